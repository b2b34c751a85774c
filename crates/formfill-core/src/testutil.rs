//! Shared test fixtures: lopdf-built AcroForm documents.

use lopdf::{dictionary, Document, Object};

/// Minimal single-page AcroForm PDF with one field of each shape the filler
/// touches, named after the pile-inspection template's real fields.
pub(crate) fn sample_form_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let text_field = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("Report#"),
        "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
    });
    let address_field = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("DeptProject"),
        "Rect" => vec![100.into(), 660.into(), 400.into(), 680.into()],
    });
    let rich_field = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("Narrative"),
        "Ff" => Object::Integer(1 << 25),
        "Rect" => vec![100.into(), 600.into(), 400.into(), 650.into()],
    });
    let checkbox = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("Check Box 1"),
        "V" => Object::Name(b"Off".to_vec()),
        "AP" => dictionary! {
            "N" => dictionary! {
                "On" => dictionary! {},
                "Off" => dictionary! {},
            },
        },
        "Rect" => vec![100.into(), 560.into(), 115.into(), 575.into()],
    });
    let dropdown = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Ch",
        "T" => Object::string_literal("Weather"),
        "Ff" => Object::Integer(1 << 17),
        "Opt" => vec![
            Object::string_literal("Sunny"),
            Object::string_literal("Cloudy"),
        ],
        "Rect" => vec![100.into(), 520.into(), 220.into(), 540.into()],
    });
    let photo_button = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("Photo 1_af_image"),
        "Ff" => Object::Integer(1 << 16),
        "Rect" => vec![100.into(), 300.into(), 360.into(), 490.into()],
    });

    let widgets = vec![
        text_field,
        address_field,
        rich_field,
        checkbox,
        dropdown,
        photo_button,
    ];

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => widgets.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    });
    if let Ok(page) = doc.get_object_mut(page_id) {
        if let Ok(dict) = page.as_dict_mut() {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
    let acroform_id = doc.add_object(dictionary! {
        "Fields" => widgets.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acroform_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A valid PDF with pages but no AcroForm.
pub(crate) fn formless_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
