//! Form filling orchestration
//!
//! Walks a template's field mappings and writes the record's values into the
//! loaded document in five phases: text, checkboxes, dropdowns, special
//! fields, photos. Every field is independent; no single missing or
//! malformed field aborts the batch. Failures are logged with the data-field
//! id and PDF field name so a registry/template mismatch can be diagnosed.

use crate::acroform::AcroForm;
use crate::error::FieldAccessError;
use crate::fit::fit_within;
use crate::photo::{source_exists, PhotoEmbedder};
use crate::registry::TemplateMapping;
use inspection_types::FormDataRecord;
use std::fmt;
use tracing::{debug, info, warn};

/// Per-category counts of fields set, plus the photo fields that failed.
/// Diagnostic output; the filler itself never fails per-field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillSummary {
    pub text_fields: usize,
    pub checkboxes: usize,
    pub dropdowns: usize,
    pub special_fields: usize,
    pub photos: usize,
    pub failed_photos: Vec<String>,
}

impl fmt::Display for FillSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "text {}, checkboxes {}, dropdowns {}, special {}, photos {}",
            self.text_fields, self.checkboxes, self.dropdowns, self.special_fields, self.photos
        )?;
        if !self.failed_photos.is_empty() {
            write!(f, ", failed photos: {}", self.failed_photos.join(", "))?;
        }
        Ok(())
    }
}

/// Fill the form in place. The embedder is expected to be fresh for this
/// document; its decode cache must not outlive the document build.
pub fn fill(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    embedder: &mut PhotoEmbedder,
) -> FillSummary {
    let mut summary = FillSummary::default();

    fill_text_fields(form, record, mapping, &mut summary);
    fill_checkboxes(form, record, mapping, &mut summary);
    fill_dropdowns(form, record, mapping, &mut summary);
    fill_special_fields(form, record, mapping, &mut summary);
    fill_photos(form, record, mapping, embedder, &mut summary);

    info!("fill complete: {}", summary);
    summary
}

fn fill_text_fields(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    summary: &mut FillSummary,
) {
    for (data_key, pdf_name) in &mapping.field_mappings {
        let Some(value) = record.text(data_key) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match form.set_text(pdf_name, &value) {
            Ok(()) => summary.text_fields += 1,
            Err(FieldAccessError::RichTextUnsupported(_)) => {
                // Known limitation of a subset of legacy-authored fields.
                debug!("skipping rich text field '{}' (data field '{}')", pdf_name, data_key);
            }
            Err(err) => {
                warn!("text field '{}' (data field '{}'): {}", pdf_name, data_key, err);
            }
        }
    }
}

fn fill_checkboxes(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    summary: &mut FillSummary,
) {
    for (data_key, pdf_name) in &mapping.checkbox_mappings {
        let checked = record.truthy(data_key);
        match form.set_checkbox(pdf_name, checked) {
            Ok(()) => summary.checkboxes += 1,
            Err(err) => {
                warn!("checkbox '{}' (data field '{}'): {}", pdf_name, data_key, err);
            }
        }
    }
}

fn fill_dropdowns(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    summary: &mut FillSummary,
) {
    for (data_key, pdf_name) in &mapping.dropdown_mappings {
        let Some(raw) = record.text(data_key) else {
            continue;
        };
        let target = mapping.translate_dropdown_value(data_key, &raw);

        let options = match form.dropdown_options(pdf_name) {
            Ok(options) => options,
            Err(err) => {
                warn!("dropdown '{}' (data field '{}'): {}", pdf_name, data_key, err);
                continue;
            }
        };

        let chosen = options
            .iter()
            .find(|o| o.display == target || o.export == target)
            .or_else(|| {
                options.iter().find(|o| {
                    o.display.eq_ignore_ascii_case(&target)
                        || o.export.eq_ignore_ascii_case(&target)
                })
            });

        match chosen {
            Some(option) => match form.select_option(pdf_name, &option.export) {
                Ok(()) => summary.dropdowns += 1,
                Err(err) => {
                    warn!("dropdown '{}' (data field '{}'): {}", pdf_name, data_key, err);
                }
            },
            None => {
                // Silent degradation: the dropdown stays unset.
                warn!(
                    "dropdown '{}': value '{}' not found in options",
                    pdf_name, target
                );
            }
        }
    }
}

fn fill_special_fields(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    summary: &mut FillSummary,
) {
    for special in &mapping.special_fields {
        let Some(value) = special.resolve(record) else {
            continue;
        };
        match form.set_text(&special.pdf_field, &value) {
            Ok(()) => summary.special_fields += 1,
            Err(FieldAccessError::RichTextUnsupported(_)) => {
                debug!("skipping rich text special field '{}'", special.pdf_field);
            }
            Err(err) => {
                warn!("special field '{}': {}", special.pdf_field, err);
            }
        }
    }
}

fn fill_photos(
    form: &mut AcroForm,
    record: &FormDataRecord,
    mapping: &TemplateMapping,
    embedder: &mut PhotoEmbedder,
    summary: &mut FillSummary,
) {
    // Photos are processed strictly one at a time; the form-mutation surface
    // assumes single-flight access to the in-progress document.
    for (data_key, pdf_button) in &mapping.photo_button_mappings {
        let Some(source_ref) = record.text(data_key) else {
            continue;
        };
        if source_ref.is_empty() {
            continue;
        }

        if !source_exists(&source_ref) {
            warn!("photo '{}': source does not exist: {}", data_key, source_ref);
            summary.failed_photos.push(data_key.clone());
            continue;
        }
        if !form.contains(pdf_button) {
            warn!("photo '{}': button field '{}' not found", data_key, pdf_button);
            summary.failed_photos.push(data_key.clone());
            continue;
        }

        let photo = match embedder.embed(form.document_mut(), &source_ref, data_key) {
            Ok(photo) => photo,
            Err(err) => {
                warn!("photo '{}': {}", data_key, err);
                summary.failed_photos.push(data_key.clone());
                continue;
            }
        };

        let bbox = mapping.photo_box(data_key);
        let size = fit_within(
            photo.width as f64,
            photo.height as f64,
            bbox.max_width,
            bbox.max_height,
        );

        match form.set_button_image(pdf_button, &photo, size) {
            Ok(()) => {
                summary.photos += 1;
                if let Err(err) = form.refresh_button_appearance(pdf_button, size) {
                    // The image stays attached; only the cached appearance
                    // placement is stale.
                    warn!("photo '{}': {}", data_key, err);
                }
            }
            Err(err) => {
                warn!("photo '{}': button '{}': {}", data_key, pdf_button, err);
                summary.failed_photos.push(data_key.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MappingRegistry;
    use crate::testutil::sample_form_pdf;
    use base64::Engine;
    use pretty_assertions::assert_eq;

    fn pile_mapping() -> TemplateMapping {
        MappingRegistry::builtin()
            .unwrap()
            .mapping_for("pile_inspection.pdf")
            .unwrap()
            .clone()
    }

    fn png_data_uri() -> String {
        use image::{DynamicImage, RgbaImage};
        let img = RgbaImage::from_pixel(40, 30, image::Rgba([1, 2, 3, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(out.into_inner())
        )
    }

    #[test]
    fn test_fill_sets_mapped_fields() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("inspection_report_number", "TEST-001");
        record.insert("project_address", "123 Main St");
        record.insert("deviation_design_documents", true);

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);

        assert_eq!(form.text_value("Report#"), Some("TEST-001".to_string()));
        assert_eq!(form.text_value("DeptProject"), Some("123 Main St".to_string()));
        assert_eq!(form.checkbox_state("Check Box 1"), Some("On".to_string()));
        assert_eq!(summary.text_fields, 2);
        // Only "Check Box 1" exists in the fixture; the other mapped
        // checkboxes are skipped.
        assert_eq!(summary.checkboxes, 1);
        assert!(summary.failed_photos.is_empty());
    }

    #[test]
    fn test_missing_pdf_fields_are_tolerated() {
        // The pile mapping references many fields the fixture lacks; filling
        // must not fail and must still set the ones that exist.
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("inspection_report_number", "R-7");
        record.insert("contractor_name", "Acme Foundations"); // "Contractor" absent
        record.insert("piles_grouted", true); // "Groutted" absent

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(form.text_value("Report#"), Some("R-7".to_string()));
        assert_eq!(summary.text_fields, 1);
    }

    #[test]
    fn test_empty_string_skips_text_field() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("inspection_report_number", "");

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.text_fields, 0);
        assert_eq!(form.text_value("Report#"), None);
    }

    #[test]
    fn test_unchecked_when_value_missing() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let record = FormDataRecord::new();

        let mut embedder = PhotoEmbedder::new();
        fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(form.checkbox_state("Check Box 1"), Some("Off".to_string()));
    }

    #[test]
    fn test_dropdown_translation_wins_over_case_fallback() {
        // "sunny" translates to "Sunny" and must match exactly, not via the
        // case-insensitive fallback.
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("weather", "sunny");

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.dropdowns, 1);
        assert_eq!(form.text_value("Weather"), Some("Sunny".to_string()));
    }

    #[test]
    fn test_dropdown_case_insensitive_fallback() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("weather", "CLOUDY"); // no translation entry

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.dropdowns, 1);
        assert_eq!(form.text_value("Weather"), Some("Cloudy".to_string()));
    }

    #[test]
    fn test_dropdown_graceful_miss_leaves_unset() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("weather", "hailstorm");

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.dropdowns, 0);
        assert_eq!(form.text_value("Weather"), None);
    }

    #[test]
    fn test_photo_attached_to_button() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("photo_1", png_data_uri());

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.photos, 1);
        assert!(summary.failed_photos.is_empty());
    }

    #[test]
    fn test_missing_photo_source_recorded_as_failed() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("photo_1", "/no/such/photo.jpg");

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.photos, 0);
        assert_eq!(summary.failed_photos, vec!["photo_1".to_string()]);
    }

    #[test]
    fn test_missing_button_recorded_as_failed() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        // photo_2 maps to "Photo 2_af_image" which the fixture lacks.
        record.insert("photo_2", png_data_uri());

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &pile_mapping(), &mut embedder);
        assert_eq!(summary.photos, 0);
        assert_eq!(summary.failed_photos, vec!["photo_2".to_string()]);
    }

    #[test]
    fn test_special_field_uses_record_date() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let mut record = FormDataRecord::new();
        record.insert("inspection_date", "03/14/2026");

        // The fixture lacks "DateStamp" and "Agency"; add a mapping variant
        // that targets an existing text field instead.
        let mut mapping = pile_mapping();
        mapping.special_fields = vec![crate::registry::SpecialField {
            pdf_field: "DeptProject".to_string(),
            source: crate::registry::SpecialSource::FieldOrToday {
                field: "inspection_date".to_string(),
                format: "%m/%d/%Y".to_string(),
            },
        }];

        let mut embedder = PhotoEmbedder::new();
        let summary = fill(&mut form, &record, &mapping, &mut embedder);
        assert_eq!(summary.special_fields, 1);
        assert_eq!(
            form.text_value("DeptProject"),
            Some("03/14/2026".to_string())
        );
    }

    #[test]
    fn test_summary_display() {
        let summary = FillSummary {
            text_fields: 3,
            checkboxes: 1,
            dropdowns: 0,
            special_fields: 1,
            photos: 2,
            failed_photos: vec!["photo_3".to_string()],
        };
        assert_eq!(
            summary.to_string(),
            "text 3, checkboxes 1, dropdowns 0, special 1, photos 2, failed photos: photo_3"
        );
    }
}
