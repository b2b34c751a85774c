//! AcroForm field access over lopdf
//!
//! Indexes the fields of a loaded document by fully-qualified name and
//! exposes typed set-operations for the four field shapes the filler needs:
//! text, checkbox, dropdown, and image pushbutton. Field failures carry an
//! explicit kind (`FieldAccessError`) so callers branch on the kind rather
//! than on message text.

use crate::error::{FieldAccessError, FormFillError};
use crate::photo::EmbeddedPhoto;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use tracing::debug;

// Field flag bits, PDF 32000-1 tables 226/228/230.
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_RICH_TEXT: i64 = 1 << 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PdfFieldType {
    Text,
    Button,
    Choice,
    Other,
}

fn field_type_from_name(name: &[u8]) -> PdfFieldType {
    match name {
        b"Tx" => PdfFieldType::Text,
        b"Btn" => PdfFieldType::Button,
        b"Ch" => PdfFieldType::Choice,
        _ => PdfFieldType::Other,
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSlot {
    id: ObjectId,
    field_type: PdfFieldType,
    flags: i64,
}

/// One entry of a dropdown's option list.
#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOption {
    pub export: String,
    pub display: String,
}

/// A loaded AcroForm document with its fields indexed by name.
pub struct AcroForm {
    doc: Document,
    fields: HashMap<String, FieldSlot>,
}

impl AcroForm {
    /// Parse the bytes and index the form fields. A document without an
    /// AcroForm dictionary is the one fatal failure of the fill phase.
    pub fn load(bytes: &[u8]) -> Result<Self, FormFillError> {
        let mut doc =
            Document::load_mem(bytes).map_err(|e| FormFillError::Parse(e.to_string()))?;

        let acroform_id = locate_acroform(&doc)?;
        let field_refs = {
            let dict = acroform_dict(&doc, acroform_id)?;
            dict.get(b"Fields")
                .and_then(Object::as_array)
                .map(|a| a.to_vec())
                .unwrap_or_default()
        };

        let mut fields = HashMap::new();
        index_fields(&doc, &field_refs, "", None, 0, &mut fields);
        debug!("indexed {} form fields", fields.len());

        set_need_appearances(&mut doc, acroform_id)?;

        Ok(Self { doc, fields })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The underlying document, for registering image resources.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Set a text field's value. Rich-text fields are refused with their own
    /// error kind; the template catalog contains a handful of legacy-authored
    /// fields that carry the flag.
    pub fn set_text(&mut self, name: &str, value: &str) -> Result<(), FieldAccessError> {
        let slot = self.slot(name)?;
        if slot.field_type != PdfFieldType::Text {
            return Err(FieldAccessError::TypeMismatch {
                name: name.to_string(),
                expected: "text",
            });
        }
        if slot.flags & FF_RICH_TEXT != 0 {
            return Err(FieldAccessError::RichTextUnsupported(name.to_string()));
        }
        let dict = self.field_dict_mut(slot.id, name)?;
        dict.set(
            "V",
            Object::String(encode_pdf_text(value), StringFormat::Literal),
        );
        // Drop any stale appearance; NeedAppearances regenerates it.
        dict.remove(b"AP");
        Ok(())
    }

    /// Current text value, mainly for diagnostics and tests.
    pub fn text_value(&self, name: &str) -> Option<String> {
        let slot = self.fields.get(name)?;
        let dict = self.doc.get_object(slot.id).ok()?.as_dict().ok()?;
        match self.resolve(dict.get(b"V").ok()?) {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
    }

    /// Check or uncheck a checkbox. The "on" appearance state is discovered
    /// from the widget; `Off` is the universal unchecked state.
    pub fn set_checkbox(&mut self, name: &str, checked: bool) -> Result<(), FieldAccessError> {
        let slot = self.slot(name)?;
        if slot.field_type != PdfFieldType::Button
            || slot.flags & (FF_PUSHBUTTON | FF_RADIO) != 0
        {
            return Err(FieldAccessError::TypeMismatch {
                name: name.to_string(),
                expected: "checkbox",
            });
        }
        let widget = self.widget_id(&slot);
        let state = if checked {
            self.checkbox_on_state(widget)
        } else {
            b"Off".to_vec()
        };

        let field = self.field_dict_mut(slot.id, name)?;
        field.set("V", Object::Name(state.clone()));
        let widget_dict = self.field_dict_mut(widget, name)?;
        widget_dict.set("AS", Object::Name(state));
        Ok(())
    }

    /// Current appearance state name of a checkbox, for tests.
    pub fn checkbox_state(&self, name: &str) -> Option<String> {
        let slot = self.fields.get(name)?;
        let dict = self.doc.get_object(slot.id).ok()?.as_dict().ok()?;
        match dict.get(b"V").ok()? {
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        }
    }

    /// The valid options of a dropdown, as (export, display) pairs.
    pub fn dropdown_options(&self, name: &str) -> Result<Vec<DropdownOption>, FieldAccessError> {
        let slot = self.slot(name)?;
        if slot.field_type != PdfFieldType::Choice {
            return Err(FieldAccessError::TypeMismatch {
                name: name.to_string(),
                expected: "dropdown",
            });
        }
        let dict = self.field_dict(slot.id, name)?;
        let mut options = Vec::new();
        if let Ok(opt) = dict.get(b"Opt") {
            if let Ok(items) = self.resolve(opt).as_array() {
                for item in items {
                    match self.resolve(item) {
                        Object::String(bytes, _) => {
                            let text = decode_pdf_string(bytes);
                            options.push(DropdownOption {
                                export: text.clone(),
                                display: text,
                            });
                        }
                        Object::Array(pair) if pair.len() == 2 => {
                            let export = pdf_string_of(self.resolve(&pair[0]));
                            let display = pdf_string_of(self.resolve(&pair[1]));
                            options.push(DropdownOption { export, display });
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(options)
    }

    /// Select a dropdown option by its export value.
    pub fn select_option(&mut self, name: &str, export: &str) -> Result<(), FieldAccessError> {
        let slot = self.slot(name)?;
        if slot.field_type != PdfFieldType::Choice {
            return Err(FieldAccessError::TypeMismatch {
                name: name.to_string(),
                expected: "dropdown",
            });
        }
        let dict = self.field_dict_mut(slot.id, name)?;
        dict.set(
            "V",
            Object::String(encode_pdf_text(export), StringFormat::Literal),
        );
        // A stale selection index would override /V in some viewers.
        dict.remove(b"I");
        Ok(())
    }

    /// Install an embedded photo as a pushbutton's normal appearance, drawn
    /// at the given size in points.
    pub fn set_button_image(
        &mut self,
        name: &str,
        photo: &EmbeddedPhoto,
        size: (f64, f64),
    ) -> Result<(), FieldAccessError> {
        let slot = self.slot(name)?;
        if slot.field_type != PdfFieldType::Button || slot.flags & FF_PUSHBUTTON == 0 {
            return Err(FieldAccessError::TypeMismatch {
                name: name.to_string(),
                expected: "push button",
            });
        }
        let (w, h) = size;

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(photo.id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut stream_dict = Dictionary::new();
        stream_dict.set("Type", Object::Name(b"XObject".to_vec()));
        stream_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        stream_dict.set("FormType", Object::Integer(1));
        stream_dict.set("BBox", real_array(&[0.0, 0.0, w, h]));
        stream_dict.set("Resources", Object::Dictionary(resources));

        // An image XObject is a unit square; scale it up to the fitted size.
        let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ", w, h);
        let appearance_id = self
            .doc
            .add_object(Object::Stream(Stream::new(stream_dict, content.into_bytes())));

        let widget = self.widget_id(&slot);
        let widget_dict = self.field_dict_mut(widget, name)?;
        let mut ap = Dictionary::new();
        ap.set("N", Object::Reference(appearance_id));
        widget_dict.set("AP", Object::Dictionary(ap));
        // Remove any caption so it cannot render over the photo.
        widget_dict.remove(b"MK");
        Ok(())
    }

    /// Recenter a button's photo appearance inside the widget rectangle.
    /// Failing here leaves the image assignment intact; only the cached
    /// appearance placement is stale.
    pub fn refresh_button_appearance(
        &mut self,
        name: &str,
        size: (f64, f64),
    ) -> Result<(), FieldAccessError> {
        let slot = self.slot(name)?;
        let widget = self.widget_id(&slot);

        let (rect, appearance_id) = {
            let dict = self.field_dict(widget, name)?;
            let rect = dict
                .get(b"Rect")
                .ok()
                .map(|o| self.resolve(o))
                .and_then(rect_of)
                .ok_or_else(|| FieldAccessError::Appearance {
                    name: name.to_string(),
                    reason: "missing or malformed /Rect".to_string(),
                })?;
            let appearance_id = dict
                .get(b"AP")
                .and_then(Object::as_dict)
                .and_then(|ap| ap.get(b"N"))
                .and_then(Object::as_reference)
                .map_err(|_| FieldAccessError::Appearance {
                    name: name.to_string(),
                    reason: "no normal appearance stream".to_string(),
                })?;
            (rect, appearance_id)
        };

        let rect_w = (rect[2] - rect[0]).abs();
        let rect_h = (rect[3] - rect[1]).abs();
        if rect_w <= 0.0 || rect_h <= 0.0 {
            return Err(FieldAccessError::Appearance {
                name: name.to_string(),
                reason: "degenerate /Rect".to_string(),
            });
        }

        let (w, h) = size;
        let dx = ((rect_w - w) / 2.0).max(0.0);
        let dy = ((rect_h - h) / 2.0).max(0.0);
        let content = format!(
            "q\n1 0 0 1 {} {} cm\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ",
            dx, dy, w, h
        );

        match self.doc.get_object_mut(appearance_id) {
            Ok(Object::Stream(stream)) => {
                stream.dict.set("BBox", real_array(&[0.0, 0.0, rect_w, rect_h]));
                stream.set_content(content.into_bytes());
                Ok(())
            }
            _ => Err(FieldAccessError::Appearance {
                name: name.to_string(),
                reason: "appearance is not a stream".to_string(),
            }),
        }
    }

    /// Serialize the document.
    pub fn save(&mut self) -> Result<Vec<u8>, FormFillError> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| FormFillError::Save(e.to_string()))?;
        Ok(out)
    }

    fn slot(&self, name: &str) -> Result<FieldSlot, FieldAccessError> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| FieldAccessError::NotFound(name.to_string()))
    }

    fn field_dict(&self, id: ObjectId, name: &str) -> Result<&Dictionary, FieldAccessError> {
        self.doc
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|_| FieldAccessError::NotFound(name.to_string()))
    }

    fn field_dict_mut(
        &mut self,
        id: ObjectId,
        name: &str,
    ) -> Result<&mut Dictionary, FieldAccessError> {
        self.doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| FieldAccessError::NotFound(name.to_string()))
    }

    /// The object carrying the widget annotation for a field: the field
    /// dictionary itself when merged, otherwise its first kid with a /Rect.
    fn widget_id(&self, slot: &FieldSlot) -> ObjectId {
        if let Ok(dict) = self.doc.get_object(slot.id).and_then(Object::as_dict) {
            if dict.has(b"Rect") {
                return slot.id;
            }
            if let Ok(kids) = dict.get(b"Kids").and_then(Object::as_array) {
                for kid in kids {
                    if let Ok(kid_id) = kid.as_reference() {
                        if let Ok(kid_dict) =
                            self.doc.get_object(kid_id).and_then(Object::as_dict)
                        {
                            if kid_dict.has(b"Rect") {
                                return kid_id;
                            }
                        }
                    }
                }
            }
        }
        slot.id
    }

    /// The name of the checked appearance state, read from /AP /N. Templates
    /// authored in different tools use Yes, On, or arbitrary names.
    fn checkbox_on_state(&self, widget: ObjectId) -> Vec<u8> {
        if let Ok(dict) = self.doc.get_object(widget).and_then(Object::as_dict) {
            if let Ok(ap) = dict.get(b"AP") {
                if let Ok(ap_dict) = self.resolve(ap).as_dict() {
                    if let Ok(normal) = ap_dict.get(b"N") {
                        if let Ok(states) = self.resolve(normal).as_dict() {
                            for (state, _) in states.iter() {
                                if state.as_slice() != b"Off" {
                                    return state.clone();
                                }
                            }
                        }
                    }
                }
            }
        }
        b"Yes".to_vec()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        if let Object::Reference(id) = obj {
            if let Ok(target) = self.doc.get_object(*id) {
                return target;
            }
        }
        obj
    }
}

fn locate_acroform(doc: &Document) -> Result<Option<ObjectId>, FormFillError> {
    let catalog = doc
        .catalog()
        .map_err(|e| FormFillError::Parse(e.to_string()))?;
    match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Ok(Some(*id)),
        Ok(Object::Dictionary(_)) => Ok(None),
        _ => Err(FormFillError::FormAccess(
            "catalog has no /AcroForm dictionary".to_string(),
        )),
    }
}

fn acroform_dict(doc: &Document, id: Option<ObjectId>) -> Result<&Dictionary, FormFillError> {
    match id {
        Some(id) => doc
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|e| FormFillError::FormAccess(e.to_string())),
        None => {
            let catalog = doc
                .catalog()
                .map_err(|e| FormFillError::Parse(e.to_string()))?;
            catalog
                .get(b"AcroForm")
                .and_then(Object::as_dict)
                .map_err(|e| FormFillError::FormAccess(e.to_string()))
        }
    }
}

fn set_need_appearances(doc: &mut Document, id: Option<ObjectId>) -> Result<(), FormFillError> {
    match id {
        Some(id) => {
            let dict = doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| FormFillError::FormAccess(e.to_string()))?;
            dict.set("NeedAppearances", Object::Boolean(true));
        }
        None => {
            let catalog = doc
                .catalog_mut()
                .map_err(|e| FormFillError::Parse(e.to_string()))?;
            if let Ok(Object::Dictionary(dict)) = catalog.get_mut(b"AcroForm") {
                dict.set("NeedAppearances", Object::Boolean(true));
            }
        }
    }
    Ok(())
}

fn index_fields(
    doc: &Document,
    refs: &[Object],
    prefix: &str,
    inherited_type: Option<PdfFieldType>,
    inherited_flags: i64,
    out: &mut HashMap<String, FieldSlot>,
) {
    for obj in refs {
        let Ok(id) = obj.as_reference() else { continue };
        let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
            continue;
        };

        let partial = match dict.get(b"T") {
            Ok(Object::String(bytes, _)) => Some(decode_pdf_string(bytes)),
            _ => None,
        };
        let name = match &partial {
            Some(t) if prefix.is_empty() => t.clone(),
            Some(t) => format!("{}.{}", prefix, t),
            None => prefix.to_string(),
        };

        let field_type = dict
            .get(b"FT")
            .and_then(Object::as_name)
            .map(field_type_from_name)
            .ok()
            .or(inherited_type);
        let flags = dict
            .get(b"Ff")
            .and_then(Object::as_i64)
            .unwrap_or(inherited_flags);

        let kids = dict
            .get(b"Kids")
            .and_then(Object::as_array)
            .map(|a| a.to_vec())
            .unwrap_or_default();

        if !kids.is_empty() && kids_are_fields(doc, &kids) {
            index_fields(doc, &kids, &name, field_type, flags, out);
        } else if let Some(field_type) = field_type {
            if !name.is_empty() {
                out.insert(name, FieldSlot { id, field_type, flags });
            }
        }
    }
}

fn kids_are_fields(doc: &Document, kids: &[Object]) -> bool {
    kids.iter().any(|kid| {
        kid.as_reference()
            .ok()
            .and_then(|id| doc.get_object(id).ok())
            .and_then(|obj| obj.as_dict().ok())
            .map(|dict| dict.has(b"T"))
            .unwrap_or(false)
    })
}

fn rect_of(obj: &Object) -> Option<[f64; 4]> {
    let items = obj.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number_of(item)?;
    }
    Some(rect)
}

fn number_of(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

fn real_array(values: &[f64]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real(*v as f32)).collect())
}

fn pdf_string_of(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => String::new(),
    }
}

/// PDF text strings are either UTF-16BE with a BOM or byte strings.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn encode_pdf_text(value: &str) -> Vec<u8> {
    if value.is_ascii() {
        value.as_bytes().to_vec()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{formless_pdf, sample_form_pdf};

    #[test]
    fn test_load_indexes_fields() {
        let form = AcroForm::load(&sample_form_pdf()).unwrap();
        assert!(form.contains("Report#"));
        assert!(form.contains("Check Box 1"));
        assert!(form.contains("Weather"));
        assert!(form.contains("Photo 1_af_image"));
        assert!(!form.contains("Ghost"));
    }

    #[test]
    fn test_formless_document_is_fatal() {
        assert!(matches!(
            AcroForm::load(&formless_pdf()),
            Err(FormFillError::FormAccess(_))
        ));
    }

    #[test]
    fn test_set_text_roundtrip() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        form.set_text("Report#", "TEST-001").unwrap();
        assert_eq!(form.text_value("Report#"), Some("TEST-001".to_string()));

        // Survives serialization.
        let bytes = form.save().unwrap();
        let reloaded = AcroForm::load(&bytes).unwrap();
        assert_eq!(reloaded.text_value("Report#"), Some("TEST-001".to_string()));
    }

    #[test]
    fn test_set_text_non_ascii_uses_utf16() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        form.set_text("Report#", "Überprüfung").unwrap();
        assert_eq!(
            form.text_value("Report#"),
            Some("Überprüfung".to_string())
        );
    }

    #[test]
    fn test_missing_field_kind() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        assert!(matches!(
            form.set_text("Ghost", "x"),
            Err(FieldAccessError::NotFound(_))
        ));
    }

    #[test]
    fn test_rich_text_field_kind() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        assert!(matches!(
            form.set_text("Narrative", "x"),
            Err(FieldAccessError::RichTextUnsupported(_))
        ));
    }

    #[test]
    fn test_type_mismatch_kind() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        assert!(matches!(
            form.set_text("Check Box 1", "x"),
            Err(FieldAccessError::TypeMismatch { .. })
        ));
        assert!(matches!(
            form.set_checkbox("Report#", true),
            Err(FieldAccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_checkbox_discovers_on_state() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        form.set_checkbox("Check Box 1", true).unwrap();
        assert_eq!(form.checkbox_state("Check Box 1"), Some("On".to_string()));
        form.set_checkbox("Check Box 1", false).unwrap();
        assert_eq!(form.checkbox_state("Check Box 1"), Some("Off".to_string()));
    }

    #[test]
    fn test_dropdown_options_and_select() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        let options = form.dropdown_options("Weather").unwrap();
        assert_eq!(
            options,
            vec![
                DropdownOption {
                    export: "Sunny".to_string(),
                    display: "Sunny".to_string()
                },
                DropdownOption {
                    export: "Cloudy".to_string(),
                    display: "Cloudy".to_string()
                },
            ]
        );
        form.select_option("Weather", "Sunny").unwrap();
        assert_eq!(form.text_value("Weather"), Some("Sunny".to_string()));
    }

    #[test]
    fn test_pushbutton_rejects_checkbox_op() {
        let mut form = AcroForm::load(&sample_form_pdf()).unwrap();
        assert!(matches!(
            form.set_checkbox("Photo 1_af_image", true),
            Err(FieldAccessError::TypeMismatch { .. })
        ));
    }
}
