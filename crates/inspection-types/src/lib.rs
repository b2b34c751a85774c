//! Shared data model for field-inspection forms
//!
//! Form descriptors are static data authored alongside the PDF templates;
//! data records are produced per inspection session by the UI layer and
//! consumed by the form filler. Nothing here touches a PDF.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Date,
    Boolean,
    Image,
    Signature,
}

/// A single field in a form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Lookup key into the submitted data record
    pub id: String,
    pub kind: FieldKind,
    pub label: String,
    /// Grouping section shown in the UI
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A template descriptor: which PDF it fills and which fields it collects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionForm {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Filename of the AcroForm PDF this form fills
    pub template_file: String,
    pub fields: Vec<FieldDefinition>,
}

/// A value collected for a single field.
///
/// Image and signature fields carry a string reference to a locally stored
/// photo (a filesystem path or a data URI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Checkbox coercion. Booleans pass through; the strings `"true"`
    /// (case-sensitive) and `"1"` count as true; a non-empty list counts as
    /// true; everything else is false.
    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => s == "true" || s == "1",
            FieldValue::List(items) => !items.is_empty(),
        }
    }

    /// String form of the value.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// The data collected for one inspection session, keyed by field id.
///
/// Passed by value into the form filler and discarded after export;
/// persistence is a UI/storage concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDataRecord(BTreeMap<String, FieldValue>);

impl FormDataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field_id.into(), value.into());
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.0.get(field_id)
    }

    /// String form of a field's value, `None` when the field is absent.
    pub fn text(&self, field_id: &str) -> Option<String> {
        self.0.get(field_id).map(FieldValue::to_text)
    }

    /// Checkbox coercion; an absent field coerces to false.
    pub fn truthy(&self, field_id: &str) -> bool {
        self.0.get(field_id).map(FieldValue::truthy).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormDataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthy_bool_passes_through() {
        assert!(FieldValue::Bool(true).truthy());
        assert!(!FieldValue::Bool(false).truthy());
    }

    #[test]
    fn test_truthy_string_table() {
        assert!(FieldValue::from("true").truthy());
        assert!(FieldValue::from("1").truthy());
        assert!(!FieldValue::from("false").truthy());
        assert!(!FieldValue::from("TRUE").truthy()); // case-sensitive
        assert!(!FieldValue::from("yes").truthy());
        assert!(!FieldValue::from("").truthy());
    }

    #[test]
    fn test_truthy_list_by_emptiness() {
        assert!(!FieldValue::List(vec![]).truthy());
        assert!(FieldValue::List(vec!["a".to_string()]).truthy());
    }

    #[test]
    fn test_truthy_missing_field_is_false() {
        let record = FormDataRecord::new();
        assert!(!record.truthy("not_there"));
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(FieldValue::Bool(true).to_text(), "true");
        assert_eq!(FieldValue::from("abc").to_text(), "abc");
        assert_eq!(
            FieldValue::List(vec!["a".to_string(), "b".to_string()]).to_text(),
            "a, b"
        );
    }

    #[test]
    fn test_record_json_roundtrip() {
        let json = r#"{
            "inspection_report_number": "TEST-001",
            "deviation_design_documents": true,
            "observed_defects": ["spalling", "honeycombing"]
        }"#;
        let record: FormDataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.get("inspection_report_number"),
            Some(&FieldValue::Text("TEST-001".to_string()))
        );
        assert_eq!(
            record.get("deviation_design_documents"),
            Some(&FieldValue::Bool(true))
        );
        assert!(record.truthy("observed_defects"));

        let back = serde_json::to_string(&record).unwrap();
        let reparsed: FormDataRecord = serde_json::from_str(&back).unwrap();
        assert_eq!(record, reparsed);
    }

    #[test]
    fn test_form_definition_deserializes_with_defaults() {
        let json = r#"{
            "id": "pile_inspection",
            "name": "Pile Driving Inspection",
            "category": "Deep Foundations",
            "template_file": "pile_inspection.pdf",
            "fields": [
                {"id": "inspection_report_number", "kind": "text", "label": "Report #", "section": "General", "required": true},
                {"id": "weather", "kind": "select", "label": "Weather", "section": "Site Conditions", "options": ["Sunny", "Cloudy", "Rain"]}
            ]
        }"#;
        let form: InspectionForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.fields.len(), 2);
        assert!(form.fields[0].required);
        assert!(!form.fields[1].required);
        assert_eq!(form.fields[1].kind, FieldKind::Select);
    }
}
