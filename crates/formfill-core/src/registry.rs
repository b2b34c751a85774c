//! Field mapping registry
//!
//! Bridges the data-field ids collected by the UI to the internal field
//! names of the pre-authored PDF templates. The whole catalog is one
//! declarative JSON document embedded at build time; entries are validated
//! on load. Lookup is pure and side-effect free.
//!
//! Several PDF field names intentionally preserve authoring typos carried by
//! the third-party templates (e.g. "Groutted"). They are literal keys into
//! the template binaries and must match byte-for-byte.

use crate::error::FormFillError;
use inspection_types::FormDataRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Maximum width/height box for an embedded photo, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoBox {
    pub max_width: f64,
    pub max_height: f64,
}

/// Applied when a photo field has no registered constraint.
pub const DEFAULT_PHOTO_BOX: PhotoBox = PhotoBox {
    max_width: 200.0,
    max_height: 150.0,
};

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

/// Where a special field's value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SpecialSource {
    /// A fixed string.
    Literal { value: String },
    /// Today's date in the given chrono format.
    Today {
        #[serde(default = "default_date_format")]
        format: String,
    },
    /// A record field, falling back to today's date when absent or empty.
    FieldOrToday {
        field: String,
        #[serde(default = "default_date_format")]
        format: String,
    },
}

/// A PDF field whose value is not sourced directly from the data record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialField {
    pub pdf_field: String,
    #[serde(flatten)]
    pub source: SpecialSource,
}

impl SpecialField {
    /// Resolve the value against a record. An empty result means "leave the
    /// field unset".
    pub fn resolve(&self, record: &FormDataRecord) -> Option<String> {
        let value = match &self.source {
            SpecialSource::Literal { value } => value.clone(),
            SpecialSource::Today { format } => chrono::Local::now().format(format).to_string(),
            SpecialSource::FieldOrToday { field, format } => match record.text(field) {
                Some(v) if !v.is_empty() => v,
                _ => chrono::Local::now().format(format).to_string(),
            },
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Field mappings for one PDF template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMapping {
    /// data-field id -> PDF text field name
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    /// data-field id -> PDF pushbutton field name used for photo attachment
    #[serde(default)]
    pub photo_button_mappings: BTreeMap<String, String>,
    /// data-field id -> PDF checkbox field name
    #[serde(default)]
    pub checkbox_mappings: BTreeMap<String, String>,
    /// data-field id -> PDF dropdown field name
    #[serde(default)]
    pub dropdown_mappings: BTreeMap<String, String>,
    /// Per data-field translation from the stored value to the exact option
    /// string the template's dropdown carries (handles format drift such as
    /// "14:00" -> "2:00 pm").
    #[serde(default)]
    pub dropdown_value_mappings: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub special_fields: Vec<SpecialField>,
    #[serde(default)]
    pub photo_size_constraints: BTreeMap<String, PhotoBox>,
}

impl TemplateMapping {
    /// The constraint box for a photo field, or the fixed default.
    pub fn photo_box(&self, field_id: &str) -> PhotoBox {
        self.photo_size_constraints
            .get(field_id)
            .copied()
            .unwrap_or(DEFAULT_PHOTO_BOX)
    }

    /// Translate a raw dropdown value for a field, passing it through when
    /// no translation table entry exists.
    pub fn translate_dropdown_value(&self, field_id: &str, raw: &str) -> String {
        self.dropdown_value_mappings
            .get(field_id)
            .and_then(|table| table.get(raw))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Catalog {
    templates: BTreeMap<String, TemplateMapping>,
}

/// Immutable process-wide mapping catalog, one entry per supported template.
#[derive(Debug, Clone)]
pub struct MappingRegistry {
    catalog: Catalog,
}

const BUILTIN_CATALOG: &str = include_str!("mappings.json");

impl MappingRegistry {
    /// Parse and validate the embedded catalog.
    pub fn builtin() -> Result<Self, FormFillError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from JSON. Structural problems are
    /// errors; referential drift in the hand-maintained tables only warns.
    pub fn from_json(json: &str) -> Result<Self, FormFillError> {
        let catalog: Catalog =
            serde_json::from_str(json).map_err(|e| FormFillError::Registry(e.to_string()))?;
        let registry = Self { catalog };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), FormFillError> {
        for (file, mapping) in &self.catalog.templates {
            if !file.ends_with(".pdf") {
                return Err(FormFillError::Registry(format!(
                    "template key '{}' is not a .pdf filename",
                    file
                )));
            }
            for (field, bbox) in &mapping.photo_size_constraints {
                if bbox.max_width <= 0.0 || bbox.max_height <= 0.0 {
                    return Err(FormFillError::Registry(format!(
                        "non-positive photo box for '{}' in '{}'",
                        field, file
                    )));
                }
                if !mapping.photo_button_mappings.contains_key(field) {
                    warn!(
                        "template '{}': photo size constraint for '{}' has no photo button mapping",
                        file, field
                    );
                }
            }
            for field in mapping.dropdown_value_mappings.keys() {
                if !mapping.dropdown_mappings.contains_key(field) {
                    warn!(
                        "template '{}': dropdown value translation for '{}' has no dropdown mapping",
                        file, field
                    );
                }
            }
        }
        Ok(())
    }

    /// Pure lookup; absent means the template has no registered mapping.
    pub fn mapping_for(&self, template_file: &str) -> Option<&TemplateMapping> {
        self.catalog.templates.get(template_file)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &TemplateMapping)> {
        self.catalog
            .templates
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn template_files(&self) -> impl Iterator<Item = &str> {
        self.catalog.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.catalog.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.templates.is_empty()
    }
}
