//! PDF form filling for field-inspection reports
//!
//! Takes a generic key/value data record plus a per-template field-mapping
//! table and writes text, checkbox, dropdown, and photo values into the
//! named fields of a pre-authored AcroForm PDF, then exports the result.
//!
//! The pipeline, leaf-first:
//! - [`registry`] — the declarative per-template field-mapping catalog
//! - [`template`] — template asset loading with an in-memory byte cache
//! - [`photo`] — photo decoding and image XObject embedding
//! - [`fit`] — aspect-ratio-preserving photo sizing
//! - [`acroform`] — typed AcroForm field access over lopdf
//! - [`filler`] — the five-phase fill orchestration
//! - [`export`] — save, persist, and best-effort share

pub mod acroform;
pub mod error;
pub mod export;
pub mod filler;
pub mod fit;
pub mod photo;
pub mod registry;
pub mod template;

#[cfg(test)]
pub(crate) mod testutil;

pub use acroform::{AcroForm, DropdownOption};
pub use error::{EmbedError, FieldAccessError, FormFillError};
pub use export::{derive_filename, ExportOutcome, Exporter, FillPipeline, LogShare, ShareSink};
pub use filler::{fill, FillSummary};
pub use fit::fit_within;
pub use photo::{EmbeddedPhoto, PhotoEmbedder};
pub use registry::{
    MappingRegistry, PhotoBox, SpecialField, SpecialSource, TemplateMapping, DEFAULT_PHOTO_BOX,
};
pub use template::{TemplateStore, MIN_TEMPLATE_BYTES};
