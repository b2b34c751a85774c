//! Export and share
//!
//! Serializes the filled document, writes it under a derived filename, and
//! hands the path to a share sink. Sharing is best-effort: the PDF is
//! already durably written when it runs, so a sink failure is logged and
//! never propagated.

use crate::acroform::AcroForm;
use crate::error::FormFillError;
use crate::filler::{self, FillSummary};
use crate::photo::PhotoEmbedder;
use crate::registry::MappingRegistry;
use crate::template::TemplateStore;
use chrono::{DateTime, Local};
use inspection_types::FormDataRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Receives the path of a freshly exported report. The platform share sheet
/// lives behind this seam; the core only logs.
pub trait ShareSink {
    fn share(&self, path: &Path) -> Result<(), String>;
}

/// Default sink: records the export in the log and nothing else.
#[derive(Debug, Default)]
pub struct LogShare;

impl ShareSink for LogShare {
    fn share(&self, path: &Path) -> Result<(), String> {
        info!("filled report ready to share: {}", path.display());
        Ok(())
    }
}

/// Writes exported reports into one output directory.
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the bytes under a derived filename and return the path.
    pub fn persist(
        &self,
        bytes: &[u8],
        template_file: &str,
        record: &FormDataRecord,
    ) -> Result<PathBuf, FormFillError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(derive_filename(template_file, record, Local::now()));
        fs::write(&path, bytes)?;
        info!("wrote filled report to {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// `<templateBase>_<normalizedReportNumber>_<YYYY-MM-DD_HHmm>.pdf`. The
/// timestamp makes collisions practically impossible without a formal
/// uniqueness scheme.
pub fn derive_filename(
    template_file: &str,
    record: &FormDataRecord,
    now: DateTime<Local>,
) -> String {
    let base = template_file
        .strip_suffix(".pdf")
        .unwrap_or(template_file);
    let report_number = record
        .text("inspection_report_number")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "report".to_string());
    format!(
        "{}_{}_{}.pdf",
        base,
        normalize_component(&report_number),
        now.format("%Y-%m-%d_%H%M")
    )
}

fn normalize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Result of a completed fill-and-export run.
#[derive(Debug)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub summary: FillSummary,
}

/// The full fill-and-export pipeline with its long-lived collaborators
/// injected at construction. Runs are strictly sequential; the in-progress
/// document is never shared.
pub struct FillPipeline {
    registry: MappingRegistry,
    store: TemplateStore,
    exporter: Exporter,
    share: Box<dyn ShareSink>,
}

impl FillPipeline {
    pub fn new(registry: MappingRegistry, store: TemplateStore, exporter: Exporter) -> Self {
        Self {
            registry,
            store,
            exporter,
            share: Box::new(LogShare),
        }
    }

    pub fn with_share_sink(mut self, sink: Box<dyn ShareSink>) -> Self {
        self.share = sink;
        self
    }

    /// Fill the named template from the record, export, and share.
    pub fn run(
        &mut self,
        template_file: &str,
        record: &FormDataRecord,
    ) -> Result<ExportOutcome, FormFillError> {
        let mapping = self
            .registry
            .mapping_for(template_file)
            .cloned()
            .ok_or_else(|| FormFillError::MappingNotFound(template_file.to_string()))?;

        let template_bytes = self.store.load(template_file)?;
        let mut form = AcroForm::load(template_bytes)?;

        // Fresh embedder per build: decoded photos belong to this document.
        let mut embedder = PhotoEmbedder::new();
        let summary = filler::fill(&mut form, record, &mapping, &mut embedder);

        let bytes = form.save()?;
        let path = self.exporter.persist(&bytes, template_file, record)?;

        if let Err(err) = self.share.share(&path) {
            warn!("share failed (report already written): {}", err);
        }

        Ok(ExportOutcome { path, summary })
    }
}
