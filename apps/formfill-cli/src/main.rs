//! Inspection report filler CLI
//!
//! Entry point wrapping the fill-and-export pipeline: loads a JSON data
//! record, fills the chosen template, and prints the exported path.
//! Per-field diagnostics surface through tracing logs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use formfill_core::{Exporter, FillPipeline, MappingRegistry, TemplateStore};
use inspection_types::FormDataRecord;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formfill")]
#[command(version, about = "Fill inspection-report PDF templates from collected field data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a template from a JSON record and export the PDF
    Fill {
        /// Template filename, e.g. pile_inspection.pdf
        #[arg(short, long)]
        template: String,

        /// Path to the JSON data record
        #[arg(short, long)]
        record: PathBuf,

        /// Directory holding the packaged PDF templates
        #[arg(long, default_value = "templates")]
        assets_dir: PathBuf,

        /// Directory to write the filled report into
        #[arg(long, default_value = "exports")]
        out_dir: PathBuf,
    },
    /// List the templates known to the mapping registry
    Templates,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Fill {
            template,
            record,
            assets_dir,
            out_dir,
        } => {
            let json = std::fs::read_to_string(&record)
                .with_context(|| format!("Failed to read record file: {}", record.display()))?;
            let record: FormDataRecord =
                serde_json::from_str(&json).context("Record file is not a valid data record")?;

            let registry = MappingRegistry::builtin()?;
            let mut pipeline = FillPipeline::new(
                registry,
                TemplateStore::new(assets_dir),
                Exporter::new(out_dir),
            );

            let outcome = pipeline.run(&template, &record)?;
            tracing::info!("fields set: {}", outcome.summary);
            println!("{}", outcome.path.display());
        }
        Command::Templates => {
            let registry = MappingRegistry::builtin()?;
            for (file, mapping) in registry.entries() {
                println!(
                    "{}  (text {}, checkboxes {}, dropdowns {}, photos {})",
                    file,
                    mapping.field_mappings.len(),
                    mapping.checkbox_mappings.len(),
                    mapping.dropdown_mappings.len(),
                    mapping.photo_button_mappings.len(),
                );
            }
        }
    }
    Ok(())
}
