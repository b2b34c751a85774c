//! Template asset loading
//!
//! Resolves template filenames against the packaged assets directory and
//! caches bytes for the life of the store. The catalog is small and fixed;
//! there is no eviction.

use crate::error::FormFillError;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Assets below this size are treated as corrupt or truncated.
pub const MIN_TEMPLATE_BYTES: usize = 1024;

/// Long-lived loader owning the in-memory byte cache keyed by filename.
pub struct TemplateStore {
    assets_dir: PathBuf,
    cache: HashMap<String, Vec<u8>>,
}

impl TemplateStore {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Load a template's bytes, reading from storage at most once per name.
    pub fn load(&mut self, template_file: &str) -> Result<&[u8], FormFillError> {
        if template_file.is_empty()
            || template_file.contains(['/', '\\'])
            || template_file.contains("..")
        {
            return Err(FormFillError::InvalidTemplateName(
                template_file.to_string(),
            ));
        }

        let bytes = match self.cache.entry(template_file.to_string()) {
            Entry::Occupied(cached) => cached.into_mut(),
            Entry::Vacant(slot) => {
                let data = read_asset(&self.assets_dir, template_file)?;
                slot.insert(data)
            }
        };
        Ok(bytes)
    }

    pub fn is_cached(&self, template_file: &str) -> bool {
        self.cache.contains_key(template_file)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn read_asset(assets_dir: &Path, name: &str) -> Result<Vec<u8>, FormFillError> {
    let path = assets_dir.join(name);
    let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FormFillError::TemplateNotFound(name.to_string()),
        _ => FormFillError::Io(e),
    })?;
    if bytes.len() < MIN_TEMPLATE_BYTES {
        return Err(FormFillError::TemplateTruncated {
            name: name.to_string(),
            len: bytes.len(),
        });
    }
    debug!("loaded template {} ({} bytes)", name, bytes.len());
    Ok(bytes)
}
