//! Photo loading and embedding
//!
//! Resolves a photo reference (filesystem path or data URI) to raw bytes,
//! decodes it — JPEG first, PNG second — and registers the result as an
//! image XObject in the target document. JPEG bytes pass through to the PDF
//! unchanged (DCTDecode); PNG pixels are Flate-compressed, with the alpha
//! channel split into an /SMask. Decodes are cached by source reference for
//! the lifetime of one document build, so a photo referenced by several
//! fields is decoded once.

use crate::error::EmbedError;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Handle to an image registered in the open document's resource table.
/// Invalid once that document is discarded.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedPhoto {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Per-document-build embedder owning the decode cache.
#[derive(Default)]
pub struct PhotoEmbedder {
    cache: HashMap<String, EmbeddedPhoto>,
}

impl PhotoEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed the referenced photo, reusing an earlier decode of the same
    /// source within this build.
    pub fn embed(
        &mut self,
        doc: &mut Document,
        source_ref: &str,
        field_id: &str,
    ) -> Result<EmbeddedPhoto, EmbedError> {
        if let Some(photo) = self.cache.get(source_ref) {
            debug!("photo cache hit for field {}", field_id);
            return Ok(*photo);
        }

        let bytes = resolve_source(source_ref)?;
        let photo = match embed_jpeg(doc, &bytes) {
            Ok(photo) => photo,
            Err(jpeg) => match embed_png(doc, &bytes) {
                Ok(photo) => photo,
                Err(png) => {
                    warn!(
                        "field {}: photo decode failed (jpeg: {}; png: {})",
                        field_id, jpeg, png
                    );
                    return Err(EmbedError::Undecodable { jpeg, png });
                }
            },
        };

        debug!(
            "embedded photo for field {} ({}x{} px)",
            field_id, photo.width, photo.height
        );
        self.cache.insert(source_ref.to_string(), photo);
        Ok(photo)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Whether the referenced resource can be read at all. Data URIs carry their
/// bytes inline and always pass; filesystem references are checked on disk.
pub fn source_exists(source_ref: &str) -> bool {
    if source_ref.starts_with("data:") {
        return true;
    }
    Path::new(strip_file_scheme(source_ref)).exists()
}

fn strip_file_scheme(source_ref: &str) -> &str {
    source_ref.strip_prefix("file://").unwrap_or(source_ref)
}

fn resolve_source(source_ref: &str) -> Result<Vec<u8>, EmbedError> {
    if let Some(rest) = source_ref.strip_prefix("data:") {
        let encoded = rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| EmbedError::BadDataUri("missing comma separator".to_string()))?;
        return base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EmbedError::BadDataUri(e.to_string()));
    }
    std::fs::read(strip_file_scheme(source_ref))
        .map_err(|_| EmbedError::Unavailable(source_ref.to_string()))
}

/// JPEG: dimensions are read without decoding pixels and the raw bytes are
/// embedded directly under DCTDecode. The SOF component count distinguishes
/// grayscale from RGB.
fn embed_jpeg(doc: &mut Document, data: &[u8]) -> Result<EmbeddedPhoto, String> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err("bad SOI marker".to_string());
    }
    let (width, height) = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| e.to_string())?;

    let color_space: &[u8] = if jpeg_component_count(data) == 1 {
        b"DeviceGray"
    } else {
        b"DeviceRGB"
    };

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    let id = doc.add_object(Object::Stream(Stream::new(dict, data.to_vec())));
    Ok(EmbeddedPhoto { id, width, height })
}

/// Scan JPEG markers for the SOF segment and read its component count.
fn jpeg_component_count(data: &[u8]) -> u8 {
    let mut i = 2; // past SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            if i + 9 < data.len() {
                return data[i + 9];
            }
            break;
        }
        if i + 3 < data.len() {
            let segment_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + segment_len;
        } else {
            break;
        }
    }
    3
}

/// PNG: decoded to RGB8 with the alpha channel, when present, embedded as a
/// grayscale /SMask.
fn embed_png(doc: &mut Document, data: &[u8]) -> Result<EmbeddedPhoto, String> {
    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    if !data.starts_with(&PNG_MAGIC) {
        return Err("bad signature".to_string());
    }
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
        if pixel.0[3] != 255 {
            has_transparency = true;
        }
    }

    let smask_id = if has_transparency {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width as i64));
        dict.set("Height", Object::Integer(height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        Some(doc.add_object(Object::Stream(Stream::new(dict, flate_compress(&alpha)))))
    } else {
        None
    };

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    if let Some(smask_id) = smask_id {
        dict.set("SMask", Object::Reference(smask_id));
    }

    let id = doc.add_object(Object::Stream(Stream::new(dict, flate_compress(&rgb))));
    Ok(EmbeddedPhoto { id, width, height })
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}
