use thiserror::Error;

/// Fatal errors: any of these aborts a fill-and-export operation.
#[derive(Error, Debug)]
pub enum FormFillError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template name is not a plain filename: {0}")]
    InvalidTemplateName(String),

    #[error("Template asset '{name}' is implausibly small ({len} bytes)")]
    TemplateTruncated { name: String, len: usize },

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Document has no fillable form: {0}")]
    FormAccess(String),

    #[error("No field mapping registered for template: {0}")]
    MappingNotFound(String),

    #[error("Mapping registry rejected: {0}")]
    Registry(String),

    #[error("Failed to save filled PDF: {0}")]
    Save(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-field access failures, discriminated by kind so the filler can branch
/// without inspecting message text.
#[derive(Error, Debug)]
pub enum FieldAccessError {
    #[error("field '{0}' not found in form")]
    NotFound(String),

    #[error("field '{name}' is not a {expected} field")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("field '{0}' is a rich text field and cannot be set")]
    RichTextUnsupported(String),

    #[error("appearance update failed for '{name}': {reason}")]
    Appearance { name: String, reason: String },
}

/// Per-photo embed failures. Recoverable: the filler records the field and
/// moves on.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("image source does not exist: {0}")]
    Unavailable(String),

    #[error("invalid data URI: {0}")]
    BadDataUri(String),

    #[error("image not decodable as JPEG ({jpeg}) or PNG ({png})")]
    Undecodable { jpeg: String, png: String },
}
