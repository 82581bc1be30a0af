use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors surfaced by the editor.
///
/// The first group are contract violations by the caller (an unknown tool,
/// toggle or layer key). Policy rejections such as drawing on a locked layer
/// are not errors and never show up here.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("undefined tool \"{0}\"")]
    UndefinedTool(String),
    #[error("undefined toggle \"{0}\"")]
    UndefinedToggle(String),
    #[error("undefined layer {0}")]
    UndefinedLayer(usize),
    #[error("no active layer")]
    NoActiveLayer,
    #[error("invalid color \"{0}\"")]
    InvalidColor(String),

    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl From<Box<bincode::ErrorKind>> for EditorError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        EditorError::Serialize(e.to_string())
    }
}
