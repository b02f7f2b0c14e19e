//! Error type shared by the whole crate.

use std::path::PathBuf;

/// Result alias defaulting to [`ContextError`].
pub type Result<T, E = ContextError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A query word tokenized to zero pieces. Inserting it would make the
    /// root terminal and match every line.
    #[error("query word {word:?} tokenizes to an empty piece sequence")]
    EmptyTokenization { word: String },

    /// A line in an input file could not be parsed.
    #[error("{}:{line}: {msg}", .path.display())]
    InvalidFormat {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ContextError {
    pub(crate) fn invalid_format(path: &std::path::Path, line: usize, msg: impl Into<String>) -> Self {
        ContextError::InvalidFormat {
            path: path.to_path_buf(),
            line,
            msg: msg.into(),
        }
    }
}
