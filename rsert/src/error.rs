//! Errors reported by rsert.
//!
//! Library errors from the type and stream crates convert into
//! [`RsertError`] so commands can use `?` throughout; `main` prints the
//! `Display` form and exits with a failure status.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsertError {
    /// `rsert.toml` is unreadable or holds invalid limits.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input path that cannot be read as a file.
    #[error("Cannot open input: {0}")]
    FileOperation(String),

    /// Arguments that contradict each other or the file system.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// Some files of a multi-file command failed.
    #[error("{0}")]
    CommandExecution(String),

    #[error("JSON conversion failed at {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("Type error: {0}")]
    Type(#[from] rser_type::TypeError),

    #[error("Stream error: {0}")]
    Stream(#[from] rser_stream::StreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RsertError>;
