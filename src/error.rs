use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    #[error("invalid filter key: {0}")]
    InvalidFilterKey(String),

    #[error("no column mapping for field {field} of table {table}")]
    UnmappedField { table: String, field: String },

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("source file not found: {0}")]
    SourceNotFound(String),

    #[error("archive error in {path}: {message}")]
    Archive { path: String, message: String },

    #[error("unsupported compression method in {0}: only stored and deflated entries are readable")]
    UnsupportedCompression(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("download request failed: {0}")]
    DownloadHttp(String),

    #[error("download of {url} returned status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl From<rusqlite::Error> for LoaderError {
    fn from(err: rusqlite::Error) -> Self {
        LoaderError::Storage(err.to_string())
    }
}
