use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WvhtError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "{path:?} is not a usable vector file (vector size {vector_size}, {record_count} lines)"
    )]
    InvalidShape {
        path: PathBuf,
        vector_size: usize,
        record_count: usize,
    },
    #[error("invalid table size: {0}")]
    InvalidTableSize(String),
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("malformed index header: {0}")]
    MalformedHeader(String),
    #[error("format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, WvhtError>;

impl From<anyhow::Error> for WvhtError {
    fn from(value: anyhow::Error) -> Self {
        Self::Format(format!("{value:#}"))
    }
}
