use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Search attempted on an empty index")]
    EmptyIndex,

    #[error("No index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Index at {} is unusable: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl QaError {
    /// Whether this error means "no usable index on disk", which callers recover from by rebuilding
    #[inline]
    pub const fn is_missing_index(&self) -> bool {
        matches!(self, Self::IndexNotFound(_) | Self::CorruptIndex { .. })
    }
}

pub mod answer;
pub mod auth;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod http;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod source;

#[cfg(test)]
mod test_support;
