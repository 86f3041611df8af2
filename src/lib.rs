use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or unreadable ingestion batch. Fatal to the current
    /// operation; no partial corpus is ever produced.
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Persisted index and text store disagree in size. Recovered internally
    /// by a full rebuild; callers should never see this escape `create()`.
    #[error("Persisted state inconsistent: {texts} stored texts vs {vectors} indexed vectors")]
    Consistency { texts: usize, vectors: usize },

    /// The index could not be initialized while serving a search.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Batch source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod prompt;
