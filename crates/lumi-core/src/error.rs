use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Loading,
    Chunking,
    Indexing,
    Embedding,
    Reranking,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Chunking => "chunking",
            Stage::Indexing => "indexing",
            Stage::Embedding => "embedding",
            Stage::Reranking => "reranking",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No documents to ingest")]
    EmptyInput,

    #[error("Collection is not ready: ingest documents first")]
    NotReady,

    #[error("Collection already exists: {0}")]
    DuplicateName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{stage} timed out after {}ms", elapsed.as_millis())]
    Timeout { stage: Stage, elapsed: Duration },

    #[error("{stage} backend failed: {message}")]
    ExternalService { stage: Stage, message: String },

    #[error("{stage} failed: {message}")]
    Operation { stage: Stage, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn external(stage: Stage, err: impl fmt::Display) -> Self {
        Error::ExternalService { stage, message: err.to_string() }
    }

    pub fn operation(stage: Stage, err: impl fmt::Display) -> Self {
        Error::Operation { stage, message: err.to_string() }
    }

    /// The stage that failed, when the error belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::EmptyInput => Some(Stage::Chunking),
            Error::Timeout { stage, .. }
            | Error::ExternalService { stage, .. }
            | Error::Operation { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Timeouts are transient; everything else needs a change before retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
