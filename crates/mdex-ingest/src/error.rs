//! Error types for ingestion

use crate::resource::ResourceKind;
use mdex_common::EntityId;
use std::path::PathBuf;

/// Result type for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for ingestion
///
/// Only transport failures and non-success statuses are transient; every
/// other variant is final for the record or list it concerns.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed list response from {url}: {reason}")]
    MalformedList { url: String, reason: String },

    #[error("Invalid {kind} payload for ID {id}: {reason}")]
    InvalidPayload {
        kind: ResourceKind,
        id: EntityId,
        reason: String,
    },

    #[error("Missing input file {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<IngestError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline failed for: {}", kinds.join(", "))]
    PipelineFailed { kinds: Vec<String> },
}

impl IngestError {
    /// Whether another attempt at the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transport(_) | IngestError::Status { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_payload(
        kind: ResourceKind,
        id: EntityId,
        reason: impl Into<String>,
    ) -> Self {
        IngestError::InvalidPayload {
            kind,
            id,
            reason: reason.into(),
        }
    }
}
