//! Error types for backend calls and the chat pipelines.
//!
//! None of these end a session. The orchestrator turns each pipeline failure
//! into a bot message; the variants exist so the decision of *which* message
//! is made in one place and so callers of the library can match on them.

/// Failure of a single request to the indexing backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
    #[error("request cancelled")]
    Cancelled,
    #[error("request task ended without a result")]
    Aborted,
}

impl BackendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }
}

/// Errors surfaced by the chat pipelines and the orchestrator handle.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No file selected. Please choose a file to upload.")]
    MissingInput,
    #[error("No index available. Please upload a file first.")]
    IndexUnavailable,
    #[error("Error uploading file: {0}")]
    IngestionFailed(#[source] BackendError),
    #[error("Error querying index: {0}")]
    QueryFailed(#[source] BackendError),
    #[error("the chat session is no longer running")]
    Closed,
}
