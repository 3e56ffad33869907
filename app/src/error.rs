use thiserror::Error;

/// Typed failures for the API surface; a web boundary maps `InvalidRequest`
/// to 400 and `NotFound` to 404. User input errors inside a conversation
/// never appear here; those are terminal conversational messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
