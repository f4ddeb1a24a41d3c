//! Index client errors.

use thiserror::Error;

/// Errors returned by pair index queries.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Transport failure or non-success HTTP status.
    #[error("index request failed: {0}")]
    Http(String),

    /// The index answered with GraphQL-level errors.
    #[error("index query error: {0}")]
    GraphQl(String),

    /// The payload did not have the expected shape.
    #[error("unexpected index response: {0}")]
    Decode(String),
}

impl IndexError {
    /// Whether the same query could succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::GraphQl(_))
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
