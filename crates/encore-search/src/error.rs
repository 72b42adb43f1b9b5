//! Error types for embedding, generation and vector search.

use thiserror::Error;

/// Errors raised by a remote model provider (embedding or chat).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("HTTP error from {provider}: {message}")]
    Http { provider: String, message: String },

    /// The provider returned a rate-limit response.
    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    /// The request never completed (connection, timeout, TLS).
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("parse error from {provider}: {message}")]
    Parse { provider: String, message: String },

    /// No API key was configured for a provider that needs one.
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: String },

    /// The response parsed but carried no usable payload.
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    /// A batch call returned a different number of vectors than inputs.
    #[error("{provider} returned {got} embeddings for {expected} inputs")]
    CountMismatch {
        provider: String,
        expected: usize,
        got: usize,
    },
}

impl ProviderError {
    /// Returns `true` when the error is transient and the call may succeed
    /// if repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::RateLimited { .. } | Self::Request(_)
        )
    }
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors raised by the vector index and the retrieval pipeline.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("vector store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("database error: {0}")]
    Database(#[from] encore_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record {id} is already indexed")]
    DuplicateRecord { id: String },

    #[error("invalid vector: {0}")]
    InvalidVector(String),
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
