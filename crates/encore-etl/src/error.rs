//! Error types for talking to the upstream setlist service.

use thiserror::Error;

/// Errors that can occur while collecting setlists.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream answered with a non-success status.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    /// The upstream returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// The requested entity does not exist upstream.
    #[error("not found: {entity} at {source_name}")]
    NotFound { entity: String, source_name: String },

    /// A response body could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Reading or writing raw files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw files could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FetchError {
    /// Returns `true` when the error is transient and the operation may
    /// succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::RateLimited { .. } | Self::Request(_)
        )
    }

    /// Returns `true` when the error indicates the entity was not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let not_found = FetchError::NotFound {
            entity: "artist Nobody".to_string(),
            source_name: "setlist.fm".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_transient());
        assert_eq!(
            not_found.to_string(),
            "not found: artist Nobody at setlist.fm"
        );

        let limited = FetchError::RateLimited {
            source_name: "setlist.fm".to_string(),
        };
        assert!(limited.is_transient());
        assert!(!limited.is_not_found());
    }
}
