//! Error types for the embed pipeline.
//!
//! Only validation and rate-limit errors are meant to surface to callers;
//! extraction, ingestion and storage failures are caught at the smallest
//! possible scope and degrade to rendering the plain link.

use thiserror::Error;

/// Result type alias for embed operations.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Error types for embed operations.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Malformed URL, UUID or other caller input. Never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Flood threshold exceeded for a caller identity.
    #[error("flood limit exceeded for event '{0}'")]
    RateLimited(String),

    /// Upstream metadata fetch failed or returned nothing usable.
    #[error("metadata extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    /// Image download, validation or persistence failed.
    #[error("image ingestion failed for {url}: {message}")]
    ImageIngestion { url: String, message: String },

    /// Durable preview record read/write failed.
    #[error("preview storage failed: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for EmbedError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve the full error chain with context.
        EmbedError::Other(format!("{err:#}"))
    }
}

impl From<sqlx::Error> for EmbedError {
    fn from(err: sqlx::Error) -> Self {
        EmbedError::Storage(err.to_string())
    }
}

impl EmbedError {
    /// Check if the error is caused by the caller (4xx-equivalent).
    ///
    /// User-caused errors surface immediately; everything else degrades to
    /// a plain link plus a log entry.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, EmbedError::Validation(_) | EmbedError::RateLimited(_))
    }

    /// Check if the caller should fall back to rendering the original link.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            EmbedError::Extraction { .. }
                | EmbedError::ImageIngestion { .. }
                | EmbedError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(EmbedError::Validation("bad url".into()).is_user_error());
        assert!(EmbedError::RateLimited("event".into()).is_user_error());
        assert!(
            !EmbedError::Extraction {
                url: "https://example.com".into(),
                message: "timeout".into(),
            }
            .is_user_error()
        );
        assert!(
            EmbedError::Extraction {
                url: "https://example.com".into(),
                message: "timeout".into(),
            }
            .is_degradable()
        );
        assert!(!EmbedError::Validation("bad".into()).is_degradable());
    }
}
