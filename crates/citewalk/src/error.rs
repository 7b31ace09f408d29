//! Error types for the suggestion engine.
//!
//! Uses `thiserror` for structured error handling with automatic `From`
//! implementations. The client layer (`FetchError`) and engine layer
//! (`EngineError`) are kept separate so the aggregator can classify
//! per-candidate versus systemic fetch failures.

use std::time::Duration;

use crate::models::Doi;

/// Errors from the catalog HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the catalog (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Work not known to the catalog (404 response)
    #[error("Work not found: {doi}")]
    NotFound {
        /// Identifier of the missing work
        doi: String,
    },

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl FetchError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(doi: impl Into<String>) -> Self {
        Self::NotFound { doi: doi.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_) | Self::Server { .. })
    }

    /// Returns true for connectivity-class failures that indicate the
    /// catalog itself is unavailable, as opposed to a problem with one
    /// individual work. `NotFound` and `Parse` mean the service answered,
    /// so they are never systemic.
    #[must_use]
    pub const fn is_systemic(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Middleware(_)
                | Self::Timeout(_)
                | Self::Server { .. }
                | Self::RateLimited { .. }
        )
    }
}

/// Errors from the suggestion engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Empty or malformed identifier; rejected before entering any set.
    #[error("Invalid identifier: {raw:?}")]
    InvalidIdentifier {
        /// The offending raw input.
        raw: String,
    },

    /// Per-candidate hydration failure. Absorbed inside the aggregator
    /// (the candidate is retained as a stub), surfaced only through events.
    #[error("Hydration failed for {doi}: {source}")]
    Hydration {
        /// The candidate that failed to hydrate.
        doi: Doi,
        /// Underlying client error.
        source: FetchError,
    },

    /// Systemic fetch-layer unavailability. Recoverable: the previous
    /// suggestion list stays valid.
    #[error("Suggestion aggregation failed: {detail}")]
    Aggregation {
        /// Human-readable failure summary.
        detail: String,
    },

    /// A DOI observed in two mutually exclusive sets. Cannot occur with
    /// the single-state-map session model.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Create an invalid-identifier error.
    #[must_use]
    pub fn invalid_identifier(raw: impl Into<String>) -> Self {
        Self::InvalidIdentifier { raw: raw.into() }
    }

    /// Create an aggregation error.
    #[must_use]
    pub fn aggregation(detail: impl Into<String>) -> Self {
        Self::Aggregation { detail: detail.into() }
    }

    /// Returns true if the operation can be retried later without any
    /// state repair (the previous suggestion list is still valid).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Aggregation { .. } | Self::Hydration { .. })
    }
}

/// Result type alias for catalog client operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
