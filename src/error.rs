//! Error types for the CryptoView data layer

use thiserror::Error;

/// Errors surfaced by the market-data client and the query cache.
///
/// Transport failures are classified once, centrally, in the provider layer;
/// no raw `reqwest::Error` escapes it. Every operation fails with one of
/// these variants and a human-readable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Caller supplied an empty or invalid identifier or query
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Upstream payload shape violates the expected contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Client-side timeout waiting for a response
    #[error("Request timed out. Please check your connection.")]
    Timeout,

    /// Resource not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other transport or server failure, with the upstream message
    #[error("Failed to fetch data: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Creates an InvalidArgument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates a NotFound error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an Unknown error
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Whether the cache layer may retry this failure.
    ///
    /// `NotFound` is permanent; retrying it only wastes API quota.
    /// `InvalidArgument` and `InvalidResponse` cannot improve on retry either.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited | ApiError::Timeout | ApiError::Unknown(_)
        )
    }
}

/// Errors from the persistence layer (storage reads/writes)
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded
    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
