//! Error types for feedsync
//!
//! This module provides error handling for the library, including:
//! - The upstream failure taxonomy (expired, rate-limited, bad request, exhausted retries)
//! - Storage errors with context about the failed query
//! - HTTP status code mapping for whatever transport embeds the library
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for feedsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feedsync
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "sync.page_size")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// No enabled, unquarantined credential is left in the pool
    #[error("no available credential: every enabled credential is quarantined or invalid")]
    NoAvailableCredential,

    /// Upstream platform API failure
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Source not found
    #[error("source not found: {0}")]
    NotFound(String),

    /// Another history crawl owns the crawl slot
    #[error("history crawl already running for source {active_source_id}")]
    CrawlInProgress {
        /// Source currently being crawled
        active_source_id: String,
    },

    /// Shutdown in progress - not accepting new sync operations
    #[error("shutdown in progress: not accepting new sync operations")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Failures reported by the upstream platform API
///
/// Produced by the [`ErrorClassifier`](crate::accounts::ErrorClassifier) from a raw
/// [`UpstreamFailure`](crate::upstream::UpstreamFailure), and by the
/// [`ArticlePageFetcher`](crate::fetcher::ArticlePageFetcher) once retries run out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Retries exhausted while fetching one page of a source
    #[error("fetching page {page} of source {source_id} failed after {attempts} attempts: {reason}")]
    FetchFailed {
        /// Source whose page could not be fetched
        source_id: String,
        /// Requested page
        page: u32,
        /// Total attempts made, including the first
        attempts: u32,
        /// Message of the last failure
        reason: String,
    },

    /// The credential has expired and was disabled
    #[error("credential {credential_id} has expired: {message}")]
    CredentialExpired {
        /// Credential that was rejected
        credential_id: String,
        /// Upstream message
        message: String,
    },

    /// The credential is being throttled by the upstream
    #[error("credential {credential_id} is rate limited: {message}")]
    RateLimited {
        /// Credential that was throttled
        credential_id: String,
        /// Upstream message
        message: String,
    },

    /// The upstream rejected the request as malformed
    #[error("upstream rejected request from credential {credential_id}: {message}")]
    BadRequest {
        /// Credential used for the request
        credential_id: String,
        /// Upstream message
        message: String,
    },

    /// Any other upstream failure (transport error, unknown message)
    #[error("upstream call with credential {credential_id} failed: {message}")]
    Rejected {
        /// Credential used for the request
        credential_id: String,
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Upstream message
        message: String,
    },
}

/// API error response format
///
/// This structure is what a transport layer should return when a sync operation
/// fails. It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "upstream_fetch_failed",
///     "message": "upstream error: fetching page 1 of source MP_1 failed after 4 attempts: timeout",
///     "details": {
///       "source_id": "MP_1",
///       "page": 1
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "no_available_credential")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "conflict" error, used when an exclusive operation is already running
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,

            // 409 Conflict - Exclusive operation already running
            Error::CrawlInProgress { .. } => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - Upstream errors
            Error::Upstream(UpstreamError::RateLimited { .. }) => 429,
            Error::Upstream(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::NoAvailableCredential => 503,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::NoAvailableCredential => "no_available_credential",
            Error::Upstream(e) => match e {
                UpstreamError::FetchFailed { .. } => "upstream_fetch_failed",
                UpstreamError::CredentialExpired { .. } => "credential_expired",
                UpstreamError::RateLimited { .. } => "credential_rate_limited",
                UpstreamError::BadRequest { .. } => "upstream_bad_request",
                UpstreamError::Rejected { .. } => "upstream_rejected",
            },
            Error::NotFound(_) => "not_found",
            Error::CrawlInProgress { .. } => "conflict",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Upstream(UpstreamError::FetchFailed {
                source_id,
                page,
                attempts,
                ..
            }) => Some(serde_json::json!({
                "source_id": source_id,
                "page": page,
                "attempts": attempts,
            })),
            Error::Upstream(
                UpstreamError::CredentialExpired { credential_id, .. }
                | UpstreamError::RateLimited { credential_id, .. }
                | UpstreamError::BadRequest { credential_id, .. },
            ) => Some(serde_json::json!({
                "credential_id": credential_id,
            })),
            Error::Upstream(UpstreamError::Rejected {
                credential_id,
                status,
                ..
            }) => Some(serde_json::json!({
                "credential_id": credential_id,
                "status": status,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::CrawlInProgress { active_source_id } => Some(serde_json::json!({
                "active_source_id": active_source_id,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
