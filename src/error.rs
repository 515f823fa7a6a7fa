//! # Error Handling
//!
//! Closed error taxonomy for the MRI Qube integration. Every failure the
//! client surface can produce is one of these variants, so callers branch
//! exhaustively instead of string-matching messages.

use thiserror::Error;

use crate::models::EntityKind;

/// Errors surfaced by the Qube client, token manager and sync service.
#[derive(Debug, Error)]
pub enum QubeError {
    /// Token endpoint transport failure or non-2xx response.
    #[error("authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    /// HTTP 401 from a resource endpoint. The executor discards the cached
    /// token and retries; this surfaces only once the retry budget runs out.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header,
    /// defaulting to 60 when the header is absent or unparseable.
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Timeout, connection failure or undecodable response body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-2xx resource response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Local store failure on the client surface (credential loads, token
    /// cache reads).
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Client id, client secret or base URL missing.
    #[error("MRI Qube connection is not configured")]
    NotConfigured,

    /// Entity sync that exists as a placeholder only.
    #[error("{0} sync is not implemented")]
    NotImplemented(EntityKind),

    /// The request queue worker is gone, or the queued task itself died.
    /// Seen during shutdown.
    #[error("request queue is closed")]
    QueueClosed,
}

impl QubeError {
    pub fn authentication<S: Into<String>>(status: u16, message: S) -> Self {
        QubeError::Authentication {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        QubeError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn api<S: Into<String>>(status: u16, message: S) -> Self {
        QubeError::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the retry loop should attempt again after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            QubeError::NotConfigured
                | QubeError::NotImplemented(_)
                | QubeError::Database(_)
                | QubeError::QueueClosed
        )
    }

    /// Failure class stored in `sync_errors.error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            QubeError::Database(_) => crate::models::sync_error::error_type::DATABASE,
            _ => crate::models::sync_error::error_type::API,
        }
    }
}
