//! Webhook authentication errors.
//!
//! Every variant is an authentication failure: the body is not trusted and
//! nothing is processed. All map to 400 so the gateway does not retry a
//! request that can never succeed.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while authenticating a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The signature header is absent.
    #[error("Missing signature header")]
    MissingSignature,

    /// No signature in the header matches the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header or the verified payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Test-mode event delivered to a live-only receiver.
    #[error("Livemode mismatch")]
    LivemodeMismatch,
}

impl WebhookError {
    /// Returns true if the gateway should retry delivering this webhook.
    ///
    /// Authentication failures never become valid on retry.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}
