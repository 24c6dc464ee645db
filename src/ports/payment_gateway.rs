//! Payment gateway port.
//!
//! The reconciliation core only reads from the gateway: it asks for the
//! canonical subscription state of a customer and mirrors it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::GatewaySubscription;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Port for payment gateway reads.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Fetches the most recent subscription for a customer, in any status.
    ///
    /// Returns `None` when the customer has never subscribed. A customer is
    /// assumed to hold at most one subscription.
    async fn latest_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<GatewaySubscription>, PaymentError>;
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,

    pub message: String,

    /// Gateway's own error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the gateway's error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Response could not be decoded.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::ExternalServiceError,
        };
        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    NotFound,
    RateLimitExceeded,
    InvalidResponse,
    /// Gateway API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentError::network("timeout").retryable);
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());
        assert!(!PaymentError::authentication("bad key").retryable);
        assert!(!PaymentErrorCode::InvalidResponse.is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::not_found("Customer");
        assert_eq!(err.to_string(), "not_found: Customer not found");
    }

    #[test]
    fn payment_error_converts_to_domain_error() {
        let err: DomainError = PaymentError::network("connection reset")
            .with_provider_code("api_connection_error")
            .into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }
}
