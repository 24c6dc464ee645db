//! Reconciliation errors.
//!
//! Everything that can go wrong after an event has been authenticated.
//! None of these reach the gateway: the receiver has already answered 200.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};
use crate::ports::PaymentError;

/// Errors raised while reconciling a verified event.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// No application user is linked to the gateway customer.
    #[error("No user mapped to customer {customer_id}")]
    Mapping { customer_id: String },

    /// A datastore read or write failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DomainError),

    /// The gateway could not be queried.
    #[error("Gateway request failed: {0}")]
    Gateway(#[from] PaymentError),

    /// Event data failed domain validation.
    #[error("Invalid event data: {0}")]
    Validation(#[from] ValidationError),

    /// Every allocation attempt lost a version race.
    #[error("Allocation for order {order_ref} conflicted on all {attempts} attempts")]
    ConcurrencyExhausted { order_ref: String, attempts: u32 },

    /// Another delivery already applied this order to the ledger.
    #[error("Order {order_ref} was already allocated")]
    AlreadyAllocated { order_ref: String },
}

impl ReconciliationError {
    /// Returns true if re-running the same event may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconciliationError::Persistence(_) | ReconciliationError::ConcurrencyExhausted { .. } => true,
            ReconciliationError::Gateway(err) => err.retryable,
            ReconciliationError::Mapping { .. }
            | ReconciliationError::Validation(_)
            | ReconciliationError::AlreadyAllocated { .. } => false,
        }
    }
}
