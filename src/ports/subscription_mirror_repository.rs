//! Subscription mirror repository port.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionMirror;
use crate::domain::foundation::DomainError;

/// Repository port for the per-customer subscription mirror.
///
/// Implementations must keep at most one row per customer id.
#[async_trait]
pub trait SubscriptionMirrorRepository: Send + Sync {
    /// Inserts or replaces the mirror row keyed by `customer_id`.
    ///
    /// `updated_at` is when the snapshot was read from the gateway. A stored
    /// row read later than that is kept, and `false` is returned.
    async fn upsert(&self, mirror: &SubscriptionMirror) -> Result<bool, DomainError>;

    /// Find the mirror row for a gateway customer.
    async fn find_by_customer(&self, customer_id: &str)
        -> Result<Option<SubscriptionMirror>, DomainError>;
}
