//! Order repository port.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::billing::OrderRecord;
use crate::domain::foundation::DomainError;

/// Repository port for mirrored one-time orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order unless one with the same `session_id` exists.
    ///
    /// Must rely on a unique constraint rather than a prior read, so two
    /// concurrent inserts for one session yield exactly one `Inserted`.
    async fn insert_if_absent(&self, order: &OrderRecord) -> Result<SaveResult, DomainError>;

    /// Find an order by its checkout session ID.
    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderRecord>, DomainError>;
}
