//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresLedgerRepository` - Ledger entries, credits, versioned commits
//! - `PostgresOrderRepository` - Idempotent order inserts
//! - `PostgresSubscriptionMirrorRepository` - Per-customer mirror upserts
//! - `PostgresWebhookEventRepository` - Processed-event log
//! - `PostgresCustomerDirectory` - Customer to user lookup

mod customer_directory;
mod ledger_repository;
mod order_repository;
mod subscription_mirror_repository;
mod webhook_event_repository;

pub use customer_directory::PostgresCustomerDirectory;
pub use ledger_repository::PostgresLedgerRepository;
pub use order_repository::PostgresOrderRepository;
pub use subscription_mirror_repository::PostgresSubscriptionMirrorRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::foundation::DomainError;

/// Wraps a sqlx error with the action that failed.
fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", action, e))
}
