//! In-memory adapters.
//!
//! Implementations of every reconciliation port backed by `tokio` locks.
//! Used by unit and integration tests in place of Postgres and Stripe.

mod customer_directory;
mod ledger_repository;
mod order_repository;
mod payment_gateway;
mod subscription_mirror_repository;
mod webhook_event_repository;

pub use customer_directory::InMemoryCustomerDirectory;
pub use ledger_repository::InMemoryLedgerRepository;
pub use order_repository::InMemoryOrderRepository;
pub use payment_gateway::InMemoryPaymentGateway;
pub use subscription_mirror_repository::InMemorySubscriptionMirrorRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
