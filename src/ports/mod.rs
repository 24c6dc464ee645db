//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `LedgerRepository` - Open obligations and atomic allocation commits
//! - `OrderRepository` - Idempotent one-time order mirror
//! - `SubscriptionMirrorRepository` - Latest subscription state per customer
//! - `WebhookEventRepository` - Processed event log
//!
//! ## Lookup and Gateway Ports
//!
//! - `CustomerDirectory` - Gateway customer to user mapping
//! - `PaymentGateway` - Canonical subscription reads

mod customer_directory;
mod ledger_repository;
mod order_repository;
mod payment_gateway;
mod subscription_mirror_repository;
mod webhook_event_repository;

pub use customer_directory::CustomerDirectory;
pub use ledger_repository::{CommitOutcome, LedgerRepository};
pub use order_repository::OrderRepository;
pub use payment_gateway::{PaymentError, PaymentErrorCode, PaymentGateway};
pub use subscription_mirror_repository::SubscriptionMirrorRepository;
pub use webhook_event_repository::{
    ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository,
};
