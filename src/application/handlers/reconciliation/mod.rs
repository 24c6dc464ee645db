//! Reconciliation handlers.
//!
//! Command handlers that turn verified gateway events into ledger and mirror
//! updates:
//!
//! - Reconciling a verified event (entry point for background work)
//! - Syncing a customer's subscription mirror
//! - Recording a paid one-time order
//! - Allocating a payment across open ledger entries

mod allocate_payment;
mod errors;
mod handle_gateway_event;
mod record_order;
mod sync_subscription;

pub use allocate_payment::{
    AllocatePaymentCommand, AllocatePaymentHandler, AllocatePaymentResult, AllocationSettings,
};
pub use errors::ReconciliationError;
pub use handle_gateway_event::{
    HandleGatewayEventCommand, HandleGatewayEventHandler, HandleGatewayEventResult,
};
pub use record_order::{RecordOrderCommand, RecordOrderHandler, RecordOrderOutcome};
pub use sync_subscription::{SyncSubscriptionCommand, SyncSubscriptionHandler};
