//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::reconciliation::{
    AllocatePaymentCommand, AllocatePaymentHandler, AllocatePaymentResult, AllocationSettings,
    HandleGatewayEventCommand, HandleGatewayEventHandler, HandleGatewayEventResult,
    ReconciliationError, RecordOrderCommand, RecordOrderHandler, RecordOrderOutcome,
    SyncSubscriptionCommand, SyncSubscriptionHandler,
};
