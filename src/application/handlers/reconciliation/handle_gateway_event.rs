//! HandleGatewayEventHandler - Command handler for a verified gateway event.
//!
//! Runs in the background after the receiver has acknowledged the delivery:
//!
//! 1. Skip events already processed with a final outcome
//! 2. Classify the event
//! 3. Sync the subscription mirror, or record the order and allocate it
//! 4. Record the outcome in the processed event log

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{
    AllocatePaymentCommand, AllocatePaymentHandler, AllocatePaymentResult, ReconciliationError,
    RecordOrderCommand, RecordOrderHandler, RecordOrderOutcome, SyncSubscriptionCommand,
    SyncSubscriptionHandler,
};
use crate::domain::billing::{
    classify, Classification, GatewayEvent, IgnoreReason, OrderRecord, SubscriptionStatus,
};
use crate::ports::{WebhookEventRecord, WebhookEventRepository};

/// Command to reconcile one verified event.
#[derive(Debug, Clone)]
pub struct HandleGatewayEventCommand {
    pub event: GatewayEvent,
}

/// Result of reconciling an event.
#[derive(Debug, Clone)]
pub enum HandleGatewayEventResult {
    /// A previous delivery of this event was already handled.
    AlreadyProcessed,
    /// Event acknowledged but no action taken.
    Ignored(IgnoreReason),
    /// Subscription mirror refreshed.
    SubscriptionSynced {
        customer_id: String,
        status: SubscriptionStatus,
    },
    /// New order recorded and its payment allocated.
    PaymentAllocated {
        order: OrderRecord,
        allocation: AllocatePaymentResult,
    },
    /// Order was already allocated by an earlier delivery; nothing written.
    DuplicateOrder { session_id: String },
}

/// Handler for reconciling verified gateway events.
pub struct HandleGatewayEventHandler {
    events: Arc<dyn WebhookEventRepository>,
    sync: SyncSubscriptionHandler,
    record: RecordOrderHandler,
    allocate: AllocatePaymentHandler,
}

impl HandleGatewayEventHandler {
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        sync: SyncSubscriptionHandler,
        record: RecordOrderHandler,
        allocate: AllocatePaymentHandler,
    ) -> Self {
        Self {
            events,
            sync,
            record,
            allocate,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayEventCommand,
    ) -> Result<HandleGatewayEventResult, ReconciliationError> {
        let event = cmd.event;

        // 1. Check if already processed
        let previous = self.events.find_by_event_id(&event.id).await?;
        if let Some(previous) = &previous {
            if previous.result.is_final() {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    previous_result = %previous.result,
                    "Skipping already processed event"
                );
                return Ok(HandleGatewayEventResult::AlreadyProcessed);
            }
        }

        // 2. Process the event
        let outcome = self.dispatch(&event).await;

        if let (Ok(_), Some(previous)) = (&outcome, &previous) {
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                previous_error = previous.error_message.as_deref().unwrap_or_default(),
                "Recovered previously failed event"
            );
        }

        let customer_id = event.customer_id().unwrap_or_default();
        let session_id = event.object_id().unwrap_or_default();
        match &outcome {
            Ok(HandleGatewayEventResult::Ignored(reason)) => info!(
                event_id = %event.id,
                event_type = %event.event_type,
                customer_id = %customer_id,
                reason = %reason,
                "Ignoring event"
            ),
            Ok(_) => info!(
                event_id = %event.id,
                event_type = %event.event_type,
                customer_id = %customer_id,
                "Reconciled event"
            ),
            Err(err) => error!(
                event_id = %event.id,
                event_type = %event.event_type,
                customer_id = %customer_id,
                session_id = %session_id,
                error = %err,
                retryable = err.is_retryable(),
                "Reconciliation failed"
            ),
        }

        // 3. Record the outcome
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        let record = match &outcome {
            Ok(HandleGatewayEventResult::Ignored(reason)) => WebhookEventRecord::ignored(
                &event.id,
                &event.event_type,
                reason.to_string(),
                payload,
            ),
            Ok(_) => WebhookEventRecord::success(&event.id, &event.event_type, payload),
            Err(err) => {
                WebhookEventRecord::failed(&event.id, &event.event_type, err.to_string(), payload)
            }
        };
        if let Err(err) = self.events.save(record).await {
            warn!(
                event_id = %event.id,
                error = %err,
                "Failed to record processed event"
            );
        }

        outcome
    }

    async fn dispatch(
        &self,
        event: &GatewayEvent,
    ) -> Result<HandleGatewayEventResult, ReconciliationError> {
        match classify(event) {
            Classification::Ignore(reason) => Ok(HandleGatewayEventResult::Ignored(reason)),

            Classification::SyncSubscription { customer_id } => {
                let mirror = self
                    .sync
                    .handle(SyncSubscriptionCommand {
                        customer_id: customer_id.clone(),
                    })
                    .await?;
                Ok(HandleGatewayEventResult::SubscriptionSynced {
                    customer_id,
                    status: mirror.status,
                })
            }

            Classification::RecordOnePayment(payment) => {
                let order = match self.record.handle(RecordOrderCommand { payment }).await? {
                    RecordOrderOutcome::Inserted(order) => order,
                    // The row can outlive a failed allocation, so only the
                    // ledger's claim proves the payment was applied.
                    RecordOrderOutcome::Duplicate(order) => {
                        if self.allocate.is_allocated(&order.session_id).await? {
                            return Ok(HandleGatewayEventResult::DuplicateOrder {
                                session_id: order.session_id,
                            });
                        }
                        warn!(
                            event_id = %event.id,
                            session_id = %order.session_id,
                            "Order recorded but never allocated, allocating now"
                        );
                        order
                    }
                };

                let allocated = self
                    .allocate
                    .handle(AllocatePaymentCommand {
                        customer_id: order.customer_id.clone(),
                        amount: order.total_paid()?,
                        currency: order.currency.clone(),
                        league_id: order.league_id,
                        order_ref: order.session_id.clone(),
                    })
                    .await;
                match allocated {
                    Ok(allocation) => {
                        Ok(HandleGatewayEventResult::PaymentAllocated { order, allocation })
                    }
                    Err(ReconciliationError::AlreadyAllocated { order_ref }) => {
                        Ok(HandleGatewayEventResult::DuplicateOrder {
                            session_id: order_ref,
                        })
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }
}
