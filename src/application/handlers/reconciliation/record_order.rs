//! RecordOrderHandler - Command handler for mirroring a paid one-time checkout.

use std::sync::Arc;

use tracing::{debug, info};

use super::ReconciliationError;
use crate::domain::billing::{CheckoutPayment, OrderRecord};
use crate::ports::{OrderRepository, SaveResult};

/// Command to record a completed checkout.
#[derive(Debug, Clone)]
pub struct RecordOrderCommand {
    pub payment: CheckoutPayment,
}

/// Result of recording an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrderOutcome {
    /// First time this checkout session was seen.
    Inserted(OrderRecord),
    /// The session was already recorded; nothing was written. Carries the
    /// order as rebuilt from this delivery.
    Duplicate(OrderRecord),
}

/// Handler for the idempotent order insert.
pub struct RecordOrderHandler {
    orders: Arc<dyn OrderRepository>,
}

impl RecordOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn handle(
        &self,
        cmd: RecordOrderCommand,
    ) -> Result<RecordOrderOutcome, ReconciliationError> {
        let order = OrderRecord::from_checkout(&cmd.payment)?;
        // Surfaces bad currency data before anything is written.
        order.total_paid()?;

        match self.orders.insert_if_absent(&order).await? {
            SaveResult::Inserted => {
                info!(
                    event_id = %order.event_id,
                    customer_id = %order.customer_id,
                    session_id = %order.session_id,
                    amount_total = order.amount_total,
                    currency = %order.currency,
                    "Recorded one-time order"
                );
                Ok(RecordOrderOutcome::Inserted(order))
            }
            SaveResult::AlreadyExists => {
                debug!(
                    event_id = %order.event_id,
                    session_id = %order.session_id,
                    "Order already recorded"
                );
                Ok(RecordOrderOutcome::Duplicate(order))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::InMemoryOrderRepository;

    fn payment(session_id: &str) -> CheckoutPayment {
        CheckoutPayment {
            event_id: "evt_1".to_string(),
            session_id: session_id.to_string(),
            customer_id: "cus_1".to_string(),
            payment_intent_id: Some("pi_1".to_string()),
            amount_subtotal: 20_000,
            amount_total: 20_000,
            currency: "usd".to_string(),
            payment_status: "paid".to_string(),
            league_id: None,
            team_id: None,
        }
    }

    #[tokio::test]
    async fn first_insert_returns_order() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let handler = RecordOrderHandler::new(orders.clone());

        let outcome = handler
            .handle(RecordOrderCommand {
                payment: payment("cs_1"),
            })
            .await
            .unwrap();

        let RecordOrderOutcome::Inserted(order) = outcome else {
            panic!("expected Inserted");
        };
        assert_eq!(order.session_id, "cs_1");
        assert!(orders.find_by_session_id("cs_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replay_is_duplicate_and_keeps_one_row() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let handler = RecordOrderHandler::new(orders.clone());
        let cmd = RecordOrderCommand {
            payment: payment("cs_1"),
        };

        handler.handle(cmd.clone()).await.unwrap();
        let outcome = handler.handle(cmd).await.unwrap();

        let RecordOrderOutcome::Duplicate(order) = outcome else {
            panic!("expected Duplicate");
        };
        assert_eq!(order.session_id, "cs_1");
        assert_eq!(orders.len().await, 1);
    }

    #[tokio::test]
    async fn negative_total_is_rejected_before_insert() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let handler = RecordOrderHandler::new(orders.clone());
        let mut p = payment("cs_1");
        p.amount_total = -5;

        let result = handler.handle(RecordOrderCommand { payment: p }).await;

        assert!(matches!(result, Err(ReconciliationError::Validation(_))));
        assert_eq!(orders.len().await, 0);
    }
}
