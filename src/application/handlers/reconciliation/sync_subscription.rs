//! SyncSubscriptionHandler - Command handler for refreshing a customer's subscription mirror.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::ReconciliationError;
use crate::domain::billing::SubscriptionMirror;
use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentGateway, SubscriptionMirrorRepository};

/// Command to sync one customer's subscription state.
#[derive(Debug, Clone)]
pub struct SyncSubscriptionCommand {
    pub customer_id: String,
}

/// Handler that pulls canonical state from the gateway and upserts the mirror.
///
/// Idempotent: the mirror is keyed by customer id and always replaced with
/// the gateway's current answer, never built from event payloads.
///
/// Syncs for one customer run one at a time in this process, so a later sync
/// always reads the gateway after an earlier one has written. Across
/// processes the repository drops snapshots read before the stored one.
pub struct SyncSubscriptionHandler {
    gateway: Arc<dyn PaymentGateway>,
    mirrors: Arc<dyn SubscriptionMirrorRepository>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncSubscriptionHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        mirrors: Arc<dyn SubscriptionMirrorRepository>,
    ) -> Self {
        Self {
            gateway,
            mirrors,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn handle(
        &self,
        cmd: SyncSubscriptionCommand,
    ) -> Result<SubscriptionMirror, ReconciliationError> {
        let lock = self
            .in_flight
            .lock()
            .await
            .entry(cmd.customer_id.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.sync(&cmd.customer_id).await
        };

        let mut in_flight = self.in_flight.lock().await;
        // Only the map and this call still hold the lock.
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(&cmd.customer_id);
        }

        result
    }

    async fn sync(&self, customer_id: &str) -> Result<SubscriptionMirror, ReconciliationError> {
        let read_at = Timestamp::now();
        let mut mirror = match self.gateway.latest_subscription(customer_id).await? {
            Some(subscription) => {
                debug!(
                    customer_id = %customer_id,
                    subscription_id = %subscription.subscription_id,
                    status = %subscription.status,
                    "Mirroring latest subscription"
                );
                SubscriptionMirror::from_gateway(customer_id, &subscription)
            }
            None => SubscriptionMirror::not_started(customer_id),
        };
        mirror.updated_at = read_at;

        if self.mirrors.upsert(&mirror).await? {
            return Ok(mirror);
        }

        debug!(
            customer_id = %customer_id,
            "Stored mirror is newer than this snapshot, keeping it"
        );
        Ok(self.mirrors.find_by_customer(customer_id).await?.unwrap_or(mirror))
    }
}
