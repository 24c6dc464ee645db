//! In-memory payment gateway.
//!
//! Serves canned subscriptions per customer and can be told to fail, so
//! handler tests can exercise gateway outages without network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::GatewaySubscription;
use crate::ports::{PaymentError, PaymentGateway};

#[derive(Debug, Default)]
struct GatewayState {
    subscriptions: HashMap<String, GatewaySubscription>,
    failure: Option<PaymentError>,
    calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subscription returned for a customer.
    pub async fn set_subscription(&self, customer_id: &str, subscription: GatewaySubscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(customer_id.to_string(), subscription);
    }

    /// Makes every following call fail with `error`.
    pub async fn fail_with(&self, error: PaymentError) {
        self.state.write().await.failure = Some(error);
    }

    pub async fn clear_failure(&self) {
        self.state.write().await.failure = None;
    }

    /// Number of `latest_subscription` calls served, failures included.
    pub async fn calls(&self) -> usize {
        self.state.read().await.calls
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn latest_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<GatewaySubscription>, PaymentError> {
        let mut state = self.state.write().await;
        state.calls += 1;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        Ok(state.subscriptions.get(customer_id).cloned())
    }
}
