//! In-memory order repository keyed by checkout session id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::OrderRecord;
use crate::domain::foundation::DomainError;
use crate::ports::{OrderRepository, SaveResult};

/// In-memory order store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<String, OrderRecord>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_if_absent(&self, order: &OrderRecord) -> Result<SaveResult, DomainError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.session_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        orders.insert(order.session_id.clone(), order.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.orders.read().await.get(session_id).cloned())
    }
}
