//! In-memory subscription mirror keyed by customer id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::SubscriptionMirror;
use crate::domain::foundation::DomainError;
use crate::ports::SubscriptionMirrorRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionMirrorRepository {
    mirrors: Arc<RwLock<HashMap<String, SubscriptionMirror>>>,
}

impl InMemorySubscriptionMirrorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mirrored customers.
    pub async fn len(&self) -> usize {
        self.mirrors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mirrors.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionMirrorRepository for InMemorySubscriptionMirrorRepository {
    async fn upsert(&self, mirror: &SubscriptionMirror) -> Result<bool, DomainError> {
        let mut mirrors = self.mirrors.write().await;
        if let Some(stored) = mirrors.get(&mirror.customer_id) {
            if stored.updated_at > mirror.updated_at {
                return Ok(false);
            }
        }
        mirrors.insert(mirror.customer_id.clone(), mirror.clone());
        Ok(true)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionMirror>, DomainError> {
        Ok(self.mirrors.read().await.get(customer_id).cloned())
    }
}
