//! In-memory gateway customer to user mapping.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::CustomerDirectory;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerDirectory {
    links: Arc<RwLock<HashMap<String, UserId>>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links a gateway customer to a user, replacing any earlier link.
    pub async fn link(&self, customer_id: &str, user_id: UserId) {
        self.links
            .write()
            .await
            .insert(customer_id.to_string(), user_id);
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn find_user_by_customer(&self, customer_id: &str) -> Result<Option<UserId>, DomainError> {
        Ok(self.links.read().await.get(customer_id).copied())
    }
}
