//! In-memory processed-event log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookEventRepository {
    records: Arc<RwLock<HashMap<String, WebhookEventRecord>>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let previous = self
            .records
            .write()
            .await
            .insert(record.event_id.clone(), record);
        Ok(match previous {
            Some(_) => SaveResult::AlreadyExists,
            None => SaveResult::Inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProcessingResult;
    use serde_json::json;

    #[tokio::test]
    async fn save_replaces_failed_record() {
        let repo = InMemoryWebhookEventRepository::new();

        let first = repo
            .save(WebhookEventRecord::failed("evt_1", "invoice.paid", "db down", json!({})))
            .await
            .unwrap();
        let second = repo
            .save(WebhookEventRecord::success("evt_1", "invoice.paid", json!({})))
            .await
            .unwrap();

        assert_eq!(first, SaveResult::Inserted);
        assert_eq!(second, SaveResult::AlreadyExists);
        assert_eq!(repo.len().await, 1);
        let stored = repo.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(stored.result, ProcessingResult::Success);
    }
}
