//! WebhookEventRepository port - Processed gateway event log.
//!
//! Records the outcome of every verified event so re-deliveries can be
//! skipped and failures reconciled by hand from the stored payload.
//!
//! The gateway delivers at least once. A second delivery of an event whose
//! previous outcome was `success` or `ignored` is not processed again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::foundation::DomainError;

/// Outcome of processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    Success,
    Ignored,
    Failed,
}

impl ProcessingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingResult::Success => "success",
            ProcessingResult::Ignored => "ignored",
            ProcessingResult::Failed => "failed",
        }
    }

    /// Parses the persisted form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ProcessingResult::Success),
            "ignored" => Some(ProcessingResult::Ignored),
            "failed" => Some(ProcessingResult::Failed),
            _ => None,
        }
    }

    /// Returns true if a re-delivery of the event needs no further work.
    pub fn is_final(&self) -> bool {
        !matches!(self, ProcessingResult::Failed)
    }
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Gateway event ID (evt_xxx format).
    pub event_id: String,

    pub event_type: String,

    pub processed_at: DateTime<Utc>,

    pub result: ProcessingResult,

    /// Ignore reason or error message.
    pub error_message: Option<String>,

    /// Verified event payload, kept for manual reconciliation.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        result: ProcessingResult,
        error_message: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result,
            error_message,
            payload,
        }
    }

    /// Creates a new success record.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::new(event_id, event_type, ProcessingResult::Success, None, payload)
    }

    /// Creates a new ignored record.
    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::new(
            event_id,
            event_type,
            ProcessingResult::Ignored,
            Some(reason.into()),
            payload,
        )
    }

    /// Creates a new failure record.
    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::new(
            event_id,
            event_type,
            ProcessingResult::Failed,
            Some(error.into()),
            payload,
        )
    }
}

/// Result of attempting to save a keyed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this key).
    Inserted,
    /// A record with this key already existed.
    AlreadyExists,
}

/// Port for storing and retrieving processed webhook events.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its gateway event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Store the outcome for an event.
    ///
    /// Replaces an earlier record for the same event id, so a retried
    /// failure ends up with its latest outcome. Returns
    /// `SaveResult::AlreadyExists` when a record was replaced.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}
