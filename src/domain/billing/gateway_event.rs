//! Payment gateway webhook event envelope.
//!
//! Only the envelope is typed here. The `data.object` payload stays a JSON
//! value until the classifier turns it into a closed `Classification`.

use serde::{Deserialize, Serialize};

/// Gateway webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    pub data: GatewayEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl GatewayEvent {
    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Returns the `id` of the data object, if any.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }

    /// Returns the gateway customer id carried by the data object.
    ///
    /// Accepts either a bare id string or an expanded customer object.
    pub fn customer_id(&self) -> Option<&str> {
        let customer = self.data.object.get("customer")?;
        let id = match customer {
            serde_json::Value::String(id) => Some(id.as_str()),
            serde_json::Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()),
            _ => None,
        }?;
        (!id.is_empty()).then_some(id)
    }
}

/// Builder for creating test GatewayEvent instances.
#[cfg(test)]
pub struct GatewayEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for GatewayEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl GatewayEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> GatewayEvent {
        GatewayEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: GatewayEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}
