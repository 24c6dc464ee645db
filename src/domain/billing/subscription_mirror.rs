//! Subscription mirror: the latest known subscription state per customer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Lifecycle status of a mirrored subscription.
///
/// `NotStarted` is local: it records that the gateway reported no
/// subscription at all. Statuses this build does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    NotStarted,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
    Other(String),
}

impl SubscriptionStatus {
    /// Parses a gateway status string. Never fails.
    pub fn parse(s: &str) -> Self {
        match s {
            "not_started" => Self::NotStarted,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "not_started",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubscriptionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Masked card details. Never holds a full card number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDescriptor {
    pub brand: String,
    pub last4: String,
}

/// Canonical subscription state as fetched from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySubscription {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub card: Option<CardDescriptor>,
}

/// Mirror row. At most one per gateway customer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMirror {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub payment_method: Option<CardDescriptor>,
    pub status: SubscriptionStatus,
    pub updated_at: Timestamp,
}

impl SubscriptionMirror {
    /// Mirror for a customer the gateway has no subscription for.
    pub fn not_started(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            subscription_id: None,
            price_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            payment_method: None,
            status: SubscriptionStatus::NotStarted,
            updated_at: Timestamp::now(),
        }
    }

    /// Mirror of the gateway's current subscription for a customer.
    pub fn from_gateway(customer_id: impl Into<String>, sub: &GatewaySubscription) -> Self {
        Self {
            customer_id: customer_id.into(),
            subscription_id: Some(sub.subscription_id.clone()),
            price_id: sub.price_id.clone(),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            payment_method: sub.card.clone(),
            status: sub.status.clone(),
            updated_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_roundtrip() {
        for s in ["not_started", "active", "past_due", "canceled", "unpaid", "paused", "trialing"] {
            assert_eq!(SubscriptionStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = SubscriptionStatus::parse("on_hold");
        assert_eq!(status, SubscriptionStatus::Other("on_hold".to_string()));
        assert_eq!(status.to_string(), "on_hold");
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }

    #[test]
    fn not_started_mirror_is_empty() {
        let mirror = SubscriptionMirror::not_started("cus_1");

        assert_eq!(mirror.status, SubscriptionStatus::NotStarted);
        assert!(mirror.subscription_id.is_none());
        assert!(mirror.payment_method.is_none());
        assert!(!mirror.cancel_at_period_end);
    }

    #[test]
    fn from_gateway_copies_subscription() {
        let sub = GatewaySubscription {
            subscription_id: "sub_1".to_string(),
            status: SubscriptionStatus::Active,
            price_id: Some("price_1".to_string()),
            current_period_start: Timestamp::from_unix_secs(1_700_000_000),
            current_period_end: Timestamp::from_unix_secs(1_702_592_000),
            cancel_at_period_end: true,
            card: Some(CardDescriptor {
                brand: "visa".to_string(),
                last4: "4242".to_string(),
            }),
        };

        let mirror = SubscriptionMirror::from_gateway("cus_1", &sub);

        assert_eq!(mirror.customer_id, "cus_1");
        assert_eq!(mirror.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(mirror.price_id.as_deref(), Some("price_1"));
        assert!(mirror.cancel_at_period_end);
        assert_eq!(mirror.payment_method.unwrap().last4, "4242");
    }
}
