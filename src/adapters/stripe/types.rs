//! Stripe API objects as returned by the subscription list endpoint.
//!
//! Only the fields the subscription mirror needs are modelled. Everything
//! else in the response is ignored by serde.

use serde::Deserialize;

use crate::domain::billing::{CardDescriptor, GatewaySubscription, SubscriptionStatus};
use crate::domain::foundation::Timestamp;

/// Generic Stripe list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    // `Vec::new` keeps serde from adding a `T: Default` bound.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

/// Stripe Subscription object.
///
/// Newer API versions moved the billing period onto the subscription items,
/// so both locations are optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    pub status: String,

    pub current_period_start: Option<i64>,

    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Expanded payment method, a bare id when not expanded, or null.
    #[serde(default)]
    pub default_payment_method: Option<StripePaymentMethodRef>,

    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

/// Subscription items container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,

    pub current_period_start: Option<i64>,

    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

/// `default_payment_method` is either an id or an expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StripePaymentMethodRef {
    Expanded(StripePaymentMethod),
    Id(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentMethod {
    pub id: String,

    pub card: Option<StripeCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCard {
    pub brand: String,

    pub last4: String,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.first_item().and_then(|i| i.current_period_start))
    }

    fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|i| i.current_period_end))
    }

    fn card(&self) -> Option<CardDescriptor> {
        match &self.default_payment_method {
            Some(StripePaymentMethodRef::Expanded(pm)) => pm.card.as_ref().map(|c| CardDescriptor {
                brand: c.brand.clone(),
                last4: c.last4.clone(),
            }),
            _ => None,
        }
    }

    /// Converts to the gateway-neutral subscription snapshot.
    pub fn into_gateway_subscription(self) -> GatewaySubscription {
        GatewaySubscription {
            status: SubscriptionStatus::parse(&self.status),
            price_id: self
                .first_item()
                .and_then(|i| i.price.as_ref())
                .map(|p| p.id.clone()),
            current_period_start: self.period_start().and_then(Timestamp::from_unix_secs),
            current_period_end: self.period_end().and_then(Timestamp::from_unix_secs),
            cancel_at_period_end: self.cancel_at_period_end,
            card: self.card(),
            subscription_id: self.id,
        }
    }
}

/// Stripe error envelope: `{"error": {"type": .., "code": .., "message": ..}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}
