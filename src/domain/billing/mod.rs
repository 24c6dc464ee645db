//! Billing domain module.
//!
//! Gateway events, their authentication and classification, and the mirrored
//! gateway-side records (orders and subscriptions).
//!
//! # Module Structure
//!
//! - `gateway_event` - Webhook event envelope
//! - `webhook_verifier` - HMAC signature and replay-window checks
//! - `webhook_errors` - Authentication errors
//! - `classifier` - Verified event to action
//! - `order` - One-time order record
//! - `subscription_mirror` - Latest subscription state per customer

mod classifier;
mod gateway_event;
mod order;
mod subscription_mirror;
mod webhook_errors;
mod webhook_verifier;

pub use classifier::{classify, is_tracked_event, CheckoutPayment, Classification, IgnoreReason};
pub use gateway_event::{GatewayEvent, GatewayEventData};
pub use order::OrderRecord;
pub use subscription_mirror::{
    CardDescriptor, GatewaySubscription, SubscriptionMirror, SubscriptionStatus,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{sign_payload, SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub(crate) use gateway_event::GatewayEventBuilder;
