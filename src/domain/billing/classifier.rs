//! Event classification.
//!
//! Turns a verified gateway event into the single action the reconciliation
//! core should take. Pure: no I/O and no clock.

use serde_json::Value;
use std::fmt;

use super::gateway_event::GatewayEvent;
use crate::domain::foundation::{LeagueId, TeamId};

/// Event types that can change a customer's billing state.
const TRACKED_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
    "customer.subscription.paused",
    "customer.subscription.resumed",
    "customer.subscription.pending_update_applied",
    "customer.subscription.pending_update_expired",
    "customer.subscription.trial_will_end",
    "invoice.paid",
    "invoice.payment_failed",
    "invoice.payment_action_required",
    "invoice.upcoming",
    "invoice.marked_uncollectible",
    "invoice.payment_succeeded",
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.canceled",
];

/// Returns true if the event type is one the core reacts to.
pub fn is_tracked_event(event_type: &str) -> bool {
    TRACKED_EVENTS.contains(&event_type)
}

/// Data captured from a paid one-time checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPayment {
    pub event_id: String,
    pub session_id: String,
    pub customer_id: String,
    pub payment_intent_id: Option<String>,
    /// Minor units, as reported.
    pub amount_subtotal: i64,
    /// Minor units, as reported.
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    pub league_id: Option<LeagueId>,
    pub team_id: Option<TeamId>,
}

/// Why an event was acknowledged without action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UntrackedEventType,
    MissingCustomer,
    /// Payment-mode checkout whose payment has not cleared yet.
    CheckoutNotPaid,
    /// Payment intent belonging to an invoice; the invoice events cover it.
    InvoicePaymentIntent,
    /// Tracked event missing a field the action needs.
    MalformedPayload(&'static str),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UntrackedEventType => write!(f, "untracked event type"),
            IgnoreReason::MissingCustomer => write!(f, "no customer id in payload"),
            IgnoreReason::CheckoutNotPaid => write!(f, "checkout payment not yet paid"),
            IgnoreReason::InvoicePaymentIntent => write!(f, "payment intent belongs to an invoice"),
            IgnoreReason::MalformedPayload(field) => write!(f, "payload missing '{}'", field),
        }
    }
}

/// The action to take for a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignore(IgnoreReason),
    SyncSubscription { customer_id: String },
    RecordOnePayment(CheckoutPayment),
}

/// Classifies a verified event.
pub fn classify(event: &GatewayEvent) -> Classification {
    if !is_tracked_event(&event.event_type) {
        return Classification::Ignore(IgnoreReason::UntrackedEventType);
    }

    let customer_id = match event.customer_id() {
        Some(id) => id.to_string(),
        None => return Classification::Ignore(IgnoreReason::MissingCustomer),
    };
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => classify_checkout(event, object, customer_id),
        "payment_intent.succeeded" if has_value(object, "invoice") => {
            Classification::Ignore(IgnoreReason::InvoicePaymentIntent)
        }
        _ => Classification::SyncSubscription { customer_id },
    }
}

fn classify_checkout(event: &GatewayEvent, object: &Value, customer_id: String) -> Classification {
    let mode = object.get("mode").and_then(Value::as_str).unwrap_or_default();
    if mode != "payment" {
        return Classification::SyncSubscription { customer_id };
    }

    let payment_status = str_field(object, "payment_status").unwrap_or_default();
    if payment_status != "paid" {
        return Classification::Ignore(IgnoreReason::CheckoutNotPaid);
    }

    let Some(session_id) = str_field(object, "id") else {
        return Classification::Ignore(IgnoreReason::MalformedPayload("id"));
    };
    let Some(amount_total) = object.get("amount_total").and_then(Value::as_i64) else {
        return Classification::Ignore(IgnoreReason::MalformedPayload("amount_total"));
    };
    let Some(currency) = str_field(object, "currency") else {
        return Classification::Ignore(IgnoreReason::MalformedPayload("currency"));
    };
    let amount_subtotal = object
        .get("amount_subtotal")
        .and_then(Value::as_i64)
        .unwrap_or(amount_total);

    let metadata = object.get("metadata");
    let league_id = metadata_str(metadata, "league_id")
        .or_else(|| metadata_str(metadata, "leagueId"))
        .and_then(|s| s.parse::<LeagueId>().ok());
    let team_id = metadata_str(metadata, "team_id").and_then(|s| s.parse::<TeamId>().ok());

    Classification::RecordOnePayment(CheckoutPayment {
        event_id: event.id.clone(),
        session_id,
        customer_id,
        payment_intent_id: id_or_expanded(object.get("payment_intent")),
        amount_subtotal,
        amount_total,
        currency: currency.to_ascii_lowercase(),
        payment_status,
        league_id,
        team_id,
    })
}

fn has_value(object: &Value, key: &str) -> bool {
    object.get(key).map_or(false, |v| !v.is_null())
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn metadata_str<'a>(metadata: Option<&'a Value>, key: &str) -> Option<&'a str> {
    metadata?
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn id_or_expanded(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
