//! Mirrored one-time order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::classifier::CheckoutPayment;
use crate::domain::foundation::{LeagueId, OrderId, TeamId, Timestamp, ValidationError};
use crate::domain::ledger::from_minor_units;

/// One completed one-time checkout. Immutable once written.
///
/// Unique by `session_id`: the checkout session is the idempotency key for
/// gateway re-deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub session_id: String,
    pub customer_id: String,
    pub payment_intent_id: Option<String>,
    /// Minor units, exactly as received.
    pub amount_subtotal: i64,
    /// Minor units, exactly as received.
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    pub league_id: Option<LeagueId>,
    pub team_id: Option<TeamId>,
    /// Gateway event that produced this order.
    pub event_id: String,
    pub created_at: Timestamp,
}

impl OrderRecord {
    /// Builds an order from a classified checkout payment.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank session id or negative amounts.
    pub fn from_checkout(payment: &CheckoutPayment) -> Result<Self, ValidationError> {
        if payment.session_id.trim().is_empty() {
            return Err(ValidationError::empty_field("session_id"));
        }
        if payment.amount_total < 0 {
            return Err(ValidationError::negative("amount_total"));
        }
        if payment.amount_subtotal < 0 {
            return Err(ValidationError::negative("amount_subtotal"));
        }

        Ok(Self {
            id: OrderId::new(),
            session_id: payment.session_id.clone(),
            customer_id: payment.customer_id.clone(),
            payment_intent_id: payment.payment_intent_id.clone(),
            amount_subtotal: payment.amount_subtotal,
            amount_total: payment.amount_total,
            currency: payment.currency.clone(),
            payment_status: payment.payment_status.clone(),
            league_id: payment.league_id,
            team_id: payment.team_id,
            event_id: payment.event_id.clone(),
            created_at: Timestamp::now(),
        })
    }

    /// Total paid in the ledger's decimal unit.
    pub fn total_paid(&self) -> Result<Decimal, ValidationError> {
        from_minor_units(self.amount_total, &self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payment() -> CheckoutPayment {
        CheckoutPayment {
            event_id: "evt_1".to_string(),
            session_id: "cs_1".to_string(),
            customer_id: "cus_1".to_string(),
            payment_intent_id: None,
            amount_subtotal: 19_000,
            amount_total: 20_000,
            currency: "usd".to_string(),
            payment_status: "paid".to_string(),
            league_id: None,
            team_id: None,
        }
    }

    #[test]
    fn from_checkout_copies_fields() {
        let order = OrderRecord::from_checkout(&payment()).unwrap();

        assert_eq!(order.session_id, "cs_1");
        assert_eq!(order.amount_subtotal, 19_000);
        assert_eq!(order.amount_total, 20_000);
        assert_eq!(order.event_id, "evt_1");
    }

    #[test]
    fn total_paid_converts_minor_units() {
        let order = OrderRecord::from_checkout(&payment()).unwrap();
        assert_eq!(order.total_paid().unwrap(), Decimal::from_str("200.00").unwrap());
    }

    #[test]
    fn blank_session_is_rejected() {
        let mut p = payment();
        p.session_id = " ".to_string();
        assert_eq!(
            OrderRecord::from_checkout(&p),
            Err(ValidationError::empty_field("session_id"))
        );
    }

    #[test]
    fn negative_total_is_rejected() {
        let mut p = payment();
        p.amount_total = -100;
        assert_eq!(
            OrderRecord::from_checkout(&p),
            Err(ValidationError::negative("amount_total"))
        );
    }
}
