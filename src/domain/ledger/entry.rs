//! Ledger entry entity.
//!
//! A ledger entry is one payment obligation owned by a user, usually a
//! league registration fee.
//!
//! # Design Decisions
//!
//! - **Decimal money**: amounts are `rust_decimal::Decimal` in the currency's
//!   major unit, never floats
//! - **Derived status**: `status` is recomputed on every change and is never
//!   written independently of the amounts
//! - **Optimistic concurrency**: `version` increments on every write

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LedgerStatus, PaymentMethod};
use crate::domain::foundation::{LeagueId, LedgerEntryId, TeamId, Timestamp, UserId, ValidationError};

/// One line of allocation history on a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationNote {
    /// Amount applied by this allocation.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    pub method: PaymentMethod,

    /// Calendar date the allocation was applied.
    pub applied_on: NaiveDate,

    /// Order reference (checkout session id) the money came from.
    pub order_ref: String,
}

impl fmt::Display for AllocationNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Applied {} via {} on {} (order {})",
            self.amount, self.method, self.applied_on, self.order_ref
        )
    }
}

/// Payment obligation owned by a user.
///
/// # Invariants
///
/// - `0 <= amount_paid <= amount_due`
/// - `status == LedgerStatus::derive(amount_paid, amount_due, due_date, today)`
///   as of the last write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub user_id: UserId,
    pub league_id: Option<LeagueId>,
    pub team_id: Option<TeamId>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub status: LedgerStatus,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Vec<AllocationNote>,

    /// Optimistic concurrency token.
    pub version: i32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LedgerEntry {
    /// Creates a new unpaid obligation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Negative` if `amount_due` is below zero.
    pub fn new(
        id: LedgerEntryId,
        user_id: UserId,
        amount_due: Decimal,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        if amount_due < Decimal::ZERO {
            return Err(ValidationError::negative("amount_due"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            user_id,
            league_id: None,
            team_id: None,
            amount_due,
            amount_paid: Decimal::ZERO,
            status: LedgerStatus::derive(Decimal::ZERO, amount_due, due_date, today),
            due_date,
            payment_method: None,
            notes: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Ties the entry to a league.
    pub fn with_league(mut self, league_id: LeagueId) -> Self {
        self.league_id = Some(league_id);
        self
    }

    /// Ties the entry to a team.
    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Amount still owed. Never negative.
    pub fn outstanding(&self) -> Decimal {
        (self.amount_due - self.amount_paid).max(Decimal::ZERO)
    }

    /// Returns true if nothing remains to be paid.
    pub fn is_settled(&self) -> bool {
        self.amount_paid >= self.amount_due
    }

    /// Applies up to `available` to this entry and returns the amount applied.
    ///
    /// Updates `amount_paid`, `payment_method` and `status`, and appends an
    /// allocation note. Does nothing and returns zero when the entry is
    /// already settled or `available` is not positive. Does not touch
    /// `version`; the repository bumps it on commit.
    pub fn apply_payment(
        &mut self,
        available: Decimal,
        method: PaymentMethod,
        order_ref: &str,
        today: NaiveDate,
    ) -> Decimal {
        let applied = available.min(self.outstanding());
        if applied <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        self.amount_paid += applied;
        self.payment_method = Some(method);
        self.status = LedgerStatus::derive(self.amount_paid, self.amount_due, self.due_date, today);
        self.notes.push(AllocationNote {
            amount: applied,
            method,
            applied_on: today,
            order_ref: order_ref.to_string(),
        });
        self.updated_at = Timestamp::now();
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn entry(due: &str) -> LedgerEntry {
        LedgerEntry::new(LedgerEntryId::new(), UserId::new(), dec(due), None, today()).unwrap()
    }

    #[test]
    fn new_entry_is_pending_and_unpaid() {
        let e = entry("150");
        assert_eq!(e.status, LedgerStatus::Pending);
        assert_eq!(e.amount_paid, Decimal::ZERO);
        assert_eq!(e.outstanding(), dec("150"));
        assert_eq!(e.version, 1);
    }

    #[test]
    fn new_entry_rejects_negative_amount() {
        let result = LedgerEntry::new(
            LedgerEntryId::new(),
            UserId::new(),
            dec("-1"),
            None,
            today(),
        );
        assert_eq!(result, Err(ValidationError::negative("amount_due")));
    }

    #[test]
    fn new_entry_past_due_is_overdue() {
        let due = NaiveDate::from_ymd_opt(2025, 1, 1);
        let e = LedgerEntry::new(LedgerEntryId::new(), UserId::new(), dec("10"), due, today())
            .unwrap();
        assert_eq!(e.status, LedgerStatus::Overdue);
    }

    #[test]
    fn apply_payment_caps_at_outstanding() {
        let mut e = entry("75");
        let applied = e.apply_payment(dec("200"), PaymentMethod::Gateway, "cs_1", today());

        assert_eq!(applied, dec("75"));
        assert_eq!(e.amount_paid, dec("75"));
        assert_eq!(e.status, LedgerStatus::Paid);
        assert_eq!(e.payment_method, Some(PaymentMethod::Gateway));
    }

    #[test]
    fn apply_payment_partial_sets_partial() {
        let mut e = entry("75");
        let applied = e.apply_payment(dec("50"), PaymentMethod::Gateway, "cs_1", today());

        assert_eq!(applied, dec("50"));
        assert_eq!(e.status, LedgerStatus::Partial);
        assert_eq!(e.outstanding(), dec("25"));
    }

    #[test]
    fn apply_payment_appends_note() {
        let mut e = entry("75");
        e.apply_payment(dec("20"), PaymentMethod::Gateway, "cs_abc", today());

        assert_eq!(e.notes.len(), 1);
        let note = &e.notes[0];
        assert_eq!(note.amount, dec("20"));
        assert_eq!(note.order_ref, "cs_abc");
        assert_eq!(
            note.to_string(),
            "Applied 20 via gateway on 2025-01-15 (order cs_abc)"
        );
    }

    #[test]
    fn apply_payment_on_settled_entry_is_noop() {
        let mut e = entry("75");
        e.amount_paid = dec("75");

        let applied = e.apply_payment(dec("10"), PaymentMethod::Gateway, "cs_1", today());

        assert_eq!(applied, Decimal::ZERO);
        assert!(e.notes.is_empty());
    }

    #[test]
    fn apply_zero_is_noop() {
        let mut e = entry("75");
        let applied = e.apply_payment(Decimal::ZERO, PaymentMethod::Gateway, "cs_1", today());

        assert_eq!(applied, Decimal::ZERO);
        assert_eq!(e.status, LedgerStatus::Pending);
        assert!(e.payment_method.is_none());
    }

    #[test]
    fn notes_serialize_amount_as_string() {
        let note = AllocationNote {
            amount: dec("12.50"),
            method: PaymentMethod::Gateway,
            applied_on: today(),
            order_ref: "cs_1".to_string(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["amount"], "12.50");
        assert_eq!(json["method"], "gateway");
    }
}
