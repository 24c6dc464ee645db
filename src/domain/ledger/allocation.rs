//! Pure allocation planner.
//!
//! Walks a user's open ledger entries in due-date order and decides how much
//! of an incoming payment each one receives. Nothing here touches storage:
//! the resulting [`AllocationPlan`] is committed atomically by
//! `LedgerRepository::commit_allocation`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LedgerEntry, LedgerStatus, PaymentMethod};
use crate::domain::foundation::{CreditId, LeagueId, LedgerEntryId, Timestamp, UserId, ValidationError};

/// A payment to distribute over a user's obligations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub user_id: UserId,

    /// Amount paid, in the ledger's decimal unit.
    pub amount: Decimal,

    /// ISO currency code, lowercase as the gateway reports it.
    pub currency: String,

    /// Restricts allocation to entries of this league when set.
    pub league_id: Option<LeagueId>,

    /// Order reference recorded in allocation notes and credits.
    pub order_ref: String,
}

/// Money received that no open obligation could absorb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredit {
    pub id: CreditId,
    pub user_id: UserId,
    pub league_id: Option<LeagueId>,
    pub amount: Decimal,
    pub currency: String,
    pub order_ref: String,
    pub created_at: Timestamp,
}

/// New state for one entry, guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    /// Entry with amounts, status and notes already updated.
    pub entry: LedgerEntry,

    /// Version the entry had when it was loaded.
    pub expected_version: i32,

    /// Amount applied to this entry by the plan.
    pub applied: Decimal,
}

/// Everything a single allocation commit must write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub user_id: UserId,
    pub order_ref: String,
    pub amount: Decimal,
    pub updates: Vec<EntryUpdate>,
    pub leftover: Decimal,
    pub credit: Option<AccountCredit>,
}

impl AllocationPlan {
    /// Sum of everything applied to entries.
    pub fn total_applied(&self) -> Decimal {
        self.updates.iter().map(|u| u.applied).sum()
    }

    /// Summarises the plan for callers and logs.
    pub fn result(&self) -> AllocationResult {
        AllocationResult {
            applied_entries: self
                .updates
                .iter()
                .map(|u| AppliedEntry {
                    entry_id: u.entry.id,
                    applied: u.applied,
                    status: u.entry.status,
                })
                .collect(),
            leftover: self.leftover,
            credit: self.credit.clone(),
        }
    }
}

/// Amount applied to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEntry {
    pub entry_id: LedgerEntryId,
    pub applied: Decimal,
    pub status: LedgerStatus,
}

/// Outcome of an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub applied_entries: Vec<AppliedEntry>,
    pub leftover: Decimal,
    pub credit: Option<AccountCredit>,
}

/// Orders entries for allocation: earliest due date first, entries without a
/// due date last. The sort is stable, so entries sharing a due date keep the
/// order they were loaded in.
pub fn order_candidates(entries: &mut [LedgerEntry]) {
    entries.sort_by_key(|e| (e.due_date.is_none(), e.due_date));
}

/// Plans the distribution of `request.amount` over `candidates`.
///
/// Candidates outside the requested league, not open for allocation, or
/// already settled are skipped. A positive leftover becomes an
/// [`AccountCredit`] in the plan.
///
/// # Errors
///
/// Returns `ValidationError::Negative` for a negative amount.
pub fn plan_allocation(
    request: &AllocationRequest,
    mut candidates: Vec<LedgerEntry>,
    today: NaiveDate,
) -> Result<AllocationPlan, ValidationError> {
    if request.amount < Decimal::ZERO {
        return Err(ValidationError::negative("amount"));
    }

    order_candidates(&mut candidates);

    let mut remaining = request.amount;
    let mut updates = Vec::new();

    for mut entry in candidates {
        if remaining <= Decimal::ZERO {
            break;
        }
        if entry.user_id != request.user_id
            || !entry.status.accepts_allocation()
            || entry.is_settled()
        {
            continue;
        }
        if let Some(league_id) = request.league_id {
            if entry.league_id != Some(league_id) {
                continue;
            }
        }

        let expected_version = entry.version;
        let applied = entry.apply_payment(
            remaining,
            PaymentMethod::Gateway,
            &request.order_ref,
            today,
        );
        if applied > Decimal::ZERO {
            remaining -= applied;
            updates.push(EntryUpdate {
                entry,
                expected_version,
                applied,
            });
        }
    }

    let leftover = remaining.max(Decimal::ZERO);
    let credit = (leftover > Decimal::ZERO).then(|| AccountCredit {
        id: CreditId::new(),
        user_id: request.user_id,
        league_id: request.league_id,
        amount: leftover,
        currency: request.currency.clone(),
        order_ref: request.order_ref.clone(),
        created_at: Timestamp::now(),
    });

    Ok(AllocationPlan {
        user_id: request.user_id,
        order_ref: request.order_ref.clone(),
        amount: request.amount,
        updates,
        leftover,
        credit,
    })
}
