//! Ledger repository port.
//!
//! Reads open obligations and commits allocation plans.
//!
//! # Design
//!
//! - **Atomic commit**: every entry update and the optional credit of a plan
//!   land in one transaction, or none do
//! - **Version guard**: each update applies only if the entry still has the
//!   version it was planned against
//! - **Order claim**: a plan's `order_ref` is claimed in the same transaction,
//!   so one order is applied at most once however often it is re-planned

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LeagueId, LedgerEntryId, UserId};
use crate::domain::ledger::{AccountCredit, AllocationPlan, LedgerEntry};

/// Result of committing an allocation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every update and the credit were written.
    Committed,
    /// An entry changed since it was loaded. Nothing was written.
    Conflict { entry_id: LedgerEntryId },
    /// The plan's order was already applied by an earlier commit. Nothing was written.
    AlreadyApplied,
}

/// Repository port for ledger entries and account credits.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Loads the user's entries open for allocation (`pending` or `partial`).
    ///
    /// Restricted to `league_id` when given. Ordered by due date ascending
    /// with undated entries last, then by creation order.
    async fn find_open_entries(
        &self,
        user_id: &UserId,
        league_id: Option<&LeagueId>,
    ) -> Result<Vec<LedgerEntry>, DomainError>;

    /// Find an entry by its ID.
    async fn find_by_id(&self, id: &LedgerEntryId) -> Result<Option<LedgerEntry>, DomainError>;

    /// Applies a plan atomically.
    ///
    /// Claims `plan.order_ref` first; an existing claim yields
    /// `AlreadyApplied`. Each written entry gets `version = expected_version + 1`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure; nothing is written
    async fn commit_allocation(&self, plan: &AllocationPlan) -> Result<CommitOutcome, DomainError>;

    /// Returns true once a commit for `order_ref` has succeeded.
    async fn is_order_applied(&self, order_ref: &str) -> Result<bool, DomainError>;

    /// Lists account credits held for a user, oldest first.
    async fn find_credits_by_user(&self, user_id: &UserId) -> Result<Vec<AccountCredit>, DomainError>;
}
