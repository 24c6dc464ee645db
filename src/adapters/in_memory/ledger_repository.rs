//! In-memory ledger repository.
//!
//! Version checks and writes happen under one write lock, which gives the
//! same all-or-nothing commit as the Postgres transaction.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, LeagueId, LedgerEntryId, UserId};
use crate::domain::ledger::{order_candidates, AccountCredit, AllocationPlan, LedgerEntry};
use crate::ports::{CommitOutcome, LedgerRepository};

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    credits: Vec<AccountCredit>,
    applied_orders: HashSet<String>,
}

/// In-memory ledger store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerRepository {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any entry with the same id.
    pub async fn insert(&self, entry: LedgerEntry) {
        let mut state = self.state.write().await;
        match state.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => state.entries.push(entry),
        }
    }

    /// Snapshot of every stored entry in insertion order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.entries.clone()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn find_open_entries(
        &self,
        user_id: &UserId,
        league_id: Option<&LeagueId>,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let state = self.state.read().await;
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| &e.user_id == user_id && e.status.accepts_allocation())
            .filter(|e| league_id.map_or(true, |l| e.league_id.as_ref() == Some(l)))
            .cloned()
            .collect();
        order_candidates(&mut entries);
        Ok(entries)
    }

    async fn find_by_id(&self, id: &LedgerEntryId) -> Result<Option<LedgerEntry>, DomainError> {
        let state = self.state.read().await;
        Ok(state.entries.iter().find(|e| &e.id == id).cloned())
    }

    async fn commit_allocation(&self, plan: &AllocationPlan) -> Result<CommitOutcome, DomainError> {
        let mut state = self.state.write().await;

        if state.applied_orders.contains(&plan.order_ref) {
            return Ok(CommitOutcome::AlreadyApplied);
        }

        for update in &plan.updates {
            let current = state.entries.iter().find(|e| e.id == update.entry.id);
            if current.map(|e| e.version) != Some(update.expected_version) {
                return Ok(CommitOutcome::Conflict {
                    entry_id: update.entry.id,
                });
            }
        }

        for update in &plan.updates {
            if let Some(slot) = state.entries.iter_mut().find(|e| e.id == update.entry.id) {
                let mut entry = update.entry.clone();
                entry.version = update.expected_version + 1;
                *slot = entry;
            }
        }
        if let Some(credit) = &plan.credit {
            state.credits.push(credit.clone());
        }
        state.applied_orders.insert(plan.order_ref.clone());

        Ok(CommitOutcome::Committed)
    }

    async fn is_order_applied(&self, order_ref: &str) -> Result<bool, DomainError> {
        Ok(self.state.read().await.applied_orders.contains(order_ref))
    }

    async fn find_credits_by_user(&self, user_id: &UserId) -> Result<Vec<AccountCredit>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .credits
            .iter()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::{plan_allocation, AllocationRequest, LedgerStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn entry(user_id: UserId, due: i64) -> LedgerEntry {
        LedgerEntry::new(LedgerEntryId::new(), user_id, Decimal::from(due), None, today()).unwrap()
    }

    fn request(user_id: UserId, amount: i64) -> AllocationRequest {
        AllocationRequest {
            user_id,
            amount: Decimal::from(amount),
            currency: "usd".to_string(),
            league_id: None,
            order_ref: "cs_1".to_string(),
        }
    }

    #[tokio::test]
    async fn find_open_entries_filters_user_status_and_league() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();
        let league = LeagueId::new();
        let mut paid = entry(user, 10);
        paid.status = LedgerStatus::Paid;
        repo.insert(paid).await;
        repo.insert(entry(UserId::new(), 10)).await;
        repo.insert(entry(user, 10)).await;
        repo.insert(entry(user, 10).with_league(league)).await;

        assert_eq!(repo.find_open_entries(&user, None).await.unwrap().len(), 2);
        assert_eq!(
            repo.find_open_entries(&user, Some(&league)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();
        let e = entry(user, 10);
        let id = e.id;
        repo.insert(e).await;

        let candidates = repo.find_open_entries(&user, None).await.unwrap();
        let plan = plan_allocation(&request(user, 4), candidates, today()).unwrap();

        assert_eq!(repo.commit_allocation(&plan).await.unwrap(), CommitOutcome::Committed);
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.amount_paid, Decimal::from(4));
    }

    #[tokio::test]
    async fn stale_plan_conflicts_and_writes_nothing() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();
        repo.insert(entry(user, 10)).await;
        repo.insert(entry(user, 10)).await;

        let candidates = repo.find_open_entries(&user, None).await.unwrap();
        let first = plan_allocation(&request(user, 15), candidates.clone(), today()).unwrap();
        let second = plan_allocation(&request(user, 15), candidates, today()).unwrap();

        assert_eq!(repo.commit_allocation(&first).await.unwrap(), CommitOutcome::Committed);
        assert!(matches!(
            repo.commit_allocation(&second).await.unwrap(),
            CommitOutcome::Conflict { .. }
        ));

        let total: Decimal = repo.entries().await.iter().map(|e| e.amount_paid).sum();
        assert_eq!(total, Decimal::from(15));
    }

    #[tokio::test]
    async fn second_plan_for_same_order_is_already_applied() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();
        let e = entry(user, 10);
        let id = e.id;
        repo.insert(e).await;
        assert!(!repo.is_order_applied("cs_1").await.unwrap());

        let candidates = repo.find_open_entries(&user, None).await.unwrap();
        let first = plan_allocation(&request(user, 4), candidates, today()).unwrap();
        repo.commit_allocation(&first).await.unwrap();

        let candidates = repo.find_open_entries(&user, None).await.unwrap();
        let replan = plan_allocation(&request(user, 4), candidates, today()).unwrap();
        assert_eq!(
            repo.commit_allocation(&replan).await.unwrap(),
            CommitOutcome::AlreadyApplied
        );

        assert!(repo.is_order_applied("cs_1").await.unwrap());
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid, Decimal::from(4));
        assert_eq!(stored.notes.len(), 1);
    }

    #[tokio::test]
    async fn conflicting_commit_leaves_order_unclaimed() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();
        repo.insert(entry(user, 10)).await;

        let candidates = repo.find_open_entries(&user, None).await.unwrap();
        let mut other = request(user, 3);
        other.order_ref = "cs_other".to_string();
        let winner = plan_allocation(&other, candidates.clone(), today()).unwrap();
        let stale = plan_allocation(&request(user, 3), candidates, today()).unwrap();
        repo.commit_allocation(&winner).await.unwrap();

        assert!(matches!(
            repo.commit_allocation(&stale).await.unwrap(),
            CommitOutcome::Conflict { .. }
        ));
        assert!(!repo.is_order_applied("cs_1").await.unwrap());
    }

    #[tokio::test]
    async fn credit_is_stored_with_commit() {
        let repo = InMemoryLedgerRepository::new();
        let user = UserId::new();

        let plan = plan_allocation(&request(user, 7), vec![], today()).unwrap();
        repo.commit_allocation(&plan).await.unwrap();

        let credits = repo.find_credits_by_user(&user).await.unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].amount, Decimal::from(7));
    }
}
