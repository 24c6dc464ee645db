//! PostgreSQL implementation of LedgerRepository.
//!
//! An allocation commit runs in one transaction. It first claims the order
//! in `payment_allocations`; a concurrent or earlier claim for the same order
//! rolls back as `AlreadyApplied`. Every entry update is then guarded by the
//! version read at planning time; the first guard that matches no row rolls
//! the whole commit back and reports a conflict.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CreditId, DomainError, LeagueId, LedgerEntryId, TeamId, Timestamp, UserId,
};
use crate::domain::ledger::{
    AccountCredit, AllocationNote, AllocationPlan, LedgerEntry, LedgerStatus, PaymentMethod,
};
use crate::ports::{CommitOutcome, LedgerRepository};

use super::db_error;

/// PostgreSQL implementation of LedgerRepository.
#[derive(Clone)]
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx query mapping.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct LedgerEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub league_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Json<Vec<AllocationNote>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let status: LedgerStatus = row.status.parse()?;
        let payment_method = row
            .payment_method
            .as_deref()
            .map(str::parse::<PaymentMethod>)
            .transpose()?;

        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            league_id: row.league_id.map(LeagueId::from_uuid),
            team_id: row.team_id.map(TeamId::from_uuid),
            amount_due: row.amount_due,
            amount_paid: row.amount_paid,
            status,
            due_date: row.due_date,
            payment_method,
            notes: row.notes.0,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AccountCreditRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub league_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub order_ref: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountCreditRow> for AccountCredit {
    fn from(row: AccountCreditRow) -> Self {
        AccountCredit {
            id: CreditId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            league_id: row.league_id.map(LeagueId::from_uuid),
            amount: row.amount,
            currency: row.currency,
            order_ref: row.order_ref,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

const ENTRY_COLUMNS: &str = "id, user_id, league_id, team_id, amount_due, amount_paid, status, \
     due_date, payment_method, notes, version, created_at, updated_at";

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn find_open_entries(
        &self,
        user_id: &UserId,
        league_id: Option<&LeagueId>,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE user_id = $1
              AND status IN ('pending', 'partial')
              AND ($2::uuid IS NULL OR league_id = $2)
            ORDER BY due_date ASC NULLS LAST, created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(league_id.map(|l| *l.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load open ledger entries"))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn find_by_id(&self, id: &LedgerEntryId) -> Result<Option<LedgerEntry>, DomainError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = $1");

        let row = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch ledger entry"))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn commit_allocation(&self, plan: &AllocationPlan) -> Result<CommitOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // Blocks behind a concurrent claim for the same order until it settles.
        let claimed = sqlx::query(
            r#"
            INSERT INTO payment_allocations (order_ref, user_id, amount, applied, leftover)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (order_ref) DO NOTHING
            "#,
        )
        .bind(&plan.order_ref)
        .bind(plan.user_id.as_uuid())
        .bind(plan.amount)
        .bind(plan.total_applied())
        .bind(plan.leftover)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to claim order for allocation"))?;

        if claimed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back allocation"))?;
            return Ok(CommitOutcome::AlreadyApplied);
        }

        for update in &plan.updates {
            let entry = &update.entry;
            let result = sqlx::query(
                r#"
                UPDATE ledger_entries SET
                    amount_paid = $3,
                    status = $4,
                    payment_method = $5,
                    notes = $6,
                    version = version + 1,
                    updated_at = $7
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(update.expected_version)
            .bind(entry.amount_paid)
            .bind(entry.status.as_str())
            .bind(entry.payment_method.map(|m| m.as_str()))
            .bind(Json(&entry.notes))
            .bind(entry.updated_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update ledger entry"))?;

            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(db_error("Failed to roll back allocation"))?;
                return Ok(CommitOutcome::Conflict { entry_id: entry.id });
            }
        }

        if let Some(credit) = &plan.credit {
            sqlx::query(
                r#"
                INSERT INTO account_credits (
                    id, user_id, league_id, amount, currency, order_ref, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(credit.id.as_uuid())
            .bind(credit.user_id.as_uuid())
            .bind(credit.league_id.map(|l| *l.as_uuid()))
            .bind(credit.amount)
            .bind(&credit.currency)
            .bind(&credit.order_ref)
            .bind(credit.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert account credit"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit allocation"))?;

        Ok(CommitOutcome::Committed)
    }

    async fn is_order_applied(&self, order_ref: &str) -> Result<bool, DomainError> {
        let (applied,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM payment_allocations WHERE order_ref = $1)",
        )
        .bind(order_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check order allocation"))?;

        Ok(applied)
    }

    async fn find_credits_by_user(&self, user_id: &UserId) -> Result<Vec<AccountCredit>, DomainError> {
        let rows = sqlx::query_as::<_, AccountCreditRow>(
            r#"
            SELECT id, user_id, league_id, amount, currency, order_ref, created_at
            FROM account_credits
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load account credits"))?;

        Ok(rows.into_iter().map(AccountCredit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn row() -> LedgerEntryRow {
        LedgerEntryRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            league_id: None,
            team_id: Some(Uuid::new_v4()),
            amount_due: Decimal::new(15000, 2),
            amount_paid: Decimal::new(5000, 2),
            status: "partial".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            payment_method: Some("gateway".to_string()),
            notes: Json(vec![]),
            version: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_maps_to_entry() {
        let r = row();
        let id = r.id;

        let entry = LedgerEntry::try_from(r).unwrap();

        assert_eq!(*entry.id.as_uuid(), id);
        assert_eq!(entry.status, LedgerStatus::Partial);
        assert_eq!(entry.payment_method, Some(PaymentMethod::Gateway));
        assert_eq!(entry.outstanding(), Decimal::new(10000, 2));
        assert_eq!(entry.version, 3);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut r = row();
        r.status = "refunded".to_string();

        let err = LedgerEntry::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let mut r = row();
        r.payment_method = Some("cheque".to_string());

        assert!(LedgerEntry::try_from(r).is_err());
    }

    #[test]
    fn credit_row_maps() {
        let credit = AccountCredit::from(AccountCreditRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            league_id: None,
            amount: Decimal::new(500, 2),
            currency: "usd".to_string(),
            order_ref: "cs_1".to_string(),
            created_at: Utc::now(),
        });

        assert_eq!(credit.amount, Decimal::new(500, 2));
        assert_eq!(credit.order_ref, "cs_1");
    }
}
