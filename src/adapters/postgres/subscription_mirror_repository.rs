//! PostgreSQL implementation of SubscriptionMirrorRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{CardDescriptor, SubscriptionMirror, SubscriptionStatus};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::SubscriptionMirrorRepository;

use super::db_error;

#[derive(Clone)]
pub struct PostgresSubscriptionMirrorRepository {
    pool: PgPool,
}

impl PostgresSubscriptionMirrorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MirrorRow {
    customer_id: String,
    subscription_id: Option<String>,
    price_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    card_brand: Option<String>,
    card_last4: Option<String>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl From<MirrorRow> for SubscriptionMirror {
    fn from(row: MirrorRow) -> Self {
        let payment_method = match (row.card_brand, row.card_last4) {
            (Some(brand), Some(last4)) => Some(CardDescriptor { brand, last4 }),
            _ => None,
        };

        SubscriptionMirror {
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            price_id: row.price_id,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            payment_method,
            status: SubscriptionStatus::parse(&row.status),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl SubscriptionMirrorRepository for PostgresSubscriptionMirrorRepository {
    async fn upsert(&self, mirror: &SubscriptionMirror) -> Result<bool, DomainError> {
        let card = mirror.payment_method.as_ref();

        let result = sqlx::query(
            r#"
            INSERT INTO subscription_mirrors (
                customer_id, subscription_id, price_id, current_period_start,
                current_period_end, cancel_at_period_end, card_brand, card_last4,
                status, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (customer_id) DO UPDATE SET
                subscription_id = EXCLUDED.subscription_id,
                price_id = EXCLUDED.price_id,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                card_brand = EXCLUDED.card_brand,
                card_last4 = EXCLUDED.card_last4,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            WHERE subscription_mirrors.updated_at <= EXCLUDED.updated_at
            "#,
        )
        .bind(&mirror.customer_id)
        .bind(&mirror.subscription_id)
        .bind(&mirror.price_id)
        .bind(mirror.current_period_start.map(|t| *t.as_datetime()))
        .bind(mirror.current_period_end.map(|t| *t.as_datetime()))
        .bind(mirror.cancel_at_period_end)
        .bind(card.map(|c| c.brand.as_str()))
        .bind(card.map(|c| c.last4.as_str()))
        .bind(mirror.status.as_str())
        .bind(mirror.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert subscription mirror"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionMirror>, DomainError> {
        let row = sqlx::query_as::<_, MirrorRow>(
            r#"
            SELECT customer_id, subscription_id, price_id, current_period_start,
                   current_period_end, cancel_at_period_end, card_brand, card_last4,
                   status, updated_at
            FROM subscription_mirrors
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch subscription mirror"))?;

        Ok(row.map(SubscriptionMirror::from))
    }
}
