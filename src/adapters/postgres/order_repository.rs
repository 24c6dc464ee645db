//! PostgreSQL implementation of OrderRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::OrderRecord;
use crate::domain::foundation::{DomainError, LeagueId, OrderId, TeamId, Timestamp};
use crate::ports::{OrderRepository, SaveResult};

use super::db_error;

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    session_id: String,
    customer_id: String,
    payment_intent_id: Option<String>,
    amount_subtotal: i64,
    amount_total: i64,
    currency: String,
    payment_status: String,
    league_id: Option<Uuid>,
    team_id: Option<Uuid>,
    event_id: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for OrderRecord {
    fn from(row: OrderRow) -> Self {
        OrderRecord {
            id: OrderId::from_uuid(row.id),
            session_id: row.session_id,
            customer_id: row.customer_id,
            payment_intent_id: row.payment_intent_id,
            amount_subtotal: row.amount_subtotal,
            amount_total: row.amount_total,
            currency: row.currency,
            payment_status: row.payment_status,
            league_id: row.league_id.map(LeagueId::from_uuid),
            team_id: row.team_id.map(TeamId::from_uuid),
            event_id: row.event_id,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert_if_absent(&self, order: &OrderRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, session_id, customer_id, payment_intent_id, amount_subtotal,
                amount_total, currency, payment_status, league_id, team_id,
                event_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.session_id)
        .bind(&order.customer_id)
        .bind(&order.payment_intent_id)
        .bind(order.amount_subtotal)
        .bind(order.amount_total)
        .bind(&order.currency)
        .bind(&order.payment_status)
        .bind(order.league_id.map(|l| *l.as_uuid()))
        .bind(order.team_id.map(|t| *t.as_uuid()))
        .bind(&order.event_id)
        .bind(order.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert order"))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderRecord>, DomainError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, session_id, customer_id, payment_intent_id, amount_subtotal,
                   amount_total, currency, payment_status, league_id, team_id,
                   event_id, created_at
            FROM orders
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch order"))?;

        Ok(row.map(OrderRecord::from))
    }
}
