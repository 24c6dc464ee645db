//! PostgreSQL implementation of CustomerDirectory.
//!
//! Reads the `billing_customers` link table written at checkout creation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::CustomerDirectory;

use super::db_error;

#[derive(Clone)]
pub struct PostgresCustomerDirectory {
    pool: PgPool,
}

impl PostgresCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
    async fn find_user_by_customer(&self, customer_id: &str) -> Result<Option<UserId>, DomainError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM billing_customers WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to look up billing customer"))?;

        Ok(row.map(|(id,)| UserId::from_uuid(id)))
    }
}
