//! Customer directory port - gateway customer id to application user.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Resolves gateway customers to application users.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Returns the user linked to `customer_id`, or `None` if unmapped.
    async fn find_user_by_customer(&self, customer_id: &str) -> Result<Option<UserId>, DomainError>;
}
