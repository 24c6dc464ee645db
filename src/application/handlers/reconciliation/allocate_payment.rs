//! AllocatePaymentHandler - Command handler for applying a payment to a user's ledger.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::ReconciliationError;
use crate::domain::foundation::{LeagueId, Timestamp, UserId};
use crate::domain::ledger::{plan_allocation, AllocationRequest, AllocationResult};
use crate::ports::{CommitOutcome, CustomerDirectory, LedgerRepository};

/// Command to allocate a received payment.
#[derive(Debug, Clone)]
pub struct AllocatePaymentCommand {
    /// Gateway customer that paid.
    pub customer_id: String,

    /// Amount paid, in the ledger's decimal unit.
    pub amount: Decimal,

    pub currency: String,

    /// Restricts allocation to one league's entries.
    pub league_id: Option<LeagueId>,

    /// Order reference (checkout session id).
    pub order_ref: String,
}

/// Result of a committed allocation.
#[derive(Debug, Clone)]
pub struct AllocatePaymentResult {
    pub user_id: UserId,
    pub allocation: AllocationResult,
    /// Number of plan/commit rounds it took.
    pub attempts: u32,
}

/// Retry policy for version conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationSettings {
    pub max_attempts: u32,
    /// Multiplied by the attempt number before each retry.
    pub retry_backoff: Duration,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

/// Handler for allocating payments across open ledger entries.
///
/// Plans against a fresh read, commits atomically, and re-plans when another
/// allocation touched the same entries first.
pub struct AllocatePaymentHandler {
    customers: Arc<dyn CustomerDirectory>,
    ledger: Arc<dyn LedgerRepository>,
    settings: AllocationSettings,
}

impl AllocatePaymentHandler {
    pub fn new(customers: Arc<dyn CustomerDirectory>, ledger: Arc<dyn LedgerRepository>) -> Self {
        Self {
            customers,
            ledger,
            settings: AllocationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AllocationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns true if a commit for this order has already succeeded.
    pub async fn is_allocated(&self, order_ref: &str) -> Result<bool, ReconciliationError> {
        Ok(self.ledger.is_order_applied(order_ref).await?)
    }

    pub async fn handle(
        &self,
        cmd: AllocatePaymentCommand,
    ) -> Result<AllocatePaymentResult, ReconciliationError> {
        // 1. Resolve the paying user
        let user_id = self
            .customers
            .find_user_by_customer(&cmd.customer_id)
            .await?
            .ok_or_else(|| ReconciliationError::Mapping {
                customer_id: cmd.customer_id.clone(),
            })?;

        let request = AllocationRequest {
            user_id,
            amount: cmd.amount,
            currency: cmd.currency.clone(),
            league_id: cmd.league_id,
            order_ref: cmd.order_ref.clone(),
        };

        let max_attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            // 2. Load and plan against the current state
            let candidates = self
                .ledger
                .find_open_entries(&user_id, cmd.league_id.as_ref())
                .await?;
            let plan = plan_allocation(&request, candidates, Timestamp::now().date())?;

            // 3. Commit or re-plan
            match self.ledger.commit_allocation(&plan).await? {
                CommitOutcome::Committed => {
                    let allocation = plan.result();

                    if let Some(credit) = &allocation.credit {
                        warn!(
                            user_id = %user_id,
                            customer_id = %cmd.customer_id,
                            session_id = %cmd.order_ref,
                            unattributed_amount = %credit.amount,
                            currency = %credit.currency,
                            "Payment exceeded open obligations; leftover held as account credit"
                        );
                    }
                    info!(
                        user_id = %user_id,
                        session_id = %cmd.order_ref,
                        entries = allocation.applied_entries.len(),
                        applied = %plan.total_applied(),
                        leftover = %allocation.leftover,
                        attempt,
                        "Allocated payment"
                    );

                    return Ok(AllocatePaymentResult {
                        user_id,
                        allocation,
                        attempts: attempt,
                    });
                }
                CommitOutcome::Conflict { entry_id } => {
                    debug!(
                        user_id = %user_id,
                        session_id = %cmd.order_ref,
                        entry_id = %entry_id,
                        attempt,
                        "Ledger entry changed during allocation, re-planning"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                    }
                }
                CommitOutcome::AlreadyApplied => {
                    debug!(
                        user_id = %user_id,
                        session_id = %cmd.order_ref,
                        attempt,
                        "Order already applied by another delivery"
                    );
                    return Err(ReconciliationError::AlreadyAllocated {
                        order_ref: cmd.order_ref,
                    });
                }
            }
        }

        Err(ReconciliationError::ConcurrencyExhausted {
            order_ref: cmd.order_ref,
            attempts: max_attempts,
        })
    }
}
