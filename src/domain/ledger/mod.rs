//! Ledger domain module.
//!
//! Payment obligations owned by users and the rules for applying incoming
//! payments to them.
//!
//! # Module Structure
//!
//! - `entry` - LedgerEntry entity and allocation notes
//! - `status` - LedgerStatus derivation and PaymentMethod
//! - `allocation` - Pure FIFO allocation planner
//! - `money` - Gateway minor-unit conversion

mod allocation;
mod entry;
pub mod money;
mod status;

pub use allocation::{
    order_candidates, plan_allocation, AccountCredit, AllocationPlan, AllocationRequest,
    AllocationResult, AppliedEntry, EntryUpdate,
};
pub use entry::{AllocationNote, LedgerEntry};
pub use money::from_minor_units;
pub use status::{LedgerStatus, PaymentMethod};
