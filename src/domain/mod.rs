//! Domain layer - Core business logic.
//!
//! Pure types and rules with no I/O. Adapters and handlers depend on this
//! layer, never the reverse.

pub mod billing;
pub mod foundation;
pub mod ledger;
