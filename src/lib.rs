//! League Ledger - Payment reconciliation for league fee ledgers
//!
//! This crate receives signed payment-gateway webhooks, mirrors subscription
//! state, records one-time orders and allocates payments across a member's
//! open ledger entries, oldest obligation first.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
