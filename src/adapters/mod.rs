//! Adapters - Implementations of ports for the outside world.
//!
//! - `http` - Axum webhook receiver
//! - `postgres` - Repository ports over PostgreSQL
//! - `stripe` - Payment gateway client
//! - `in_memory` - Port implementations for tests

pub mod http;
pub mod in_memory;
pub mod postgres;
pub mod stripe;
