//! Stripe adapter.
//!
//! - `StripePaymentGateway` - `PaymentGateway` implementation over the REST API
//! - `types` - API response objects

mod stripe_gateway;
mod types;

pub use stripe_gateway::{StripeConfig, StripePaymentGateway};
