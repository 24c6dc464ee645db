//! Webhook receiver.
//!
//! - `POST /webhooks/stripe` - signed gateway events
//! - `GET /health` - liveness check

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAck};
pub use handlers::{WebhookApiError, WebhookAppState, SIGNATURE_HEADER};
pub use routes::{app_router, webhook_routes};
