//! Axum router configuration for the webhook receiver.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health, receive_stripe_webhook, webhook_preflight, WebhookAppState};

/// Create the webhook router.
///
/// # Routes
/// - `POST /stripe` - Receive a signed gateway event
/// - `OPTIONS /stripe` - CORS preflight (204)
///
/// Any other method answers 405.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route(
        "/stripe",
        post(receive_stripe_webhook).options(webhook_preflight),
    )
}

/// Create the complete application router with its middleware stack.
///
/// Mounts the webhook routes at `/webhooks` and the liveness check at
/// `/health`. Bodies over `max_body_bytes` are refused with 413.
pub fn app_router(
    state: WebhookAppState,
    request_timeout: Duration,
    max_body_bytes: usize,
) -> Router {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}
