//! HTTP handlers for the webhook receiver.
//!
//! The receiver authenticates the raw body, acknowledges the delivery and
//! hands the verified event to background reconciliation. Nothing past the
//! signature check can change the response the gateway sees.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::application::handlers::reconciliation::{
    HandleGatewayEventCommand, HandleGatewayEventHandler,
};
use crate::domain::billing::{WebhookError, WebhookVerifier};

use super::super::background::{BackgroundTasks, SchedulerClosed};
use super::dto::{ErrorResponse, HealthResponse, WebhookAck};

/// Header carrying the gateway signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<WebhookVerifier>,
    pub reconciler: Arc<HandleGatewayEventHandler>,
    pub tasks: Arc<BackgroundTasks>,
}

impl WebhookAppState {
    pub fn new(
        verifier: WebhookVerifier,
        reconciler: HandleGatewayEventHandler,
        tasks: Arc<BackgroundTasks>,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            reconciler: Arc::new(reconciler),
            tasks,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Verify, acknowledge and schedule a gateway event
pub async fn receive_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = state.verifier.verify(&body, signature).map_err(|err| {
        warn!(error = %err, body_len = body.len(), "Rejected webhook delivery");
        WebhookApiError::Authentication(err)
    })?;

    let span = info_span!(
        "reconcile_event",
        event_id = %event.id,
        event_type = %event.event_type
    );
    let event_id = event.id.clone();
    let event_type = event.event_type.clone();
    let reconciler = state.reconciler.clone();

    state
        .tasks
        .spawn(
            async move {
                // Failures are logged and recorded by the handler itself.
                if let Ok(result) = reconciler.handle(HandleGatewayEventCommand { event }).await {
                    debug!(?result, "Background reconciliation finished");
                }
            }
            .instrument(span),
        )
        .await?;

    info!(
        event_id = %event_id,
        event_type = %event_type,
        "Accepted webhook delivery"
    );
    Ok(Json(WebhookAck::received()))
}

/// OPTIONS /webhooks/stripe - CORS preflight
pub async fn webhook_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"))],
    )
}

/// GET /health - Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type for the receiver.
#[derive(Debug)]
pub enum WebhookApiError {
    /// Delivery failed authentication; never processed.
    Authentication(WebhookError),
    /// The event verified but could not be scheduled.
    SchedulerUnavailable,
}

impl From<SchedulerClosed> for WebhookApiError {
    fn from(_: SchedulerClosed) -> Self {
        Self::SchedulerUnavailable
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookApiError::Authentication(err) => (err.status_code(), err.to_string()),
            WebhookApiError::SchedulerUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SchedulerClosed.to_string(),
            ),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
