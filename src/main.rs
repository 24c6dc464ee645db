//! League Ledger server binary.
//!
//! Loads configuration, connects to PostgreSQL, wires the reconciliation
//! handlers and serves the webhook receiver until SIGINT/SIGTERM. On shutdown
//! it stops accepting connections, then drains background reconciliation.

use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use league_ledger::adapters::http::{app_router, BackgroundTasks, WebhookAppState};
use league_ledger::adapters::postgres::{
    PostgresCustomerDirectory, PostgresLedgerRepository, PostgresOrderRepository,
    PostgresSubscriptionMirrorRepository, PostgresWebhookEventRepository,
};
use league_ledger::adapters::stripe::{StripeConfig, StripePaymentGateway};
use league_ledger::application::{
    AllocatePaymentHandler, AllocationSettings, HandleGatewayEventHandler, RecordOrderHandler,
    SyncSubscriptionHandler,
};
use league_ledger::config::AppConfig;
use league_ledger::domain::billing::WebhookVerifier;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect_with(config.database.connect_options()?)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let gateway = StripePaymentGateway::new(
        StripeConfig::new(config.payment.stripe_api_key.clone())
            .with_base_url(config.payment.api_base_url.clone()),
    )?;
    if config.payment.is_test_mode() {
        info!("Stripe client running in test mode");
    }

    let events = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresLedgerRepository::new(pool.clone()));
    let orders = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let mirrors = Arc::new(PostgresSubscriptionMirrorRepository::new(pool.clone()));
    let customers = Arc::new(PostgresCustomerDirectory::new(pool.clone()));

    let reconciler = HandleGatewayEventHandler::new(
        events,
        SyncSubscriptionHandler::new(Arc::new(gateway), mirrors),
        RecordOrderHandler::new(orders),
        AllocatePaymentHandler::new(customers, ledger).with_settings(AllocationSettings {
            max_attempts: config.reconciliation.max_allocation_attempts,
            retry_backoff: config.reconciliation.retry_backoff(),
        }),
    );

    let verifier = WebhookVerifier::new(config.payment.webhook_secret())
        .with_tolerance_secs(config.payment.signature_tolerance_secs)
        .with_require_livemode(config.payment.require_livemode);

    let tasks = Arc::new(BackgroundTasks::new());
    let state = WebhookAppState::new(verifier, reconciler, tasks.clone());
    let app = app_router(
        state,
        config.server.request_timeout(),
        config.server.max_body_bytes,
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "League Ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = tasks.drain(config.server.drain_timeout()).await;
    info!(
        completed = report.completed,
        aborted = report.aborted,
        "Background work drained"
    );

    pool.close().await;
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
