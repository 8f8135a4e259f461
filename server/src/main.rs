//! Slot booking HTTP server.
//!
//! Wires the Postgres stores, admission engine and HTTP router together.

mod config;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use config::Config;
use slot_booking_core::environment::SystemClock;
use slot_booking_postgres::{PostgresBookingStore, PostgresEventStore, migrate};
use slot_booking_runtime::BookingService;
use slot_booking_runtime::metrics::MetricsServer;
use slot_booking_web::{AppState, router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slot_booking=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slot booking server");

    let config = Config::from_env();
    info!(
        http_addr = %config.server.addr(),
        metrics_addr = %config.server.metrics_addr(),
        max_connections = config.postgres.max_connections,
        lock_timeout_ms = config.postgres.lock_timeout_ms,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await
        .context("Failed to connect to database")?;
    migrate(&pool).await.context("Failed to run migrations")?;
    info!("Database ready");

    MetricsServer::new(config.server.metrics_addr())
        .start()
        .context("Failed to start metrics exporter")?;
    info!(address = %config.server.metrics_addr(), "Metrics exporter listening");

    let events = Arc::new(PostgresEventStore::new(pool.clone()));
    let bookings =
        Arc::new(PostgresBookingStore::new(pool).with_lock_timeout(config.postgres.lock_timeout()));
    let service = BookingService::new(events, bookings, Arc::new(SystemClock))
        .with_retry_policy(config.admission.retry_policy());

    let origin = HeaderValue::from_str(&config.server.cors_allowed_origin)
        .context("CORS_ALLOWED_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let app = router(AppState::new(service)).layer(cors);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
