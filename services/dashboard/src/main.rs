//! Budget dashboard service
//!
//! Single-binary Rust service that:
//! 1. Loads configuration and the stored Session Credential
//! 2. Builds the authenticated gateway to the budget backend
//! 3. Serves the dashboard routes behind a session-aware route guard
//! 4. Exposes `/health` and Prometheus `/metrics`

mod config;
mod error;
mod metrics;
mod route_guard;
mod routes;
mod session;
mod state;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self as axum_middleware, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use budget_api::BudgetApi;
use budget_auth::{FileTokenStore, MemoryTokenStore, TokenStore};
use budget_gateway::Gateway;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::session::SessionTracker;
use crate::state::{AppState, ServiceMetrics};

/// How long in-flight requests get to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the axum router with all routes and shared state.
///
/// Layer order, outermost first: concurrency limit, request accounting,
/// route guard.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(routes::dashboard))
        .route("/transactions", get(routes::transactions))
        .route("/categories", get(routes::categories))
        .route("/goals", get(routes::goals))
        .route("/auth/login", get(routes::login_page).post(routes::login))
        .route("/auth/register", post(routes::register))
        .route("/auth/logout", post(routes::logout))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            route_guard::guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting budget-dashboard");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        api_base_url = %config.api.base_url,
        refresh_timeout_secs = config.api.refresh_timeout_secs,
        queue_timeout_secs = config.api.queue_timeout_secs,
        persistent_session = config.session.credential_file.is_some(),
        "configuration loaded"
    );

    let store: Arc<dyn TokenStore> = match &config.session.credential_file {
        Some(path) => Arc::new(FileTokenStore::load(path.clone()).await.with_context(|| {
            format!("failed to load session credential from {}", path.display())
        })?),
        None => Arc::new(MemoryTokenStore::new()),
    };

    let sessions = Arc::new(SessionTracker::new());
    let gateway = Gateway::builder(config.api.base_url.clone())
        .token_store(store)
        .listener(sessions.clone())
        .request_timeout(config.api.timeout())
        .refresh_timeout(config.api.refresh_timeout())
        .queue_timeout(config.api.queue_timeout())
        .build()
        .context("failed to build backend gateway")?;

    let authenticated = gateway.is_authenticated().await;
    info!(authenticated, "gateway ready");

    let metrics = ServiceMetrics::new();
    let app_state = AppState {
        api: BudgetApi::new(gateway),
        sessions,
        metrics: metrics.clone(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    let in_flight = metrics.in_flight.clone();

    // The drain deadline starts at signal receipt: the server is told to stop
    // accepting, then raced against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Count every inbound request and record its latency.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let start = Instant::now();
    state.metrics.in_flight.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    state.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    metrics::record_request(status.as_u16(), &method, start.elapsed().as_secs_f64());
    response
}

/// Health endpoint: status, session presence, uptime, requests served.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "authenticated": state.gateway().is_authenticated().await,
        "refresh_in_flight": state.gateway().refresh_in_flight(),
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
        "sessions_expired": state.sessions.expired_total(),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
