//! Imgur Gateway
//!
//! Single-binary Rust service that:
//! 1. Registers the Imgur client and token store once at startup
//! 2. Serves the route that starts Imgur's authorization flow
//! 3. Authenticates protected routes with a stored, refreshed or freshly
//!    exchanged Imgur access token
//! 4. Proxies `/3/*` to api.imgur.com with that token attached

mod config;
mod error;
mod metrics;
mod middleware;
mod proxy;
mod redirect;
mod registration;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Extension, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgur_auth::Session;
use metrics_exporter_prometheus::PrometheusHandle;
use token_store::StorageRegistry;

use crate::config::Config;
use crate::middleware::{AuthState, authenticate_imgur};
use crate::proxy::ProxyState;
use crate::redirect::Redirector;
use crate::registration::Container;

/// Time allowed for in-flight requests to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    auth: AuthState,
    proxy: ProxyState,
    started_at: Instant,
    requests_total: Arc<AtomicU64>,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Only the protected routes pass through the Imgur middleware; health,
/// metrics and the authenticate route itself are always reachable.
fn build_router(state: AppState, authenticate_path: &str, max_connections: usize) -> Router {
    let protected = Router::new()
        .route("/3/{*path}", any(proxy_handler))
        .route("/imgur/account", get(account_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            authenticate_imgur,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(authenticate_path, get(authenticate_handler))
        .merge(protected)
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

    let args: Vec<String> = std::env::args().collect();
    let flag_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    };

    // --publish-config writes the packaged defaults and exits
    if let Some(target) = flag_value("--publish-config") {
        let target = std::path::Path::new(target);
        if Config::publish_default(target)
            .with_context(|| format!("failed to publish config to {}", target.display()))?
        {
            info!(path = %target.display(), "default configuration published");
        } else {
            warn!(path = %target.display(), "configuration already exists, left untouched");
        }
        return Ok(());
    }

    info!("starting imgur-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let config_path = Config::resolve_path(flag_value("--config"));
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        api_base_url = %config.imgur.api_base_url,
        token_storage = %config.imgur.token_storage,
        authenticate_route = %config.routes.authenticate,
        "configuration loaded"
    );

    let timeout = Duration::from_secs(config.server.timeout_secs);
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;

    let container = Container::new(StorageRegistry::with_builtins(), http.clone());
    let services = container
        .register(&config.imgur)
        .await
        .context("imgur service registration failed")?;

    let app_state = AppState {
        auth: AuthState {
            api: services.client.clone(),
            store: services.store.clone(),
            redirector: Redirector::from_config(&config.routes),
            storage_key: Arc::from(config.imgur.storage_key.as_str()),
            persist_refreshed_tokens: config.imgur.persist_refreshed_tokens,
        },
        proxy: ProxyState {
            client: http,
            upstream_url: config.imgur.api_base_url.clone(),
            timeout,
        },
        started_at: Instant::now(),
        requests_total: Arc::new(AtomicU64::new(0)),
        prometheus: prometheus_handle,
    };

    let app = build_router(
        app_state,
        &config.routes.authenticate,
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timer starts when the signal fires, not when the server starts
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
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: status, uptime, requests served and the storage backend.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "requests_served": state.requests_total.load(Ordering::Relaxed),
        "token_storage": state.auth.store.backend(),
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

#[derive(Deserialize)]
struct AuthorizeParams {
    state: Option<String>,
}

/// Send the browser to Imgur's authorize endpoint.
async fn authenticate_handler(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let url = state.auth.api.authorization_url(params.state.as_deref());
    info!("redirecting to imgur authorization");
    redirect::found(&url)
}

/// Account details of the token attached by the middleware.
async fn account_handler(Extension(session): Extension<Session>) -> impl IntoResponse {
    let token = session.get_access_token();
    axum::Json(serde_json::json!({
        "account_username": token.and_then(|t| t.account_username.clone()),
        "account_id": token.and_then(|t| t.account_id),
        "expires_at": token.map(|t| t.expires_at()),
    }))
}

/// Forward `/3/*` to the Imgur API with the session's token.
async fn proxy_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    request: axum::http::Request<axum::body::Body>,
) -> Response {
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    proxy::proxy_request(&state.proxy, &session, request, request_id).await
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
