//! HTTP gateway for the subscription-gated signal dashboard.
//!
//! Every request is resolved to a [`CallerIdentity`](signal_core::CallerIdentity)
//! before routing. Premium routes (signal matrix, current signal, trade
//! history) require a trialing or active subscription; public routes
//! (health, symbol status, live predictions, asset detail) are open and
//! degrade section by section when the upstream signal service misbehaves.

pub mod accounts;
pub mod asset_routes;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod request_id;
pub mod security_headers;
pub mod signal_routes;
pub mod token;


use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use signal_client::{HttpSignalSource, SignalSource, SignalSourceConfig};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use accounts::{AccountStore, InMemoryAccountStore, SqliteAccountStore};
use auth::CredentialResolver;
use config::ServerConfig;
use gateway::GatewayError;
use token::{HmacTokenVerifier, TokenVerifier};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub signals: Arc<dyn SignalSource>,
    pub resolver: Arc<CredentialResolver>,
    pub default_fee_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Handler error. Gateway errors render with their own status and code;
/// anything else is an internal failure whose message stays in the logs.
#[derive(Debug)]
pub enum AppError {
    Gateway(GatewayError),
    Internal(StatusCode, anyhow::Error),
}

impl AppError {
    pub fn with_status(status: StatusCode, err: anyhow::Error) -> Self {
        AppError::Internal(status, err)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Gateway(err) => err.into_response(),
            AppError::Internal(status, err) => {
                tracing::error!("Request failed ({}): {:#}", status, err);
                (
                    status,
                    Json(json!({
                        "success": false,
                        "error": status.canonical_reason().unwrap_or("Internal error"),
                        "code": "internal_error",
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Assemble the full router with its middleware stack.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(asset_routes::asset_routes())
        .merge(signal_routes::signal_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_caller_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = tracing::field::Empty,
                        )
                    }),
                )
                .layer(middleware::from_fn(request_id::request_id_middleware))
                .layer(middleware::from_fn(
                    security_headers::security_headers_middleware,
                ))
                .layer(cors_layer(&config.cors_allowed_origins))
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(config.request_timeout),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

async fn handle_timeout_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request exceeded deadline");
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "success": false,
                "error": "Request timed out",
                "code": "request_timeout",
            })),
        )
            .into_response()
    } else {
        AppError::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("Unhandled middleware error: {}", err),
        )
        .into_response()
    }
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "signal_source": state.signals.backend_name(),
    }))
}

/// Install the global tracing subscriber. `LOG_FORMAT=json` switches to
/// structured output.
pub fn init_tracing() {
    let json_logging = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,api_server=debug"))
    };

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .init();
    }
}

async fn build_account_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn AccountStore>> {
    match &config.database_url {
        Some(url) => {
            let store = SqliteAccountStore::connect(url)
                .await
                .context("Failed to open account database")?;
            tracing::info!("Account store: sqlite");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using an empty in-memory account store");
            Ok(Arc::new(InMemoryAccountStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!("Starting signal dashboard API v{}", env!("CARGO_PKG_VERSION"));

    let signals = HttpSignalSource::new(SignalSourceConfig::new(
        config.signal_source_url.clone(),
        config.signal_source_timeout,
    ))
    .context("Failed to build signal source client")?;
    tracing::info!("Signal source: {}", signals.base_url());

    let accounts = build_account_store(&config).await?;
    let tokens: Option<Arc<dyn TokenVerifier>> = match &config.token_secret {
        Some(secret) => Some(Arc::new(HmacTokenVerifier::new(secret))),
        None => {
            tracing::warn!("TOKEN_SECRET not set, bearer tokens will resolve to anonymous");
            None
        }
    };

    let state = AppState {
        signals: Arc::new(signals),
        resolver: Arc::new(CredentialResolver::new(accounts, tokens)),
        default_fee_percent: config.default_fee_percent,
    };
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
