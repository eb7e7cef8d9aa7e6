//! Premium signal routes
//!
//! Everything here sits behind the subscription route layer: anonymous
//! callers get 401, registered-but-unsubscribed callers get 403. Live
//! prediction history is public and lives in [`crate::asset_routes`].

use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use performance_engine::{
    accumulate, build_grid, cumulative_history_curve, max_drawdown, round_to, HistorySummary,
    SignalMatrix,
};
use serde::Serialize;
use signal_core::{CallerIdentity, CurrentSignal, EquityPoint};

use crate::auth::Caller;
use crate::gateway::{authorize_premium, require_subscription_middleware, validate_symbol, GatewayError};
use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    #[serde(flatten)]
    pub summary: HistorySummary,
    pub equity_curve: Vec<EquityPoint>,
    pub max_drawdown_percent: Option<f64>,
}

pub fn signal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/signals/matrix", get(get_signal_matrix))
        .route("/api/signals/:symbol/current", get(get_current_signal))
        .route("/api/history/:symbol", get(get_history))
        .route_layer(middleware::from_fn(require_subscription_middleware))
}

/// Fetch the latest call for `symbol` on behalf of `caller`.
///
/// Entitlement is checked here as well as in the route layer so public
/// pages can reuse it and tell a locked signal apart from a failed fetch.
pub(crate) async fn fetch_current_signal(
    state: &AppState,
    caller: &CallerIdentity,
    symbol: &str,
) -> Result<CurrentSignal, GatewayError> {
    authorize_premium(caller)?;
    state
        .signals
        .current_signal(symbol)
        .await
        .map_err(|e| GatewayError::from_upstream(symbol, e))
}

async fn get_signal_matrix(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SignalMatrix>>, AppError> {
    let points = state
        .signals
        .signal_points()
        .await
        .map_err(|e| GatewayError::from_upstream("signal matrix", e))?;

    let matrix = build_grid(&points);
    tracing::debug!(
        "Built signal matrix: {} assets from {} points",
        matrix.assets.len(),
        points.len()
    );

    Ok(Json(ApiResponse::success(matrix)))
}

async fn get_current_signal(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CurrentSignal>>, AppError> {
    let symbol = validate_symbol(&symbol)?;
    let signal = fetch_current_signal(&state, &caller, &symbol).await?;
    Ok(Json(ApiResponse::success(signal)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<HistoryResponse>>, AppError> {
    let symbol = validate_symbol(&symbol)?;

    let records = state
        .signals
        .trade_history(&symbol)
        .await
        .map_err(|e| GatewayError::from_upstream(&symbol, e))?;

    let summary = accumulate(&records);
    let equity_curve = cumulative_history_curve(&summary.records);
    let max_drawdown_percent =
        (!equity_curve.is_empty()).then(|| round_to(max_drawdown(&equity_curve), 2));

    Ok(Json(ApiResponse::success(HistoryResponse {
        symbol,
        summary,
        equity_curve,
        max_drawdown_percent,
    })))
}
