//! Public asset routes: symbol status, live prediction history and the
//! asset detail page.
//!
//! The asset detail page is assembled from independent upstream sections.
//! Each section fails on its own: a broken backtest feed leaves
//! `backtest_stats` null but the page still renders.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use performance_engine::{
    apply_fee, cumulative_live_curve, max_drawdown, round_to, summarize, value_range, LiveStats,
};
use serde::{Deserialize, Serialize};
use signal_client::{UpstreamError, UpstreamResult};
use signal_core::{CurrentSignal, EquityPoint, LivePredictionRecord, PerformanceStats, SymbolStatus};

use crate::auth::Caller;
use crate::gateway::{parse_fee, validate_symbol, GatewayError};
use crate::signal_routes::fetch_current_signal;
use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct AssetDetailQuery {
    /// What-if fee per trade, in percent. Kept as text so a bad value
    /// becomes a validation error rather than a query rejection.
    pub fee: Option<String>,
}

/// Current-signal section of the asset page.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurrentSignalView {
    Available { signal: CurrentSignal },
    Locked { reason: &'static str },
    Unavailable,
}

impl CurrentSignalView {
    fn from_result(symbol: &str, result: Result<CurrentSignal, GatewayError>) -> Self {
        match result {
            Ok(signal) => CurrentSignalView::Available { signal },
            Err(e) if e.is_entitlement() => CurrentSignalView::Locked { reason: e.code() },
            Err(e) => {
                tracing::warn!("Current signal for {} omitted: {}", symbol, e);
                CurrentSignalView::Unavailable
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub symbol: String,
    pub records: Vec<LivePredictionRecord>,
    pub live_stats: Option<LiveStats>,
}

#[derive(Debug, Serialize)]
pub struct AssetDetail {
    pub symbol: String,
    pub backtest_stats: Option<PerformanceStats>,
    pub recent_validation_stats: Option<PerformanceStats>,
    pub live_history: Option<Vec<LivePredictionRecord>>,
    pub live_stats: Option<LiveStats>,
    pub fee_percent: f64,
    pub fee_adjusted_pnl_percent: Option<f64>,
    pub equity_curve: Vec<EquityPoint>,
    pub equity_range: Option<ValueRange>,
    pub max_drawdown_percent: Option<f64>,
    pub current_signal: CurrentSignalView,
}

pub fn asset_routes() -> Router<AppState> {
    Router::new()
        .route("/api/symbols/:symbol/status", get(get_symbol_status))
        .route("/api/live/:symbol", get(get_live_predictions))
        .route("/api/assets/:symbol", get(get_asset_detail))
}

fn best_effort<T>(section: &str, symbol: &str, result: UpstreamResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} for {} unavailable: {}", section, symbol, e);
            None
        }
    }
}

async fn get_symbol_status(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<SymbolStatus>>, AppError> {
    let symbol = validate_symbol(&symbol)?;

    let status = state
        .signals
        .symbol_status(&symbol)
        .await
        .map_err(|e| GatewayError::from_upstream(&symbol, e))?;

    Ok(Json(ApiResponse::success(status)))
}

async fn get_live_predictions(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<LiveResponse>>, AppError> {
    let symbol = validate_symbol(&symbol)?;

    let records = state
        .signals
        .live_predictions(&symbol)
        .await
        .map_err(|e| GatewayError::from_upstream(&symbol, e))?;

    let live_stats = summarize(&records);

    Ok(Json(ApiResponse::success(LiveResponse {
        symbol,
        records,
        live_stats,
    })))
}

async fn get_asset_detail(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(symbol): Path<String>,
    Query(query): Query<AssetDetailQuery>,
) -> Result<Json<ApiResponse<AssetDetail>>, AppError> {
    let symbol = validate_symbol(&symbol)?;
    let fee_percent = parse_fee(query.fee.as_deref(), state.default_fee_percent)?;

    let (backtest, validation, live, current) = tokio::join!(
        state.signals.backtest_stats(&symbol),
        state.signals.validation_stats(&symbol),
        state.signals.live_predictions(&symbol),
        fetch_current_signal(&state, &caller, &symbol),
    );

    // Upstream knows nothing about this symbol yet.
    let all_missing = [
        backtest.as_ref().err(),
        validation.as_ref().err(),
        live.as_ref().err(),
    ]
    .into_iter()
    .all(|e| e.map_or(false, UpstreamError::is_not_found));
    if all_missing {
        return Err(GatewayError::ResourceInitializing(symbol).into());
    }

    let backtest_stats = best_effort("Backtest stats", &symbol, backtest);
    let recent_validation_stats = best_effort("Validation stats", &symbol, validation);
    let live_history = best_effort("Live history", &symbol, live);
    let current_signal = CurrentSignalView::from_result(&symbol, current);

    let records = live_history.as_deref().unwrap_or_default();
    let live_stats = summarize(records);
    let fee_adjusted_pnl_percent = live_stats
        .as_ref()
        .map(|_| apply_fee(records, fee_percent));
    let equity_curve = cumulative_live_curve(records);
    let equity_range = value_range(&equity_curve).map(|(min, max)| ValueRange { min, max });
    let max_drawdown_percent =
        (!equity_curve.is_empty()).then(|| round_to(max_drawdown(&equity_curve), 2));

    Ok(Json(ApiResponse::success(AssetDetail {
        symbol,
        backtest_stats,
        recent_validation_stats,
        live_history,
        live_stats,
        fee_percent,
        fee_adjusted_pnl_percent,
        equity_curve,
        equity_range,
        max_drawdown_percent,
        current_signal,
    })))
}
