use async_trait::async_trait;
use signal_core::{
    CurrentSignal, HistoricalTradeRecord, LivePredictionRecord, PerformanceStats, SignalPoint,
    SymbolStatus,
};

use crate::error::UpstreamResult;

/// Read-only view of the signal-generation service.
///
/// The gateway only talks to upstream through this trait, so tests can swap
/// in a canned implementation without a network.
#[async_trait]
pub trait SignalSource: Send + Sync {
    // -- Grid ----------------------------------------------------------------
    async fn signal_points(&self) -> UpstreamResult<Vec<SignalPoint>>;

    async fn current_signal(&self, symbol: &str) -> UpstreamResult<CurrentSignal>;

    // -- Performance records -------------------------------------------------
    async fn trade_history(&self, symbol: &str) -> UpstreamResult<Vec<HistoricalTradeRecord>>;

    async fn live_predictions(&self, symbol: &str) -> UpstreamResult<Vec<LivePredictionRecord>>;

    // -- Aggregate stats -----------------------------------------------------
    async fn backtest_stats(&self, symbol: &str) -> UpstreamResult<PerformanceStats>;

    async fn validation_stats(&self, symbol: &str) -> UpstreamResult<PerformanceStats>;

    // -- Meta ----------------------------------------------------------------
    async fn symbol_status(&self, symbol: &str) -> UpstreamResult<SymbolStatus>;

    fn backend_name(&self) -> &'static str;
}
