pub mod equity;
pub mod history;
pub mod live;
pub mod matrix;
pub mod rounding;

#[cfg(test)]
mod tests;

pub use equity::{build_curve, cumulative_history_curve, cumulative_live_curve, max_drawdown, value_range};
pub use history::{accumulate, trade_pnl_percent, EnrichedTradeRecord, HistorySummary};
pub use live::{apply_fee, summarize, LiveStats};
pub use matrix::{build_grid, SignalMatrix};
pub use rounding::round_to;
