use serde::Serialize;
use signal_core::{Direction, HistoricalTradeRecord, Outcome};

use crate::rounding::round_to;

/// A historical record with its realised PnL attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTradeRecord {
    #[serde(flatten)]
    pub record: HistoricalTradeRecord,
    /// `None` while either price is missing.
    pub pnl_percent: Option<f64>,
}

/// Accuracy and PnL over a set of historical records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub accuracy_percent: f64,
    pub cumulative_pnl_percent: f64,
    pub win_count: usize,
    pub loss_count: usize,
    pub pending_count: usize,
    pub total_count: usize,
    pub records: Vec<EnrichedTradeRecord>,
}

/// Percentage move captured by a trade, signed by direction.
///
/// Returns `None` when either price is missing. A zero entry price or a flat
/// direction yields `0.0`.
pub fn trade_pnl_percent(direction: Direction, entry: Option<f64>, exit: Option<f64>) -> Option<f64> {
    let (entry, exit) = (entry?, exit?);
    if entry == 0.0 {
        return Some(0.0);
    }

    let pnl = match direction {
        Direction::Buy => (exit - entry) / entry * 100.0,
        Direction::Sell => (entry - exit) / entry * 100.0,
        Direction::Flat => 0.0,
    };
    Some(pnl)
}

/// Compute accuracy and cumulative PnL from historical trade records.
///
/// Accuracy uses the discrete `outcome` (pending records are ignored);
/// PnL uses prices, so a WIN without prices still counts for accuracy
/// while contributing nothing to the PnL sum.
pub fn accumulate(records: &[HistoricalTradeRecord]) -> HistorySummary {
    let mut win_count = 0usize;
    let mut loss_count = 0usize;
    let mut pending_count = 0usize;
    let mut pnl_sum = 0.0;
    let mut enriched = Vec::with_capacity(records.len());

    for record in records {
        match record.outcome {
            Outcome::Win => win_count += 1,
            Outcome::Loss => loss_count += 1,
            Outcome::Pending => pending_count += 1,
        }

        let pnl = trade_pnl_percent(record.direction, record.entry_price, record.exit_price);
        if let Some(p) = pnl {
            pnl_sum += p;
        }

        enriched.push(EnrichedTradeRecord {
            record: record.clone(),
            pnl_percent: pnl.map(|p| round_to(p, 2)),
        });
    }

    let decided = win_count + loss_count;
    let accuracy_percent = if decided == 0 {
        0.0
    } else {
        round_to(win_count as f64 / decided as f64 * 100.0, 2)
    };

    HistorySummary {
        accuracy_percent,
        cumulative_pnl_percent: round_to(pnl_sum, 2),
        win_count,
        loss_count,
        pending_count,
        total_count: records.len(),
        records: enriched,
    }
}
