use chrono::{DateTime, Utc};
use signal_core::{EquityPoint, LivePredictionRecord};

use crate::history::{trade_pnl_percent, EnrichedTradeRecord};
use crate::rounding::round_to;

/// Order curve points by time. Ties keep their input order.
///
/// A curve needs at least two points to be drawn; shorter inputs yield an
/// empty curve and the caller shows a placeholder.
pub fn build_curve(points: &[EquityPoint]) -> Vec<EquityPoint> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut curve = points.to_vec();
    curve.sort_by_key(|p| p.time);
    curve
}

/// Min/max of the curve values, widened to always include the zero baseline.
pub fn value_range(curve: &[EquityPoint]) -> Option<(f64, f64)> {
    if curve.is_empty() {
        return None;
    }
    Some(
        curve
            .iter()
            .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.value), hi.max(p.value))),
    )
}

/// Largest peak-to-trough drop of a cumulative PnL curve, in percentage points.
/// The curve is assumed to start from a flat (zero) position.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = 0.0_f64;
    let mut worst = 0.0_f64;
    for point in curve {
        peak = peak.max(point.value);
        worst = worst.max(peak - point.value);
    }
    worst
}

fn running_total(mut steps: Vec<(DateTime<Utc>, f64)>) -> Vec<EquityPoint> {
    steps.sort_by_key(|(time, _)| *time);
    let mut total = 0.0;
    let points: Vec<EquityPoint> = steps
        .into_iter()
        .map(|(time, pnl)| {
            total += pnl;
            EquityPoint {
                time,
                value: round_to(total, 2),
            }
        })
        .collect();
    build_curve(&points)
}

/// Cumulative live PnL over time. Flat calls are skipped; open calls add 0.
pub fn cumulative_live_curve(records: &[LivePredictionRecord]) -> Vec<EquityPoint> {
    running_total(
        records
            .iter()
            .filter(|r| !r.is_flat())
            .map(|r| (r.time, r.pnl_percent.unwrap_or(0.0)))
            .collect(),
    )
}

/// Cumulative realised PnL over time from priced historical records.
///
/// Summed from unrounded per-trade PnL so the last point matches
/// [`HistorySummary::cumulative_pnl_percent`](crate::HistorySummary).
pub fn cumulative_history_curve(records: &[EnrichedTradeRecord]) -> Vec<EquityPoint> {
    running_total(
        records
            .iter()
            .filter_map(|r| {
                let record = &r.record;
                trade_pnl_percent(record.direction, record.entry_price, record.exit_price)
                    .map(|pnl| (record.time, pnl))
            })
            .collect(),
    )
}
