use serde::Serialize;
use signal_core::LivePredictionRecord;

use crate::rounding::round_to;

/// Win rate and PnL of the live model over non-flat calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStats {
    pub win_count: usize,
    pub total_count: usize,
    pub accuracy_percent: f64,
    pub cumulative_pnl_percent: f64,
}

fn directional(records: &[LivePredictionRecord]) -> impl Iterator<Item = &LivePredictionRecord> {
    records.iter().filter(|r| !r.is_flat())
}

/// Summarise live predictions. `None` means there is nothing to report
/// (every call was flat, or there were no calls at all).
///
/// A call wins when its `pnl_percent` is strictly positive. Open calls
/// (`pnl_percent` missing) still count towards the total.
pub fn summarize(records: &[LivePredictionRecord]) -> Option<LiveStats> {
    let mut total_count = 0usize;
    let mut win_count = 0usize;
    let mut pnl_sum = 0.0;

    for record in directional(records) {
        total_count += 1;
        let pnl = record.pnl_percent.unwrap_or(0.0);
        if pnl > 0.0 {
            win_count += 1;
        }
        pnl_sum += pnl;
    }

    if total_count == 0 {
        return None;
    }

    Some(LiveStats {
        win_count,
        total_count,
        accuracy_percent: round_to(win_count as f64 / total_count as f64 * 100.0, 1),
        cumulative_pnl_percent: round_to(pnl_sum, 2),
    })
}

/// Live PnL after charging `fee_percent_per_trade` on every non-flat call.
///
/// The fee is a what-if input: zero, fractional and negative values are
/// all accepted as-is.
pub fn apply_fee(records: &[LivePredictionRecord], fee_percent_per_trade: f64) -> f64 {
    let (count, pnl_sum) = directional(records).fold((0usize, 0.0), |(count, sum), r| {
        (count + 1, sum + r.pnl_percent.unwrap_or(0.0))
    });
    round_to(pnl_sum - count as f64 * fee_percent_per_trade, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use signal_core::Direction;

    fn call(direction: Direction, pnl: Option<f64>) -> LivePredictionRecord {
        LivePredictionRecord {
            time: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            predicted_direction: direction,
            entry_price: Some(100.0),
            exit_price: None,
            pnl_percent: pnl,
        }
    }

    #[test]
    fn test_all_flat_is_no_data() {
        let records = vec![call(Direction::Flat, Some(2.0)), call(Direction::Flat, None)];
        assert_eq!(summarize(&records), None);
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn test_summary_ignores_flat_calls() {
        let records = vec![
            call(Direction::Buy, Some(1.5)),
            call(Direction::Sell, Some(-0.5)),
            call(Direction::Flat, Some(50.0)),
            call(Direction::Buy, Some(0.25)),
        ];
        let stats = summarize(&records).unwrap();

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.win_count, 2);
        assert_eq!(stats.accuracy_percent, 66.7);
        assert_eq!(stats.cumulative_pnl_percent, 1.25);
    }

    #[test]
    fn test_open_calls_count_but_do_not_win() {
        let records = vec![call(Direction::Buy, None), call(Direction::Sell, Some(1.0))];
        let stats = summarize(&records).unwrap();

        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.win_count, 1);
        assert_eq!(stats.accuracy_percent, 50.0);
    }

    #[test]
    fn test_fee_charged_per_directional_call() {
        let records = vec![
            call(Direction::Buy, Some(1.0)),
            call(Direction::Sell, Some(2.0)),
            call(Direction::Flat, Some(10.0)),
        ];
        assert_eq!(apply_fee(&records, 0.0), 3.0);
        assert_eq!(apply_fee(&records, 0.1), 2.8);
        assert_eq!(apply_fee(&records, -0.5), 4.0);
    }

    #[test]
    fn test_fee_with_no_calls() {
        assert_eq!(apply_fee(&[], 0.25), 0.0);
    }
}
