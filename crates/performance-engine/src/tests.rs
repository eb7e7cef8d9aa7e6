use chrono::{DateTime, TimeZone, Utc};
use signal_core::{
    Direction, EquityPoint, HistoricalTradeRecord, LivePredictionRecord, Outcome, SignalPoint,
    SignalValue, Timeframe,
};

use crate::{accumulate, apply_fee, build_curve, build_grid, summarize};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Helper: a signal point with both timestamps set to `secs`.
fn signal(asset: &str, timeframe: &str, value: i64, secs: i64) -> SignalPoint {
    SignalPoint {
        asset: asset.to_string(),
        timeframe: timeframe.to_string(),
        signal_value: SignalValue::try_from(value).unwrap(),
        generated_at: ts(secs),
        last_updated_at: ts(secs),
    }
}

/// Helper: a resolved historical trade.
fn trade(direction: Direction, entry: f64, exit: f64, outcome: Outcome) -> HistoricalTradeRecord {
    HistoricalTradeRecord {
        time: ts(0),
        asset: "BTCUSDT".to_string(),
        timeframe: "1d".to_string(),
        direction,
        entry_price: Some(entry),
        exit_price: Some(exit),
        outcome,
    }
}

/// Helper: a live call with a closed PnL.
fn live(direction: Direction, pnl: f64) -> LivePredictionRecord {
    LivePredictionRecord {
        time: ts(0),
        predicted_direction: direction,
        entry_price: Some(100.0),
        exit_price: Some(100.0 + pnl),
        pnl_percent: Some(pnl),
    }
}

/// A deterministic spread of grid inputs: duplicates, unknown timeframes,
/// unsorted assets.
fn grid_fixtures() -> Vec<Vec<SignalPoint>> {
    let assets = ["SOLUSDT", "BTCUSDT", "ETHUSDT", "ADAUSDT"];
    let timeframes = ["15m", "30m", "60m", "240m", "1d", "5m"];
    let mut fixtures = vec![Vec::new()];
    for n in 1..40usize {
        let points = (0..n)
            .map(|i| {
                signal(
                    assets[(i * 7 + n) % assets.len()],
                    timeframes[(i * 5 + n * 3) % timeframes.len()],
                    ((i + n) % 3) as i64 - 1,
                    (i * 13 % 17) as i64,
                )
            })
            .collect();
        fixtures.push(points);
    }
    fixtures
}

#[test]
fn test_grid_assets_are_distinct_sorted_inputs() {
    for points in grid_fixtures() {
        let matrix = build_grid(&points);

        let mut expected: Vec<String> = points.iter().map(|p| p.asset.clone()).collect();
        expected.sort();
        expected.dedup();
        assert_eq!(matrix.assets, expected);
    }
}

#[test]
fn test_grid_cells_come_from_matching_points() {
    for points in grid_fixtures() {
        let matrix = build_grid(&points);

        for asset in &matrix.assets {
            for timeframe in Timeframe::ALL {
                let cell = matrix.cell(asset, timeframe);
                let first = points
                    .iter()
                    .find(|p| &p.asset == asset && p.timeframe() == Some(timeframe));
                match first {
                    Some(point) => assert_eq!(cell, point.signal_value),
                    None => assert_eq!(cell, SignalValue::Wait),
                }
            }
        }
    }
}

#[test]
fn test_history_scenario_long_win_short_loss() {
    let records = vec![
        trade(Direction::Buy, 100.0, 110.0, Outcome::Win),
        trade(Direction::Sell, 50.0, 55.0, Outcome::Loss),
    ];
    let summary = accumulate(&records);

    assert_eq!(summary.accuracy_percent, 50.0);
    assert_eq!(summary.cumulative_pnl_percent, 0.0);
    assert_eq!(summary.records[0].pnl_percent, Some(10.0));
    assert_eq!(summary.records[1].pnl_percent, Some(-10.0));
}

#[test]
fn test_history_accuracy_bounds() {
    let outcomes = [Outcome::Win, Outcome::Loss, Outcome::Pending];
    for n in 0..30usize {
        let records: Vec<HistoricalTradeRecord> = (0..n)
            .map(|i| {
                trade(
                    if i % 2 == 0 { Direction::Buy } else { Direction::Sell },
                    100.0,
                    100.0 + (i as f64 - 10.0),
                    outcomes[(i * 5 + n) % 3],
                )
            })
            .collect();
        let summary = accumulate(&records);

        assert!((0.0..=100.0).contains(&summary.accuracy_percent));
        assert!(summary.win_count + summary.loss_count <= records.len());
        assert_eq!(
            summary.win_count + summary.loss_count + summary.pending_count,
            summary.total_count
        );
    }
}

#[test]
fn test_live_flat_only_is_no_data() {
    let records = vec![live(Direction::Flat, 3.0), live(Direction::Flat, -1.0)];
    assert!(summarize(&records).is_none());
}

#[test]
fn test_fee_is_linear_in_fee() {
    let records = vec![
        live(Direction::Buy, 1.25),
        live(Direction::Sell, -0.4),
        live(Direction::Flat, 7.0),
        live(Direction::Buy, 0.9),
    ];
    let non_flat = records.iter().filter(|r| !r.is_flat()).count() as f64;
    let base = apply_fee(&records, 0.0);

    for fee in [-1.0, -0.05, 0.0, 0.04, 0.1, 0.25, 1.5] {
        let expected = base - non_flat * fee;
        assert!(
            (apply_fee(&records, fee) - expected).abs() < 0.011,
            "fee {} gave {} expected {}",
            fee,
            apply_fee(&records, fee),
            expected
        );
    }
}

#[test]
fn test_equity_curve_scenario() {
    let point = |t: i64, v: f64| EquityPoint { time: ts(t), value: v };
    let curve = build_curve(&[point(1, -5.0), point(3, 10.0), point(2, 3.0)]);
    assert_eq!(curve, vec![point(1, -5.0), point(2, 3.0), point(3, 10.0)]);
}
