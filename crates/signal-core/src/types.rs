use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::CoreError;
use crate::numeric::{lenient_f64, null_as_default};

/// Timeframes shown on the signal matrix, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "60m")]
    Min60,
    #[serde(rename = "240m")]
    Min240,
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::Min15,
        Timeframe::Min30,
        Timeframe::Min60,
        Timeframe::Min240,
        Timeframe::Day1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Min15 => "15m",
            Timeframe::Min30 => "30m",
            Timeframe::Min60 => "60m",
            Timeframe::Min240 => "240m",
            Timeframe::Day1 => "1d",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    /// Exact wire labels only: `"1h"` is not `"60m"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTimeframe(s.to_string()))
    }
}

/// Model output for one cell: -1 (SELL), 0 (WAIT) or 1 (BUY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i8")]
pub enum SignalValue {
    Sell,
    #[default]
    Wait,
    Buy,
}

impl SignalValue {
    pub fn as_i8(&self) -> i8 {
        match self {
            SignalValue::Sell => -1,
            SignalValue::Wait => 0,
            SignalValue::Buy => 1,
        }
    }
}

impl TryFrom<i64> for SignalValue {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(SignalValue::Sell),
            0 => Ok(SignalValue::Wait),
            1 => Ok(SignalValue::Buy),
            other => Err(CoreError::InvalidSignalValue(other)),
        }
    }
}

impl From<SignalValue> for i8 {
    fn from(value: SignalValue) -> Self {
        value.as_i8()
    }
}

/// One model output for one asset at one timeframe.
///
/// `timeframe` is kept as the raw upstream string: points on timeframes
/// outside [`Timeframe::ALL`] are valid data, they just never land on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub asset: String,
    pub timeframe: String,
    pub signal_value: SignalValue,
    pub generated_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl SignalPoint {
    pub fn timeframe(&self) -> Option<Timeframe> {
        self.timeframe.parse().ok()
    }
}

/// Trade direction. Upstream sends either `"BUY"`/`"SELL"` or a signed
/// integer; anything unrecognised is treated as flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    #[default]
    Flat,
}

impl Direction {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => match s.trim().to_uppercase().as_str() {
                "BUY" | "LONG" | "1" => Direction::Buy,
                "SELL" | "SHORT" | "-1" => Direction::Sell,
                _ => Direction::Flat,
            },
            Value::Number(n) => match n.as_f64() {
                Some(v) if v > 0.0 => Direction::Buy,
                Some(v) if v < 0.0 => Direction::Sell,
                _ => Direction::Flat,
            },
            _ => Direction::Flat,
        }
    }

    pub fn is_flat(&self) -> bool {
        *self == Direction::Flat
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Direction::from_value(&value))
    }
}

/// Resolution state of a historical signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    #[serde(alias = "win", alias = "Win")]
    Win,
    #[serde(alias = "loss", alias = "Loss")]
    Loss,
    #[default]
    #[serde(other)]
    Pending,
}

/// A resolved or pending signal outcome as recorded by the signal service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTradeRecord {
    pub time: DateTime<Utc>,
    pub asset: String,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exit_price: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outcome: Outcome,
}

/// One real-time directional call from the live model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePredictionRecord {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub predicted_direction: Direction,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pnl_percent: Option<f64>,
}

impl LivePredictionRecord {
    /// Flat calls are excluded from every performance statistic.
    pub fn is_flat(&self) -> bool {
        self.predicted_direction.is_flat()
    }
}

/// Aggregate strategy statistics published by the signal service
/// (backtest window or recent out-of-sample validation window).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    #[serde(default)]
    pub total_trades: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub win_rate_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_return_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_drawdown_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sharpe_ratio: Option<f64>,
    #[serde(default)]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
}

/// The latest model call for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSignal {
    pub asset: String,
    pub timeframe: String,
    pub signal_value: SignalValue,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

/// Whether the signal service has finished bootstrapping a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStatus {
    pub symbol: String,
    #[serde(default)]
    pub initialized: bool,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A single `{time, value}` sample on an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeframe_order_and_parse() {
        let mut shuffled = vec![Timeframe::Day1, Timeframe::Min15, Timeframe::Min240, Timeframe::Min30];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Timeframe::Min15, Timeframe::Min30, Timeframe::Min240, Timeframe::Day1]
        );
        assert_eq!("240m".parse::<Timeframe>(), Ok(Timeframe::Min240));
        assert_eq!("60m".parse::<Timeframe>(), Ok(Timeframe::Min60));
        assert!("5m".parse::<Timeframe>().is_err());
        assert!("1h".parse::<Timeframe>().is_err());
        assert!("4h".parse::<Timeframe>().is_err());
        assert!("1D".parse::<Timeframe>().is_err());
        assert!(" 60m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_signal_value_serde() {
        let v: SignalValue = serde_json::from_value(json!(-1)).unwrap();
        assert_eq!(v, SignalValue::Sell);
        assert_eq!(serde_json::to_value(SignalValue::Buy).unwrap(), json!(1));
        assert!(serde_json::from_value::<SignalValue>(json!(2)).is_err());
    }

    #[test]
    fn test_direction_from_strings_and_numbers() {
        let parsed: Vec<Direction> =
            serde_json::from_value(json!(["BUY", "sell", 1, -1, 0, "hold", null])).unwrap();
        assert_eq!(
            parsed,
            vec![
                Direction::Buy,
                Direction::Sell,
                Direction::Buy,
                Direction::Sell,
                Direction::Flat,
                Direction::Flat,
                Direction::Flat,
            ]
        );
    }

    #[test]
    fn test_historical_record_lenient_fields() {
        let record: HistoricalTradeRecord = serde_json::from_value(json!({
            "time": "2024-03-01T12:00:00Z",
            "asset": "BTCUSDT",
            "timeframe": "60m",
            "direction": "BUY",
            "entry_price": "100.5",
            "exit_price": null,
            "outcome": null
        }))
        .unwrap();

        assert_eq!(record.entry_price, Some(100.5));
        assert_eq!(record.exit_price, None);
        assert_eq!(record.outcome, Outcome::Pending);
    }

    #[test]
    fn test_outcome_unknown_is_pending() {
        let outcomes: Vec<Outcome> =
            serde_json::from_value(json!(["WIN", "loss", "PENDING", "VOID"])).unwrap();
        assert_eq!(
            outcomes,
            vec![Outcome::Win, Outcome::Loss, Outcome::Pending, Outcome::Pending]
        );
    }

    #[test]
    fn test_signal_point_requires_timestamps() {
        let missing = serde_json::from_value::<SignalPoint>(json!({
            "asset": "ETHUSDT",
            "timeframe": "15m",
            "signal_value": 1
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_live_record_flat() {
        let record: LivePredictionRecord = serde_json::from_value(json!({
            "time": "2024-03-01T12:00:00Z",
            "predicted_direction": 0,
            "pnl_percent": 1.2
        }))
        .unwrap();
        assert!(record.is_flat());
    }
}
