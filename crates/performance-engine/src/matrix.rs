use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use signal_core::{SignalPoint, SignalValue, Timeframe};

/// Dense asset × timeframe view of the current signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMatrix {
    /// Distinct assets, sorted lexicographically.
    pub assets: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub grid: BTreeMap<String, BTreeMap<Timeframe, SignalValue>>,
    /// Most recent `last_updated_at` among the points that filled a cell.
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl SignalMatrix {
    /// Value for one cell, WAIT when the asset or cell is absent.
    pub fn cell(&self, asset: &str, timeframe: Timeframe) -> SignalValue {
        self.grid
            .get(asset)
            .and_then(|row| row.get(&timeframe))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Reshape a flat snapshot of signal points into a grid over [`Timeframe::ALL`].
///
/// When several points share an (asset, timeframe) cell the first one in
/// input order wins. Points on timeframes outside the fixed set still
/// contribute their asset as a row, but never a cell value.
pub fn build_grid(points: &[SignalPoint]) -> SignalMatrix {
    let mut assets: BTreeSet<&str> = BTreeSet::new();
    let mut cells: HashMap<(&str, Timeframe), &SignalPoint> = HashMap::new();

    for point in points {
        assets.insert(point.asset.as_str());
        if let Some(timeframe) = point.timeframe() {
            cells.entry((point.asset.as_str(), timeframe)).or_insert(point);
        }
    }

    let mut grid = BTreeMap::new();
    let mut last_updated_at: Option<DateTime<Utc>> = None;

    for asset in &assets {
        let mut row = BTreeMap::new();
        for timeframe in Timeframe::ALL {
            let value = match cells.get(&(*asset, timeframe)) {
                Some(point) => {
                    last_updated_at = last_updated_at.max(Some(point.last_updated_at));
                    point.signal_value
                }
                None => SignalValue::Wait,
            };
            row.insert(timeframe, value);
        }
        grid.insert(asset.to_string(), row);
    }

    SignalMatrix {
        assets: assets.into_iter().map(str::to_string).collect(),
        timeframes: Timeframe::ALL.to_vec(),
        grid,
        last_updated_at,
    }
}
