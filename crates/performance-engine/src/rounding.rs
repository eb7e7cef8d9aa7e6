use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Round a percentage for presentation, midpoint away from zero.
///
/// The decimal result is parsed back rather than converted arithmetically so
/// `2.8` comes back as the nearest `f64` to 2.8. Values that do not fit a
/// `Decimal` (non-finite or out of range) are returned unchanged. Negative
/// zero is normalised to `0.0`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let rounded = Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_string().parse::<f64>().ok())
        .unwrap_or(value);
    rounded + 0.0
}
