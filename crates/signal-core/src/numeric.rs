//! Lenient decoding for numeric fields coming from the signal service.
//!
//! Prices and PnL values arrive as numbers, numeric strings or `null`
//! depending on how far a record has progressed. Anything that is not a
//! finite number decodes to `None` so the accounting code can treat it as
//! a neutral value instead of rejecting the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a JSON value into a finite `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// `deserialize_with` helper for optional numeric fields.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

/// `deserialize_with` helper that maps an explicit `null` to `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_numbers_and_strings() {
        assert_eq!(coerce_f64(&json!(101.5)), Some(101.5));
        assert_eq!(coerce_f64(&json!(" 42.25 ")), Some(42.25));
        assert_eq!(coerce_f64(&json!(7)), Some(7.0));
    }

    #[test]
    fn test_coerce_rejects_non_numeric() {
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!("n/a")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!("inf")), None);
        assert_eq!(coerce_f64(&json!([1.0])), None);
        assert_eq!(coerce_f64(&json!(true)), None);
    }
}
