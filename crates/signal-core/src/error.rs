use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid signal value: {0} (expected -1, 0 or 1)")]
    InvalidSignalValue(i64),

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),
}
