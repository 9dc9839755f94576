//! Error types for glucose calculations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoCalcError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Division by zero: {0} must not be zero")]
    DivisionByZero(&'static str),

    #[error("No readings to compute statistics from")]
    EmptyInput,

    #[error("Unknown glucose unit: {0}")]
    UnknownUnit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GlucoCalcError>;

/// Reject NaN/infinite and negative values
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(GlucoCalcError::InvalidInput(format!("{} must be finite, got {}", name, value)));
    }
    if value < 0.0 {
        return Err(GlucoCalcError::InvalidInput(format!("{} must not be negative, got {}", name, value)));
    }
    Ok(value)
}
