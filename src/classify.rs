//! Clinical status bands for a single glucose value
//!
//! Thresholds follow the ADA hypoglycemia levels and the international
//! Time-in-Range consensus. They are fixed; changing them is a clinical
//! decision, not a configuration one.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::{Glucose, GlucoseUnit};

/// Level 2 hypoglycemia, below this is critical-low
pub const CRITICAL_LOW_MGDL: f64 = 54.0;
/// Level 1 hypoglycemia, below this is low
pub const LOW_MGDL: f64 = 70.0;
/// From here up is high
pub const HIGH_MGDL: f64 = 180.0;
/// Above this is critical-high
pub const CRITICAL_HIGH_MGDL: f64 = 250.0;

/// Classification of a glucose value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlucoseStatus {
    CriticalLow,  // < 54 mg/dL
    Low,          // 54 to < 70
    Normal,       // 70 to < 180
    High,         // 180 to 250
    CriticalHigh, // > 250 mg/dL
}

impl GlucoseStatus {
    /// Get a display label for the status
    pub fn label(self) -> &'static str {
        match self {
            GlucoseStatus::CriticalLow => "Critical Low",
            GlucoseStatus::Low => "Low",
            GlucoseStatus::Normal => "Normal",
            GlucoseStatus::High => "High",
            GlucoseStatus::CriticalHigh => "Critical High",
        }
    }

    /// Get a short status text
    pub fn status(self) -> &'static str {
        match self {
            GlucoseStatus::CriticalLow => "CRITICAL LOW",
            GlucoseStatus::Low => "LOW",
            GlucoseStatus::Normal => "OK",
            GlucoseStatus::High => "HIGH",
            GlucoseStatus::CriticalHigh => "CRITICAL HIGH",
        }
    }

    pub fn is_hypoglycemic(self) -> bool {
        matches!(self, GlucoseStatus::CriticalLow | GlucoseStatus::Low)
    }

    pub fn is_hyperglycemic(self) -> bool {
        matches!(self, GlucoseStatus::High | GlucoseStatus::CriticalHigh)
    }
}

/// Classify a glucose value. Order matters: first match wins.
///
/// Negative or non-finite values are rejected rather than falling through
/// to a band.
pub fn classify(glucose: Glucose) -> Result<GlucoseStatus> {
    let mgdl = glucose.checked_mg_dl()?;
    let status = if mgdl < CRITICAL_LOW_MGDL {
        GlucoseStatus::CriticalLow
    } else if mgdl < LOW_MGDL {
        GlucoseStatus::Low
    } else if mgdl > CRITICAL_HIGH_MGDL {
        GlucoseStatus::CriticalHigh
    } else if mgdl >= HIGH_MGDL {
        GlucoseStatus::High
    } else {
        GlucoseStatus::Normal
    };
    Ok(status)
}

pub fn classify_value(value: f64, unit: GlucoseUnit) -> Result<GlucoseStatus> {
    classify(Glucose::new(value, unit))
}
