//! Glucose unit types, conversion and formatting
//!
//! All engine arithmetic happens in mg/dL. Values entered in mmol/L are
//! normalized with [`convert`] before they reach the classifier, statistics
//! or bolus code. Nothing in here rounds; rounding is left to the `format*`
//! helpers used for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GlucoCalcError, Result};

/// mg/dL per mmol/L for glucose (molar mass 180.16 g/mol)
pub const MGDL_PER_MMOL: f64 = 18.0182;

/// Unit a glucose magnitude is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    /// Get the unit label
    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Format a value in this unit without suffix
    pub fn format_value(self, value: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0}", value),
            GlucoseUnit::MmolL => format!("{:.1}", value),
        }
    }

    /// Format a value in this unit with suffix
    pub fn format(self, value: f64) -> String {
        format!("{} {}", self.format_value(value), self.label())
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GlucoseUnit {
    type Err = GlucoCalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" | "mg" => Ok(GlucoseUnit::MgDl),
            "mmol/l" | "mmoll" | "mmol" => Ok(GlucoseUnit::MmolL),
            _ => Err(GlucoCalcError::UnknownUnit(s.to_string())),
        }
    }
}

/// Convert a glucose magnitude between units.
///
/// Returns `value` untouched when `from == to`. Any number is accepted;
/// plausibility checks belong to the callers that need them.
pub fn convert(value: f64, from: GlucoseUnit, to: GlucoseUnit) -> f64 {
    match (from, to) {
        (GlucoseUnit::MgDl, GlucoseUnit::MmolL) => value / MGDL_PER_MMOL,
        (GlucoseUnit::MmolL, GlucoseUnit::MgDl) => value * MGDL_PER_MMOL,
        _ => value,
    }
}

/// A glucose magnitude tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glucose {
    pub value: f64,
    pub unit: GlucoseUnit,
}

impl Glucose {
    pub fn new(value: f64, unit: GlucoseUnit) -> Self {
        Self { value, unit }
    }

    pub fn mg_dl(value: f64) -> Self {
        Self::new(value, GlucoseUnit::MgDl)
    }

    pub fn mmol_l(value: f64) -> Self {
        Self::new(value, GlucoseUnit::MmolL)
    }

    /// Magnitude in mg/dL
    pub fn as_mg_dl(self) -> f64 {
        convert(self.value, self.unit, GlucoseUnit::MgDl)
    }

    /// Magnitude in mg/dL, rejecting values that are negative or non-finite
    /// either as given or after conversion
    pub fn checked_mg_dl(self) -> Result<f64> {
        ensure_non_negative("glucose", self.value)?;
        let mgdl = self.as_mg_dl();
        if !mgdl.is_finite() {
            return Err(GlucoCalcError::InvalidInput(format!(
                "glucose {} {} overflows when converted to mg/dL",
                self.value, self.unit
            )));
        }
        Ok(mgdl)
    }

    /// Magnitude in mmol/L
    pub fn as_mmol_l(self) -> f64 {
        convert(self.value, self.unit, GlucoseUnit::MmolL)
    }

    /// Same quantity expressed in `unit`
    pub fn to_unit(self, unit: GlucoseUnit) -> Self {
        Self::new(convert(self.value, self.unit, unit), unit)
    }

    /// Format the value with unit suffix
    pub fn format(self) -> String {
        self.unit.format(self.value)
    }
}

impl fmt::Display for Glucose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Target glucose band in mg/dL, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TargetRange {
    fn default() -> Self {
        Self { min: 70.0, max: 180.0 }
    }
}

impl TargetRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min <= 0.0 {
            return Err(GlucoCalcError::InvalidInput(format!(
                "target range bounds must be positive and finite, got {}-{}",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(GlucoCalcError::InvalidInput(format!(
                "target range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, mg_dl: f64) -> bool {
        self.min <= mg_dl && mg_dl <= self.max
    }

    /// Get range display string for the user's unit
    pub fn format_range(&self, unit: GlucoseUnit) -> String {
        format!(
            "{}-{} {}",
            unit.format_value(convert(self.min, GlucoseUnit::MgDl, unit)),
            unit.format_value(convert(self.max, GlucoseUnit::MgDl, unit)),
            unit.label()
        )
    }
}
