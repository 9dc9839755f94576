//! Meal and correction bolus calculation with safety guards
//!
//! The dose is `carbs / carbRatio` plus, only when glucose is above target,
//! `(glucose - target) / correctionFactor`, rounded to 0.1 U. There is no
//! insulin-on-board term. Safety guards are advisory: they add warnings but
//! never change the recommended dose.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GlucoCalcError, Result};
use crate::units::{Glucose, TargetRange};

/// Per-patient dosing settings, all glucose values in mg/dL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientParameters {
    /// Grams of carbohydrate covered by one unit (ICR)
    pub carb_ratio: f64,
    /// mg/dL drop per unit (ISF)
    pub correction_factor: f64,
    pub target_glucose: f64,
    pub target_range: TargetRange,
    /// Units above which a maxDose warning is raised
    pub max_bolus: f64,
    pub low_glucose_threshold: f64,
}

impl Default for PatientParameters {
    fn default() -> Self {
        Self {
            carb_ratio: 15.0,
            correction_factor: 50.0,
            target_glucose: 120.0,
            target_range: TargetRange::default(),
            max_bolus: 15.0,
            low_glucose_threshold: 70.0,
        }
    }
}

fn ensure_divisor(name: &'static str, value: f64) -> Result<()> {
    ensure_non_negative(name, value)?;
    if value == 0.0 {
        return Err(GlucoCalcError::DivisionByZero(name));
    }
    Ok(())
}

impl PatientParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_divisor("carb ratio", self.carb_ratio)?;
        ensure_divisor("correction factor", self.correction_factor)?;
        ensure_non_negative("target glucose", self.target_glucose)?;
        ensure_non_negative("max bolus", self.max_bolus)?;
        ensure_non_negative("low glucose threshold", self.low_glucose_threshold)?;
        self.target_range.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    MaxDose,
    LowGlucose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BolusWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BolusCalculationResult {
    pub carb_grams: f64,
    /// mg/dL
    pub current_glucose: f64,
    pub target_glucose: f64,
    pub carb_ratio: f64,
    pub correction_factor: f64,
    pub meal_bolus: f64,
    pub correction_bolus: f64,
    /// Units, rounded to one decimal
    pub recommended_insulin: f64,
    pub warnings: Vec<BolusWarning>,
}

impl BolusCalculationResult {
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Recommend a bolus for a meal at the given current glucose
pub fn calculate_bolus(
    carb_grams: f64,
    current: Glucose,
    params: &PatientParameters,
) -> Result<BolusCalculationResult> {
    ensure_non_negative("carbohydrate grams", carb_grams)?;
    let current_glucose = current.checked_mg_dl()?;
    params.validate()?;

    let meal_bolus = carb_grams / params.carb_ratio;
    let glucose_diff = current_glucose - params.target_glucose;
    let correction_bolus = if glucose_diff > 0.0 {
        glucose_diff / params.correction_factor
    } else {
        0.0
    };
    let total_bolus = (meal_bolus + correction_bolus).max(0.0);
    let recommended_insulin = (total_bolus * 10.0).round() / 10.0;

    debug!(
        "Bolus for {}g at {:.0} mg/dL: meal {:.3} U + correction {:.3} U = {:.1} U",
        carb_grams, current_glucose, meal_bolus, correction_bolus, recommended_insulin
    );

    let mut warnings = Vec::new();

    if recommended_insulin > params.max_bolus {
        warn!("Recommended {:.1} U exceeds max bolus {:.1} U", recommended_insulin, params.max_bolus);
        warnings.push(BolusWarning {
            kind: WarningKind::MaxDose,
            message: format!(
                "Recommended dose of {:.1} U exceeds the maximum bolus of {:.1} U",
                recommended_insulin, params.max_bolus
            ),
        });
    }

    if current_glucose < params.low_glucose_threshold {
        warn!("Bolus requested at low glucose {:.0} mg/dL", current_glucose);
        warnings.push(BolusWarning {
            kind: WarningKind::LowGlucose,
            message: format!(
                "Current glucose {:.0} mg/dL is below {:.0} mg/dL; treat the low before taking insulin",
                current_glucose, params.low_glucose_threshold
            ),
        });
    }

    Ok(BolusCalculationResult {
        carb_grams,
        current_glucose,
        target_glucose: params.target_glucose,
        carb_ratio: params.carb_ratio,
        correction_factor: params.correction_factor,
        meal_bolus,
        correction_bolus,
        recommended_insulin,
        warnings,
    })
}
