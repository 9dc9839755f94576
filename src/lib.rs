//! Glucose statistics and insulin bolus calculation
//!
//! Pure, stateless computations over caller-supplied readings and patient
//! parameters:
//!
//! - [`units`]: mg/dL and mmol/L conversion
//! - [`classify`]: clinical status band of a single value
//! - [`stats`]: mean, median, SD, CV, time-in-range and estimated A1C
//! - [`bolus`]: meal and correction dose with safety warnings
//!
//! Every function may be called concurrently; nothing here holds state.

pub mod bolus;
pub mod classify;
pub mod config;
pub mod error;
pub mod reading;
pub mod stats;
pub mod units;

pub use bolus::{calculate_bolus, BolusCalculationResult, BolusWarning, PatientParameters, WarningKind};
pub use classify::{classify, classify_value, GlucoseStatus};
pub use error::{GlucoCalcError, Result};
pub use reading::Reading;
pub use stats::{GlycemicSummary, TimeInRange};
pub use units::{convert, Glucose, GlucoseUnit, TargetRange};
