//! Recorded glucose readings

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GlucoCalcError, Result};
use crate::units::{Glucose, GlucoseUnit};

/// Trailing window used when the caller has no preference
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// A single glucose reading. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawReading")]
pub struct Reading {
    value: f64,
    unit: GlucoseUnit,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insulin_dose: Option<f64>,
}

/// Unvalidated wire shape
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReading {
    value: f64,
    #[serde(default)]
    unit: GlucoseUnit,
    timestamp: DateTime<Utc>,
    insulin_dose: Option<f64>,
}

impl TryFrom<RawReading> for Reading {
    type Error = GlucoCalcError;

    fn try_from(raw: RawReading) -> Result<Self> {
        let reading = Reading::new(raw.value, raw.unit, raw.timestamp)?;
        match raw.insulin_dose {
            Some(dose) => reading.with_insulin_dose(dose),
            None => Ok(reading),
        }
    }
}

impl Reading {
    /// Record a reading; the value must be positive and finite
    pub fn new(value: f64, unit: GlucoseUnit, timestamp: DateTime<Utc>) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(GlucoCalcError::InvalidInput(format!(
                "glucose reading must be positive and finite, got {}",
                value
            )));
        }
        Glucose::new(value, unit).checked_mg_dl()?;
        Ok(Self { value, unit, timestamp, insulin_dose: None })
    }

    /// Attach the insulin units taken alongside this reading
    pub fn with_insulin_dose(mut self, units: f64) -> Result<Self> {
        self.insulin_dose = Some(ensure_non_negative("insulin dose", units)?);
        Ok(self)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> GlucoseUnit {
        self.unit
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn insulin_dose(&self) -> Option<f64> {
        self.insulin_dose
    }

    pub fn glucose(&self) -> Glucose {
        Glucose::new(self.value, self.unit)
    }

    /// Value normalized to mg/dL
    pub fn mg_dl(&self) -> f64 {
        self.glucose().as_mg_dl()
    }
}

/// Earliest instant of `[now - window, now]`, or `None` when the window
/// reaches past the earliest representable time
pub fn window_start(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(window)
}

/// Readings taken in `[now - window, now]`, oldest first. A window too large
/// to represent has no lower bound.
pub fn within_window(readings: &[Reading], now: DateTime<Utc>, window: Duration) -> Vec<&Reading> {
    let start = window_start(now, window);
    let mut selected: Vec<&Reading> = readings
        .iter()
        .filter(|r| start.map_or(true, |start| r.timestamp >= start) && r.timestamp <= now)
        .collect();
    selected.sort_by_key(|r| r.timestamp);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_values() {
        assert!(Reading::new(0.0, GlucoseUnit::MgDl, at(1, 8)).is_err());
        assert!(Reading::new(-5.0, GlucoseUnit::MgDl, at(1, 8)).is_err());
        assert!(Reading::new(f64::NAN, GlucoseUnit::MgDl, at(1, 8)).is_err());
        assert!(Reading::new(f64::INFINITY, GlucoseUnit::MmolL, at(1, 8)).is_err());
    }

    #[test]
    fn test_insulin_dose_validation() {
        let reading = Reading::new(120.0, GlucoseUnit::MgDl, at(1, 8)).unwrap();
        assert!(reading.clone().with_insulin_dose(-1.0).is_err());
        let dosed = reading.with_insulin_dose(4.5).unwrap();
        assert_eq!(dosed.insulin_dose(), Some(4.5));
    }

    #[test]
    fn test_mmol_reading_normalizes() {
        let reading = Reading::new(10.0, GlucoseUnit::MmolL, at(1, 8)).unwrap();
        assert!((reading.mg_dl() - 180.182).abs() < 1e-9);
    }

    #[test]
    fn test_window_selection() {
        let readings = vec![
            Reading::new(110.0, GlucoseUnit::MgDl, at(20, 8)).unwrap(),
            Reading::new(100.0, GlucoseUnit::MgDl, at(2, 8)).unwrap(),
            Reading::new(140.0, GlucoseUnit::MgDl, at(15, 8)).unwrap(),
            Reading::new(160.0, GlucoseUnit::MgDl, at(25, 8)).unwrap(),
        ];
        let selected = within_window(&readings, at(21, 0), Duration::days(7));
        let values: Vec<f64> = selected.iter().map(|r| r.value()).collect();
        assert_eq!(values, vec![140.0, 110.0]);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = at(21, 8);
        let readings = vec![
            Reading::new(100.0, GlucoseUnit::MgDl, at(14, 8)).unwrap(),
            Reading::new(101.0, GlucoseUnit::MgDl, at(14, 8) - Duration::seconds(1)).unwrap(),
            Reading::new(102.0, GlucoseUnit::MgDl, now).unwrap(),
            Reading::new(103.0, GlucoseUnit::MgDl, now + Duration::seconds(1)).unwrap(),
        ];
        let selected = within_window(&readings, now, Duration::days(7));
        let values: Vec<f64> = selected.iter().map(|r| r.value()).collect();
        assert_eq!(values, vec![100.0, 102.0]);
    }

    #[test]
    fn test_unbounded_window_does_not_overflow() {
        let readings = vec![
            Reading::new(100.0, GlucoseUnit::MgDl, at(2, 8)).unwrap(),
            Reading::new(110.0, GlucoseUnit::MgDl, at(20, 8)).unwrap(),
        ];
        let window = Duration::days(1_000_000_000);
        assert!(window_start(at(21, 0), window).is_none());
        assert_eq!(within_window(&readings, at(21, 0), window).len(), 2);
        assert_eq!(within_window(&readings, at(21, 0), Duration::MAX).len(), 2);
    }

    #[test]
    fn test_rejects_overflowing_mmol() {
        assert!(Reading::new(f64::MAX, GlucoseUnit::MmolL, at(1, 8)).is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"value": 5.4, "unit": "mmol/L", "timestamp": "2024-03-01T08:00:00Z", "insulinDose": 2.0}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.unit(), GlucoseUnit::MmolL);
        assert_eq!(reading.insulin_dose(), Some(2.0));

        let bad = r#"{"value": -1, "unit": "mg/dL", "timestamp": "2024-03-01T08:00:00Z"}"#;
        assert!(serde_json::from_str::<Reading>(bad).is_err());

        let out = serde_json::to_value(Reading::new(99.0, GlucoseUnit::MgDl, at(1, 8)).unwrap()).unwrap();
        assert_eq!(out["unit"], "mg/dL");
        assert!(out.get("insulinDose").is_none());
    }
}
