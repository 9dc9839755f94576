//! Statistics calculations for glucose readings
//!
//! Everything here works on mg/dL magnitudes; readings recorded in mmol/L are
//! normalized first. Results are never rounded. Display rounding is:
//! percentages to whole numbers (half-up), eA1C and mmol/L to one decimal,
//! mg/dL to none.
//!
//! Mean, median and standard deviation have no meaning for an empty set and
//! fail with [`GlucoCalcError::EmptyInput`] instead of returning 0 or NaN.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::classify::{classify_value, GlucoseStatus};
use crate::error::{GlucoCalcError, Result};
use crate::reading::{window_start, within_window, Reading};
use crate::units::{Glucose, GlucoseUnit, TargetRange};

/// CV at or below this is considered stable glycemia
pub const STABLE_CV_PERCENT: f64 = 36.0;

/// ADAG regression: eA1C(%) = (average mg/dL + 46.7) / 28.7
const A1C_INTERCEPT: f64 = 46.7;
const A1C_SLOPE: f64 = 28.7;

fn check_finite(values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        Some(bad) => Err(GlucoCalcError::InvalidInput(format!("invalid glucose value {}", bad))),
        None => Ok(()),
    }
}

fn check_values(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(GlucoCalcError::EmptyInput);
    }
    check_finite(values)
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    check_values(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of values already sorted ascending
pub fn median(sorted_values: &[f64]) -> Result<f64> {
    check_values(sorted_values)?;
    let n = sorted_values.len();
    let mid = n / 2;
    if n % 2 == 0 {
        Ok((sorted_values[mid - 1] + sorted_values[mid]) / 2.0)
    } else {
        Ok(sorted_values[mid])
    }
}

/// Population standard deviation (divides by n, not n - 1)
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    let variance = values.iter()
        .map(|&v| (v - mean).powi(2))
        .sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Coefficient of variation as a percentage
pub fn coefficient_of_variation(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    if mean == 0.0 {
        return Err(GlucoCalcError::DivisionByZero("mean glucose"));
    }
    Ok(std_dev(values)? / mean * 100.0)
}

/// Estimated A1C (%) from an average glucose. Not clamped.
pub fn estimated_a1c(average: Glucose) -> f64 {
    (average.as_mg_dl() + A1C_INTERCEPT) / A1C_SLOPE
}

/// Copy of `values` sorted ascending, ready for [`median`] and [`percentile`]
pub fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Nearest-rank percentile from sorted values
pub fn percentile(sorted_values: &[f64], pct: f64) -> Result<f64> {
    check_values(sorted_values)?;
    let idx = ((sorted_values.len() as f64 - 1.0) * pct.clamp(0.0, 100.0) / 100.0).round() as usize;
    Ok(sorted_values[idx.min(sorted_values.len() - 1)])
}

fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Whole-number percentages for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedPercentages {
    pub below: u32,
    pub in_range: u32,
    pub above: u32,
}

/// Readings per clinical band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub critical_low: usize,
    pub low: usize,
    pub normal: usize,
    pub high: usize,
    pub critical_high: usize,
}

/// Time-in-range statistics against the patient's target range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInRange {
    pub total: usize,
    pub below: usize,
    pub in_range: usize,
    pub above: usize,
    pub bands: BandCounts,
}

impl TimeInRange {
    /// Count mg/dL values below, inside and above `range`. An empty set
    /// yields zero counts; a negative or non-finite value is an error.
    pub fn from_values(values: &[f64], range: TargetRange) -> Result<Self> {
        check_finite(values)?;
        let mut tir = Self {
            total: values.len(),
            below: 0,
            in_range: 0,
            above: 0,
            bands: BandCounts::default(),
        };

        for &v in values {
            if v < range.min {
                tir.below += 1;
            } else if v > range.max {
                tir.above += 1;
            } else {
                tir.in_range += 1;
            }

            match classify_value(v, GlucoseUnit::MgDl)? {
                GlucoseStatus::CriticalLow => tir.bands.critical_low += 1,
                GlucoseStatus::Low => tir.bands.low += 1,
                GlucoseStatus::Normal => tir.bands.normal += 1,
                GlucoseStatus::High => tir.bands.high += 1,
                GlucoseStatus::CriticalHigh => tir.bands.critical_high += 1,
            }
        }

        Ok(tir)
    }

    pub fn below_percent(&self) -> f64 {
        percent_of(self.below, self.total)
    }

    pub fn in_range_percent(&self) -> f64 {
        percent_of(self.in_range, self.total)
    }

    pub fn above_percent(&self) -> f64 {
        percent_of(self.above, self.total)
    }

    /// Percentage of readings in a clinical band
    pub fn band_percent(&self, status: GlucoseStatus) -> f64 {
        let count = match status {
            GlucoseStatus::CriticalLow => self.bands.critical_low,
            GlucoseStatus::Low => self.bands.low,
            GlucoseStatus::Normal => self.bands.normal,
            GlucoseStatus::High => self.bands.high,
            GlucoseStatus::CriticalHigh => self.bands.critical_high,
        };
        percent_of(count, self.total)
    }

    /// Rounded half-up independently, so the three may not sum to 100
    pub fn rounded(&self) -> RoundedPercentages {
        RoundedPercentages {
            below: self.below_percent().round() as u32,
            in_range: self.in_range_percent().round() as u32,
            above: self.above_percent().round() as u32,
        }
    }
}

/// Aggregate metrics over a trailing window of readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlycemicSummary {
    /// `None` when the window has no lower bound
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: DateTime<Utc>,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub time_in_range: TimeInRange,
    pub estimated_a1c: f64,
}

impl GlycemicSummary {
    /// Summarize readings in `[now - window, now]`
    pub fn generate(
        readings: &[Reading],
        range: TargetRange,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Self> {
        range.validate()?;
        let selected = within_window(readings, now, window);
        debug!(
            "Summarizing {} of {} readings over {} days",
            selected.len(),
            readings.len(),
            window.num_days()
        );

        let values: Vec<f64> = selected.iter().map(|r| r.mg_dl()).collect();
        let sorted = sorted_values(&values);
        let mean = mean(&values)?;

        Ok(Self {
            window_start: window_start(now, window),
            window_end: now,
            count: values.len(),
            mean,
            median: median(&sorted)?,
            std_dev: std_dev(&values)?,
            cv: coefficient_of_variation(&values)?,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            q1: percentile(&sorted, 25.0)?,
            q3: percentile(&sorted, 75.0)?,
            time_in_range: TimeInRange::from_values(&values, range)?,
            estimated_a1c: estimated_a1c(Glucose::mg_dl(mean)),
        })
    }

    pub fn is_stable(&self) -> bool {
        self.cv <= STABLE_CV_PERCENT
    }

    /// Format mean with unit
    pub fn format_mean(&self, unit: GlucoseUnit) -> String {
        Glucose::mg_dl(self.mean).to_unit(unit).format()
    }

    /// eA1C to one decimal
    pub fn format_a1c(&self) -> String {
        format!("{:.1}%", self.estimated_a1c)
    }
}

/// Per-day statistics for trend analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub time_in_range: TimeInRange,
}

/// Group readings by UTC calendar day, oldest day first
pub fn daily_summaries<'a, I>(readings: I, range: TargetRange) -> Result<Vec<DailySummary>>
where
    I: IntoIterator<Item = &'a Reading>,
{
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for reading in readings {
        by_day.entry(reading.timestamp().date_naive()).or_default().push(reading.mg_dl());
    }

    by_day.into_iter()
        .map(|(date, values)| {
            Ok(DailySummary {
                date,
                count: values.len(),
                mean: mean(&values)?,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                time_in_range: TimeInRange::from_values(&values, range)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(value: f64, day: u32, hour: u32) -> Reading {
        let ts = Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap();
        Reading::new(value, GlucoseUnit::MgDl, ts).unwrap()
    }

    #[test]
    fn test_basic_stats() {
        let values = vec![100.0, 120.0, 140.0, 160.0, 180.0];
        assert!((mean(&values).unwrap() - 140.0).abs() < 1e-9);
        assert!((median(&values).unwrap() - 140.0).abs() < 1e-9);
        // population: sqrt((1600 + 400 + 0 + 400 + 1600) / 5)
        assert!((std_dev(&values).unwrap() - 800.0_f64.sqrt()).abs() < 1e-9);
        let cv = coefficient_of_variation(&values).unwrap();
        assert!((cv - 800.0_f64.sqrt() / 140.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_even_count() {
        assert!((median(&[90.0, 100.0, 120.0, 200.0]).unwrap() - 110.0).abs() < 1e-9);
        assert!((median(&[42.0]).unwrap() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(mean(&[]), Err(GlucoCalcError::EmptyInput)));
        assert!(matches!(median(&[]), Err(GlucoCalcError::EmptyInput)));
        assert!(matches!(std_dev(&[]), Err(GlucoCalcError::EmptyInput)));
        assert!(matches!(percentile(&[], 50.0), Err(GlucoCalcError::EmptyInput)));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(mean(&[100.0, f64::NAN]), Err(GlucoCalcError::InvalidInput(_))));
    }

    #[test]
    fn test_estimated_a1c_reference_points() {
        assert!((estimated_a1c(Glucose::mg_dl(97.0)) - 5.0).abs() < 0.05);
        assert!((estimated_a1c(Glucose::mg_dl(154.0)) - 7.0).abs() < 0.05);
        assert!((estimated_a1c(Glucose::mg_dl(183.0)) - 8.0).abs() < 0.05);
        // 154 mg/dL expressed in mmol/L gives the same answer
        let mmol = Glucose::mg_dl(154.0).to_unit(GlucoseUnit::MmolL);
        assert!((estimated_a1c(mmol) - 7.0).abs() < 0.05);
    }

    #[test]
    fn test_time_in_range() {
        let values = vec![50.0, 65.0, 70.0, 150.0, 180.0, 200.0, 300.0];
        let tir = TimeInRange::from_values(&values, TargetRange::default()).unwrap();
        assert_eq!(tir.below, 2);
        assert_eq!(tir.in_range, 3);
        assert_eq!(tir.above, 2);
        assert_eq!(tir.bands.critical_low, 1);
        assert_eq!(tir.bands.low, 1);
        assert_eq!(tir.bands.normal, 2);
        assert_eq!(tir.bands.high, 2);
        assert_eq!(tir.bands.critical_high, 1);
        let total = tir.below_percent() + tir.in_range_percent() + tir.above_percent();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rounded_percentages_round_half_up() {
        // 1/8 = 12.5% -> 13, 6/8 = 75% -> 75
        let values = vec![60.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 200.0];
        let rounded = TimeInRange::from_values(&values, TargetRange::default()).unwrap().rounded();
        assert_eq!(rounded, RoundedPercentages { below: 13, in_range: 75, above: 13 });
    }

    #[test]
    fn test_empty_time_in_range_is_zero() {
        let tir = TimeInRange::from_values(&[], TargetRange::default()).unwrap();
        assert_eq!(tir.total, 0);
        assert_eq!(tir.in_range_percent(), 0.0);
    }

    #[test]
    fn test_time_in_range_rejects_invalid_values() {
        let range = TargetRange::default();
        assert!(matches!(
            TimeInRange::from_values(&[f64::NAN, f64::NAN], range),
            Err(GlucoCalcError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeInRange::from_values(&[120.0, f64::INFINITY], range),
            Err(GlucoCalcError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeInRange::from_values(&[-10.0], range),
            Err(GlucoCalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summary_respects_window() {
        let readings = vec![
            reading(400.0, 1, 8), // outside a 7 day window
            reading(100.0, 20, 8),
            reading(120.0, 21, 8),
            reading(140.0, 22, 8),
            reading(200.0, 23, 8),
        ];
        let now = Utc.with_ymd_and_hms(2024, 5, 24, 0, 0, 0).unwrap();
        let summary = GlycemicSummary::generate(&readings, TargetRange::default(), now, Duration::days(7)).unwrap();
        assert_eq!(summary.count, 4);
        assert!((summary.mean - 140.0).abs() < 1e-9);
        assert!((summary.median - 130.0).abs() < 1e-9);
        assert_eq!(summary.min, 100.0);
        assert_eq!(summary.max, 200.0);
        assert_eq!(summary.time_in_range.above, 1);
        assert!(summary.is_stable());
        assert_eq!(summary.format_mean(GlucoseUnit::MgDl), "140 mg/dL");
        assert_eq!(summary.format_a1c(), "6.5%");
    }

    #[test]
    fn test_summary_of_empty_window_fails() {
        let readings = vec![reading(100.0, 1, 8)];
        let now = Utc.with_ymd_and_hms(2024, 5, 30, 0, 0, 0).unwrap();
        let result = GlycemicSummary::generate(&readings, TargetRange::default(), now, Duration::days(7));
        assert!(matches!(result, Err(GlucoCalcError::EmptyInput)));
    }

    #[test]
    fn test_single_reading_summary() {
        let readings = vec![reading(123.0, 10, 8)];
        let now = Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap();
        let summary = GlycemicSummary::generate(&readings, TargetRange::default(), now, Duration::days(7)).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.median, 123.0);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.cv, 0.0);
        assert_eq!(summary.q1, 123.0);
        assert_eq!(summary.q3, 123.0);
    }

    #[test]
    fn test_summary_with_unbounded_window() {
        let readings = vec![reading(100.0, 1, 8), reading(200.0, 20, 8)];
        let now = Utc.with_ymd_and_hms(2024, 5, 24, 0, 0, 0).unwrap();
        let summary = GlycemicSummary::generate(
            &readings,
            TargetRange::default(),
            now,
            Duration::days(1_000_000_000),
        )
        .unwrap();
        assert_eq!(summary.count, 2);
        assert!(summary.window_start.is_none());
        assert!((summary.mean - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_summaries_of_window_selection() {
        let readings = vec![reading(100.0, 1, 8), reading(140.0, 20, 8), reading(160.0, 21, 8)];
        let now = Utc.with_ymd_and_hms(2024, 5, 24, 0, 0, 0).unwrap();
        let selected = within_window(&readings, now, Duration::days(7));
        let days = daily_summaries(selected, TargetRange::default()).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
    }

    #[test]
    fn test_daily_summaries() {
        let readings = vec![
            reading(200.0, 3, 20),
            reading(100.0, 2, 8),
            reading(140.0, 2, 12),
            reading(60.0, 3, 7),
        ];
        let days = daily_summaries(&readings, TargetRange::default()).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(days[0].count, 2);
        assert!((days[0].mean - 120.0).abs() < 1e-9);
        assert_eq!(days[1].min, 60.0);
        assert_eq!(days[1].max, 200.0);
        assert_eq!(days[1].time_in_range.below, 1);
    }
}
