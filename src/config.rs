//! Configuration file parsing
//!
//! Settings live in a plain `key value # comment` text file. These values
//! drive dosing, so an unknown key or unparsable value in an existing file is
//! an error rather than a silent fallback to the defaults.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::Duration;
use log::info;

use crate::bolus::PatientParameters;
use crate::error::{GlucoCalcError, Result};
use crate::reading::DEFAULT_WINDOW_DAYS;
use crate::units::GlucoseUnit;

const DEFAULT_CONFIG: &str = "\
# glucocalc settings. Glucose values are in mg/dL.
carb_ratio 15              # grams of carbohydrate per unit
correction_factor 50       # mg/dL drop per unit
target_glucose 120
target_min 70
target_max 180
max_bolus 15               # units
low_glucose_threshold 70
unit mg/dL                 # display unit: mg/dL or mmol/L
window_days 30             # statistics window
";

/// Configuration loaded from config.txt
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub params: PatientParameters,
    pub display_unit: GlucoseUnit,
    pub window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: PatientParameters::default(),
            display_unit: GlucoseUnit::default(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse configuration text
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut config = Config::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let applied = match Self::parse_line(line) {
                Some((key, rest)) => {
                    // Extract value before any comment
                    let value = rest.split('#').next().unwrap_or("").trim();
                    config.apply(key, value)
                }
                None => Err(GlucoCalcError::Config("expected 'key value'".to_string())),
            };
            applied.map_err(|e| {
                GlucoCalcError::Config(format!("line {}: '{}': {}", idx + 1, line, e))
            })?;
        }

        config.params.validate()?;
        if config.window_days <= 0 || Duration::try_days(config.window_days).is_none() {
            return Err(GlucoCalcError::Config(format!(
                "window_days must be a positive number of days, got {}",
                config.window_days
            )));
        }
        Ok(config)
    }

    /// Load the first of `paths` that exists. Only a missing file falls
    /// through; any other read or parse failure is returned. Defaults are
    /// used when none of the files exist.
    pub fn load_first<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        for path in paths {
            let path: &Path = path.as_ref();
            match Self::load(path) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    return Ok(config);
                }
                Err(GlucoCalcError::Io(e)) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let params = &mut self.params;
        match key {
            "carb_ratio" => params.carb_ratio = parse_number(value)?,
            "correction_factor" => params.correction_factor = parse_number(value)?,
            "target_glucose" => params.target_glucose = parse_number(value)?,
            "target_min" => params.target_range.min = parse_number(value)?,
            "target_max" => params.target_range.max = parse_number(value)?,
            "max_bolus" => params.max_bolus = parse_number(value)?,
            "low_glucose_threshold" => params.low_glucose_threshold = parse_number(value)?,
            "unit" => self.display_unit = value.parse()?,
            "window_days" => {
                self.window_days = value.parse().map_err(|_| {
                    GlucoCalcError::Config(format!("'{}' is not a whole number of days", value))
                })?
            }
            _ => return Err(GlucoCalcError::Config(format!("unknown key '{}'", key))),
        }
        Ok(())
    }

    /// Statistics window as a duration. A day count too large to represent
    /// becomes an unbounded window.
    pub fn window(&self) -> Duration {
        Duration::try_days(self.window_days).unwrap_or(Duration::MAX)
    }

    /// Write the commented default configuration
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }
}

fn parse_number(value: &str) -> Result<f64> {
    value.parse::<f64>()
        .map_err(|_| GlucoCalcError::Config(format!("'{}' is not a number", value)))
}

/// Get the application configuration directory
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glucocalc")
}

/// Default config file path
pub fn config_file_path() -> PathBuf {
    get_config_dir().join("config.txt")
}
