//! glucocalc command line
//!
//! Usage:
//!   glucocalc convert <value> <from> <to>        - Convert between mg/dL and mmol/L
//!   glucocalc classify <value> [unit]            - Clinical status of a reading
//!   glucocalc bolus <carbs> <glucose> [unit]     - Recommend a bolus
//!   glucocalc stats <readings.json> [days]       - Summarize readings
//!   glucocalc path                               - Show config location
//!   GLUCOCALC_DBG=1 glucocalc ...                - Enable debug output

use std::env;
use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use log::{info, warn};

use glucocalc::config::{config_file_path, Config};
use glucocalc::reading::within_window;
use glucocalc::stats::{daily_summaries, GlycemicSummary};
use glucocalc::{calculate_bolus, classify, convert, GlucoCalcError, Glucose, GlucoseUnit, Reading, Result};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("GLUCOCALC_DBG").is_ok();

    // Initialize logger
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    // Create default config if it doesn't exist
    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    // Config directory first, then current directory. A file that exists but
    // does not parse is fatal: dosing must never run on unintended defaults.
    let config = Config::load_first(&[cfg_path.as_path(), Path::new("config.txt")]).map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;

    match args.get(1).map(|s| s.as_str()) {
        Some("convert") => cmd_convert(&args[2..])?,
        Some("classify") => cmd_classify(&config, &args[2..])?,
        Some("bolus") => cmd_bolus(&config, &args[2..])?,
        Some("stats") => cmd_stats(&config, &args[2..])?,
        Some("path") | Some("paths") => {
            println!("Config file: {}", cfg_path.display());
        }
        Some("--version") | Some("-V") => {
            println!("glucocalc {}", env!("CARGO_PKG_VERSION"));
        }
        _ => print_help(),
    }

    Ok(())
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str> {
    args.get(idx)
        .map(|s| s.as_str())
        .ok_or_else(|| GlucoCalcError::InvalidInput(format!("missing argument <{}>", name)))
}

fn number(args: &[String], idx: usize, name: &str) -> Result<f64> {
    let raw = arg(args, idx, name)?;
    raw.parse()
        .map_err(|_| GlucoCalcError::InvalidInput(format!("<{}> must be a number, got '{}'", name, raw)))
}

fn unit_or(args: &[String], idx: usize, default: GlucoseUnit) -> Result<GlucoseUnit> {
    match args.get(idx) {
        Some(raw) => raw.parse(),
        None => Ok(default),
    }
}

fn cmd_convert(args: &[String]) -> Result<()> {
    let value = number(args, 0, "value")?;
    let from: GlucoseUnit = arg(args, 1, "from")?.parse()?;
    let to: GlucoseUnit = arg(args, 2, "to")?.parse()?;
    let converted = Glucose::new(convert(value, from, to), to);
    println!("{}", serde_json::to_string_pretty(&converted)?);
    eprintln!("{} = {}", Glucose::new(value, from), converted);
    Ok(())
}

fn cmd_classify(config: &Config, args: &[String]) -> Result<()> {
    let value = number(args, 0, "value")?;
    let glucose = Glucose::new(value, unit_or(args, 1, config.display_unit)?);
    let status = classify(glucose)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    eprintln!("{}: {}", glucose, status.label());
    Ok(())
}

fn cmd_bolus(config: &Config, args: &[String]) -> Result<()> {
    let carbs = number(args, 0, "carbs")?;
    let value = number(args, 1, "glucose")?;
    let glucose = Glucose::new(value, unit_or(args, 2, config.display_unit)?);

    let result = calculate_bolus(carbs, glucose, &config.params)?;
    info!("Recommended {:.1} U with {} warning(s)", result.recommended_insulin, result.warnings.len());

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!("Recommended bolus: {:.1} U", result.recommended_insulin);
    for warning in &result.warnings {
        eprintln!("  WARNING: {}", warning.message);
    }
    Ok(())
}

fn cmd_stats(config: &Config, args: &[String]) -> Result<()> {
    let path = arg(args, 0, "readings.json")?;
    let window = match args.get(1) {
        Some(raw) => raw.parse::<i64>()
            .ok()
            .filter(|days| *days > 0)
            .and_then(Duration::try_days)
            .ok_or_else(|| {
                GlucoCalcError::InvalidInput(format!("<days> must be a positive whole number, got '{}'", raw))
            })?,
        None => config.window(),
    };

    let readings: Vec<Reading> = serde_json::from_str(&fs::read_to_string(path)?)?;
    info!("Loaded {} readings from {}", readings.len(), path);

    let range = config.params.target_range;
    let now = Utc::now();
    let summary = GlycemicSummary::generate(&readings, range, now, window)?;
    let daily = daily_summaries(within_window(&readings, now, window), range)?;

    let output = serde_json::json!({ "summary": summary, "daily": daily });
    println!("{}", serde_json::to_string_pretty(&output)?);

    let unit = config.display_unit;
    let tir = summary.time_in_range.rounded();
    eprintln!("Readings:        {}", summary.count);
    eprintln!("Mean:            {}", summary.format_mean(unit));
    eprintln!("CV:              {:.0}%{}", summary.cv, if summary.is_stable() { " (stable)" } else { "" });
    eprintln!("Time in range:   {}% ({})", tir.in_range, range.format_range(unit));
    eprintln!("Below / above:   {}% / {}%", tir.below, tir.above);
    eprintln!("Estimated A1C:   {}", summary.format_a1c());
    Ok(())
}

fn print_help() {
    eprintln!("glucocalc v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glucocalc convert <value> <from> <to>      Convert between mg/dL and mmol/L");
    eprintln!("  glucocalc classify <value> [unit]          Clinical status of a reading");
    eprintln!("  glucocalc bolus <carbs> <glucose> [unit]   Recommend a bolus");
    eprintln!("  glucocalc stats <readings.json> [days]     Summarize readings");
    eprintln!("  glucocalc path                             Show config location");
    eprintln!("  glucocalc help                             Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLUCOCALC_DBG=1                            Enable debug output");
    eprintln!();
    eprintln!("CONFIG:");
    eprintln!("  {}", config_file_path().display());
}
