// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Logger setup: a terminal logger and, on request, a copy of the log in
//! `log_<date>_<time>.txt` in the working directory.
use crate::analysis::error::AnalysisError;
use chrono::Local;
use simplelog::*;
use std::fs::File;

/// level names accepted in configuration: debug, info, warn, error, off
pub fn level_filter(loglevel: &str) -> Result<LevelFilter, AnalysisError> {
    match loglevel.trim().to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(AnalysisError::Config(format!(
            "loglevel must be debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// name of the log file for the current moment
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Installs the global logger. Returns false if a logger was already installed, in which
/// case the old one stays in use.
pub fn init_logger(loglevel: &str, log_to_file: bool) -> Result<bool, AnalysisError> {
    let log_option = level_filter(loglevel)?;
    if log_option == LevelFilter::Off {
        return Ok(false);
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if log_to_file {
        let name = log_file_name();
        let file = File::create(&name)
            .map_err(|e| AnalysisError::Config(format!("cannot create {}: {}", name, e)))?;
        loggers.push(WriteLogger::new(log_option, Config::default(), file));
    }
    Ok(CombinedLogger::init(loggers).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(level_filter(" WARN ").unwrap(), LevelFilter::Warn);
        assert_eq!(level_filter("off").unwrap(), LevelFilter::Off);
        assert!(matches!(level_filter("loud"), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("log_") && name.ends_with(".txt"));
    }

    #[test]
    fn test_off_installs_nothing() {
        assert!(!init_logger("off", false).unwrap());
    }
}
