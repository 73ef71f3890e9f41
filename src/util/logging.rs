//! Structured logging setup for the stepextract binary
//!
//! The library itself never installs a subscriber; extraction reports through
//! [`ExtractionLogger`](crate::diagnostics::ExtractionLogger). This module wires
//! the `tracing` ecosystem for command-line use: console or JSON output on
//! stderr, filtered by `RUST_LOG` or the configured level.
//!
//! # Example
//!
//! ```no_run
//! use stepextract::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!("Extraction started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for stepextract's own events
    pub level: Level,

    /// One JSON object per event instead of console formatting
    pub use_json: bool,

    /// Include the module target (e.g., stepextract::extractors) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level chosen on the command line: an explicit level wins, then
    /// `--verbose`, then `--quiet`, then `STEPEXTRACT_LOG_LEVEL`
    pub fn from_args(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(level_str) => parse_level(level_str),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => parse_level(
                &env::var("STEPEXTRACT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            ),
        };
        Self {
            level,
            use_json: json_from_env(),
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, case-insensitively
///
/// Unknown names fall back to `Level::INFO`.
///
/// ```
/// use stepextract::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn json_from_env() -> bool {
    env::var("STEPEXTRACT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Install the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            if let Ok(directive) = format!("stepextract={}", config.level).parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads `STEPEXTRACT_LOG_LEVEL` and `STEPEXTRACT_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig::from_args(None, false, false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("invalid"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    #[serial]
    fn test_from_args_precedence() {
        env::set_var("STEPEXTRACT_LOG_LEVEL", "warn");
        assert_eq!(LoggingConfig::from_args(Some("trace"), true, false).level, Level::TRACE);
        assert_eq!(LoggingConfig::from_args(None, true, true).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_args(None, false, true).level, Level::ERROR);
        assert_eq!(LoggingConfig::from_args(None, false, false).level, Level::WARN);
        env::remove_var("STEPEXTRACT_LOG_LEVEL");
        assert_eq!(LoggingConfig::from_args(None, false, false).level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_json_from_env() {
        env::set_var("STEPEXTRACT_LOG_JSON", "true");
        assert!(LoggingConfig::from_args(None, false, false).use_json);
        env::set_var("STEPEXTRACT_LOG_JSON", "nope");
        assert!(!LoggingConfig::from_args(None, false, false).use_json);
        env::remove_var("STEPEXTRACT_LOG_JSON");
    }
}
