//! Configuration management for stepextract
//!
//! Settings load from environment variables with fallback defaults.
//!
//! # Environment Variables
//!
//! - `STEPEXTRACT_STRATEGY`: Strategy selection (auto|structural|grammar) - default: "auto"
//! - `STEPEXTRACT_FALLBACK`: Run the grammar fallback when structural finds nothing (true|false) - default: "true"
//! - `STEPEXTRACT_MAX_INPUT_BYTES`: Largest input processed - default: "4194304" (4MB)
//! - `STEPEXTRACT_MAX_DEPTH`: Parser nesting limit - default: "100"
//! - `STEPEXTRACT_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use stepextract::ExtractorConfig;
//! use std::env;
//!
//! env::set_var("STEPEXTRACT_STRATEGY", "grammar");
//!
//! let config = ExtractorConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use crate::syntax::DEFAULT_MAX_DEPTH;
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FALLBACK_ENABLED: bool = true;
const DEFAULT_MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;
const MAX_INPUT_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Highest accepted `max_depth`; parses at this limit fit a 2 MiB thread stack
pub const MAX_DEPTH_LIMIT: usize = 200;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid strategy: {0}. Valid options: auto, structural, grammar")]
    InvalidStrategy(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Which extraction strategies run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Structural first, grammar fallback only when structural finds nothing
    #[default]
    Auto,
    Structural,
    Grammar,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "structural" => Ok(Strategy::Structural),
            "grammar" => Ok(Strategy::Grammar),
            _ => Err(ConfigError::InvalidStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Auto => "auto",
            Strategy::Structural => "structural",
            Strategy::Grammar => "grammar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractorConfig {
    pub strategy: Strategy,

    /// Only consulted by [`Strategy::Auto`]
    pub fallback_enabled: bool,

    /// Larger inputs yield no steps
    pub max_input_bytes: usize,

    /// Nesting limit for the grammar parser
    pub max_depth: usize,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ExtractorConfig {
    /// Reads STEPEXTRACT_* variables; unparsable values fall back to defaults
    fn default() -> Self {
        let strategy = env::var("STEPEXTRACT_STRATEGY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let fallback_enabled = env::var("STEPEXTRACT_FALLBACK")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_FALLBACK_ENABLED);

        let max_input_bytes = env::var("STEPEXTRACT_MAX_INPUT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_INPUT_BYTES);

        let max_depth = env::var("STEPEXTRACT_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);

        let log_level = env::var("STEPEXTRACT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            strategy,
            fallback_enabled,
            max_input_bytes,
            max_depth,
            log_level,
        }
    }
}

impl ExtractorConfig {
    /// Built-in defaults, ignoring the environment
    pub fn builtin() -> Self {
        Self {
            strategy: Strategy::Auto,
            fallback_enabled: DEFAULT_FALLBACK_ENABLED,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for zero or oversized limits and unknown log levels
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max input size must be at least 1 byte".to_string(),
            ));
        }
        if self.max_input_bytes > MAX_INPUT_BYTES_LIMIT {
            return Err(ConfigError::ValidationFailed(
                "Max input size cannot exceed 64MB".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max depth must be at least 1".to_string(),
            ));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max depth cannot exceed {}",
                MAX_DEPTH_LIMIT
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stepextract Configuration:")?;
        writeln!(f, "  Strategy: {}", self.strategy)?;
        writeln!(f, "  Fallback Enabled: {}", self.fallback_enabled)?;
        writeln!(f, "  Max Input Size: {} bytes", self.max_input_bytes)?;
        writeln!(f, "  Max Depth: {}", self.max_depth)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("STEPEXTRACT_STRATEGY"),
            EnvGuard::unset("STEPEXTRACT_FALLBACK"),
            EnvGuard::unset("STEPEXTRACT_MAX_INPUT_BYTES"),
            EnvGuard::unset("STEPEXTRACT_MAX_DEPTH"),
            EnvGuard::unset("STEPEXTRACT_LOG_LEVEL"),
        ];

        let config = ExtractorConfig::default();
        assert_eq!(config, ExtractorConfig::builtin());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("STEPEXTRACT_STRATEGY", "Grammar"),
            EnvGuard::set("STEPEXTRACT_FALLBACK", "false"),
            EnvGuard::set("STEPEXTRACT_MAX_INPUT_BYTES", "2048"),
            EnvGuard::set("STEPEXTRACT_MAX_DEPTH", "64"),
            EnvGuard::set("STEPEXTRACT_LOG_LEVEL", "DEBUG"),
        ];

        let config = ExtractorConfig::default();
        assert_eq!(config.strategy, Strategy::Grammar);
        assert!(!config.fallback_enabled);
        assert_eq!(config.max_input_bytes, 2048);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_unparsable_values_fall_back() {
        let _guards = vec![
            EnvGuard::set("STEPEXTRACT_STRATEGY", "magic"),
            EnvGuard::set("STEPEXTRACT_MAX_DEPTH", "deep"),
        ];

        let config = ExtractorConfig::default();
        assert_eq!(config.strategy, Strategy::Auto);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_configuration_validation_limits() {
        let mut config = ExtractorConfig::builtin();
        config.max_input_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::builtin();
        config.max_input_bytes = MAX_INPUT_BYTES_LIMIT + 1;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::builtin();
        config.max_depth = MAX_DEPTH_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = ExtractorConfig::builtin();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("STRUCTURAL".parse::<Strategy>().unwrap(), Strategy::Structural);
        assert!("both".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Grammar.to_string(), "grammar");
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", ExtractorConfig::builtin());
        assert!(display.contains("Stepextract Configuration:"));
        assert!(display.contains("Strategy: auto"));
    }
}
