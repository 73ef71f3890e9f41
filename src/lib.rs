//! stepextract - flow step extraction from loosely structured source
//!
//! Turns JavaScript or TypeScript text that defines a list of step objects
//! into validated [`StepRecord`]s a flow editor can render. Extraction never
//! fails: unparseable input yields an empty list.
//!
//! # Example Usage
//!
//! ```
//! use stepextract::parse_steps;
//!
//! let steps = parse_steps(r#"const steps = [{ id: "s1", nextStep: "s2" }, { id: "s2" }];"#);
//! assert_eq!(steps.len(), 2);
//! assert_eq!(steps[0].id, "s1");
//! ```
//!
//! # Project Structure
//!
//! - [`extractors`]: structural scan, grammar fallback and the orchestrator
//! - [`syntax`]: tokenizer, syntax tree, parser and renderer for the fallback
//! - [`validation`]: rules turning candidates into records
//! - [`diagnostics`]: injectable logging for extraction runs

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extractors;
pub mod scan;
pub mod steps;
pub mod syntax;
pub mod util;
pub mod validation;

pub use config::{ConfigError, ExtractorConfig, Strategy};
pub use diagnostics::{ExtractionLogger, HeuristicLogger, NoopLogger, PhaseReport, TracingLogger};
pub use error::ExtractError;
pub use extractors::{parse_steps, ConditionTable, StepExtractor, StrategyComparison};
pub use steps::{StepLink, StepMeta, StepRecord, StepType};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validation::Validator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
