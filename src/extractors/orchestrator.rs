//! Strategy orchestration
//!
//! [`StepExtractor`] is the only entry point callers need. It never fails:
//! empty, oversized, and unparseable input all yield an empty list, and a
//! panic anywhere inside extraction is caught and reported the same way.

use super::conditions::ConditionTable;
use super::grammar::GrammarExtractor;
use super::preprocess::preprocess;
use super::structural::StructuralExtractor;
use crate::config::{ExtractorConfig, Strategy};
use crate::diagnostics::{ExtractionLogger, NoopLogger, PhaseReport};
use crate::error::ExtractError;
use crate::steps::StepRecord;
use crate::validation::Validator;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

const STAGE: &str = "orchestrator";

/// Step ids each strategy finds on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyComparison {
    pub structural: Vec<String>,
    pub grammar: Vec<String>,
    pub diverges: bool,
}

pub struct StepExtractor {
    config: ExtractorConfig,
    logger: Arc<dyn ExtractionLogger>,
    validator: Validator,
}

impl StepExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            logger: Arc::new(NoopLogger),
            validator: Validator::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExtractionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Ordered, id-unique steps found in `source`; `[]` on any failure
    pub fn extract(&self, source: &str) -> Vec<StepRecord> {
        if !self.accepts(source) {
            return Vec::new();
        }
        self.guarded(|| self.run(source)).unwrap_or_default()
    }

    /// Like [`extract`](Self::extract) for dynamically typed input; only
    /// strings are examined
    pub fn extract_from_value(&self, value: &serde_json::Value) -> Vec<StepRecord> {
        match value.as_str() {
            Some(source) => self.extract(source),
            None => {
                self.logger.diagnostic(STAGE, "input is not a string");
                Vec::new()
            }
        }
    }

    /// Run both strategies independently and report where they disagree
    pub fn compare(&self, source: &str) -> StrategyComparison {
        let (structural, grammar) = if self.accepts(source) {
            self.guarded(|| {
                let conditions = ConditionTable::from_source(source);
                (
                    self.run_structural(source, &conditions),
                    self.run_grammar(source, &conditions),
                )
            })
            .unwrap_or_default()
        } else {
            (Vec::new(), Vec::new())
        };

        let structural = ids(&structural);
        let grammar = ids(&grammar);
        let diverges = structural != grammar;
        if diverges {
            self.logger.diagnostic(
                STAGE,
                &format!(
                    "strategies disagree: structural found {} steps, grammar found {}",
                    structural.len(),
                    grammar.len()
                ),
            );
        }
        StrategyComparison {
            structural,
            grammar,
            diverges,
        }
    }

    fn accepts(&self, source: &str) -> bool {
        if source.trim().is_empty() {
            return false;
        }
        if source.len() > self.config.max_input_bytes {
            let error = ExtractError::InputTooLarge {
                size: source.len(),
                limit: self.config.max_input_bytes,
            };
            self.logger.diagnostic(STAGE, &error.to_string());
            return false;
        }
        true
    }

    fn guarded<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let error = ExtractError::Internal(panic_message(payload.as_ref()));
                self.logger.diagnostic(STAGE, &error.to_string());
                None
            }
        }
    }

    fn run(&self, source: &str) -> Vec<StepRecord> {
        let conditions = ConditionTable::from_source(source);
        match self.config.strategy {
            Strategy::Structural => self.run_structural(source, &conditions),
            Strategy::Grammar => self.run_grammar(source, &conditions),
            Strategy::Auto => {
                let records = self.run_structural(source, &conditions);
                if !records.is_empty() || !self.config.fallback_enabled {
                    return records;
                }
                self.run_grammar(source, &conditions)
            }
        }
    }

    fn run_structural(&self, source: &str, conditions: &ConditionTable) -> Vec<StepRecord> {
        let start = Instant::now();
        let records = StructuralExtractor::new(conditions, self.logger.as_ref())
            .extract(source, &self.validator);
        self.report("structural", source.len(), records.len(), start);
        records
    }

    fn run_grammar(&self, source: &str, conditions: &ConditionTable) -> Vec<StepRecord> {
        let start = Instant::now();
        let text = preprocess(source);
        let records =
            GrammarExtractor::new(conditions, self.logger.as_ref(), self.config.max_depth)
                .extract(&text, &self.validator);
        self.report("grammar", source.len(), records.len(), start);
        records
    }

    fn report(&self, phase: &str, input_bytes: usize, records: usize, start: Instant) {
        self.logger.phase(&PhaseReport {
            phase: phase.to_string(),
            input_bytes,
            records,
            latency_ms: start.elapsed().as_millis() as u64,
        });
    }
}

impl Default for StepExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::builtin())
    }
}

/// Extract steps with built-in defaults and no diagnostics
pub fn parse_steps(source: &str) -> Vec<StepRecord> {
    StepExtractor::default().extract(source)
}

fn ids(records: &[StepRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during extraction".to_string()
    }
}
