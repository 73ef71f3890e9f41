//! Injectable diagnostics for the extraction pipeline
//!
//! Extraction code never logs globally. It reports through an
//! [`ExtractionLogger`] handed in by the caller; the default discards
//! everything so the core stays pure and testable.

pub mod logger;

pub use logger::HeuristicLogger;

use serde::Serialize;
use tracing::debug;

/// Summary of one strategy run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: String,
    pub input_bytes: usize,
    pub records: usize,
    pub latency_ms: u64,
}

pub trait ExtractionLogger: Send + Sync {
    /// A skipped candidate, a failed parse, or a caught error
    fn diagnostic(&self, stage: &str, message: &str);

    fn phase(&self, report: &PhaseReport);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl ExtractionLogger for NoopLogger {
    fn diagnostic(&self, _stage: &str, _message: &str) {}

    fn phase(&self, _report: &PhaseReport) {}
}

/// Forwards to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ExtractionLogger for TracingLogger {
    fn diagnostic(&self, stage: &str, message: &str) {
        debug!(stage, "{}", message);
    }

    fn phase(&self, report: &PhaseReport) {
        debug!(
            phase = %report.phase,
            input_bytes = report.input_bytes,
            records = report.records,
            latency_ms = report.latency_ms,
            "Extraction phase finished"
        );
    }
}
