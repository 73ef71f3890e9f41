// JSON-lines trace of extraction diagnostics and phases
use super::{ExtractionLogger, PhaseReport};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum TraceEntry<'a> {
    Diagnostic {
        stage: &'a str,
        message: &'a str,
        timestamp: u64,
    },
    Phase {
        #[serde(flatten)]
        report: &'a PhaseReport,
        timestamp: u64,
    },
}

/// Appends one JSON object per event to a trace file
///
/// A file that cannot be opened disables the logger with a warning; nothing
/// in extraction ever fails because of it.
#[derive(Clone)]
pub struct HeuristicLogger {
    writer: Option<Arc<Mutex<BufWriter<File>>>>,
    enabled: bool,
}

impl HeuristicLogger {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        let writer = log_file.and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(Arc::new(Mutex::new(BufWriter::new(file)))),
                Err(e) => {
                    warn!("Failed to open extraction trace file {:?}: {}", path, e);
                    None
                }
            }
        });

        Self {
            enabled: writer.is_some(),
            writer,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            writer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn write(&self, entry: &TraceEntry<'_>) {
        if !self.enabled {
            return;
        }
        let Some(writer) = &self.writer else {
            return;
        };
        let Ok(mut writer) = writer.lock() else {
            return;
        };
        match serde_json::to_string(entry) {
            Ok(json) => {
                if let Err(e) = writeln!(writer, "{}", json) {
                    warn!("Failed to write extraction trace entry: {}", e);
                }
                if let Err(e) = writer.flush() {
                    warn!("Failed to flush extraction trace: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize extraction trace entry: {}", e),
        }
    }
}

impl ExtractionLogger for HeuristicLogger {
    fn diagnostic(&self, stage: &str, message: &str) {
        self.write(&TraceEntry::Diagnostic {
            stage,
            message,
            timestamp: timestamp(),
        });
        debug!("Extraction diagnostic: stage={} {}", stage, message);
    }

    fn phase(&self, report: &PhaseReport) {
        self.write(&TraceEntry::Phase {
            report,
            timestamp: timestamp(),
        });
        debug!(
            "Extraction trace: phase={} records={} latency_ms={}",
            report.phase, report.records, report.latency_ms
        );
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.jsonl");
        let logger = HeuristicLogger::new(Some(path.clone()));
        assert!(logger.is_enabled());

        logger.diagnostic("grammar", "module parse failed");
        logger.phase(&PhaseReport {
            phase: "structural".to_string(),
            input_bytes: 42,
            records: 2,
            latency_ms: 1,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "diagnostic");
        assert_eq!(lines[0]["stage"], "grammar");
        assert_eq!(lines[1]["event"], "phase");
        assert_eq!(lines[1]["phase"], "structural");
        assert_eq!(lines[1]["records"], 2);
    }

    #[test]
    fn test_unopenable_path_disables() {
        let dir = TempDir::new().unwrap();
        let logger = HeuristicLogger::new(Some(dir.path().join("missing").join("trace.jsonl")));
        assert!(!logger.is_enabled());
        logger.diagnostic("x", "ignored");
    }

    #[test]
    fn test_disabled() {
        assert!(!HeuristicLogger::disabled().is_enabled());
        assert!(!HeuristicLogger::new(None).is_enabled());
    }
}
