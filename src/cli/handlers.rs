use crate::cli::commands::{ExtractArgs, PreprocessArgs, SourceArgs};
use crate::cli::output::{OutputFormat, OutputFormatter};
use crate::config::ExtractorConfig;
use crate::diagnostics::{ExtractionLogger, HeuristicLogger, TracingLogger};
use crate::extractors::{preprocess, ConditionTable, StepExtractor};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Exit code for I/O failures; an empty step list is still a success
const EXIT_IO_ERROR: i32 = 1;

pub fn handle_extract(args: &ExtractArgs) -> i32 {
    match run_extract(args) {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            EXIT_IO_ERROR
        }
    }
}

pub fn handle_conditions(args: &SourceArgs) -> i32 {
    exit_code(read_source(args.input.as_deref()).and_then(|source| {
        let table = ConditionTable::from_source(&source);
        debug!("Found {} condition functions", table.len());
        let output = OutputFormatter::new(OutputFormat::from(args.format)).format_conditions(&table)?;
        write_output(&output, None)
    }))
}

pub fn handle_preprocess(args: &PreprocessArgs) -> i32 {
    exit_code(
        read_source(args.input.as_deref())
            .and_then(|source| write_output(&preprocess(&source), None)),
    )
}

pub fn handle_compare(args: &SourceArgs) -> i32 {
    exit_code(read_source(args.input.as_deref()).and_then(|source| {
        let extractor = StepExtractor::new(checked_config()).with_logger(Arc::new(TracingLogger));
        let comparison = extractor.compare(&source);
        if comparison.diverges {
            warn!(
                structural = comparison.structural.len(),
                grammar = comparison.grammar.len(),
                "Extraction strategies disagree"
            );
        }
        let output =
            OutputFormatter::new(OutputFormat::from(args.format)).format_comparison(&comparison)?;
        write_output(&output, None)
    }))
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let source = read_source(args.input.as_deref())?;

    let mut config = checked_config();
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if args.no_fallback {
        config.fallback_enabled = false;
    }
    debug!("Extractor configuration: {:?}", config);

    let logger: Arc<dyn ExtractionLogger> = match &args.trace_file {
        Some(path) => Arc::new(HeuristicLogger::new(Some(path.clone()))),
        None => Arc::new(TracingLogger),
    };
    let steps = StepExtractor::new(config).with_logger(logger).extract(&source);
    info!("Extracted {} steps", steps.len());

    let output = OutputFormatter::new(OutputFormat::from(args.format)).format_steps(&steps)?;
    write_output(&output, args.output.as_ref())
}

/// Environment configuration, or built-in defaults when it does not validate
fn checked_config() -> ExtractorConfig {
    let config = ExtractorConfig::default();
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            ExtractorConfig::builtin()
        }
    }
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            EXIT_IO_ERROR
        }
    }
}

/// File contents, or stdin for `None` and `-`
fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read standard input")?;
            Ok(source)
        }
    }
}

fn write_output(output: &str, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormatArg;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_read_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let error = read_source(Some(&dir.path().join("absent.ts"))).unwrap_err();
        assert!(error.to_string().contains("Failed to read"));
    }

    #[test]
    #[serial]
    fn test_extract_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("flow.ts");
        let output = dir.path().join("steps.json");
        fs::write(&input, "export const steps = [{ id: 'a', nextStep: 'null' }];").unwrap();

        let args = ExtractArgs {
            input: Some(input),
            format: OutputFormatArg::Json,
            strategy: None,
            no_fallback: false,
            trace_file: None,
            output: Some(output.clone()),
        };
        assert_eq!(handle_extract(&args), 0);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!([{"id": "a", "nextStep": null}]));
    }

    #[test]
    #[serial]
    fn test_extract_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let args = ExtractArgs {
            input: Some(dir.path().join("absent.ts")),
            format: OutputFormatArg::Json,
            strategy: None,
            no_fallback: false,
            trace_file: None,
            output: None,
        };
        assert_eq!(handle_extract(&args), EXIT_IO_ERROR);
    }
}
