use crate::config::Strategy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Step extraction from loosely structured flow definitions
#[derive(Parser, Debug)]
#[command(
    name = "stepextract",
    about = "Extract flow steps from JavaScript or TypeScript source",
    version,
    author,
    long_about = "stepextract reads source text that defines a list of step objects and \
                  prints the steps it can recover. Type annotations, comments and module \
                  syntax are tolerated; unparseable input yields an empty list."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Extract steps from a source file",
        long_about = "Runs the structural scan and, if it finds nothing, the grammar fallback.\n\n\
                      Examples:\n  \
                      stepextract extract flow.ts\n  \
                      cat flow.ts | stepextract extract --format yaml\n  \
                      stepextract extract flow.ts --strategy grammar --trace-file trace.jsonl"
    )]
    Extract(ExtractArgs),

    #[command(about = "List the condition functions a source file declares")]
    Conditions(SourceArgs),

    #[command(about = "Print the normalized text the grammar fallback parses")]
    Preprocess(PreprocessArgs),

    #[command(
        about = "Run both strategies and report where they disagree",
        long_about = "Runs the structural and grammar strategies independently and prints \
                      the step ids each one found.\n\n\
                      Examples:\n  \
                      stepextract compare flow.ts --format json"
    )]
    Compare(SourceArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "PATH", help = "Source file, or - for stdin (default)")]
    pub input: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_enum, help = "Force one strategy instead of structural-then-grammar")]
    pub strategy: Option<StrategyArg>,

    #[arg(long, help = "Never run the grammar fallback")]
    pub no_fallback: bool,

    #[arg(
        long,
        value_name = "FILE",
        help = "Append extraction diagnostics as JSON lines to FILE"
    )]
    pub trace_file: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SourceArgs {
    #[arg(value_name = "PATH", help = "Source file, or - for stdin (default)")]
    pub input: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PreprocessArgs {
    #[arg(value_name = "PATH", help = "Source file, or - for stdin (default)")]
    pub input: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Auto,
    Structural,
    Grammar,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::Structural => Strategy::Structural,
            StrategyArg::Grammar => Strategy::Grammar,
        }
    }
}
