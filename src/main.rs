use stepextract::cli::commands::{CliArgs, Commands};
use stepextract::cli::handlers::{
    handle_compare, handle_conditions, handle_extract, handle_preprocess,
};
use stepextract::util::logging::{init_logging, LoggingConfig};
use stepextract::VERSION;

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_args(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("stepextract v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Extract(extract_args) => handle_extract(extract_args),
        Commands::Conditions(source_args) => handle_conditions(source_args),
        Commands::Preprocess(preprocess_args) => handle_preprocess(preprocess_args),
        Commands::Compare(source_args) => handle_compare(source_args),
    };

    std::process::exit(exit_code);
}
