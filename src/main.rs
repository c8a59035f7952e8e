use clap::Parser;
use find_serverless_stacks::cli::{handle_scan, CliArgs};
use find_serverless_stacks::util::{init_logging, LoggingConfig};
use find_serverless_stacks::VERSION;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::resolve(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("find-serverless-stacks v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = handle_scan(&args).await;

    std::process::exit(exit_code);
}
