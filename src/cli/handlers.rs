//! Command handlers wiring configuration, AWS, detection and output

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::commands::CliArgs;
use super::output::OutputFormatter;
use crate::aws::{load_sdk_config, CloudFormationSource};
use crate::config::ScanConfig;
use crate::detection::Detector;
use crate::output::StacksOutput;
use crate::progress::LoggingHandler;
use crate::source::StackDataSource;

/// Runs a scan end to end and returns the process exit code
///
/// Only the formatted result is written to stdout. Failures print a single
/// message to stderr and exit with 1.
pub async fn handle_scan(args: &CliArgs) -> i32 {
    let config = args.apply_to(ScanConfig::default());
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return 1;
    }
    debug!("{}", config);

    let sdk_config = load_sdk_config(&config).await;
    let source: Arc<dyn StackDataSource> =
        Arc::new(CloudFormationSource::from_config(&sdk_config, &config));

    let cancel = CancellationToken::new();
    let signal_watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = scan_and_render(source, &config, &cancel).await;
    signal_watcher.abort();

    match result {
        Ok(rendered) => {
            println!("{}", rendered);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Scans with any data source and renders the result in the configured format
pub async fn scan_and_render(
    source: Arc<dyn StackDataSource>,
    config: &ScanConfig,
    cancel: &CancellationToken,
) -> Result<String> {
    let format = config.output_format()?;
    let output = scan(source, config, cancel).await?;
    OutputFormatter::new(format).format(&output)
}

/// Runs the detector, cancelling it when the scan timeout passes
pub async fn scan(
    source: Arc<dyn StackDataSource>,
    config: &ScanConfig,
    cancel: &CancellationToken,
) -> Result<StacksOutput> {
    let detector = Detector::new(source, config.region())
        .with_max_workers(config.max_workers)
        .with_progress_handler(Arc::new(LoggingHandler));

    let deadline = config
        .scan_timeout()
        .map(|timeout| tokio::spawn(cancel_after(cancel.clone(), timeout)));

    let result = detector.detect(cancel).await;

    if let Some(deadline) = deadline {
        deadline.abort();
    }

    let stacks = result.with_context(|| format!("Scan of region {} failed", config.region()))?;
    if cancel.is_cancelled() {
        warn!(
            matched = stacks.len(),
            "Scan was cancelled, results may be incomplete"
        );
    }

    Ok(StacksOutput::new(stacks))
}

async fn cancel_after(cancel: CancellationToken, timeout: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "Scan timeout reached, cancelling");
            cancel.cancel();
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling scan");
            cancel.cancel();
        }
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    }
}
