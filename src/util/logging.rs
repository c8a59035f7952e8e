//! Structured logging setup
//!
//! Logs always go to stderr; stdout carries only the formatted scan result.
//! `RUST_LOG`, when set, takes precedence over the configured level.
//!
//! # Example
//!
//! ```no_run
//! use find_serverless_stacks::util::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::resolve(Some("debug"), false, false));
//! tracing::info!(region = "us-east-1", "Scan started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_LEVEL_ENV: &str = "FSS_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "FSS_LOG_JSON";

const CRATE_TARGET: &str = "find_serverless_stacks";

/// Noisy dependency targets capped at `warn` unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["aws_config", "aws_smithy_runtime", "aws_sdk_cloudformation", "hyper", "h2"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,

    /// One JSON object per line instead of human-readable text
    pub use_json: bool,

    pub include_target: bool,
    pub include_location: bool,
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with source locations and thread ids, for log shipping
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    /// Resolves the effective configuration from command-line switches
    ///
    /// Precedence: explicit `--log-level`, then `-v` (debug), then `-q`
    /// (error), then `FSS_LOG_LEVEL`, then `info`. `FSS_LOG_JSON=true`
    /// switches to JSON output.
    pub fn resolve(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = if let Some(level) = log_level {
            parse_level(level)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            env::var(LOG_LEVEL_ENV)
                .map(|level| parse_level(&level))
                .unwrap_or(Level::INFO)
        };

        let use_json = env::var(LOG_JSON_ENV)
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            ..Default::default()
        }
    }
}

/// Parses a log level, falling back to `INFO` for unknown names
///
/// ```
/// use find_serverless_stacks::util::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("verbose"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new(format!("{}={}", CRATE_TARGET, level));
    for target in QUIET_TARGETS {
        if let Ok(directive) = format!("{}=warn", target).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}
