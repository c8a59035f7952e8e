//! Scan configuration
//!
//! [`ScanConfig::default()`] loads settings from environment variables with
//! fallback defaults; command-line flags are layered on top by the CLI and
//! the result is checked with [`ScanConfig::validate`].
//!
//! # Environment Variables
//!
//! - `FSS_PROFILE` / `AWS_PROFILE`: credentials profile - default: "default"
//! - `FSS_REGION` / `AWS_REGION`: region to scan - **required**
//! - `FSS_OUTPUT`: output format (json|tsv) - default: "json"
//! - `FSS_MAX_WORKERS`: concurrent stack workers - default: "10"
//! - `FSS_REQUEST_TIMEOUT`: per-request timeout in seconds - default: "30"
//! - `FSS_SCAN_TIMEOUT`: whole-scan timeout in seconds - default: none
//! - `FSS_RATE_LIMIT`: API requests per second - default: "5"
//! - `FSS_RATE_BURST`: API request burst size - default: "10"
//! - `FSS_MAX_RETRIES`: retries for throttled or failed requests - default: "3"
//! - `FSS_LOG_LEVEL`: logging level - default: "info"

use crate::cli::output::OutputFormat;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_SESSION_NAME: &str = "find-serverless-stacks-session";
pub const DEFAULT_ASSUME_ROLE_DURATION_SECS: u32 = 3600;
const DEFAULT_OUTPUT: &str = "json";
const DEFAULT_MAX_WORKERS: usize = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RATE_LIMIT: f64 = 5.0;
const DEFAULT_RATE_BURST: u32 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_LOG_LEVEL: &str = "info";

const MAX_WORKERS_LIMIT: usize = 100;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MIN_ASSUME_ROLE_DURATION_SECS: u32 = 900;
const MAX_ASSUME_ROLE_DURATION_SECS: u32 = 43_200;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("AWS region is required. Use --region or set AWS_REGION")]
    MissingRegion,

    #[error("Invalid output format: {0}. Valid options: json, tsv")]
    InvalidOutputFormat(String),

    #[error("Invalid AssumeRole configuration: {0}")]
    InvalidAssumeRole(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Credentials obtained by assuming an IAM role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleConfig {
    pub role_arn: String,
    pub session_name: String,
    pub duration_secs: u32,
    pub external_id: Option<String>,
}

impl AssumeRoleConfig {
    pub fn new(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            duration_secs: DEFAULT_ASSUME_ROLE_DURATION_SECS,
            external_id: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// STS accepts sessions between 15 minutes and 12 hours
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role_arn.trim().is_empty() {
            return Err(ConfigError::InvalidAssumeRole(
                "role ARN cannot be empty".to_string(),
            ));
        }
        if self.session_name.trim().is_empty() {
            return Err(ConfigError::InvalidAssumeRole(
                "session name cannot be empty".to_string(),
            ));
        }
        if !(MIN_ASSUME_ROLE_DURATION_SECS..=MAX_ASSUME_ROLE_DURATION_SECS)
            .contains(&self.duration_secs)
        {
            return Err(ConfigError::InvalidAssumeRole(format!(
                "duration must be between {} and {} seconds, got {}",
                MIN_ASSUME_ROLE_DURATION_SECS, MAX_ASSUME_ROLE_DURATION_SECS, self.duration_secs
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub profile: String,
    pub region: Option<String>,

    /// Raw output format name, checked by [`ScanConfig::validate`]
    pub output: String,

    pub max_workers: usize,
    pub request_timeout_secs: u64,

    /// Deadline for the whole scan; the scan is cancelled when it passes
    pub scan_timeout_secs: Option<u64>,

    pub rate_limit_per_sec: f64,
    pub rate_limit_burst: u32,
    pub max_retries: u32,
    pub log_level: String,
    pub assume_role: Option<AssumeRoleConfig>,
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Default for ScanConfig {
    fn default() -> Self {
        let profile = env_non_empty("FSS_PROFILE")
            .or_else(|| env_non_empty("AWS_PROFILE"))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        let region = env_non_empty("FSS_REGION").or_else(|| env_non_empty("AWS_REGION"));

        let output = env_non_empty("FSS_OUTPUT")
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string())
            .to_lowercase();

        let log_level = env::var("FSS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            profile,
            region,
            output,
            max_workers: env_parse("FSS_MAX_WORKERS").unwrap_or(DEFAULT_MAX_WORKERS),
            request_timeout_secs: env_parse("FSS_REQUEST_TIMEOUT")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            scan_timeout_secs: env_parse("FSS_SCAN_TIMEOUT"),
            rate_limit_per_sec: env_parse("FSS_RATE_LIMIT").unwrap_or(DEFAULT_RATE_LIMIT),
            rate_limit_burst: env_parse("FSS_RATE_BURST").unwrap_or(DEFAULT_RATE_BURST),
            max_retries: env_parse("FSS_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
            log_level,
            assume_role: None,
        }
    }
}

impl ScanConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.region {
            Some(region) if !region.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingRegion),
        }

        self.output_format()?;

        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Worker count must be between 1 and {}, got {}",
                MAX_WORKERS_LIMIT, self.max_workers
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.scan_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "Scan timeout must be at least 1 second".to_string(),
            ));
        }

        if !(self.rate_limit_per_sec.is_finite() && self.rate_limit_per_sec > 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "Rate limit must be a positive number of requests per second, got {}",
                self.rate_limit_per_sec
            )));
        }
        if self.rate_limit_burst == 0 {
            return Err(ConfigError::ValidationFailed(
                "Rate limit burst must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if let Some(assume_role) = &self.assume_role {
            assume_role.validate()?;
        }

        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        self.output
            .parse()
            .map_err(|_| ConfigError::InvalidOutputFormat(self.output.clone()))
    }

    /// Region to scan; empty until validated
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or_default()
    }

    /// Named profile to load, or `None` to use the default credential chain
    pub fn named_profile(&self) -> Option<&str> {
        let profile = self.profile.trim();
        if profile.is_empty() || profile == DEFAULT_PROFILE {
            None
        } else {
            Some(profile)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

impl fmt::Display for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan Configuration:")?;
        writeln!(f, "  Profile: {}", self.profile)?;
        writeln!(f, "  Region: {}", self.region.as_deref().unwrap_or("<unset>"))?;
        writeln!(f, "  Output: {}", self.output)?;
        writeln!(f, "  Workers: {}", self.max_workers)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        if let Some(secs) = self.scan_timeout_secs {
            writeln!(f, "  Scan Timeout: {}s", secs)?;
        }
        writeln!(
            f,
            "  Rate Limit: {}/s (burst {})",
            self.rate_limit_per_sec, self.rate_limit_burst
        )?;
        writeln!(f, "  Max Retries: {}", self.max_retries)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        if let Some(role) = &self.assume_role {
            writeln!(
                f,
                "  Assume Role: {} (session {}, {}s)",
                role.role_arn, role.session_name, role.duration_secs
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: &[&str] = &[
        "FSS_PROFILE",
        "AWS_PROFILE",
        "FSS_REGION",
        "AWS_REGION",
        "FSS_OUTPUT",
        "FSS_MAX_WORKERS",
        "FSS_REQUEST_TIMEOUT",
        "FSS_SCAN_TIMEOUT",
        "FSS_RATE_LIMIT",
        "FSS_RATE_BURST",
        "FSS_MAX_RETRIES",
        "FSS_LOG_LEVEL",
    ];

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn remove(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clean_env() -> Vec<EnvGuard> {
        ENV_KEYS.iter().map(|key| EnvGuard::remove(key)).collect()
    }

    fn valid() -> ScanConfig {
        ScanConfig {
            region: Some("us-east-1".to_string()),
            ..clean_default()
        }
    }

    fn clean_default() -> ScanConfig {
        let _guards = clean_env();
        ScanConfig::default()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let config = clean_default();

        assert_eq!(config.profile, DEFAULT_PROFILE);
        assert_eq!(config.region, None);
        assert_eq!(config.output, "json");
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.scan_timeout_secs, None);
        assert_eq!(config.rate_limit_per_sec, 5.0);
        assert_eq!(config.rate_limit_burst, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.assume_role.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _clean = clean_env();
        let _guards = vec![
            EnvGuard::set("FSS_PROFILE", "prod"),
            EnvGuard::set("FSS_REGION", "eu-west-1"),
            EnvGuard::set("FSS_OUTPUT", "TSV"),
            EnvGuard::set("FSS_MAX_WORKERS", "25"),
            EnvGuard::set("FSS_REQUEST_TIMEOUT", "60"),
            EnvGuard::set("FSS_SCAN_TIMEOUT", "300"),
            EnvGuard::set("FSS_RATE_LIMIT", "2.5"),
            EnvGuard::set("FSS_RATE_BURST", "4"),
            EnvGuard::set("FSS_MAX_RETRIES", "0"),
            EnvGuard::set("FSS_LOG_LEVEL", "DEBUG"),
        ];

        let config = ScanConfig::default();

        assert_eq!(config.profile, "prod");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.output_format(), Ok(OutputFormat::Tsv));
        assert_eq!(config.max_workers, 25);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.scan_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.rate_limit_per_sec, 2.5);
        assert_eq!(config.rate_limit_burst, 4);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_aws_fallback_variables() {
        let _clean = clean_env();
        let _guards = vec![
            EnvGuard::set("AWS_PROFILE", "sandbox"),
            EnvGuard::set("AWS_REGION", "ap-northeast-1"),
        ];

        let config = ScanConfig::default();
        assert_eq!(config.profile, "sandbox");
        assert_eq!(config.region(), "ap-northeast-1");
    }

    #[test]
    #[serial]
    fn test_fss_variables_win_over_aws() {
        let _clean = clean_env();
        let _guards = vec![
            EnvGuard::set("AWS_REGION", "ap-northeast-1"),
            EnvGuard::set("FSS_REGION", "us-west-2"),
        ];

        assert_eq!(ScanConfig::default().region(), "us-west-2");
    }

    #[test]
    #[serial]
    fn test_unparseable_numbers_fall_back() {
        let _clean = clean_env();
        let _guard = EnvGuard::set("FSS_MAX_WORKERS", "many");

        assert_eq!(ScanConfig::default().max_workers, DEFAULT_MAX_WORKERS);
    }

    #[test]
    #[serial]
    fn test_validation_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_validation_missing_region() {
        let mut config = valid();
        config.region = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingRegion));

        config.region = Some("  ".to_string());
        assert_eq!(config.validate(), Err(ConfigError::MissingRegion));
    }

    #[test]
    #[serial]
    fn test_validation_invalid_output() {
        let mut config = valid();
        config.output = "xml".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidOutputFormat("xml".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_validation_invalid_numbers() {
        let cases: Vec<Box<dyn Fn(&mut ScanConfig)>> = vec![
            Box::new(|c| c.max_workers = 0),
            Box::new(|c| c.max_workers = 101),
            Box::new(|c| c.request_timeout_secs = 0),
            Box::new(|c| c.request_timeout_secs = 601),
            Box::new(|c| c.scan_timeout_secs = Some(0)),
            Box::new(|c| c.rate_limit_per_sec = 0.0),
            Box::new(|c| c.rate_limit_per_sec = -1.0),
            Box::new(|c| c.rate_limit_burst = 0),
            Box::new(|c| c.log_level = "loud".to_string()),
        ];

        for mutate in cases {
            let mut config = valid();
            mutate(&mut config);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ValidationFailed(_))
            ));
        }
    }

    #[test]
    fn test_assume_role_validation() {
        assert!(AssumeRoleConfig::new("arn:aws:iam::123456789012:role/Scanner")
            .validate()
            .is_ok());

        let empty_arn = AssumeRoleConfig::new("");
        assert!(matches!(
            empty_arn.validate(),
            Err(ConfigError::InvalidAssumeRole(_))
        ));

        let mut empty_session = AssumeRoleConfig::new("arn:aws:iam::123:role/R");
        empty_session.session_name = String::new();
        assert!(empty_session.validate().is_err());

        for duration in [899, 43_201] {
            let mut role = AssumeRoleConfig::new("arn:aws:iam::123:role/R");
            role.duration_secs = duration;
            assert!(role.validate().is_err(), "duration {} accepted", duration);
        }

        for duration in [900, 43_200] {
            let mut role = AssumeRoleConfig::new("arn:aws:iam::123:role/R");
            role.duration_secs = duration;
            assert!(role.validate().is_ok(), "duration {} rejected", duration);
        }
    }

    #[test]
    #[serial]
    fn test_validation_checks_assume_role() {
        let mut config = valid();
        config.assume_role = Some(AssumeRoleConfig {
            duration_secs: 60,
            ..AssumeRoleConfig::new("arn:aws:iam::123:role/R")
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAssumeRole(_))
        ));
    }

    #[test]
    #[serial]
    fn test_named_profile() {
        let mut config = valid();
        assert_eq!(config.named_profile(), None);

        config.profile = "prod".to_string();
        assert_eq!(config.named_profile(), Some("prod"));
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let mut config = valid();
        config.assume_role = Some(AssumeRoleConfig::new("arn:aws:iam::123:role/R"));
        let display = config.to_string();

        assert!(display.contains("Scan Configuration:"));
        assert!(display.contains("Region: us-east-1"));
        assert!(display.contains("Assume Role: arn:aws:iam::123:role/R"));
    }
}
