use clap::{Parser, ValueEnum};

use crate::config::{
    AssumeRoleConfig, ScanConfig, DEFAULT_ASSUME_ROLE_DURATION_SECS, DEFAULT_SESSION_NAME,
};

/// Find CloudFormation stacks deployed by the Serverless Framework
#[derive(Parser, Debug, Clone)]
#[command(
    name = "find-serverless-stacks",
    about = "Find CloudFormation stacks deployed by the Serverless Framework",
    version,
    author,
    long_about = "Scans every active CloudFormation stack in one region and reports the ones \
                  that carry the Serverless Framework deployment bucket.\n\n\
                  Examples:\n  \
                  find-serverless-stacks --region us-east-1\n  \
                  find-serverless-stacks --region eu-west-1 --profile prod --output tsv\n  \
                  find-serverless-stacks --region us-east-1 --assume-role arn:aws:iam::123456789012:role/Scanner"
)]
pub struct CliArgs {
    #[arg(short = 'p', long, value_name = "PROFILE", help = "AWS profile name (default: default credential chain)")]
    pub profile: Option<String>,

    #[arg(short = 'r', long, value_name = "REGION", help = "AWS region to scan")]
    pub region: Option<String>,

    #[arg(short = 'o', long, value_enum, value_name = "FORMAT", help = "Output format [default: json]")]
    pub output: Option<OutputFormatArg>,

    #[arg(long, value_name = "N", help = "Number of stacks inspected concurrently [default: 10]")]
    pub workers: Option<usize>,

    #[arg(long, value_name = "SECONDS", help = "Abort the scan after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "SECONDS", help = "Timeout for each AWS API request [default: 30]")]
    pub request_timeout: Option<u64>,

    #[arg(long, value_name = "PER_SEC", help = "Maximum AWS API requests per second [default: 5]")]
    pub rate_limit: Option<f64>,

    #[arg(long, value_name = "N", help = "Maximum burst of AWS API requests [default: 10]")]
    pub rate_burst: Option<u32>,

    #[arg(long, value_name = "N", help = "Retries for throttled or failed requests [default: 3]")]
    pub max_retries: Option<u32>,

    #[arg(long, value_name = "ROLE_ARN", help = "IAM role to assume before scanning")]
    pub assume_role: Option<String>,

    #[arg(
        long,
        value_name = "NAME",
        requires = "assume_role",
        default_value = DEFAULT_SESSION_NAME,
        help = "Session name for the assumed role"
    )]
    pub session_name: String,

    #[arg(
        long,
        value_name = "SECONDS",
        requires = "assume_role",
        default_value_t = DEFAULT_ASSUME_ROLE_DURATION_SECS,
        help = "Assumed role session duration (900-43200)"
    )]
    pub duration: u32,

    #[arg(long, value_name = "ID", requires = "assume_role", help = "External ID for the assumed role")]
    pub external_id: Option<String>,

    #[arg(long, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Tsv,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Tsv => super::output::OutputFormat::Tsv,
        }
    }
}

impl CliArgs {
    /// Layers explicit flags over an environment-derived configuration
    pub fn apply_to(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(output) = self.output {
            config.output = super::output::OutputFormat::from(output).to_string();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.scan_timeout_secs = Some(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(rate) = self.rate_limit {
            config.rate_limit_per_sec = rate;
        }
        if let Some(burst) = self.rate_burst {
            config.rate_limit_burst = burst;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.to_lowercase();
        }
        if let Some(role_arn) = &self.assume_role {
            config.assume_role = Some(AssumeRoleConfig {
                role_arn: role_arn.clone(),
                session_name: self.session_name.clone(),
                duration_secs: self.duration,
                external_id: self.external_id.clone(),
            });
        }
        config
    }
}
