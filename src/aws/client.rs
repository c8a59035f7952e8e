use super::rate_limit::TokenBucket;
use super::retry::{retry_with_backoff, RetryConfig};
use crate::config::ScanConfig;
use crate::detection::types::{ResourceRecord, StackCandidate, StackDetail};
use crate::source::{SourceError, StackDataSource};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudformation::types::{Stack, StackResource, StackStatus, StackSummary};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PERMISSION_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
];

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

const NETWORK_MARKERS: &[&str] = &["no such host", "connection refused", "timeout", "timed out"];

/// Stack statuses considered live enough to scan
pub fn active_statuses() -> Vec<StackStatus> {
    vec![
        StackStatus::CreateComplete,
        StackStatus::UpdateComplete,
        StackStatus::UpdateRollbackComplete,
    ]
}

/// [`StackDataSource`] backed by the CloudFormation API
#[derive(Debug, Clone)]
pub struct CloudFormationSource {
    client: Client,
    region: String,
    limiter: Arc<TokenBucket>,
    retry: RetryConfig,
    request_timeout: Duration,
}

impl CloudFormationSource {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
            limiter: Arc::new(TokenBucket::default()),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Builds a source from loaded SDK configuration and the scan settings
    pub fn from_config(sdk_config: &SdkConfig, config: &ScanConfig) -> Self {
        Self::new(Client::new(sdk_config), config.region())
            .with_rate_limit(TokenBucket::new(
                config.rate_limit_per_sec,
                config.rate_limit_burst,
            ))
            .with_retry(RetryConfig::default().with_max_retries(config.max_retries))
            .with_request_timeout(config.request_timeout())
    }

    pub fn with_rate_limit(mut self, limiter: TokenBucket) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sends one request through the limiter, timeout, retry and cancellation
    async fn call<T, E, R, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        stack_name: Option<&str>,
        mut send: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SdkError<E, R>>>,
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: Debug,
    {
        retry_with_backoff(&self.retry, cancel, operation, || {
            let request = send();
            self.attempt(cancel, operation, stack_name, request)
        })
        .await
    }

    async fn attempt<T, E, R>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        stack_name: Option<&str>,
        request: impl Future<Output = Result<T, SdkError<E, R>>>,
    ) -> Result<T, SourceError>
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: Debug,
    {
        self.limiter.acquire(cancel).await?;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            outcome = tokio::time::timeout(self.request_timeout, request) => outcome,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify_sdk_error(&e, &self.region, stack_name)),
            Err(_) => Err(SourceError::network(format!(
                "{} timed out after {}s",
                operation,
                self.request_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl StackDataSource for CloudFormationSource {
    async fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StackCandidate>, SourceError> {
        let mut candidates = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let token = next_token.take();
            let page = self
                .call(cancel, "ListStacks", None, || {
                    self.client
                        .list_stacks()
                        .set_stack_status_filter(Some(active_statuses()))
                        .set_next_token(token.clone())
                        .send()
                })
                .await?;

            pages += 1;
            candidates.extend(page.stack_summaries().iter().map(candidate_from_summary));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            region = %self.region,
            pages,
            stacks = candidates.len(),
            "Listed active stacks"
        );
        Ok(candidates)
    }

    async fn get_resources(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Vec<ResourceRecord>, SourceError> {
        let output = self
            .call(cancel, "DescribeStackResources", Some(stack_name), || {
                self.client
                    .describe_stack_resources()
                    .stack_name(stack_name)
                    .send()
            })
            .await?;

        Ok(output
            .stack_resources()
            .iter()
            .map(resource_from_sdk)
            .collect())
    }

    async fn get_detail(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Option<StackDetail>, SourceError> {
        let output = self
            .call(cancel, "DescribeStacks", Some(stack_name), || {
                self.client.describe_stacks().stack_name(stack_name).send()
            })
            .await?;

        Ok(output.stacks().first().map(detail_from_sdk))
    }
}

fn to_utc(time: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn candidate_from_summary(summary: &StackSummary) -> StackCandidate {
    StackCandidate {
        name: summary.stack_name().map(str::to_string),
        id: summary.stack_id().map(str::to_string),
        status: summary.stack_status().map(|s| s.as_str().to_string()),
        creation_time: to_utc(summary.creation_time()),
        last_updated_time: to_utc(summary.last_updated_time()),
    }
}

fn resource_from_sdk(resource: &StackResource) -> ResourceRecord {
    ResourceRecord {
        logical_id: resource.logical_resource_id().map(str::to_string),
        resource_type: resource.resource_type().map(str::to_string),
        physical_id: resource.physical_resource_id().map(str::to_string),
        status: resource.resource_status().map(|s| s.as_str().to_string()),
    }
}

/// Tags missing either key or value are dropped
fn detail_from_sdk(stack: &Stack) -> StackDetail {
    let tags: BTreeMap<String, String> = stack
        .tags()
        .iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
        .collect();

    StackDetail {
        description: stack.description().map(str::to_string),
        creation_time: to_utc(stack.creation_time()),
        last_updated_time: to_utc(stack.last_updated_time()),
        tags,
    }
}

fn classify_sdk_error<E, R>(
    error: &SdkError<E, R>,
    region: &str,
    stack_name: Option<&str>,
) -> SourceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    let detail = DisplayErrorContext(error).to_string();

    if matches!(
        error,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    ) {
        return SourceError::network(detail);
    }

    classify_error_code(
        error.code(),
        error.message().unwrap_or_default(),
        detail,
        region,
        stack_name,
    )
}

/// Maps an AWS error code and message onto the source error taxonomy
pub(crate) fn classify_error_code(
    code: Option<&str>,
    message: &str,
    detail: String,
    region: &str,
    stack_name: Option<&str>,
) -> SourceError {
    match code {
        Some(code) if PERMISSION_CODES.contains(&code) => {
            return SourceError::PermissionDenied { message: detail }
        }
        Some(code) if THROTTLING_CODES.contains(&code) => {
            return SourceError::RateLimited { message: detail }
        }
        Some("InvalidParameterValue") if message.to_lowercase().contains("region") => {
            return SourceError::InvalidRegion {
                region: region.to_string(),
                message: detail,
            }
        }
        Some("ValidationError") if message.contains("does not exist") => {
            if let Some(stack_name) = stack_name {
                return SourceError::NotFound {
                    stack_name: stack_name.to_string(),
                };
            }
        }
        _ => {}
    }

    let lowered = detail.to_lowercase();
    if NETWORK_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return SourceError::network(detail);
    }

    SourceError::unknown(detail)
}
