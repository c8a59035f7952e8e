use super::{SourceError, StackDataSource};
use crate::detection::types::{ResourceRecord, StackCandidate, StackDetail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted in-memory stack source
///
/// Built up front and then shared read-only by the detector's workers.
/// Counters record how the source was used so tests can assert on call
/// patterns and peak concurrency.
#[derive(Debug, Default)]
pub struct MockStackSource {
    candidates: Vec<StackCandidate>,
    listing_error: Option<SourceError>,
    resources: HashMap<String, Result<Vec<ResourceRecord>, SourceError>>,
    details: HashMap<String, Result<Option<StackDetail>, SourceError>>,
    latency: Option<Duration>,
    list_calls: AtomicUsize,
    resource_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockStackSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listed stack with the given resources and no detail
    pub fn with_stack(mut self, name: impl Into<String>, resources: Vec<ResourceRecord>) -> Self {
        let name = name.into();
        let id = format!(
            "arn:aws:cloudformation:us-east-1:123456789012:stack/{}/mock",
            name
        );
        self.candidates.push(StackCandidate::new(name.clone(), id));
        self.resources.insert(name, Ok(resources));
        self
    }

    /// Adds a raw candidate without scripting any per-stack responses
    pub fn with_candidate(mut self, candidate: StackCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn with_detail(mut self, name: impl Into<String>, detail: StackDetail) -> Self {
        self.details.insert(name.into(), Ok(Some(detail)));
        self
    }

    pub fn with_resource_error(mut self, name: impl Into<String>, error: SourceError) -> Self {
        self.resources.insert(name.into(), Err(error));
        self
    }

    pub fn with_detail_error(mut self, name: impl Into<String>, error: SourceError) -> Self {
        self.details.insert(name.into(), Err(error));
        self
    }

    pub fn with_listing_error(mut self, error: SourceError) -> Self {
        self.listing_error = Some(error);
        self
    }

    /// Delays every per-stack call, honouring cancellation while waiting
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn resource_calls(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Highest number of per-stack calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self, cancel: &CancellationToken) -> Result<(), SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = match self.latency {
            Some(latency) => tokio::select! {
                _ = cancel.cancelled() => Err(SourceError::Cancelled),
                _ = tokio::time::sleep(latency) => Ok(()),
            },
            None => {
                tokio::task::yield_now().await;
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
impl StackDataSource for MockStackSource {
    async fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StackCandidate>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        if let Some(error) = &self.listing_error {
            return Err(error.clone());
        }
        Ok(self.candidates.clone())
    }

    async fn get_resources(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Vec<ResourceRecord>, SourceError> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io(cancel).await?;

        match self.resources.get(stack_name) {
            Some(result) => result.clone(),
            None => Err(SourceError::NotFound {
                stack_name: stack_name.to_string(),
            }),
        }
    }

    async fn get_detail(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Option<StackDetail>, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io(cancel).await?;

        self.details.get(stack_name).cloned().unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_scripted_data() {
        let source = MockStackSource::new()
            .with_stack("app", vec![ResourceRecord::new("Fn", "AWS::Lambda::Function")])
            .with_detail(
                "app",
                StackDetail {
                    description: Some("desc".to_string()),
                    ..Default::default()
                },
            );
        let cancel = CancellationToken::new();

        let candidates = source.list_candidates(&cancel).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].usable_name(), Some("app"));

        let resources = source.get_resources(&cancel, "app").await.unwrap();
        assert_eq!(resources.len(), 1);

        let detail = source.get_detail(&cancel, "app").await.unwrap();
        assert_eq!(detail.unwrap().description.as_deref(), Some("desc"));

        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.resource_calls(), 1);
        assert_eq!(source.detail_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_stack() {
        let source = MockStackSource::new();
        let cancel = CancellationToken::new();

        assert!(matches!(
            source.get_resources(&cancel, "missing").await,
            Err(SourceError::NotFound { .. })
        ));
        assert_eq!(source.get_detail(&cancel, "missing").await, Ok(None));
    }

    #[tokio::test]
    async fn test_mock_honours_cancellation() {
        let source = MockStackSource::new()
            .with_stack("app", vec![])
            .with_latency(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            source.list_candidates(&cancel).await,
            Err(SourceError::Cancelled)
        );
        assert_eq!(
            source.get_resources(&cancel, "app").await,
            Err(SourceError::Cancelled)
        );
    }
}
