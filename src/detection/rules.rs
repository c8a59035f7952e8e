use super::types::{DetectionVerdict, ResourceRecord, StackDetail};
use std::sync::Arc;

/// Logical ID the Serverless Framework assigns to its deployment bucket
pub const SERVERLESS_DEPLOYMENT_BUCKET: &str = "ServerlessDeploymentBucket";

/// CloudFormation resource type of an S3 bucket
pub const S3_BUCKET_TYPE: &str = "AWS::S3::Bucket";

/// A heuristic that decides whether a stack looks like it was deployed by
/// the Serverless Framework.
///
/// Implementations must be pure: the same inputs always produce the same
/// answer, inputs are never mutated and nothing is retained between calls.
/// A single engine is shared by every scan worker.
pub trait DetectionRule: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the human-readable reason when the rule matches
    fn check(&self, resources: &[ResourceRecord], detail: Option<&StackDetail>) -> Option<String>;
}

pub struct ServerlessDeploymentBucketRule;

impl DetectionRule for ServerlessDeploymentBucketRule {
    fn name(&self) -> &str {
        "ServerlessDeploymentBucket"
    }

    fn check(&self, resources: &[ResourceRecord], _detail: Option<&StackDetail>) -> Option<String> {
        has_serverless_deployment_bucket(resources).then(|| {
            format!(
                "Contains resource with logical ID '{}'",
                SERVERLESS_DEPLOYMENT_BUCKET
            )
        })
    }
}

/// True when some resource has exactly the deployment bucket logical ID and
/// the S3 bucket type. Both must hold on the same resource.
pub fn has_serverless_deployment_bucket(resources: &[ResourceRecord]) -> bool {
    resources.iter().any(|resource| {
        resource.logical_id.as_deref() == Some(SERVERLESS_DEPLOYMENT_BUCKET)
            && resource.resource_type.as_deref() == Some(S3_BUCKET_TYPE)
    })
}

/// Ordered, append-only set of detection rules
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<Arc<dyn DetectionRule>>,
}

impl RuleEngine {
    /// Creates an engine without any rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Creates an engine with the built-in rules
    pub fn with_defaults() -> Self {
        let mut engine = Self::empty();
        engine.register(ServerlessDeploymentBucketRule);
        engine
    }

    /// Appends a rule. Names are not checked for uniqueness.
    pub fn register(&mut self, rule: impl DetectionRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule in registration order and collects all reasons
    pub fn evaluate(
        &self,
        resources: &[ResourceRecord],
        detail: Option<&StackDetail>,
    ) -> DetectionVerdict {
        let reasons = self
            .rules
            .iter()
            .filter_map(|rule| rule.check(resources, detail))
            .collect();
        DetectionVerdict::new(reasons)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .finish()
    }
}
