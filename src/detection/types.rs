//! Value types flowing through a scan
//!
//! A [`StackDataSource`](crate::source::StackDataSource) converts whatever its
//! backend returns into these types; the rule engine and detector only ever
//! see them. Fields a backend may omit are `Option`s, keeping "absent" and
//! "empty" distinct.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A stack as returned by the bulk listing call, before enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackCandidate {
    /// Stack name; malformed listing entries may lack one
    pub name: Option<String>,

    /// Opaque identifier, usually the stack ARN
    pub id: Option<String>,

    /// Lifecycle status (e.g. `CREATE_COMPLETE`)
    pub status: Option<String>,

    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated_time: Option<DateTime<Utc>>,
}

impl StackCandidate {
    /// Creates a candidate with a name and identifier
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Returns the stack name when present and non-empty
    pub fn usable_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// One resource belonging to a stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    pub logical_id: Option<String>,
    pub resource_type: Option<String>,
    pub physical_id: Option<String>,
    pub status: Option<String>,
}

impl ResourceRecord {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: Some(logical_id.into()),
            resource_type: Some(resource_type.into()),
            ..Default::default()
        }
    }
}

/// Optional enrichment for a stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackDetail {
    pub description: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated_time: Option<DateTime<Utc>>,
    pub tags: BTreeMap<String, String>,
}

/// Rule engine output for one stack
///
/// `is_match()` is derived from `reasons`, so a verdict can never claim a
/// match without a reason or vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionVerdict {
    reasons: Vec<String>,
}

impl DetectionVerdict {
    pub fn new(reasons: Vec<String>) -> Self {
        Self { reasons }
    }

    pub fn is_match(&self) -> bool {
        !self.reasons.is_empty()
    }

    /// Reasons in rule registration order
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn into_reasons(self) -> Vec<String> {
        self.reasons
    }
}
