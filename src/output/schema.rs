//! Detection result schema
//!
//! [`DetectedStack`] is the reported entity for one matched stack and
//! [`StacksOutput`] is the envelope for a whole scan. Field names serialize
//! in lower camel case (`stackName`, `stackId`, `stackTags`, ...).

use crate::detection::types::{StackCandidate, StackDetail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// A stack that matched at least one detection rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedStack {
    pub stack_name: String,
    pub stack_id: String,
    /// Region the scan ran in, not derived from the stack itself
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub stack_tags: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub reasons: Vec<String>,
}

impl DetectedStack {
    /// Builds the reported entity from the listing entry and optional detail
    ///
    /// Detail wins over the listing entry for timestamps. Timestamps are
    /// never left unset: a missing creation time becomes `now` and a missing
    /// update time mirrors the creation time.
    pub fn from_parts(
        candidate: &StackCandidate,
        detail: Option<&StackDetail>,
        region: &str,
        reasons: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let (description, tags, created_at, updated_at) = match detail {
            Some(detail) => (
                detail.description.clone().unwrap_or_default(),
                detail.tags.clone(),
                detail.creation_time,
                detail.last_updated_time,
            ),
            None => (
                String::new(),
                BTreeMap::new(),
                candidate.creation_time,
                candidate.last_updated_time,
            ),
        };

        let created_at = created_at.unwrap_or(now);
        let updated_at = updated_at.unwrap_or(created_at);

        Self {
            stack_name: candidate.name.clone().unwrap_or_default(),
            stack_id: candidate.id.clone().unwrap_or_default(),
            region: region.to_string(),
            created_at,
            updated_at,
            description,
            stack_tags: tags,
            reasons,
        }
    }
}

impl fmt::Display for DetectedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.stack_name, self.region)?;
        writeln!(f, "  ID: {}", self.stack_id)?;
        if !self.description.is_empty() {
            writeln!(f, "  Description: {}", self.description)?;
        }
        writeln!(f, "  Created: {}", self.created_at.to_rfc3339())?;
        writeln!(f, "  Updated: {}", self.updated_at.to_rfc3339())?;
        for reason in &self.reasons {
            writeln!(f, "  - {}", reason)?;
        }
        Ok(())
    }
}

/// Output envelope for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacksOutput {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub stacks: Vec<DetectedStack>,
}

impl StacksOutput {
    pub fn new(stacks: Vec<DetectedStack>) -> Self {
        Self { stacks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    fn candidate() -> StackCandidate {
        StackCandidate {
            name: Some("my-api-dev".to_string()),
            id: Some("arn:aws:cloudformation:us-east-1:123:stack/my-api-dev/abc".to_string()),
            status: Some("CREATE_COMPLETE".to_string()),
            creation_time: Some(ts(1)),
            last_updated_time: Some(ts(2)),
        }
    }

    #[test]
    fn test_from_parts_prefers_detail() {
        let detail = StackDetail {
            description: Some("My stack".to_string()),
            creation_time: Some(ts(5)),
            last_updated_time: Some(ts(6)),
            tags: BTreeMap::from([("Owner".to_string(), "team-a".to_string())]),
        };

        let stack = DetectedStack::from_parts(
            &candidate(),
            Some(&detail),
            "us-east-1",
            vec!["reason".to_string()],
            ts(23),
        );

        assert_eq!(stack.stack_name, "my-api-dev");
        assert_eq!(stack.region, "us-east-1");
        assert_eq!(stack.description, "My stack");
        assert_eq!(stack.created_at, ts(5));
        assert_eq!(stack.updated_at, ts(6));
        assert_eq!(stack.stack_tags.get("Owner").map(String::as_str), Some("team-a"));
        assert_eq!(stack.reasons, vec!["reason".to_string()]);
    }

    #[test]
    fn test_from_parts_without_detail_uses_candidate() {
        let stack = DetectedStack::from_parts(&candidate(), None, "eu-west-1", vec![], ts(23));

        assert_eq!(stack.description, "");
        assert!(stack.stack_tags.is_empty());
        assert_eq!(stack.created_at, ts(1));
        assert_eq!(stack.updated_at, ts(2));
        assert_eq!(stack.region, "eu-west-1");
    }

    #[test]
    fn test_missing_timestamps_fall_back() {
        let mut bare = candidate();
        bare.creation_time = None;
        bare.last_updated_time = None;

        let stack = DetectedStack::from_parts(&bare, None, "us-east-1", vec![], ts(23));
        assert_eq!(stack.created_at, ts(23));
        assert_eq!(stack.updated_at, ts(23));
    }

    #[test]
    fn test_missing_update_time_mirrors_creation() {
        let detail = StackDetail {
            creation_time: Some(ts(3)),
            ..Default::default()
        };
        let stack = DetectedStack::from_parts(&candidate(), Some(&detail), "us-east-1", vec![], ts(23));
        assert_eq!(stack.created_at, ts(3));
        assert_eq!(stack.updated_at, ts(3));
    }

    #[test]
    fn test_serializes_camel_case() {
        let stack = DetectedStack::from_parts(&candidate(), None, "us-east-1", vec![], ts(23));
        let json = serde_json::to_value(StacksOutput::new(vec![stack])).unwrap();
        let entry = &json["stacks"][0];

        for key in [
            "stackName",
            "stackId",
            "region",
            "createdAt",
            "updatedAt",
            "description",
            "stackTags",
            "reasons",
        ] {
            assert!(entry.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(entry["createdAt"], "2024-01-15T01:00:00Z");
    }

    #[test]
    fn test_deserialize_null_collections() {
        let json = r#"{"stacks":[{
            "stackName":"a","stackId":"b","region":"us-east-1",
            "createdAt":"2024-01-15T01:00:00Z","updatedAt":"2024-01-15T01:00:00Z",
            "description":null,"stackTags":null,"reasons":null
        }]}"#;
        let output: StacksOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.stacks.len(), 1);
        assert!(output.stacks[0].stack_tags.is_empty());
        assert!(output.stacks[0].reasons.is_empty());
    }

    #[test]
    fn test_display() {
        let stack = DetectedStack::from_parts(
            &candidate(),
            None,
            "us-east-1",
            vec!["matched".to_string()],
            ts(23),
        );
        let display = stack.to_string();
        assert!(display.contains("my-api-dev (us-east-1)"));
        assert!(display.contains("  - matched"));
    }
}
