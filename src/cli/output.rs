//! Output formatting for scan results
//!
//! Two renderings of the same [`StacksOutput`]:
//! - JSON: compact `{"stacks":[...]}` with lower-camel-case fields
//! - TSV: a fixed header row plus one row per stack, with tags and reasons
//!   flattened into `;`-joined cells
//!
//! # Example
//!
//! ```
//! use find_serverless_stacks::cli::output::{OutputFormat, OutputFormatter};
//! use find_serverless_stacks::output::StacksOutput;
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let rendered = formatter.format(&StacksOutput::default()).unwrap();
//! assert_eq!(rendered, r#"{"stacks":[]}"#);
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::output::schema::{DetectedStack, StacksOutput};

pub const TSV_HEADER: [&str; 8] = [
    "StackName",
    "StackID",
    "Region",
    "Description",
    "CreatedAt",
    "UpdatedAt",
    "Tags",
    "Reasons",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact JSON envelope (machine-readable)
    #[default]
    Json,
    /// Tab-separated values with a header row
    Tsv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Tsv => "tsv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "tsv" => Ok(OutputFormat::Tsv),
            other => Err(format!(
                "unsupported output format: {} (supported formats: json, tsv)",
                other
            )),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Renders a whole scan result
    pub fn format(&self, output: &StacksOutput) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(output),
            OutputFormat::Tsv => Ok(self.format_tsv(output)),
        }
    }

    fn format_json(&self, output: &StacksOutput) -> Result<String> {
        serde_json::to_string(output).context("Failed to serialize scan result to JSON")
    }

    fn format_tsv(&self, output: &StacksOutput) -> String {
        let mut lines = Vec::with_capacity(output.stacks.len() + 1);
        lines.push(TSV_HEADER.join("\t"));
        lines.extend(output.stacks.iter().map(tsv_row));
        lines.join("\n")
    }
}

fn tsv_row(stack: &DetectedStack) -> String {
    [
        escape_tsv(&stack.stack_name),
        escape_tsv(&stack.stack_id),
        escape_tsv(&stack.region),
        escape_tsv(&stack.description),
        format_time(&stack.created_at),
        format_time(&stack.updated_at),
        format_tags(&stack.stack_tags),
        format_reasons(&stack.reasons),
    ]
    .join("\t")
}

/// Escapes characters that would break the row/column structure
pub fn escape_tsv(value: &str) -> String {
    value
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `key=value` pairs in key order, `;`-joined
fn format_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(key, value)| format!("{}={}", escape_tsv(key), escape_tsv(value)))
        .collect::<Vec<_>>()
        .join(";")
}

fn format_reasons(reasons: &[String]) -> String {
    reasons
        .iter()
        .map(|reason| escape_tsv(reason))
        .collect::<Vec<_>>()
        .join(";")
}
