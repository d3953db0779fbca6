//! MCP tool inputs for the ChronoLog operations.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input for start_chronolog tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct StartChronologInput {
    /// Chronicle to create or open (defaults to the configured chronicle)
    #[serde(default)]
    pub chronicle_name: Option<String>,

    /// Story to acquire (defaults to the configured story)
    #[serde(default)]
    pub story_name: Option<String>,
}

/// Input for record_interaction tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct RecordInteractionInput {
    /// What the user said
    pub user_message: String,

    /// What the assistant answered
    pub assistant_message: String,
}

/// One end of a retrieval range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
#[serde(untagged)]
pub enum TimeArg {
    /// Nanoseconds since the Unix epoch
    Nanos(u64),
    /// "yesterday", "today", "tomorrow", a YYYY-MM-DD date, or digits
    Expression(String),
    /// Any other JSON value; rejected when the range is resolved
    Other(serde_json::Value),
}

impl TimeArg {
    pub fn to_token(&self) -> String {
        match self {
            TimeArg::Nanos(nanos) => nanos.to_string(),
            TimeArg::Expression(expr) => expr.clone(),
            TimeArg::Other(value) => value.to_string(),
        }
    }
}

/// Input for retrieve_interaction tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct RetrieveInteractionInput {
    /// Chronicle to read (defaults to the configured chronicle)
    #[serde(default)]
    pub chronicle_name: Option<String>,

    /// Story to read (defaults to the configured story)
    #[serde(default)]
    pub story_name: Option<String>,

    /// Inclusive start of the range; a date means the start of that day
    #[serde(default)]
    pub start: Option<TimeArg>,

    /// Inclusive end of the range; a date means the end of that day
    #[serde(default)]
    pub end: Option<TimeArg>,
}

/// Treat missing, empty and whitespace-only names alike.
pub(crate) fn name_or<'a>(name: Option<&'a str>, default: &'a str) -> &'a str {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => default,
    }
}
