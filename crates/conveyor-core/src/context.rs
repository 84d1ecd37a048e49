//! Event context: the immutable description of a triggering occurrence.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Category of the event that triggered planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Push,
    MergeRequestEvent,
    Schedule,
    Manual,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Push => "push",
            TriggerSource::MergeRequestEvent => "merge_request_event",
            TriggerSource::Schedule => "schedule",
            TriggerSource::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TriggerSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "push" => Ok(TriggerSource::Push),
            "merge_request_event" | "merge-request" => Ok(TriggerSource::MergeRequestEvent),
            "schedule" => Ok(TriggerSource::Schedule),
            "manual" => Ok(TriggerSource::Manual),
            other => Err(format!("unknown trigger source: {}", other)),
        }
    }
}

/// Immutable record describing the triggering occurrence.
///
/// Created once per trigger and read-only throughout planning and
/// execution. Condition expressions see its fields as variables via
/// [`EventContext::lookup`]; unset fields read as unset, never an error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventContext {
    pub source: TriggerSource,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Whether open merge requests target the pushed branch.
    #[serde(default)]
    pub open_merge_requests: bool,
    /// Extra trigger-supplied variables visible to conditions.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl EventContext {
    pub fn new(source: TriggerSource) -> Self {
        Self {
            source,
            branch: None,
            default_branch: None,
            open_merge_requests: false,
            variables: HashMap::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    pub fn with_open_merge_requests(mut self, open: bool) -> Self {
        self.open_merge_requests = open;
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Resolve a condition variable by name.
    ///
    /// Built-in names (`source`, `branch`, `default_branch`,
    /// `open_merge_requests`) shadow trigger-supplied variables.
    /// `open_merge_requests` reads as "true" when set and unset otherwise,
    /// so a bare `$open_merge_requests` works as a truthiness test.
    pub fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "source" => Some(self.source.as_str().to_string()),
            "branch" => self.branch.clone(),
            "default_branch" => self.default_branch.clone(),
            "open_merge_requests" => self.open_merge_requests.then(|| "true".to_string()),
            other => self.variables.get(other).cloned(),
        }
    }
}
