//! Domain types shared across the resolution engine.
//!
//! `Task` and friends are deserializable from the `detail` payload of an ECS
//! task state change event; the live-describe path builds the same types from
//! SDK responses in the `aws` module. Timestamps inside event payloads arrive
//! as RFC 3339 strings and are normalized to epoch milliseconds before typed
//! deserialization (see [`normalize_event_dates`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The only log driver the stream locator understands.
pub const AWSLOGS_DRIVER: &str = "awslogs";

/// One execution instance of a containerized workload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub task_arn: String,
    pub cluster_arn: Option<String>,
    pub task_definition_arn: Option<String>,
    pub last_status: Option<String>,
    pub desired_status: Option<String>,
    /// Who launched the task. Service-launched tasks carry an `ecs-svc/...`
    /// value here and are filtered out of the historical view.
    pub started_by: Option<String>,
    pub stopped_reason: Option<String>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    #[serde(deserialize_with = "event_time::opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "event_time::opt")]
    pub connectivity_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "event_time::opt")]
    pub pull_started_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "event_time::opt")]
    pub pull_stopped_at: Option<DateTime<Utc>>,
    /// Absent if the task never left PENDING.
    #[serde(deserialize_with = "event_time::opt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "event_time::opt")]
    pub stopping_at: Option<DateTime<Utc>>,
    /// Set iff the task reached a terminal state.
    #[serde(deserialize_with = "event_time::opt")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "event_time::opt")]
    pub execution_stopped_at: Option<DateTime<Utc>>,
    pub containers: Vec<Container>,
    pub overrides: TaskOverrides,
}

impl Task {
    /// Short task identifier: the trailing segment of the task ARN.
    pub fn id(&self) -> &str {
        arn_tail(&self.task_arn)
    }
}

/// Runtime container state within a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    pub last_status: Option<String>,
    pub image: Option<String>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub exit_code: Option<i32>,
}

/// Per-task overrides applied at run time, distinct from the immutable
/// task definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskOverrides {
    pub container_overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerOverride {
    pub name: String,
    pub command: Vec<String>,
}

/// Immutable template a task instantiates. Cached by ARN; no invalidation
/// needed since revisions never change once registered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskDefinition {
    pub arn: String,
    pub family: String,
    pub revision: i32,
    pub container_definitions: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: Option<String>,
    pub cpu: Option<i32>,
    pub memory: Option<i32>,
    pub log_configuration: Option<LogConfiguration>,
}

/// Log driver settings of a container definition. Only the `awslogs` driver
/// carries stream coordinates this crate can resolve.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogConfiguration {
    pub driver: String,
    pub options: HashMap<String, String>,
}

impl LogConfiguration {
    pub fn group(&self) -> Option<&str> {
        self.options.get("awslogs-group").map(String::as_str)
    }

    /// Stream-name prefix; the empty string when unset.
    pub fn stream_prefix(&self) -> &str {
        self.options
            .get("awslogs-stream-prefix")
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Resolved CloudWatch Logs coordinates for one container of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogStreamRef {
    pub group: String,
    pub stream: String,
}

/// One raw event from the structured log API, before any parsing.
#[derive(Debug, Clone)]
pub struct RawLogEvent {
    pub timestamp_millis: i64,
    pub message: String,
}

/// One fetched log line, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub timestamp_millis: i64,
    pub message: String,
}

/// Tail of a log stream. An empty tail is ambiguous: the stream may truly be
/// empty, or delivery may be lagging behind the read path. `possibly_delayed`
/// carries that ambiguity to the caller instead of resolving it here.
#[derive(Debug, Clone, Serialize)]
pub struct LogTail {
    pub lines: Vec<LogLine>,
    pub possibly_delayed: bool,
}

/// Envelope of an ECS task state change event parsed from a single log line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStateChangeEvent {
    pub id: Option<String>,
    #[serde(rename = "detail-type")]
    pub detail_type: Option<String>,
    pub source: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub detail: Task,
}

/// Date-valued attribute names inside an event's embedded task payload.
/// Any other date-valued attribute stays unconverted.
pub const EVENT_DATE_FIELDS: [&str; 8] = [
    "createdAt",
    "executionStoppedAt",
    "pullStartedAt",
    "pullStoppedAt",
    "startedAt",
    "stoppingAt",
    "stoppedAt",
    "connectivityAt",
];

/// Rewrites the known date fields of an event `detail` payload from RFC 3339
/// strings to epoch milliseconds. Runs only on string-typed values, so it is
/// idempotent: already-numeric fields are left untouched, as are strings that
/// do not parse as timestamps.
pub fn normalize_event_dates(detail: &mut Value) {
    let Some(map) = detail.as_object_mut() else {
        return;
    };
    for field in EVENT_DATE_FIELDS {
        if let Some(value) = map.get_mut(field) {
            if let Some(text) = value.as_str() {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                    *value = Value::from(parsed.timestamp_millis());
                }
            }
        }
    }
}

/// Trailing `/` segment of a path-like resource identifier. Returns the input
/// unchanged when it contains no `/`.
pub fn arn_tail(arn: &str) -> &str {
    arn.split('/').next_back().unwrap_or(arn)
}

/// Splits a `family:revision` composite (the tail of a task-definition ARN)
/// into its parts. Revision falls back to 0 when missing or non-numeric.
pub fn family_revision(arn: &str) -> (String, i32) {
    let tail = arn_tail(arn);
    match tail.rsplit_once(':') {
        Some((family, revision)) => (family.to_string(), revision.parse().unwrap_or(0)),
        None => (tail.to_string(), 0),
    }
}

/// Deserialization of optional timestamps that may arrive either as epoch
/// milliseconds (post-normalization) or as RFC 3339 strings.
pub(crate) mod event_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Raw>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(Raw::Millis(ms)) => Ok(DateTime::from_timestamp_millis(ms)),
            Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}
