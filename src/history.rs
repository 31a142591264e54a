//! Historical task store backed by the event log.
//!
//! The orchestration API forgets stopped tasks quickly; the only durable
//! record is the stream of task state change events in CloudWatch Logs. This
//! module reconstructs finished tasks from a time window of those events and
//! keeps them in an in-memory cache so detail lookups don't re-scan the log.
//!
//! The cache grows monotonically for the process lifetime. That is accepted:
//! one-off task runs are low-churn, and the dashboard process is restarted
//! regularly enough in practice.

use crate::error::{Error, Result};
use crate::logs::LogFetcher;
use crate::model::{normalize_event_dates, Task, TaskStateChangeEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Tasks whose `startedBy` begins with this prefix were launched by the
/// service scheduler, not by an operator; the historical view excludes them.
pub const SERVICE_STARTED_BY_PREFIX: &str = "ecs-svc";

/// Outcome of parsing one log line as a task state change event.
///
/// The log group may contain unrelated entries; a line that doesn't parse is
/// a `Skipped` variant with the reason, and the caller decides whether to
/// count, log, or fail on it.
#[derive(Debug)]
pub enum ParsedLine {
    Event(Box<TaskStateChangeEvent>),
    Skipped { reason: String },
}

/// Parses one raw log line into a task state change event.
///
/// Date fields inside the embedded task arrive as RFC 3339 strings; they are
/// normalized to epoch milliseconds before typed deserialization, and only
/// when still string-typed, so re-parsing an already-normalized payload is a
/// no-op.
pub fn parse_state_change_line(raw: &str) -> ParsedLine {
    let mut value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            return ParsedLine::Skipped {
                reason: format!("not JSON: {err}"),
            }
        }
    };

    let Some(detail) = value.get_mut("detail") else {
        return ParsedLine::Skipped {
            reason: "no detail payload".to_string(),
        };
    };
    normalize_event_dates(detail);

    match serde_json::from_value::<TaskStateChangeEvent>(value) {
        Ok(event) if event.detail.task_arn.is_empty() => ParsedLine::Skipped {
            reason: "detail has no taskArn".to_string(),
        },
        Ok(event) => ParsedLine::Event(Box::new(event)),
        Err(err) => ParsedLine::Skipped {
            reason: format!("envelope mismatch: {err}"),
        },
    }
}

/// Strict variant of [`parse_state_change_line`] for callers that treat an
/// unparseable line as an error instead of skipping it.
pub fn parse_state_change_event(raw: &str) -> Result<TaskStateChangeEvent> {
    match parse_state_change_line(raw) {
        ParsedLine::Event(event) => Ok(*event),
        ParsedLine::Skipped { reason } => Err(Error::MalformedEvent { reason }),
    }
}

/// Finished tasks reconstructed from one event-log window, plus the number
/// of lines that didn't parse as state change events.
#[derive(Debug, Default)]
pub struct FinishedTaskView {
    pub tasks: Vec<Task>,
    pub skipped: usize,
}

/// Two-level cache of finished tasks: environment name → task id → task.
/// Upsert-only, never evicted.
#[derive(Debug, Default)]
pub struct FinishedTaskCache {
    by_env: HashMap<String, HashMap<String, Task>>,
}

impl FinishedTaskCache {
    pub fn upsert(&mut self, environment: &str, task: Task) {
        let task_id = task.id().to_string();
        self.by_env
            .entry(environment.to_string())
            .or_default()
            .insert(task_id, task);
    }

    pub fn get(&self, environment: &str, task_id: &str) -> Option<&Task> {
        self.by_env.get(environment)?.get(task_id)
    }

    pub fn len(&self, environment: &str) -> usize {
        self.by_env.get(environment).map_or(0, HashMap::len)
    }
}

/// Event-log-backed store of finished tasks.
pub struct HistoricalStore {
    fetcher: LogFetcher,
    cache: Mutex<FinishedTaskCache>,
}

impl HistoricalStore {
    pub fn new(fetcher: LogFetcher) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(FinishedTaskCache::default()),
        }
    }

    /// Scans the event log from `since` to now and rebuilds the operator
    /// facing finished-task view: every parseable state change event whose
    /// task was not launched by the service scheduler. Later events for the
    /// same task win (the scan is chronological, so the final state sticks
    /// after [`store_finished_tasks`](Self::store_finished_tasks) upserts).
    pub async fn build_finished_task_view(
        &self,
        log_group: &str,
        since: DateTime<Utc>,
    ) -> Result<FinishedTaskView> {
        let raw_events = self
            .fetcher
            .filter_log_events(log_group, since.timestamp_millis())
            .await?;

        let mut view = FinishedTaskView::default();
        for raw in raw_events {
            match parse_state_change_line(&raw.message) {
                ParsedLine::Event(event) => {
                    if is_service_started(&event.detail) {
                        continue;
                    }
                    view.tasks.push(event.detail);
                }
                ParsedLine::Skipped { reason } => {
                    debug!(log_group, reason, "skipped event line");
                    view.skipped += 1;
                }
            }
        }

        if view.skipped > 0 {
            warn!(
                log_group,
                skipped = view.skipped,
                "some event lines did not parse as task state changes"
            );
        }
        Ok(view)
    }

    /// Upserts tasks into the cache for `environment`, keyed by task id.
    /// Must run (via the listing view) before historical detail lookups can
    /// succeed.
    pub fn store_finished_tasks(&self, environment: &str, tasks: &[Task]) {
        if let Ok(mut cache) = self.cache.lock() {
            for task in tasks {
                cache.upsert(environment, task.clone());
            }
            debug!(
                environment,
                cached = cache.len(environment),
                "stored finished tasks"
            );
        }
    }

    /// Cache lookup for `environment`. Absence is not an error; the caller
    /// falls back to a live lookup.
    pub fn get_finished_task(&self, environment: &str, task_id: &str) -> Option<Task> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(environment, task_id).cloned())
    }
}

fn is_service_started(task: &Task) -> bool {
    task.started_by
        .as_deref()
        .is_some_and(|s| s.starts_with(SERVICE_STARTED_BY_PREFIX))
}
