//! Abstract contracts for the upstream orchestration and log APIs.
//!
//! The engine talks to AWS only through these traits; the `aws` module holds
//! the SDK-backed implementations. Tests inject in-memory fakes to pin call
//! counts and pagination behavior.

use crate::error::Result;
use crate::model::{RawLogEvent, Task, TaskDefinition};
use async_trait::async_trait;

/// Task lifecycle statuses the listing path queries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskLifecycle {
    Running,
    Pending,
    Stopped,
}

impl TaskLifecycle {
    pub const ALL: [TaskLifecycle; 3] = [
        TaskLifecycle::Running,
        TaskLifecycle::Pending,
        TaskLifecycle::Stopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskLifecycle::Running => "RUNNING",
            TaskLifecycle::Pending => "PENDING",
            TaskLifecycle::Stopped => "STOPPED",
        }
    }
}

/// One page of task ARNs from a listing call.
#[derive(Debug, Clone, Default)]
pub struct TaskArnPage {
    pub task_arns: Vec<String>,
    pub next_token: Option<String>,
}

/// One page of raw log events, from either the filter or the get-events call.
#[derive(Debug, Clone, Default)]
pub struct LogEventPage {
    pub events: Vec<RawLogEvent>,
    pub next_token: Option<String>,
}

/// Query surface of the container orchestration API. Read-only.
#[async_trait]
pub trait OrchestrationApi: Send + Sync {
    /// Lists task ARNs in `cluster` with the given lifecycle status,
    /// one page at a time.
    async fn list_tasks_page(
        &self,
        cluster: &str,
        status: TaskLifecycle,
        page_token: Option<String>,
    ) -> Result<TaskArnPage>;

    /// Describes a batch of tasks belonging to `cluster`.
    async fn describe_tasks(&self, cluster: &str, task_arns: &[String]) -> Result<Vec<Task>>;

    /// Describes one task definition. `Ok(None)` when the identifier
    /// resolves to nothing.
    async fn describe_task_definition(&self, arn: &str) -> Result<Option<TaskDefinition>>;
}

/// Query surface of the structured event log API. Read-only.
#[async_trait]
pub trait EventLogApi: Send + Sync {
    /// One page of a time-filtered scan over a log group, from
    /// `start_millis` to now.
    async fn filter_events_page(
        &self,
        log_group: &str,
        start_millis: i64,
        page_token: Option<String>,
    ) -> Result<LogEventPage>;

    /// One tail-direction page of a single log stream, newest events first
    /// across pages. The returned token may equal the one passed in when the
    /// stream is exhausted; callers must treat that as the end.
    async fn get_log_events_page(
        &self,
        log_group: &str,
        log_stream: &str,
        page_token: Option<String>,
        limit: i32,
    ) -> Result<LogEventPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_strings() {
        assert_eq!(TaskLifecycle::Running.as_str(), "RUNNING");
        assert_eq!(TaskLifecycle::Pending.as_str(), "PENDING");
        assert_eq!(TaskLifecycle::Stopped.as_str(), "STOPPED");
    }

    #[test]
    fn test_lifecycle_all_covers_each_status_once() {
        let strs: Vec<&str> = TaskLifecycle::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(strs, vec!["RUNNING", "PENDING", "STOPPED"]);
    }
}
