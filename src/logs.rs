//! Log-stream location and log event fetching.
//!
//! The locator is a pure function from task definition + task id + container
//! name to CloudWatch Logs coordinates. The fetcher wraps the two paginated
//! read paths of the log API: the tail of a single stream and a time-filtered
//! scan over a whole group.

use crate::error::Result;
use crate::model::{LogLine, LogStreamRef, LogTail, RawLogEvent, TaskDefinition, AWSLOGS_DRIVER};
use crate::ports::EventLogApi;
use std::sync::Arc;
use tracing::debug;

/// Fixed page size for log event reads.
pub const LOG_PAGE_SIZE: i32 = 100;

/// Resolves the log group and stream for one container of one task.
///
/// Returns `None` when the container is not in the task definition, when its
/// log driver is not `awslogs`, or when the options carry no log group. The
/// stream name is `{prefix}/{containerName}/{taskId}` with the prefix
/// defaulting to the empty string.
pub fn resolve_log_stream(
    task_definition: &TaskDefinition,
    task_id: &str,
    container_name: &str,
) -> Option<LogStreamRef> {
    let container = task_definition
        .container_definitions
        .iter()
        .find(|c| c.name == container_name)?;
    let log_config = container.log_configuration.as_ref()?;
    if log_config.driver != AWSLOGS_DRIVER {
        return None;
    }
    let group = log_config.group()?.to_string();
    let prefix = log_config.stream_prefix();

    Some(LogStreamRef {
        group,
        stream: format!("{prefix}/{container_name}/{task_id}"),
    })
}

pub struct LogFetcher {
    api: Arc<dyn EventLogApi>,
}

impl LogFetcher {
    pub fn new(api: Arc<dyn EventLogApi>) -> Self {
        Self { api }
    }

    /// Fetches up to `limit` of the most recent lines of a stream, oldest
    /// first in the result.
    ///
    /// Tail pagination never returns an absent continuation token; once the
    /// stream is exhausted the API echoes the token back. The loop stops on
    /// that echo, otherwise it would page forever. An empty tail is reported
    /// with `possibly_delayed` set: log delivery lags the read path, so
    /// "no events" cannot be distinguished from "not delivered yet" here.
    pub async fn recent_log_lines(
        &self,
        log_group: &str,
        log_stream: &str,
        limit: usize,
    ) -> Result<LogTail> {
        // Pages arrive newest-first; each page's events are oldest-first.
        let mut pages: Vec<Vec<LogLine>> = Vec::new();
        let mut collected = 0usize;
        let mut token: Option<String> = None;

        loop {
            let remaining = limit.saturating_sub(collected);
            if remaining == 0 {
                break;
            }
            let page_limit = (remaining.min(LOG_PAGE_SIZE as usize)) as i32;
            let page = self
                .api
                .get_log_events_page(log_group, log_stream, token.clone(), page_limit)
                .await?;

            collected += page.events.len();
            pages.push(page.events.into_iter().map(to_log_line).collect());

            match page.next_token {
                Some(next) if Some(&next) != token.as_ref() => token = Some(next),
                _ => break,
            }
        }

        let lines: Vec<LogLine> = pages.into_iter().rev().flatten().collect();
        let possibly_delayed = lines.is_empty();
        if possibly_delayed {
            debug!(log_group, log_stream, "empty log tail, possibly delayed");
        }

        Ok(LogTail {
            lines,
            possibly_delayed,
        })
    }

    /// Scans a log group for raw events from `start_millis` to now, following
    /// pagination until exhausted. No upper time bound.
    pub async fn filter_log_events(
        &self,
        log_group: &str,
        start_millis: i64,
    ) -> Result<Vec<RawLogEvent>> {
        let mut events = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .api
                .filter_events_page(log_group, start_millis, token.clone())
                .await?;
            events.extend(page.events);
            match page.next_token {
                // Guard against a token echo here too, same as the tail path.
                Some(next) if Some(&next) != token.as_ref() => token = Some(next),
                _ => break,
            }
        }

        debug!(log_group, count = events.len(), "filtered log events");
        Ok(events)
    }
}

fn to_log_line(event: RawLogEvent) -> LogLine {
    LogLine {
        timestamp_millis: event.timestamp_millis,
        message: event.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerDefinition, LogConfiguration};
    use std::collections::HashMap;

    fn task_definition(driver: &str, options: &[(&str, &str)]) -> TaskDefinition {
        let options: HashMap<String, String> = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TaskDefinition {
            arn: "arn:aws:ecs:us-east-1:123456789012:task-definition/web:3".to_string(),
            family: "web".to_string(),
            revision: 3,
            container_definitions: vec![ContainerDefinition {
                name: "app".to_string(),
                image: Some("repo/app:latest".to_string()),
                cpu: Some(256),
                memory: Some(512),
                log_configuration: Some(LogConfiguration {
                    driver: driver.to_string(),
                    options,
                }),
            }],
        }
    }

    #[test]
    fn test_resolve_log_stream_with_prefix() {
        let td = task_definition(
            AWSLOGS_DRIVER,
            &[("awslogs-group", "/ecs/web"), ("awslogs-stream-prefix", "web")],
        );
        let resolved = resolve_log_stream(&td, "abc123", "app").unwrap();
        assert_eq!(resolved.group, "/ecs/web");
        assert_eq!(resolved.stream, "web/app/abc123");
    }

    #[test]
    fn test_resolve_log_stream_without_prefix() {
        let td = task_definition(AWSLOGS_DRIVER, &[("awslogs-group", "/ecs/web")]);
        let resolved = resolve_log_stream(&td, "abc123", "app").unwrap();
        assert_eq!(resolved.stream, "/app/abc123");
    }

    #[test]
    fn test_resolved_stream_round_trips_container_and_task() {
        let td = task_definition(
            AWSLOGS_DRIVER,
            &[("awslogs-group", "/ecs/web"), ("awslogs-stream-prefix", "web")],
        );
        let resolved = resolve_log_stream(&td, "abc123", "app").unwrap();
        let segments: Vec<&str> = resolved.stream.split('/').collect();
        assert_eq!(segments[segments.len() - 2], "app");
        assert_eq!(segments[segments.len() - 1], "abc123");
    }

    #[test]
    fn test_resolve_log_stream_unknown_container() {
        let td = task_definition(AWSLOGS_DRIVER, &[("awslogs-group", "/ecs/web")]);
        assert!(resolve_log_stream(&td, "abc123", "sidecar").is_none());
    }

    #[test]
    fn test_resolve_log_stream_unrecognized_driver() {
        let td = task_definition("fluentd", &[("awslogs-group", "/ecs/web")]);
        assert!(resolve_log_stream(&td, "abc123", "app").is_none());
    }

    #[test]
    fn test_resolve_log_stream_missing_group() {
        let td = task_definition(AWSLOGS_DRIVER, &[("awslogs-stream-prefix", "web")]);
        assert!(resolve_log_stream(&td, "abc123", "app").is_none());
    }

    #[test]
    fn test_resolve_log_stream_no_log_configuration() {
        let td = TaskDefinition {
            container_definitions: vec![ContainerDefinition {
                name: "app".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(resolve_log_stream(&td, "abc123", "app").is_none());
    }
}
