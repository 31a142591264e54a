//! AWS ECS and CloudWatch Logs integration module.
//!
//! SDK-backed implementation of the [`OrchestrationApi`] and [`EventLogApi`]
//! contracts. All conversions from SDK response shapes into the crate's
//! domain types live here so the rest of the engine never sees SDK types.

use crate::error::Result;
use crate::model::{
    family_revision, Container, ContainerDefinition, ContainerOverride, LogConfiguration,
    RawLogEvent, Task, TaskDefinition, TaskOverrides,
};
use crate::ports::{EventLogApi, LogEventPage, OrchestrationApi, TaskArnPage, TaskLifecycle};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client as LogsClient;
use aws_sdk_ecs::types::DesiredStatus;
use aws_sdk_ecs::Client;
use chrono::{DateTime, Utc};

/// Fixed page size for task listing calls.
pub const LIST_PAGE_SIZE: i32 = 100;

/// Client for the read-only AWS surface this crate consumes.
///
/// Wraps the ECS and CloudWatch Logs SDK clients behind the port traits.
pub struct AwsApi {
    /// AWS ECS SDK client
    client: Client,
    /// AWS CloudWatch Logs SDK client
    logs_client: LogsClient,
}

impl AwsApi {
    /// Creates a new client with optional region and profile configuration.
    ///
    /// # Arguments
    /// * `region` - Optional AWS region override (e.g., "us-east-1")
    /// * `profile` - Optional AWS profile name from ~/.aws/credentials
    ///
    /// # Errors
    /// This function will return an error if:
    /// - AWS credentials cannot be resolved
    /// - The specified profile doesn't exist
    /// - The specified region is invalid
    pub async fn new(region: Option<String>, profile: Option<String>) -> Result<Self> {
        let mut config_loader = aws_config::from_env();

        if let Some(region_str) = region {
            config_loader = config_loader.region(aws_config::Region::new(region_str));
        }

        if let Some(profile_name) = profile {
            config_loader = config_loader.profile_name(profile_name);
        }

        let config = config_loader.load().await;
        let client = Client::new(&config);
        let logs_client = LogsClient::new(&config);
        Ok(Self {
            client,
            logs_client,
        })
    }
}

#[async_trait]
impl OrchestrationApi for AwsApi {
    async fn list_tasks_page(
        &self,
        cluster: &str,
        status: TaskLifecycle,
        page_token: Option<String>,
    ) -> Result<TaskArnPage> {
        let resp = self
            .client
            .list_tasks()
            .cluster(cluster)
            .desired_status(desired_status(status))
            .max_results(LIST_PAGE_SIZE)
            .set_next_token(page_token)
            .send()
            .await
            .with_context(|| format!("listing {} tasks in cluster {cluster}", status.as_str()))?;

        Ok(TaskArnPage {
            task_arns: resp.task_arns().to_vec(),
            next_token: resp.next_token().map(String::from),
        })
    }

    async fn describe_tasks(&self, cluster: &str, task_arns: &[String]) -> Result<Vec<Task>> {
        let resp = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(task_arns.to_vec()))
            .send()
            .await
            .with_context(|| format!("describing {} tasks in cluster {cluster}", task_arns.len()))?;

        Ok(resp.tasks().iter().map(convert_task).collect())
    }

    async fn describe_task_definition(&self, arn: &str) -> Result<Option<TaskDefinition>> {
        let resp = self
            .client
            .describe_task_definition()
            .task_definition(arn)
            .send()
            .await
            .with_context(|| format!("describing task definition {arn}"))?;

        Ok(resp.task_definition().map(|td| convert_task_definition(arn, td)))
    }
}

#[async_trait]
impl EventLogApi for AwsApi {
    async fn filter_events_page(
        &self,
        log_group: &str,
        start_millis: i64,
        page_token: Option<String>,
    ) -> Result<LogEventPage> {
        let resp = self
            .logs_client
            .filter_log_events()
            .log_group_name(log_group)
            .start_time(start_millis)
            .set_next_token(page_token)
            .send()
            .await
            .with_context(|| format!("filtering events in log group {log_group}"))?;

        let events = resp
            .events()
            .iter()
            .filter_map(|e| {
                let (Some(timestamp), Some(message)) = (e.timestamp(), e.message()) else {
                    return None;
                };
                Some(RawLogEvent {
                    timestamp_millis: timestamp,
                    message: message.to_string(),
                })
            })
            .collect();

        Ok(LogEventPage {
            events,
            next_token: resp.next_token().map(String::from),
        })
    }

    async fn get_log_events_page(
        &self,
        log_group: &str,
        log_stream: &str,
        page_token: Option<String>,
        limit: i32,
    ) -> Result<LogEventPage> {
        let resp = self
            .logs_client
            .get_log_events()
            .log_group_name(log_group)
            .log_stream_name(log_stream)
            .limit(limit)
            .start_from_head(false) // Get most recent logs first
            .set_next_token(page_token)
            .send()
            .await
            .with_context(|| format!("reading log stream {log_group}/{log_stream}"))?;

        let events = resp
            .events()
            .iter()
            .filter_map(|e| {
                let (Some(timestamp), Some(message)) = (e.timestamp(), e.message()) else {
                    return None;
                };
                Some(RawLogEvent {
                    timestamp_millis: timestamp,
                    message: message.to_string(),
                })
            })
            .collect();

        // Tail pagination continues via the backward token; GetLogEvents
        // returns the same token back once the stream is exhausted.
        Ok(LogEventPage {
            events,
            next_token: resp.next_backward_token().map(String::from),
        })
    }
}

fn desired_status(status: TaskLifecycle) -> DesiredStatus {
    match status {
        TaskLifecycle::Running => DesiredStatus::Running,
        TaskLifecycle::Pending => DesiredStatus::Pending,
        TaskLifecycle::Stopped => DesiredStatus::Stopped,
    }
}

fn to_utc(ts: Option<&aws_sdk_ecs::primitives::DateTime>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| t.to_millis().ok())
        .and_then(DateTime::from_timestamp_millis)
}

fn convert_task(task: &aws_sdk_ecs::types::Task) -> Task {
    let containers = task
        .containers()
        .iter()
        .map(|c| Container {
            name: c.name().unwrap_or_default().to_string(),
            last_status: c.last_status().map(String::from),
            image: c.image().map(String::from),
            cpu: c.cpu().map(String::from),
            memory: c.memory().map(String::from),
            exit_code: c.exit_code(),
        })
        .collect();

    let container_overrides = task
        .overrides()
        .map(|o| {
            o.container_overrides()
                .iter()
                .map(|co| ContainerOverride {
                    name: co.name().unwrap_or_default().to_string(),
                    command: co.command().to_vec(),
                })
                .collect()
        })
        .unwrap_or_default();

    Task {
        task_arn: task.task_arn().unwrap_or_default().to_string(),
        cluster_arn: task.cluster_arn().map(String::from),
        task_definition_arn: task.task_definition_arn().map(String::from),
        last_status: task.last_status().map(String::from),
        desired_status: task.desired_status().map(String::from),
        started_by: task.started_by().map(String::from),
        stopped_reason: task.stopped_reason().map(String::from),
        cpu: task.cpu().map(String::from),
        memory: task.memory().map(String::from),
        created_at: to_utc(task.created_at()),
        connectivity_at: to_utc(task.connectivity_at()),
        pull_started_at: to_utc(task.pull_started_at()),
        pull_stopped_at: to_utc(task.pull_stopped_at()),
        started_at: to_utc(task.started_at()),
        stopping_at: to_utc(task.stopping_at()),
        stopped_at: to_utc(task.stopped_at()),
        execution_stopped_at: to_utc(task.execution_stopped_at()),
        containers,
        overrides: TaskOverrides { container_overrides },
    }
}

fn convert_task_definition(
    arn: &str,
    td: &aws_sdk_ecs::types::TaskDefinition,
) -> TaskDefinition {
    let container_definitions = td
        .container_definitions()
        .iter()
        .map(|cd| ContainerDefinition {
            name: cd.name().unwrap_or_default().to_string(),
            image: cd.image().map(String::from),
            cpu: Some(cd.cpu()),
            memory: cd.memory(),
            log_configuration: cd.log_configuration().map(|lc| LogConfiguration {
                driver: lc.log_driver().as_str().to_string(),
                options: lc
                    .options()
                    .map(|opts| {
                        opts.iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
        })
        .collect();

    // Prefer the registered family/revision; fall back to parsing the ARN.
    let (parsed_family, parsed_revision) =
        family_revision(td.task_definition_arn().unwrap_or(arn));
    TaskDefinition {
        arn: td.task_definition_arn().unwrap_or(arn).to_string(),
        family: td
            .family()
            .map(String::from)
            .unwrap_or(parsed_family),
        revision: if td.revision() != 0 {
            td.revision()
        } else {
            parsed_revision
        },
        container_definitions,
    }
}
