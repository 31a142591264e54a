//! Task resolution facade.
//!
//! [`TaskLens`] is the context object gluing the engine together: it owns the
//! configured environments and the active-environment switch, the cluster
//! query client, the task-definition cache, the event-log historical store
//! and the log fetcher. A web layer drives it with three calls: `list_tasks`
//! for the listing view, `resolve_task` for a detail view, `task_log_tail`
//! for recent log lines.

use crate::aws::AwsApi;
use crate::cluster::ClusterQuery;
use crate::config::{Config, EnvironmentConfig};
use crate::error::{Error, Result};
use crate::history::HistoricalStore;
use crate::logs::{resolve_log_stream, LogFetcher};
use crate::model::{arn_tail, LogTail, Task, TaskDefinition};
use crate::ports::{EventLogApi, OrchestrationApi};
use crate::taskdef::TaskDefinitionResolver;
use chrono::{Duration, Utc};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Combined result of the listing view: live tasks from the orchestration
/// API plus finished tasks reconstructed from the event log. `skipped_events`
/// counts log lines that didn't parse as state change events.
#[derive(Debug, Default)]
pub struct TaskListing {
    pub live: Vec<Task>,
    pub finished: Vec<Task>,
    pub skipped_events: usize,
}

impl std::fmt::Debug for TaskLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLens")
            .field("environments", &self.environments)
            .field("active", &self.active)
            .field("history_window", &self.history_window)
            .field("tail_limit", &self.tail_limit)
            .finish_non_exhaustive()
    }
}

pub struct TaskLens {
    environments: Vec<EnvironmentConfig>,
    // Index into `environments`; process-wide, reset to 0 on init.
    active: RwLock<usize>,
    cluster: ClusterQuery,
    taskdefs: TaskDefinitionResolver,
    history: HistoricalStore,
    logs: LogFetcher,
    history_window: Duration,
    tail_limit: usize,
}

impl TaskLens {
    /// Builds a facade over explicit API implementations. The first listed
    /// environment becomes active.
    ///
    /// # Errors
    /// Returns [`Error::NoEnvironments`] when the configuration lists none.
    pub fn new(
        config: Config,
        orchestration: Arc<dyn OrchestrationApi>,
        event_log: Arc<dyn EventLogApi>,
    ) -> Result<Self> {
        if config.environments.is_empty() {
            return Err(Error::NoEnvironments);
        }

        Ok(Self {
            environments: config.environments,
            active: RwLock::new(0),
            cluster: ClusterQuery::new(Arc::clone(&orchestration)),
            taskdefs: TaskDefinitionResolver::new(orchestration),
            history: HistoricalStore::new(LogFetcher::new(Arc::clone(&event_log))),
            logs: LogFetcher::new(event_log),
            history_window: Duration::hours(config.history.window_hours),
            tail_limit: config.logs.tail_limit,
        })
    }

    /// Builds a facade backed by the AWS SDK, using the region/profile from
    /// the configuration.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - The configuration lists no environments
    /// - AWS SDK initialization fails
    pub async fn connect(config: Config) -> Result<Self> {
        let api = Arc::new(
            AwsApi::new(config.aws.region.clone(), config.aws.profile.clone()).await?,
        );
        Self::new(config, Arc::clone(&api) as _, api)
    }

    /// Names of the configured environments, in display order.
    pub fn environment_names(&self) -> Vec<String> {
        self.environments.iter().map(|e| e.name.clone()).collect()
    }

    /// The currently active environment.
    pub fn active_environment(&self) -> EnvironmentConfig {
        let index = self.active.read().map(|i| *i).unwrap_or(0);
        self.environments[index.min(self.environments.len() - 1)].clone()
    }

    /// Switches the active environment. Process-wide state, not persisted.
    ///
    /// # Errors
    /// Returns [`Error::ConfigurationNotFound`] for an unknown name.
    pub fn switch_environment(&self, name: &str) -> Result<()> {
        let Some(index) = self.environments.iter().position(|e| e.name == name) else {
            return Err(Error::ConfigurationNotFound {
                name: name.to_string(),
            });
        };
        if let Ok(mut active) = self.active.write() {
            *active = index;
        }
        info!(environment = name, "switched active environment");
        Ok(())
    }

    /// Builds the listing view for the active environment: the live task
    /// list and the historical finished-task view, fetched concurrently.
    /// Finished tasks are stored into the cache as a side effect, which is
    /// what makes later historical detail lookups possible.
    pub async fn list_tasks(&self) -> Result<TaskListing> {
        let env = self.active_environment();
        let since = Utc::now() - self.history_window;

        let (live, finished_view) = tokio::try_join!(
            self.live_tasks(&env.cluster),
            self.history.build_finished_task_view(&env.log_group, since),
        )?;

        self.history.store_finished_tasks(&env.name, &finished_view.tasks);
        Ok(TaskListing {
            live,
            finished: finished_view.tasks,
            skipped_events: finished_view.skipped,
        })
    }

    async fn live_tasks(&self, cluster: &str) -> Result<Vec<Task>> {
        let arns = self.cluster.list_task_arns(cluster).await?;
        self.cluster.describe_tasks(&arns).await
    }

    /// Resolves a task by its short id, for the active environment.
    ///
    /// The historical cache is consulted first; on a miss the live listing
    /// is scanned for an ARN whose trailing segment matches, and that task
    /// is described. A task that vanishes between the list and the describe
    /// resolves to `NotFound`, same as one that never existed.
    pub async fn resolve_task(&self, task_id: &str) -> Result<Task> {
        let env = self.active_environment();

        if let Some(task) = self.history.get_finished_task(&env.name, task_id) {
            debug!(task_id, "resolved from historical cache");
            return Ok(task);
        }

        let arns = self.cluster.list_task_arns(&env.cluster).await?;
        let Some(arn) = arns.iter().find(|arn| arn_tail(arn) == task_id) else {
            return Err(Error::not_found(task_id));
        };

        let described = self
            .cluster
            .describe_tasks(std::slice::from_ref(arn))
            .await?;
        described
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(task_id))
    }

    /// Resolves the task definitions behind a set of tasks, for listing
    /// views that show family and revision. Tasks sharing a definition cost
    /// a single lookup; definitions are cached for the process lifetime.
    pub async fn resolve_task_definitions(
        &self,
        tasks: &[Task],
    ) -> Result<Vec<Arc<TaskDefinition>>> {
        let arns: Vec<String> = tasks
            .iter()
            .filter_map(|t| t.task_definition_arn.clone())
            .collect();
        self.taskdefs.resolve_many(&arns).await
    }

    /// Fetches the recent log tail for one container of a task.
    ///
    /// `Ok(None)` when the task carries no definition reference, the
    /// definition is gone upstream, or the container has no awslogs
    /// configuration. None of those are errors for a read-only view.
    pub async fn task_log_tail(
        &self,
        task: &Task,
        container_name: &str,
    ) -> Result<Option<LogTail>> {
        let Some(definition_arn) = task.task_definition_arn.as_deref() else {
            return Ok(None);
        };
        let Some(definition) = self.taskdefs.resolve(definition_arn).await? else {
            return Ok(None);
        };
        let Some(stream) = resolve_log_stream(&definition, task.id(), container_name) else {
            return Ok(None);
        };

        let tail = self
            .logs
            .recent_log_lines(&stream.group, &stream.stream, self.tail_limit)
            .await?;
        Ok(Some(tail))
    }

    /// Log tail for the environment's main container.
    pub async fn main_container_log_tail(&self, task: &Task) -> Result<Option<LogTail>> {
        let env = self.active_environment();
        self.task_log_tail(task, &env.main_container).await
    }
}
