//! Cluster query client.
//!
//! Wraps the paginated listing and batch-describe operations of the
//! orchestration API. Listing fans out one paginated scan per lifecycle
//! status (RUNNING, PENDING, STOPPED) and joins all-or-first-failure.

use crate::error::Result;
use crate::model::{Task, TaskDefinition};
use crate::ports::{OrchestrationApi, TaskLifecycle};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

pub struct ClusterQuery {
    api: Arc<dyn OrchestrationApi>,
}

impl ClusterQuery {
    pub fn new(api: Arc<dyn OrchestrationApi>) -> Self {
        Self { api }
    }

    /// Lists the ARNs of all tasks in `cluster`, across the RUNNING, PENDING
    /// and STOPPED statuses. The three scans run concurrently and their
    /// results are concatenated; a task holds exactly one status per call,
    /// so no cross-status deduplication is needed.
    pub async fn list_task_arns(&self, cluster: &str) -> Result<Vec<String>> {
        let (running, pending, stopped) = tokio::try_join!(
            self.list_for_status(cluster, TaskLifecycle::Running),
            self.list_for_status(cluster, TaskLifecycle::Pending),
            self.list_for_status(cluster, TaskLifecycle::Stopped),
        )?;

        let mut arns = running;
        arns.extend(pending);
        arns.extend(stopped);
        debug!(cluster, count = arns.len(), "listed task arns");
        Ok(arns)
    }

    async fn list_for_status(
        &self,
        cluster: &str,
        status: TaskLifecycle,
    ) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_tasks_page(cluster, status, token.clone())
                .await?;
            arns.extend(page.task_arns);
            match page.next_token {
                // A token identical to the one just used would page forever.
                Some(next) if Some(&next) != token.as_ref() => token = Some(next),
                _ => break,
            }
        }

        Ok(arns)
    }

    /// Describes a batch of tasks. The cluster is derived from the first ARN;
    /// callers must pass ARNs belonging to a single cluster. Empty input
    /// returns empty output without a network call.
    ///
    /// The batch is sent as one describe call; the underlying API caps a
    /// batch at 100 tasks, which this path does not split.
    pub async fn describe_tasks(&self, task_arns: &[String]) -> Result<Vec<Task>> {
        let Some(first) = task_arns.first() else {
            return Ok(Vec::new());
        };

        let cluster = cluster_from_task_arn(first);
        self.api.describe_tasks(cluster, task_arns).await
    }

    /// Describes each task definition concurrently. Identifiers that resolve
    /// to nothing are dropped from the result.
    pub async fn describe_task_definitions(
        &self,
        arns: &[String],
    ) -> Result<Vec<TaskDefinition>> {
        let fetches = arns.iter().map(|arn| self.api.describe_task_definition(arn));
        let resolved = try_join_all(fetches).await?;
        Ok(resolved.into_iter().flatten().collect())
    }
}

/// Cluster name embedded in a task ARN
/// (`arn:aws:ecs:region:account:task/{cluster}/{id}`). Returns the input
/// unchanged when the shape doesn't match.
pub fn cluster_from_task_arn(arn: &str) -> &str {
    let mut segments = arn.split('/').rev();
    segments.next();
    segments.next().unwrap_or(arn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_from_task_arn() {
        let arn = "arn:aws:ecs:us-east-1:123456789012:task/my-cluster/abc123";
        assert_eq!(cluster_from_task_arn(arn), "my-cluster");
    }

    #[test]
    fn test_cluster_from_malformed_arn() {
        assert_eq!(cluster_from_task_arn("no-slashes"), "no-slashes");
    }
}
