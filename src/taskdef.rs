//! Task-definition resolver with an ARN-keyed cache.
//!
//! Task definitions are immutable once registered, so cached entries never
//! need invalidation. The cache lives for the process lifetime.

use crate::error::Result;
use crate::model::TaskDefinition;
use crate::ports::OrchestrationApi;
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct TaskDefinitionResolver {
    api: Arc<dyn OrchestrationApi>,
    // Held only across non-await sections.
    cache: Mutex<HashMap<String, Arc<TaskDefinition>>>,
}

impl TaskDefinitionResolver {
    pub fn new(api: Arc<dyn OrchestrationApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves one task definition, from cache when possible. `Ok(None)`
    /// when the identifier resolves to nothing upstream.
    pub async fn resolve(&self, arn: &str) -> Result<Option<Arc<TaskDefinition>>> {
        if let Some(hit) = self.cached(arn) {
            debug!(arn, "task definition cache hit");
            return Ok(Some(hit));
        }

        let Some(fetched) = self.api.describe_task_definition(arn).await? else {
            return Ok(None);
        };
        let shared = Arc::new(fetched);
        self.insert(arn, Arc::clone(&shared));
        Ok(Some(shared))
    }

    /// Resolves a batch of task definitions. Duplicate ARNs cost a single
    /// lookup; uncached ones are fetched concurrently. Identifiers that
    /// resolve to nothing are dropped.
    pub async fn resolve_many(&self, arns: &[String]) -> Result<Vec<Arc<TaskDefinition>>> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = arns.iter().filter(|a| seen.insert(a.as_str())).collect();

        let mut resolved = Vec::with_capacity(unique.len());
        let mut missing = Vec::new();
        for arn in unique {
            match self.cached(arn) {
                Some(hit) => resolved.push(hit),
                None => missing.push(arn),
            }
        }

        let fetches = missing
            .iter()
            .map(|arn| self.api.describe_task_definition(arn));
        for (arn, fetched) in missing.iter().zip(try_join_all(fetches).await?) {
            if let Some(td) = fetched {
                let shared = Arc::new(td);
                self.insert(arn, Arc::clone(&shared));
                resolved.push(shared);
            }
        }

        Ok(resolved)
    }

    fn cached(&self, arn: &str) -> Option<Arc<TaskDefinition>> {
        match self.cache.lock() {
            Ok(cache) => cache.get(arn).cloned(),
            Err(_) => None,
        }
    }

    fn insert(&self, arn: &str, td: Arc<TaskDefinition>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(arn.to_string(), td);
        }
    }
}
