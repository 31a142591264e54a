//! Error types for the task-resolution core.
//!
//! The taxonomy mirrors what callers need to distinguish:
//! - `NotFound` / `ConfigurationNotFound` map to explicit error responses
//! - `Upstream` wraps any failed orchestration or log API call; retry policy
//!   is the caller's concern, not this crate's
//! - `MalformedEvent` is only surfaced when a caller opts into strict event
//!   parsing; the listing path skips bad lines instead

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("task not found: {task_id}")]
    NotFound { task_id: String },

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),

    #[error("malformed event: {reason}")]
    MalformedEvent { reason: String },

    #[error("environment not configured: {name}")]
    ConfigurationNotFound { name: String },

    #[error("configuration lists no environments")]
    NoEnvironments,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    pub fn not_found(task_id: impl Into<String>) -> Self {
        Error::NotFound {
            task_id: task_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("abc123");
        assert_eq!(err.to_string(), "task not found: abc123");
    }

    #[test]
    fn test_configuration_not_found_display() {
        let err = Error::ConfigurationNotFound {
            name: "prod".to_string(),
        };
        assert_eq!(err.to_string(), "environment not configured: prod");
    }

    #[test]
    fn test_upstream_preserves_context() {
        let err: Error = anyhow::anyhow!("throttled").into();
        assert!(err.to_string().contains("throttled"));
    }
}
