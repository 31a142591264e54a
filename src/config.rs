//! Configuration for the task-resolution core.
//!
//! Configuration is loaded from a TOML file at `~/.tasklens/config.toml` (or
//! any path via [`Config::from_path`]). It lists the inspectable environments
//! in order; the first one becomes the active environment on startup. AWS
//! credentials and region resolution follow the SDK defaults unless
//! overridden in the `[aws]` section.

use crate::error::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// All sections except the environment list are optional and fall back to
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AWS-specific configuration options
    #[serde(default)]
    pub aws: AwsConfig,

    /// Inspectable environments, in display order. The first entry is the
    /// active environment after init.
    #[serde(rename = "environment", default)]
    pub environments: Vec<EnvironmentConfig>,

    /// Historical view configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Log tail configuration
    #[serde(default)]
    pub logs: LogsConfig,
}

/// AWS SDK configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    /// Default AWS region (e.g., "us-east-1")
    /// If not specified, will use AWS SDK's default resolution (env vars, profile, etc.)
    pub region: Option<String>,

    /// AWS profile name to use from ~/.aws/credentials
    /// If not specified, will use the default profile
    pub profile: Option<String>,
}

/// One inspectable environment: the ECS cluster to query live, the log group
/// holding its task state change events, and the container whose logs the
/// detail view tails by default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvironmentConfig {
    pub name: String,
    pub cluster: String,
    pub main_container: String,
    pub log_group: String,
}

/// Historical view configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// How far back the event-log scan reaches, in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

/// Log tail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Maximum number of recent log lines fetched per container
    #[serde(default = "default_tail_limit")]
    pub tail_limit: usize,
}

// Default value functions for serde
fn default_window_hours() -> i64 {
    24
}

fn default_tail_limit() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            tail_limit: default_tail_limit(),
        }
    }
}

impl Config {
    /// Returns the path to the configuration directory (~/.tasklens/)
    pub fn config_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".tasklens"))
    }

    /// Returns the path to the configuration file (~/.tasklens/config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file, creating a commented
    /// template if it doesn't exist yet.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - Home directory cannot be determined
    /// - File I/O operations fail
    /// - TOML parsing fails
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if config_path.exists() {
            Self::from_path(&config_path)
        } else {
            let default_config = Config::default();
            default_config.create_default_config()?;
            Ok(default_config)
        }
    }

    /// Loads configuration from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Creates a commented template at ~/.tasklens/config.toml. The template
    /// has no environments; the facade refuses to start until at least one
    /// `[[environment]]` block is filled in.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - Directory creation fails
    /// - File write operations fail
    pub fn create_default_config(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        let config_path = Self::config_file_path()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {config_dir:?}"))?;
        }

        let default_toml = r#"# tasklens configuration file
# This file is automatically generated. Fill in at least one environment.

[aws]
# Default AWS region to use (optional)
# If not specified, uses AWS SDK's default resolution (env vars, ~/.aws/config, etc.)
# region = "us-east-1"

# AWS profile to use from ~/.aws/credentials (optional)
# If not specified, uses the default profile
# profile = "default"

# One block per inspectable environment; the first listed is active on startup.
# [[environment]]
# name = "staging"
# cluster = "staging-cluster"
# main_container = "app"
# log_group = "/ecs/staging"

[history]
# How far back the finished-task view scans the event log, in hours
window_hours = 24

[logs]
# Maximum number of recent log lines fetched per container
tail_limit = 100
"#;

        fs::write(&config_path, default_toml)
            .with_context(|| format!("Failed to write config file: {config_path:?}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.environments.is_empty());
        assert_eq!(config.history.window_hours, 24);
        assert_eq!(config.logs.tail_limit, 100);
        assert!(config.aws.region.is_none());
        assert!(config.aws.profile.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[aws]
region = "us-west-2"
profile = "production"

[[environment]]
name = "staging"
cluster = "staging-cluster"
main_container = "app"
log_group = "/ecs/staging"

[[environment]]
name = "prod"
cluster = "prod-cluster"
main_container = "app"
log_group = "/ecs/prod"

[history]
window_hours = 48

[logs]
tail_limit = 250
"#;

        let config = Config::from_str(toml_str).unwrap();
        assert_eq!(config.aws.region, Some("us-west-2".to_string()));
        assert_eq!(config.aws.profile, Some("production".to_string()));
        assert_eq!(config.environments.len(), 2);
        // Order is preserved: the first listed environment is active on init
        assert_eq!(config.environments[0].name, "staging");
        assert_eq!(config.environments[1].name, "prod");
        assert_eq!(config.environments[1].log_group, "/ecs/prod");
        assert_eq!(config.history.window_hours, 48);
        assert_eq!(config.logs.tail_limit, 250);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[[environment]]
name = "dev"
cluster = "dev-cluster"
main_container = "web"
log_group = "/ecs/dev"
"#;

        let config = Config::from_str(toml_str).unwrap();
        assert_eq!(config.environments.len(), 1);
        assert_eq!(config.aws.region, None);
        // Should use defaults for other sections
        assert_eq!(config.history.window_hours, 24);
        assert_eq!(config.logs.tail_limit, 100);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_str("not [ valid").is_err());
    }
}
