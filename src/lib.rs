//! tasklens - task-resolution and log-correlation engine for ECS dashboards.
//!
//! A read-only core for inspecting ECS task executions across environments.
//! It reconciles live task state (queried from the ECS API) with historical
//! finished tasks (reconstructed from task state change events in CloudWatch
//! Logs, since ECS retains no stopped-task history), resolves arbitrary task
//! ids against whichever source holds them, and maps a task + container pair
//! to its CloudWatch log stream for tailing recent lines.
//!
//! The entry point is [`TaskLens`]; presentation (HTML, routing) is the
//! consumer's concern.

pub mod aws;
pub mod cluster;
pub mod config;
pub mod error;
pub mod history;
pub mod logs;
pub mod model;
pub mod ports;
pub mod resolver;
pub mod taskdef;

pub use config::{Config, EnvironmentConfig};
pub use error::{Error, Result};
pub use model::{
    Container, ContainerDefinition, ContainerOverride, LogConfiguration, LogLine, LogStreamRef,
    LogTail, Task, TaskDefinition, TaskStateChangeEvent,
};
pub use resolver::{TaskLens, TaskListing};
