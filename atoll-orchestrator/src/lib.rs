//! Workspace cluster lifecycle orchestration
//!
//! This crate contains the core business logic for managing the virtual
//! clusters owned by workspaces: admitting lifecycle intents, recording
//! them as durable tasks, and executing them asynchronously against a
//! pluggable cluster driver. It is consumed by the atoll-api HTTP service
//! but can also be used by CLI commands, background workers, or other
//! entry points.

pub mod db;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod store;
pub mod task;
pub mod test_utils;
pub mod workspace;

pub use error::{OrchestratorError, Result};
pub use executor::TaskExecutor;
pub use orchestrator::LifecycleOrchestrator;
pub use store::LifecycleStore;
pub use task::{Task, TaskFilters, TaskPage, TaskStatus, TaskType};
pub use workspace::{ClusterStatus, CreateWorkspaceRequest, Workspace};
