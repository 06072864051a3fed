use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::workspace::serialize_datetime;

/// Durable record of one requested lifecycle operation.
///
/// `task_type` and `payload` are fixed at creation. Retrying a failed task
/// resets `status` on the same record rather than minting a new one, so the
/// id a client polls stays valid across attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: String,
    pub workspace_id: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle action a task carries out. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Create,
    Delete,
    Start,
    Stop,
    Upgrade,
    Backup,
    Restore,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Start => write!(f, "START"),
            Self::Stop => write!(f, "STOP"),
            Self::Upgrade => write!(f, "UPGRADE"),
            Self::Backup => write!(f, "BACKUP"),
            Self::Restore => write!(f, "RESTORE"),
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "DELETE" => Ok(Self::Delete),
            "START" => Ok(Self::Start),
            "STOP" => Ok(Self::Stop),
            "UPGRADE" => Ok(Self::Upgrade),
            "BACKUP" => Ok(Self::Backup),
            "RESTORE" => Ok(Self::Restore),
            _ => Err(format!("Invalid task type: {s}")),
        }
    }
}

/// Execution status of a task.
///
/// Transitions are restricted to PENDING -> RUNNING -> {COMPLETED, FAILED}
/// plus FAILED -> PENDING on retry; the store enforces this with guarded
/// updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Terminal statuses only change again through an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if the task is waiting for or undergoing execution.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Filters for task listing. All fields are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub workspace_id: Option<String>,
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
}

/// One page of tasks plus the total number of rows matching the filters.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
}
