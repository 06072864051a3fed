use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tenant workspace and the state of its managed virtual cluster.
///
/// The cluster fields are denormalized driver output: `cluster_status` is
/// the only field admission checks, and only the task executor writes the
/// instance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Workspace {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub cluster_status: ClusterStatus,

    /// Admission token bumped on every accepted lifecycle intent.
    pub version: i64,

    pub instance_name: Option<String>,
    pub cluster_config: serde_json::Value,
    pub cluster_version: Option<String>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Where the workspace's virtual cluster currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    /// No cluster exists yet (also the state after a completed delete).
    PendingCreation,
    /// A create task is in flight.
    Configuring,
    Running,
    Starting,
    Stopping,
    Stopped,
    Deleting,
    Error,
    Unknown,
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingCreation => write!(f, "PENDING_CREATION"),
            Self::Configuring => write!(f, "CONFIGURING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Starting => write!(f, "STARTING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Deleting => write!(f, "DELETING"),
            Self::Error => write!(f, "ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

// Serialize DateTime as RFC 3339 / ISO 8601 string
pub(crate) fn serialize_datetime<S>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}
