//! Cluster driver abstraction library.
//!
//! This library defines the contract between the lifecycle orchestrator and
//! whatever actually provisions virtual clusters (Kubernetes + helm in
//! production, a simulator for local development). Drivers are slow,
//! fallible, and run outside any database transaction; the orchestrator
//! supervises every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod error;
pub mod simulated;

// When the `test-helpers` feature is enabled, include the scripted driver.
#[cfg(feature = "test-helpers")]
pub mod scripted;

pub use error::{DriverError, Result};
pub use simulated::SimulatedDriver;

/// Everything a driver needs to know about the cluster it is acting on.
///
/// This is a projection of the workspace record, not the record itself:
/// drivers never see the database.
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    /// Owning workspace id, used to derive deterministic instance names.
    pub workspace_id: String,
    /// Human-readable workspace name.
    pub name: String,
    /// Instance name assigned at provisioning time, if the cluster exists.
    pub instance_name: Option<String>,
}

/// Metadata reported by a successful `create` call.
#[derive(Debug, Clone)]
pub struct ProvisionedCluster {
    pub instance_name: String,
    pub endpoint: String,
    pub version: String,
}

/// Parameters for provisioning a new cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<serde_json::Value>,
}

/// Parameters for upgrading an existing cluster.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpgradeParams {
    pub target_version: String,
    /// Upgrade strategy: "rolling" or "replace".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// Parameters for backing up a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackupParams {
    pub backup_name: String,
    /// Retention window: "30d", "90d", etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<String>,
}

/// Parameters for restoring a cluster from a backup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreParams {
    pub backup_name: String,
    /// Restore strategy: "replace" or "merge".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// The core trait for cluster drivers.
///
/// Every method maps to one lifecycle action. Calls must be safe to retry:
/// the orchestrator re-invokes the same action after a failed task is
/// retried, with the same spec and parameters.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Get the name of the driver (e.g., "simulated", "k8s").
    fn name(&self) -> &'static str;

    /// Provision a new virtual cluster and report its instance metadata.
    async fn create(&self, spec: &ClusterSpec, params: &CreateParams) -> Result<ProvisionedCluster>;

    /// Tear down the cluster and release its resources.
    async fn delete(&self, spec: &ClusterSpec) -> Result<()>;

    /// Start a stopped cluster.
    async fn start(&self, spec: &ClusterSpec) -> Result<()>;

    /// Stop a running cluster without releasing its storage.
    async fn stop(&self, spec: &ClusterSpec) -> Result<()>;

    /// Upgrade the cluster to a new version.
    async fn upgrade(&self, spec: &ClusterSpec, params: &UpgradeParams) -> Result<()>;

    /// Create a named backup of the cluster.
    async fn backup(&self, spec: &ClusterSpec, params: &BackupParams) -> Result<()>;

    /// Restore the cluster from a named backup.
    async fn restore(&self, spec: &ClusterSpec, params: &RestoreParams) -> Result<()>;
}
