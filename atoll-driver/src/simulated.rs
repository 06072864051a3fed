//! Simulated cluster driver for local development.
//!
//! Performs no real infrastructure work: every action sleeps for a short,
//! configurable delay and fabricates the metadata a real driver would
//! report. This is the default driver wired into the service binary so the
//! whole control plane can run on a laptop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use crate::{
    BackupParams, ClusterDriver, ClusterSpec, CreateParams, ProvisionedCluster, RestoreParams,
    Result, UpgradeParams,
};

/// Cluster version reported when a provision request does not pin one.
pub const DEFAULT_CLUSTER_VERSION: &str = "0.15.0";

#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    delay: Duration,
}

impl SimulatedDriver {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    fn instance_name(spec: &ClusterSpec) -> String {
        format!("vcluster-{}", spec.workspace_id)
    }

    fn endpoint(instance_name: &str) -> String {
        format!("https://{instance_name}.atoll-workspaces.svc.cluster.local")
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl ClusterDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn create(&self, spec: &ClusterSpec, params: &CreateParams) -> Result<ProvisionedCluster> {
        info!(workspace_id = %spec.workspace_id, "Simulating cluster provisioning");
        sleep(self.delay).await;

        let instance_name = Self::instance_name(spec);
        Ok(ProvisionedCluster {
            endpoint: Self::endpoint(&instance_name),
            version: params
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_CLUSTER_VERSION.to_string()),
            instance_name,
        })
    }

    async fn delete(&self, spec: &ClusterSpec) -> Result<()> {
        info!(workspace_id = %spec.workspace_id, "Simulating cluster destruction");
        sleep(self.delay).await;
        Ok(())
    }

    async fn start(&self, spec: &ClusterSpec) -> Result<()> {
        info!(workspace_id = %spec.workspace_id, "Simulating cluster start");
        sleep(self.delay).await;
        Ok(())
    }

    async fn stop(&self, spec: &ClusterSpec) -> Result<()> {
        info!(workspace_id = %spec.workspace_id, "Simulating cluster stop");
        sleep(self.delay).await;
        Ok(())
    }

    async fn upgrade(&self, spec: &ClusterSpec, params: &UpgradeParams) -> Result<()> {
        info!(
            workspace_id = %spec.workspace_id,
            target_version = %params.target_version,
            "Simulating cluster upgrade"
        );
        sleep(self.delay).await;
        Ok(())
    }

    async fn backup(&self, spec: &ClusterSpec, params: &BackupParams) -> Result<()> {
        info!(
            workspace_id = %spec.workspace_id,
            backup_name = %params.backup_name,
            "Simulating cluster backup"
        );
        sleep(self.delay).await;
        Ok(())
    }

    async fn restore(&self, spec: &ClusterSpec, params: &RestoreParams) -> Result<()> {
        info!(
            workspace_id = %spec.workspace_id,
            backup_name = %params.backup_name,
            "Simulating cluster restore"
        );
        sleep(self.delay).await;
        Ok(())
    }
}
