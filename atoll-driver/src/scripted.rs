//! Scripted driver for exercising the orchestrator's failure handling.
//!
//! Every action records itself in a call log and then follows the currently
//! configured [`Behavior`], so tests can assert both what the orchestrator
//! dispatched and how it reacts to success, failure, panics, and hangs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    BackupParams, ClusterDriver, ClusterSpec, CreateParams, DriverError, ProvisionedCluster,
    RestoreParams, Result, UpgradeParams,
};

/// How the scripted driver responds to the next calls.
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
    Hang(Duration),
}

#[derive(Debug, Default)]
pub struct ScriptedDriver {
    behavior: Mutex<Behavior>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the active-call counter even when the call panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..Self::default()
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Actions dispatched so far, in order (e.g. `["create", "create"]`).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of driver calls in flight at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn run(&self, action: &str) -> Result<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let _in_flight = InFlight(&self.active);

        self.calls.lock().unwrap().push(action.to_string());
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(msg) => Err(DriverError::Failed(msg)),
            Behavior::Panic(msg) => panic!("{msg}"),
            Behavior::Hang(delay) => {
                sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ClusterDriver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn create(&self, spec: &ClusterSpec, params: &CreateParams) -> Result<ProvisionedCluster> {
        self.run("create").await?;
        let instance_name = format!("vcluster-{}", spec.workspace_id);
        Ok(ProvisionedCluster {
            endpoint: format!("https://{instance_name}.atoll-workspaces.svc.cluster.local"),
            version: params
                .version
                .clone()
                .unwrap_or_else(|| crate::simulated::DEFAULT_CLUSTER_VERSION.to_string()),
            instance_name,
        })
    }

    async fn delete(&self, _spec: &ClusterSpec) -> Result<()> {
        self.run("delete").await
    }

    async fn start(&self, _spec: &ClusterSpec) -> Result<()> {
        self.run("start").await
    }

    async fn stop(&self, _spec: &ClusterSpec) -> Result<()> {
        self.run("stop").await
    }

    async fn upgrade(&self, _spec: &ClusterSpec, _params: &UpgradeParams) -> Result<()> {
        self.run("upgrade").await
    }

    async fn backup(&self, _spec: &ClusterSpec, _params: &BackupParams) -> Result<()> {
        self.run("backup").await
    }

    async fn restore(&self, _spec: &ClusterSpec, _params: &RestoreParams) -> Result<()> {
        self.run("restore").await
    }
}
