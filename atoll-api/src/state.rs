use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use atoll_driver::ClusterDriver;
use atoll_orchestrator::LifecycleOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: LifecycleOrchestrator,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        driver: Arc<dyn ClusterDriver>,
        max_concurrent_tasks: usize,
        driver_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator: LifecycleOrchestrator::new(
                pool,
                driver,
                max_concurrent_tasks,
                driver_timeout,
            ),
        }
    }
}
