use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use atoll_api::{create_app, AppState, Config};
use atoll_driver::{ClusterDriver, SimulatedDriver};
use atoll_orchestrator::db::{backup_database, create_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("atoll_api=debug,atoll_orchestrator=debug,tower_http=debug")
        .init();

    info!("Starting atoll-api service...");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: bind_addr={}, db_path={}",
        config.bind_addr,
        config.db_path.display()
    );

    // Database setup
    let db_path = &config.db_path;

    // Backup before migrations
    if db_path.exists() {
        let backup_path = backup_database(db_path)?;
        info!("Database backed up to: {}", backup_path.display());
    }

    // Create pool and run migrations
    let pool = create_pool(db_path).await?;
    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations complete");

    // The simulated driver stands in for a real control-plane integration.
    let driver: Arc<dyn ClusterDriver> = Arc::new(SimulatedDriver::new(Duration::from_millis(
        config.simulated_driver_delay_ms,
    )));
    info!("Cluster driver: {}", driver.name());

    let state = AppState::new(
        pool,
        driver,
        config.max_concurrent_tasks,
        Duration::from_secs(config.driver_timeout_secs),
    );
    info!(
        "Task executor configured: max_concurrent_tasks={}, driver_timeout={}s",
        config.max_concurrent_tasks, config.driver_timeout_secs
    );

    // Create app
    let app = create_app(state).await?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
