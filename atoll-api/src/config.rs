use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    #[serde(default = "default_driver_timeout_secs")]
    pub driver_timeout_secs: u64,

    #[serde(default = "default_simulated_driver_delay_ms")]
    pub simulated_driver_delay_ms: u64,
}

fn default_bind_addr() -> String {
    std::env::var("ATOLL_API_BIND").unwrap_or_else(|_| "0.0.0.0:3271".to_string())
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("ATOLL_API_DB_PATH") {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata)
            .join("atoll")
            .join("api")
            .join("atoll.db")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".atoll")
            .join("api")
            .join("atoll.db")
    }
}

fn default_max_concurrent_tasks() -> usize {
    std::env::var("ATOLL_MAX_CONCURRENT_TASKS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8)
}

fn default_driver_timeout_secs() -> u64 {
    std::env::var("ATOLL_DRIVER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(600) // 10 minutes
}

fn default_simulated_driver_delay_ms() -> u64 {
    std::env::var("ATOLL_SIMULATED_DRIVER_DELAY_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            driver_timeout_secs: default_driver_timeout_secs(),
            simulated_driver_delay_ms: default_simulated_driver_delay_ms(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
