//! Common test utilities and helpers for atoll-api tests
//!
//! This module provides shared functionality for all test files to reduce code duplication
//! and improve maintainability of the test suite.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::SqlitePool;
use tower::ServiceExt;

use atoll_api::AppState;
use atoll_driver::scripted::ScriptedDriver;
use atoll_orchestrator::test_utils::{create_test_db, seed_org};

pub const TEST_ORG: &str = "org-acme";
pub const TEST_USER: &str = "user-alice";

/// Helper to extract JSON body from axum response
pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}

/// Helper to create authenticated request headers
pub fn auth_headers(user_id: &str) -> Vec<(&'static str, &str)> {
    vec![("x-atoll-user", user_id)]
}

/// TestClient to encapsulate API interaction logic
pub struct TestClient {
    pub app: Router,
    pub driver: Arc<ScriptedDriver>,
    pub pool: SqlitePool,
}

impl TestClient {
    /// Create a TestClient on a fresh in-memory DB with one seeded org
    pub async fn new() -> Self {
        let pool = create_test_db().await;
        seed_org(&pool, TEST_ORG, TEST_USER).await;

        let driver = Arc::new(ScriptedDriver::new());
        let state = AppState::new(pool.clone(), driver.clone(), 4, Duration::from_secs(5));
        let app = atoll_api::create_app(state)
            .await
            .expect("Failed to create test app");

        Self { app, driver, pool }
    }

    /// Send a request to the API
    pub async fn send_request(
        &self,
        request: axum::http::Request<axum::body::Body>,
    ) -> axum::http::Response<axum::body::Body> {
        // Clone the app to allow reuse (Router is cheap to clone)
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Post JSON to an endpoint
    pub async fn post<T: serde::Serialize>(
        &self,
        uri: &str,
        body: &T,
        headers: Option<Vec<(&str, &str)>>,
    ) -> axum::http::Response<axum::body::Body> {
        let req_body = serde_json::to_string(body).expect("Failed to serialize request body");
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");

        if let Some(h) = headers {
            for (k, v) in h {
                builder = builder.header(k, v);
            }
        }

        let request = builder.body(axum::body::Body::from(req_body)).unwrap();
        self.send_request(request).await
    }

    /// Post with an empty body (lifecycle actions that take no payload)
    pub async fn post_empty(
        &self,
        uri: &str,
        headers: Option<Vec<(&str, &str)>>,
    ) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder().method("POST").uri(uri);

        if let Some(h) = headers {
            for (k, v) in h {
                builder = builder.header(k, v);
            }
        }

        let request = builder.body(axum::body::Body::empty()).unwrap();
        self.send_request(request).await
    }

    /// Get request to an endpoint
    pub async fn get(
        &self,
        uri: &str,
        headers: Option<Vec<(&str, &str)>>,
    ) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder().method("GET").uri(uri);

        if let Some(h) = headers {
            for (k, v) in h {
                builder = builder.header(k, v);
            }
        }

        let request = builder.body(axum::body::Body::empty()).unwrap();
        self.send_request(request).await
    }

    /// Delete request to an endpoint
    pub async fn delete(
        &self,
        uri: &str,
        headers: Option<Vec<(&str, &str)>>,
    ) -> axum::http::Response<axum::body::Body> {
        let mut builder = axum::http::Request::builder().method("DELETE").uri(uri);

        if let Some(h) = headers {
            for (k, v) in h {
                builder = builder.header(k, v);
            }
        }

        let request = builder.body(axum::body::Body::empty()).unwrap();
        self.send_request(request).await
    }
}

/// Fixture: create a workspace through the API, returning its id
pub async fn fixture_workspace(client: &TestClient, name: &str) -> String {
    let response = client
        .post(
            &format!("/api/v1/orgs/{TEST_ORG}/workspaces"),
            &serde_json::json!({ "name": name }),
            Some(auth_headers(TEST_USER)),
        )
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let workspace: serde_json::Value = extract_json_body(response).await;
    workspace["id"]
        .as_str()
        .expect("Workspace response should carry an id")
        .to_string()
}

/// Force a workspace into a given cluster status, bypassing the API
pub async fn set_cluster_status(pool: &SqlitePool, workspace_id: &str, status: &str) {
    sqlx::query("UPDATE workspaces SET cluster_status = ? WHERE id = ?")
        .bind(status)
        .bind(workspace_id)
        .execute(pool)
        .await
        .expect("Failed to set cluster status");
}

/// Poll the tasks API until the task reaches COMPLETED or FAILED
pub async fn wait_for_task(client: &TestClient, task_id: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let response = client
                .get(
                    &format!("/api/v1/tasks/{task_id}"),
                    Some(auth_headers(TEST_USER)),
                )
                .await;
            assert_eq!(response.status(), axum::http::StatusCode::OK);

            let task: serde_json::Value = extract_json_body(response).await;
            if task["status"] == "COMPLETED" || task["status"] == "FAILED" {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Task did not reach a terminal status in time")
}
