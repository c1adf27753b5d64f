//! Common test utilities for tollgate integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use tollgate_service::{create_router, AppState, ServiceConfig};
use tollgate_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store backing the server, for direct assertions.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The tool API key for consume/read requests.
    pub service_api_key: String,
    /// The admin API key for privileged requests.
    pub admin_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_webhook_target(None)
    }

    /// Create a harness whose webhook events are delivered to `url`.
    pub fn with_webhook_target(url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let service_api_key = "test-tool-key".to_string();
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            admin_api_key: Some(admin_api_key.clone()),
            webhook_url: url,
            webhook_secret: Some("whsec_test".into()),
            sweep_interval_seconds: 1,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            service_api_key,
            admin_api_key,
        }
    }

    /// Create an account with the given overdraft limit, returning its ID.
    pub async fn create_account(&self, overdraft_limit: i64) -> String {
        let response = self
            .server
            .post("/v1/accounts")
            .add_header("x-admin-key", &self.admin_api_key)
            .json(&serde_json::json!({ "overdraft_limit": overdraft_limit }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["account_id"].as_str().unwrap().to_string()
    }

    /// Grant credits to an account through the API.
    pub async fn grant(&self, account_id: &str, amount: i64, idempotency_key: &str) {
        self.server
            .post("/v1/credits/grant")
            .add_header("x-admin-key", &self.admin_api_key)
            .json(&serde_json::json!({
                "account_id": account_id,
                "amount": amount,
                "reason": "Test funding",
                "idempotency_key": idempotency_key,
            }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
