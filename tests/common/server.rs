//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::{create_test_dbs, TestIds};
use soundclone_server::content::{ContentManager, SqliteContentStore};
use soundclone_server::search::{SearchManager, SqliteSearchStore};
use soundclone_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use soundclone_server::user::{SqliteUserStore, TokenIssuer, UserManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Ids of the seeded users and content
    pub ids: TestIds,

    /// User store for direct database access in tests
    pub user_store: Arc<SqliteUserStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the fixtures cannot be created, the port cannot be bound
    /// or the server doesn't become ready within the timeout.
    pub async fn spawn() -> Self {
        Self::spawn_with_token_lifetimes(chrono::Duration::minutes(60), chrono::Duration::days(1))
            .await
    }

    /// Spawns a server whose tokens live for the given durations
    pub async fn spawn_with_token_lifetimes(
        access_lifetime: chrono::Duration,
        refresh_lifetime: chrono::Duration,
    ) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let ids = create_test_dbs(temp_db_dir.path()).expect("Failed to create test databases");

        let user_store = Arc::new(
            SqliteUserStore::new(temp_db_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );
        let content_store = Arc::new(
            SqliteContentStore::new(temp_db_dir.path().join("content.db"))
                .expect("Failed to open content store"),
        );
        let search_store = Arc::new(
            SqliteSearchStore::new(temp_db_dir.path().join("search.db"))
                .expect("Failed to open search store"),
        );

        let tokens = TokenIssuer::new(TEST_JWT_SECRET, access_lifetime, refresh_lifetime);
        let user_manager = Arc::new(UserManager::new(user_store.clone(), tokens));
        let content_manager = Arc::new(ContentManager::new(
            content_store.clone(),
            user_store.clone(),
        ));
        let search_manager = Arc::new(SearchManager::new(search_store, content_store));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let state = ServerState::new(config, user_manager, content_manager, search_manager);
        let app = make_app(state);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            ids,
            user_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
