//! Integration tests for Rolodex.
//!
//! Each test spawns the real application on an ephemeral port with its own
//! temp-file SQLite database, then drives it over HTTP with a cookie-holding
//! client - the same way a browser or API consumer would.
//!
//! ```bash
//! cargo test -p rolodex-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::Ipv4Addr;

use serde_json::{Value, json};

use rolodex_server::config::ServerConfig;
use rolodex_server::db;
use rolodex_server::state::AppState;

/// A running application instance plus a client pointed at it.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    // Keeps the database file alive for the lifetime of the test.
    _db_file: tempfile::NamedTempFile,
}

impl TestApp {
    /// Spawn the full application on an ephemeral port with a fresh
    /// database.
    pub async fn spawn() -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("create temp database file");
        let database_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

        let config = ServerConfig {
            database_url: database_url.into(),
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            secure_cookies: false,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let pool = db::create_pool(&config.database_url)
            .await
            .expect("create pool");
        db::run_migrations(&pool).await.expect("run migrations");

        let state = AppState::new(config, pool);
        let app = rolodex_server::build_app(state).await.expect("build app");

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("build HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            _db_file: db_file,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register an account and log the shared client in.
    ///
    /// Uses `<username>@example.com` and a fixed password.
    pub async fn register_and_login(&self, username: &str) -> Value {
        let client = self.client.clone();
        self.register_and_login_as(&client, username).await
    }

    /// Register an account and log the given client in - used to act as a
    /// second user against the same app.
    pub async fn register_and_login_as(&self, client: &reqwest::Client, username: &str) -> Value {
        let email = format!("{username}@example.com");

        let resp = client
            .post(self.url("/api/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": "hunter2!",
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status(), 201, "registration should succeed");

        let resp = client
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": "hunter2!" }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), 200, "login should succeed");

        resp.json::<Value>().await.expect("login body")["user"].clone()
    }

    /// Upload a file to the import endpoint as multipart form data.
    pub async fn import_file(&self, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_owned());
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(self.url("/api/contacts/import"))
            .multipart(form)
            .send()
            .await
            .expect("import request")
    }

    /// A second, independent client (no cookies shared) for the same app -
    /// used to act as a different user.
    #[must_use]
    pub fn fresh_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("build HTTP client")
    }

    /// Create a contact via the API and return its JSON representation.
    pub async fn create_contact(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/contacts"))
            .json(&body)
            .send()
            .await
            .expect("create contact request");
        assert_eq!(resp.status(), 201, "contact creation should succeed");
        resp.json::<Value>().await.expect("contact body")["contact"].clone()
    }

    /// Create a tag via the API and return its JSON representation.
    pub async fn create_tag(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/tags"))
            .json(&body)
            .send()
            .await
            .expect("create tag request");
        assert_eq!(resp.status(), 201, "tag creation should succeed");
        resp.json::<Value>().await.expect("tag body")["tag"].clone()
    }
}
