#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use phone_review::config::{AppConfig, DatabaseProvider};
use phone_review::database::MemoryStore;
use phone_review::{app, AppState};

/// An in-process server on an ephemeral port over a fresh in-memory store
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.database.provider = DatabaseProvider::Memory;
        config.security.jwt_secret = "integration-secret".to_string();
        config.security.bcrypt_cost = 4;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind ephemeral port")?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let router = app(AppState::new(config, Arc::new(MemoryStore::new())));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` is relative to `/api/v1`
    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Registers and logs in, returning `(user_id, token)`
    pub async fn signup(&self, username: &str, password: &str) -> Result<(i64, String)> {
        let credentials = json!({"username": username, "password": password});

        let res = self
            .client
            .post(self.api("/auth/register"))
            .json(&credentials)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

        let body: Value = self
            .client
            .post(self.api("/auth/login"))
            .json(&credentials)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let id = body["user"]["id"].as_i64().context("login response without user id")?;
        let token = body["token"].as_str().context("login response without token")?;
        Ok((id, token.to_string()))
    }
}
