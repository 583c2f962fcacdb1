use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::{AppConfig, DatabaseProvider};
use crate::database::MemoryStore;
use crate::routes;
use crate::state::AppState;

/// Minimum bcrypt cost keeps handler tests fast
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.provider = DatabaseProvider::Memory;
    config.security.jwt_secret = "test-secret".to_string();
    config.security.bcrypt_cost = TEST_BCRYPT_COST;
    config
}

/// A router over a fresh `MemoryStore`, driven with `oneshot`
pub struct TestContext {
    pub state: AppState,
    app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let state = AppState::new(test_config(), Arc::new(MemoryStore::new()));
        Self {
            app: routes::app(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn send(&self, method: Method, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(method, path, Some(token), Some(body)).await
    }

    /// Registers `username` and returns `(user_id, token)`
    pub async fn login_as(&self, username: &str) -> (i64, String) {
        let credentials = serde_json::json!({"username": username, "password": "password123"});
        let (status, _) = self
            .request(Method::POST, "/api/v1/auth/register", None, Some(credentials.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .request(Method::POST, "/api/v1/auth/login", None, Some(credentials))
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}
