//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store and drives it with
//! `tower::ServiceExt::oneshot`, so these tests need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tasknotes_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasknotes_shared::store::MemoryStore;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "Passw0rd!";

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "STORE_BACKEND" => Some("memory".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "REMINDER_INTERVAL_SECS" => Some("0".to_string()),
        "NOTIFICATION_CAPACITY" => Some("32".to_string()),
        _ => None,
    })
    .expect("test configuration")
}

/// Test context holding the router and its state
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

/// A registered user with a valid access token
pub struct TestUser {
    pub username: String,
    pub token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), test_config());
        let app = build_router(state.clone());
        Self { app, state }
    }

    /// Sends a request and returns the raw response
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
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

        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Sends a request and decodes the JSON body (Null when empty)
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/account/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        TestUser {
            username: username.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a task and returns its JSON
    pub async fn create_task(&self, user: &TestUser, body: Value) -> Value {
        let (status, task) = self
            .call(Method::POST, "/api/task", Some(&user.token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", task);
        task
    }

    /// IDs from a task list response
    pub async fn task_ids(&self, user: &TestUser, uri: &str) -> Vec<i64> {
        let (status, body) = self.call(Method::GET, uri, Some(&user.token), None).await;
        assert_eq!(status, StatusCode::OK, "list failed: {}", body);
        body.as_array()
            .unwrap()
            .iter()
            .map(|task| task["id"].as_i64().unwrap())
            .collect()
    }
}
