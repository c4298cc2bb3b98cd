//! Common test utilities for integration tests
//!
//! - Isolated on-disk layout per test (temporary directory)
//! - Router construction with cheap password hashing
//! - Request builders for JSON and multipart bodies
//! - User registration helper

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::Value;
use std::path::PathBuf;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::{ApiConfig, Config, JwtConfig, StorageConfig, DEFAULT_MAX_UPLOAD_BYTES};
use taskdesk_shared::auth::password::HashParams;
use tempfile::TempDir;
use tower::Service as _;

pub const BOUNDARY: &str = "taskdesk-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub config: Config,
    /// Keeps the directory alive for the duration of the test
    pub dir: TempDir,
}

/// A user registered through the API
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestUser {
    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// A part of a multipart form
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content: &'a [u8],
    },
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            env: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        },
        storage: StorageConfig::under(dir.path()),
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            expiry_hours: 1,
        },
        password: HashParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    }
}

impl TestContext {
    /// Creates a new test context with an empty document
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Creates a test context after adjusting the default test config
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let mut config = test_config(&dir);
        adjust(&mut config);

        let state = AppState::open(config.clone()).await?;
        let app = build_router(state);

        Ok(TestContext { app, config, dir })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a request and parses the JSON response body
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        let body = body_bytes(response).await;
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    /// Registers a user and returns its ID and token
    pub async fn register(&self, username: &str, password: &str) -> TestUser {
        let (status, body) = self
            .send_json(json_request(
                "POST",
                "/api/auth/register",
                None,
                &serde_json::json!({ "username": username, "password": password }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            username: body["user"]["username"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a task with a text-only form
    pub async fn create_task(&self, user: &TestUser, title: &str, description: &str) -> Value {
        let (status, body) = self
            .send_json(multipart_request(
                "/api/tasks",
                Some(user),
                &[Part::Text("title", title), Part::Text("description", description)],
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }

    /// Lists the user's tasks
    pub async fn list_tasks(&self, user: &TestUser) -> Vec<Value> {
        let (status, body) = self.send_json(empty_request("GET", "/api/tasks", Some(user))).await;
        assert_eq!(status, StatusCode::OK, "list failed: {}", body);
        body.as_array().unwrap().clone()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.config.storage.uploads_dir.clone()
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.config.storage.tmp_uploads_dir.clone()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn empty_request(method: &str, uri: &str, user: Option<&TestUser>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, user.auth_header());
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, user: Option<&TestUser>, body: &Value) -> Request<Body> {
    raw_json_request(method, uri, user, body.to_string())
}

pub fn raw_json_request(method: &str, uri: &str, user: Option<&TestUser>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, user.auth_header());
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, user: Option<&TestUser>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, user.auth_header());
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// Counts the entries in a directory, treating a missing one as empty
pub fn count_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
