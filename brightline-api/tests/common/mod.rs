//! Common test utilities for API tests
//!
//! This module provides shared infrastructure for the HTTP-level tests:
//! - Fresh in-memory database per test
//! - Recording mocks for CAPTCHA, email, CRM and storage
//! - One account per role with a ready access token
//! - Request helpers that drive the router without a socket

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use brightline_api::app::{build_router, AppState};
use brightline_api::config::Config;
use brightline_shared::auth::jwt::{create_token, Claims, TokenType};
use brightline_shared::auth::password::hash_password;
use brightline_shared::db::connect_in_memory;
use brightline_shared::integrations::mock::{
    CaptchaMode, MemoryStorage, MockCaptcha, MockCrm, RecordingNotifier,
};
use brightline_shared::integrations::Integrations;
use brightline_shared::models::user::{CreateUser, User, UserRole};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Password every seeded account is created with
pub const PASSWORD: &str = "Brightline1";

/// Upload limit used by the test router
pub const MAX_UPLOAD_BYTES: usize = 1024;

/// Seeded account and its access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: axum::Router,
    pub config: Config,
    pub captcha: Arc<MockCaptcha>,
    pub notifier: Arc<RecordingNotifier>,
    pub crm: Arc<MockCrm>,
    pub storage: Arc<MemoryStorage>,
    pub admin: TestUser,
    pub editor: TestUser,
    pub member: TestUser,
}

impl TestContext {
    /// Creates a new test context with a fresh database
    pub async fn new() -> anyhow::Result<Self> {
        let db = connect_in_memory().await?;

        let mut config = Config::for_testing(JWT_SECRET);
        config.uploads.max_bytes = MAX_UPLOAD_BYTES;

        let captcha = Arc::new(MockCaptcha::new(CaptchaMode::Accept));
        let notifier = Arc::new(RecordingNotifier::new());
        let crm = Arc::new(MockCrm::new());
        let storage = Arc::new(MemoryStorage::new());
        let integrations = Integrations {
            captcha: captcha.clone(),
            notifier: notifier.clone(),
            crm: crm.clone(),
            storage: storage.clone(),
        };

        let admin = create_user(&db, "admin", UserRole::Administrator).await?;
        let editor = create_user(&db, "editor", UserRole::ContentEditor).await?;
        let member = create_user(&db, "member", UserRole::Registered).await?;

        let state = AppState::new(db.clone(), config.clone(), integrations);
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            captcha,
            notifier,
            crm,
            storage,
            admin,
            editor,
            member,
        })
    }

    /// Sends a request, returning the status and the parsed JSON body
    ///
    /// An empty body is returned as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a prebuilt request
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("Non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub fn admin_token(&self) -> Option<&str> {
        Some(self.admin.token.as_str())
    }

    pub fn editor_token(&self) -> Option<&str> {
        Some(self.editor.token.as_str())
    }

    pub fn member_token(&self) -> Option<&str> {
        Some(self.member.token.as_str())
    }
}

/// Creates an account with a known password and an access token for it
pub async fn create_user(db: &SqlitePool, name: &str, role: UserRole) -> anyhow::Result<TestUser> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}-{}@example.com", name, Uuid::new_v4()),
            password_hash: hash_password(PASSWORD)?,
            full_name: format!("Test {}", name),
            company: None,
            role,
        },
    )
    .await?;

    let claims = Claims::new(user.id, user.role, TokenType::Access);
    let token = create_token(&claims, JWT_SECRET)?;

    Ok(TestUser { user, token })
}

/// Asserts a validation error envelope naming `field`
pub fn assert_field_error(status: StatusCode, body: &Value, field: &str) {
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
    assert!(
        body["errors"].get(field).is_some(),
        "expected an error on `{}`, got {}",
        field,
        body["errors"]
    );
}
