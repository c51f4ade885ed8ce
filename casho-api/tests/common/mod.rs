/// Shared harness for the API integration tests
///
/// Each test receives a fresh database from `#[sqlx::test]`; the router is
/// driven in-process with `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use casho_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "testpass123";

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

/// A registered user and their tokens
pub struct TestUser {
    pub id: String,
    pub access: String,
    pub refresh: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access)
    }
}

impl TestContext {
    pub fn new(db: PgPool) -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_SECRET.to_string(),
            },
        };

        let app = build_router(AppState::new(db.clone(), config));
        Self { db, app }
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, value)
    }

    pub async fn register(&self, username: &str, email: &str) -> TestUser {
        let (status, body) = self
            .send(
                "POST",
                "/api/register/",
                None,
                Some(json!({
                    "username": username,
                    "email": email,
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            access: body["access"].as_str().unwrap().to_string(),
            refresh: body["refresh"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a category through the API and returns its id
    pub async fn create_category(&self, user: &TestUser, name: &str, kind: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/categories/",
                Some(&user.access),
                Some(json!({"name": name, "type": kind})),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "category create failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Posts a GraphQL document, optionally authenticated
    pub async fn graphql(&self, token: Option<&str>, query: &str) -> Value {
        let (status, body) = self
            .send("POST", "/graphql", token, Some(json!({"query": query})))
            .await;

        assert_eq!(status, StatusCode::OK, "graphql transport failed: {body}");
        body
    }
}
