//! Test harness driving the router in-process.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_api::auth::hash_password;
use tally_api::{build_router, ApiConfig, AppState};
use tally_core::{NewUser, Role, User};
use tally_db::testing;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

/// Application backed by a fresh Postgres schema.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// `None` when `TALLY_TEST_DATABASE_URL` is unset; callers skip.
    pub async fn new() -> Option<Self> {
        let db = testing::database().await?;
        let state = AppState::new(db, ApiConfig::default());

        Some(TestApp {
            router: build_router(state.clone()),
            state,
        })
    }

    /// Inserts a user directly, bypassing the API.
    pub async fn create_user(&self, email: &str, role: Role) -> User {
        self.state
            .db
            .users()
            .create(NewUser {
                first_name: "Test".to_string(),
                last_name: role.to_string(),
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    /// Logs in and returns the full auth response body.
    pub async fn login(&self, email: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    /// Creates a user of `role` and returns an access token for it.
    pub async fn token_for(&self, email: &str, role: Role) -> String {
        self.create_user(email, role).await;
        let body = self.login(email).await;
        body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("admin@example.com", Role::Admin).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Creates a category and a product in it, returning the product id.
    pub async fn product(&self, token: &str, sku: &str) -> i64 {
        let category_id = match self.category_id(token, "General").await {
            Some(id) => id,
            None => {
                let (status, body) = self
                    .post("/api/categories", token, json!({ "name": "General" }))
                    .await;
                assert_eq!(status, StatusCode::CREATED, "{body}");
                body["id"].as_i64().unwrap()
            }
        };

        let (status, body) = self
            .post(
                "/api/products",
                token,
                json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "categoryId": category_id,
                    "priceCents": 1250,
                    "lowStockThreshold": 5
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn category_id(&self, token: &str, name: &str) -> Option<i64> {
        let (_, body) = self.get("/api/categories", token).await;
        body.as_array()?
            .iter()
            .find(|c| c["name"] == name)
            .and_then(|c| c["id"].as_i64())
    }

    pub async fn adjust(&self, token: &str, product_id: i64, body: Value) -> (StatusCode, Value) {
        self.request(
            Method::PATCH,
            &format!("/api/products/{product_id}/quantity"),
            Some(token),
            Some(body),
        )
        .await
    }
}

/// The `error.code` of an error body.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
