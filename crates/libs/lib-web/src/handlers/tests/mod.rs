//! # Handler Tests
//!
//! Requests go through the full router built by [`create_router`], against a
//! migrated in-memory database and the mock integrations.
//!
//! - [`auth`]: registration, logins, sessions and API keys
//! - [`relief`]: disasters, vendors, vouchers and transactions
//! - [`admin`]: users, proofs, notifications, settings and audit

mod admin;
mod relief;

use crate::server::{create_router, AppState};
use crate::services::session::ClientInfo;
use crate::services::SessionService;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use ed25519_dalek::SigningKey;
use lib_core::model::store::create_memory_pool;
use lib_core::model::store::enums::{DisasterSeverity, Role, VendorStatus};
use lib_core::model::store::models::{DisasterForCreate, User, UserForCreate, Vendor, VendorForCreate};
use lib_core::model::store::{DisasterRepository, UserRepository, VendorRepository};
use lib_core::Config;
use lib_integrations::Integrations;
use serde_json::Value;
use tower::ServiceExt;

/// Create test config
fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret-key-must-be-at-least-32-characters-long!".to_string(),
        jwt_expiration_hours: 24,
        cache_ttl_seconds: 60,
    }
}

/// Deterministic Ed25519 wallet for `seed`.
fn wallet(seed: u8) -> (SigningKey, String) {
    let signing = SigningKey::from_bytes(&[seed; 32]);
    let address = bs58::encode(signing.verifying_key().as_bytes()).into_string();
    (signing, address)
}

struct TestApp {
    router: Router,
    state: AppState,
}

/// Router plus state over a fresh database.
async fn spawn_app() -> TestApp {
    let pool = create_memory_pool().await.expect("Test database should migrate");
    let state = AppState::new(pool, test_config(), Integrations::mock());
    let router = create_router(state.clone(), vec!["http://localhost:3000".to_string()]);
    TestApp { router, state }
}

impl TestApp {
    /// Send a JSON request, optionally with a bearer token. Non-JSON bodies
    /// come back as `Value::Null`.
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
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
        self.send(builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Insert a user directly and open a session for it.
    async fn user(&self, seed: u8, role: Role) -> (User, String) {
        let (_, address) = wallet(seed);
        let user = UserRepository::create(
            &self.state.db,
            &UserForCreate {
                wallet_address: address,
                name: format!("{} {}", role, seed),
                email: Some(format!("user{}@example.org", seed)),
                phone: None,
                password_hash: None,
                role,
            },
        )
        .await
        .expect("User creation should succeed in test");

        let token = self.token_for(user.clone()).await;
        (user, token)
    }

    async fn token_for(&self, user: User) -> String {
        SessionService::issue(&self.state.db, &self.state.config, user, &ClientInfo::default())
            .await
            .expect("Session should open in test")
            .token
    }

    /// Active disaster holding `funding` minor units.
    async fn disaster(&self, created_by: i64, funding: i64) -> i64 {
        let disaster = DisasterRepository::create(
            &self.state.db,
            &DisasterForCreate {
                name: "River Flood".to_string(),
                description: None,
                location: "Lowlands".to_string(),
                latitude: 10.0,
                longitude: 20.0,
                radius_km: 25.0,
                severity: DisasterSeverity::High,
                funding_goal: funding * 2,
                created_by,
            },
        )
        .await
        .expect("Disaster creation should succeed in test");

        if funding > 0 {
            DisasterRepository::add_funding(&self.state.db, disaster.id, funding)
                .await
                .expect("Funding should succeed in test")
                .expect("Disaster should exist in test");
        }
        disaster.id
    }

    /// Approved vendor profile for `user` in `disaster_id`.
    async fn approved_vendor(&self, user: &User, disaster_id: i64, approver: i64) -> Vendor {
        let vendor = VendorRepository::create(
            &self.state.db,
            &VendorForCreate {
                user_id: user.id,
                disaster_id,
                business_name: "Corner Grocery".to_string(),
                category: "food".to_string(),
                wallet_address: user.wallet_address.clone(),
                phone: None,
                address: None,
                latitude: None,
                longitude: None,
            },
        )
        .await
        .expect("Vendor creation should succeed in test");

        VendorRepository::set_status(&self.state.db, vendor.id, VendorStatus::Approved, approver)
            .await
            .expect("Vendor approval should succeed in test")
    }
}

// ========== Router Surface ==========

#[tokio::test]
async fn test_health_returns_ok() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = spawn_app().await;

    let (status, body) = app.call(Method::GET, "/api/nowhere", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NotFound");
}

#[tokio::test]
async fn test_malformed_json_is_enveloped_as_400() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "InvalidInput");
}

#[tokio::test]
async fn test_huge_page_number_is_clamped() {
    let app = spawn_app().await;

    let (status, body) = app
        .call(Method::GET, "/api/disasters?page=9223372036854775807&limit=100", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], serde_json::json!([]));
    assert_eq!(body["data"]["pagination"]["page"], 1_000_000);
}

#[tokio::test]
async fn test_protected_route_requires_credentials() {
    let app = spawn_app().await;

    let (status, body) = app.call(Method::GET, "/api/vouchers", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "Unauthorized");
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
