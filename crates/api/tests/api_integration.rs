//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ManualClock, RecordId};
use metrics_exporter_prometheus::PrometheusHandle;
use resource_store::InMemoryResourceStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    clock: ManualClock,
    organization_id: RecordId,
}

impl TestApp {
    async fn new() -> Self {
        let clock = ManualClock::default();
        let state = api::create_state(
            InMemoryResourceStore::property_management(),
            Arc::new(clock.clone()),
            &api::Config::default(),
        );
        state.coordinator.roles().ensure_defaults().await.unwrap();
        let app = api::create_app(state, get_metrics_handle());

        Self {
            app,
            clock,
            organization_id: RecordId::new(),
        }
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_as(RecordId::new(), uri, body).await
    }

    async fn post_as(&self, user_id: RecordId, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("x-organization-id", self.organization_id.to_string())
                .header("x-user-id", user_id.to_string())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn invite(&self, email: &str) -> Value {
        let (status, body) = self.post("/invite/tenant", json!({ "email": email })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_invite_returns_pending_invitation() {
    let app = TestApp::new().await;

    let body = app.invite("jane@co.com").await;

    assert_eq!(body["message"], "Invitation sent successfully");
    assert_eq!(body["invitation"]["email"], "jane@co.com");
    assert_eq!(body["invitation"]["status"], "pending");
    assert!(body["invitation"]["id"].as_str().is_some());
    assert!(body["invitation"]["expires_at"].as_str().is_some());
}

#[tokio::test]
async fn test_invite_requires_email() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/invite/owner", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required");
}

#[tokio::test]
async fn test_invite_requires_organization() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/invite/vendor")
                .header("content-type", "application/json")
                .body(Body::from(json!({"email": "v@co.com"}).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Organization ID is required");
}

#[tokio::test]
async fn test_invite_rejects_unknown_role_path() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/invite/superadmin", json!({"email": "x@co.com"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invite_rejects_registered_email() {
    let app = TestApp::new().await;
    app.invite("jane@co.com").await;
    let (status, _) = app
        .post(
            "/invite/accept/token",
            json!({
                "email": "jane@co.com",
                "password": "secret-pass",
                "firstName": "Jane",
                "lastName": "Doe"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/invite/team", json!({"email": "jane@co.com"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User with this email already exists");
}

#[tokio::test]
async fn test_verify_then_accept_flow() {
    let app = TestApp::new().await;
    app.invite("jane@co.com").await;

    let (status, body) = app.get("/invite/verify/abc123?email=jane@co.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Invitation is valid");
    assert_eq!(body["invitation"]["role"], "tenant");
    assert_eq!(
        body["invitation"]["organization_id"],
        app.organization_id.to_string()
    );

    let (status, body) = app
        .post(
            "/invite/accept/abc123",
            json!({
                "email": "jane@co.com",
                "password": "secret-pass",
                "firstName": "Jane",
                "lastName": "Doe"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account created successfully");
    assert_eq!(body["user"]["email"], "jane@co.com");
    assert_eq!(body["user"]["first_name"], "Jane");
    assert_eq!(body["user"]["role"], "tenant");

    let (status, body) = app.get("/invite/verify/abc123?email=jane@co.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invitation not found");
}

#[tokio::test]
async fn test_verify_requires_email() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/invite/verify/abc123").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token and email are required");
}

#[tokio::test]
async fn test_expired_invitation_is_rejected() {
    let app = TestApp::new().await;
    app.invite("jane@co.com").await;
    app.clock.advance(chrono::Duration::hours(25));

    let (status, body) = app.get("/invite/verify/abc123?email=jane@co.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invitation has expired");

    let (status, _) = app
        .post(
            "/invite/accept/abc123",
            json!({
                "email": "jane@co.com",
                "password": "secret-pass",
                "firstName": "Jane",
                "lastName": "Doe"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accept_requires_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/invite/accept/abc123", json!({"email": "jane@co.com"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password is required");
}

#[tokio::test]
async fn test_create_rental() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/rentals",
            json!({
                "property": {"name": "Elm Court", "address": "1 Elm St"},
                "units": [
                    {"unit_number": "1A", "rent_amount": "1500", "bedrooms": "2",
                     "bathrooms": "1", "square_feet": "800", "status": "Reserved"},
                    {"unit_number": "1B", "rent_amount": 1650, "bedrooms": 2,
                     "bathrooms": 1.5, "square_feet": 850, "status": "Occupied"}
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["name"], "Elm Court");
    assert_eq!(body["total_units"], 2);
    assert_eq!(body["organization_id"], app.organization_id.to_string());
    let units = body["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert!(units.iter().any(|u| u["status"] == "Available"));
    assert!(units.iter().any(|u| u["status"] == "Occupied"));
}

#[tokio::test]
async fn test_create_rental_without_units() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/rentals",
            json!({"property": {"name": "Elm Court"}, "units": []}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "At least one unit is required for a property");
}

#[tokio::test]
async fn test_create_organization() {
    let app = TestApp::new().await;
    let owner_id = RecordId::new();

    let (status, body) = app
        .post_as(
            owner_id,
            "/organizations",
            json!({
                "user": {"id": owner_id, "email": "olive@acme.com", "first_name": "Olive"},
                "organization": {"name": "Acme Rentals"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["organization"]["name"], "Acme Rentals");
    assert_eq!(body["user_profile"]["id"], owner_id.to_string());
    assert_eq!(
        body["role_assignment"]["organization_id"],
        body["organization"]["id"]
    );
}

#[tokio::test]
async fn test_create_organization_owner_defaults_to_caller() {
    let app = TestApp::new().await;
    let caller_id = RecordId::new();

    let (status, body) = app
        .post_as(
            caller_id,
            "/organizations",
            json!({
                "user": {"email": "olive@acme.com"},
                "organization": {"name": "Acme Rentals"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user_profile"]["id"], caller_id.to_string());
    assert_eq!(body["role_assignment"]["user_id"], caller_id.to_string());
}

#[tokio::test]
async fn test_create_organization_for_another_user_is_forbidden() {
    let app = TestApp::new().await;
    let owner_id = RecordId::new();
    let (status, original) = app
        .post_as(
            owner_id,
            "/organizations",
            json!({
                "user": {"id": owner_id, "email": "olive@acme.com"},
                "organization": {"name": "Olive Co"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post_as(
            RecordId::new(),
            "/organizations",
            json!({
                "user": {"id": owner_id, "email": "mallory@evil.com"},
                "organization": {"name": "Mallory Co"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Cannot create an organization for another user");

    // The owner's profile still carries their own email; nothing was
    // written under the other address.
    let (status, body) = app
        .post("/invite/owner", json!({"email": "olive@acme.com"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "User with this email already exists");
    app.invite("mallory@evil.com").await;
    assert_eq!(
        original["user_profile"]["organization_id"],
        original["organization"]["id"]
    );
}

#[tokio::test]
async fn test_create_organization_requires_caller() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/organizations")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "user": {"id": RecordId::new(), "email": "olive@acme.com"},
                        "organization": {"name": "Acme Rentals"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID is required");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    app.invite("metrics@co.com").await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("saga_executions_total"));
}
