// HTTP-level tests for the Gatekeeper API
// The router runs against the in-memory directories, so no database is needed

use super::*;
use crate::auth::{HashingCost, InMemoryDirectory};
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

/// Helper function to create a test app over a fresh in-memory directory
fn create_test_app() -> (TestServer, InMemoryDirectory) {
    let dir = InMemoryDirectory::new();
    let hasher = PasswordHasher::new(HashingCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let auth = AuthService::new(
        Arc::new(dir.clone()),
        Arc::new(dir.clone()),
        hasher,
        chrono::Duration::hours(24),
    );

    let app = create_router(AppState { auth }, Duration::from_secs(5));
    (TestServer::new(app).unwrap(), dir)
}

fn registration(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "email": email,
        "password": "pa55word",
        "bio": "Trail runner"
    })
}

async fn register(server: &TestServer, username: &str, email: &str) {
    let response = server.post("/users").json(&registration(username, email)).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}

async fn login(server: &TestServer, username: &str, password: &str) -> axum_test::TestResponse {
    server
        .post("/tokens/authentication")
        .json(&json!({ "username": username, "password": password }))
        .await
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_app();
    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "Status is available\n");
}

// ============================================================================
// Registration (POST /users)
// ============================================================================

#[tokio::test]
async fn test_register_success_hides_password_hash() {
    let (server, _) = create_test_app();
    let response = server
        .post("/users")
        .json(&registration("alice", "alice@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["bio"], "Trail runner");
    assert!(body["user"]["id"].as_i64().unwrap() > 0);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username_is_conflict() {
    let (server, dir) = create_test_app();
    register(&server, "alice", "alice@example.com").await;

    let response = server
        .post("/users")
        .json(&registration("alice", "another@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "username or email already exists");
    assert_eq!(dir.user_count().await, 1);
}

#[tokio::test]
async fn test_register_duplicate_email_is_conflict() {
    let (server, _) = create_test_app();
    register(&server, "alice", "alice@example.com").await;

    let response = server
        .post("/users")
        .json(&registration("alice2", "alice@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_invalid_email_is_bad_request() {
    let (server, dir) = create_test_app();
    let response = server
        .post("/users")
        .json(&registration("alice", "not-an-email"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid email format");
    assert_eq!(dir.user_count().await, 0);
}

#[tokio::test]
async fn test_register_email_without_dotted_domain_is_bad_request() {
    let (server, dir) = create_test_app();

    for (i, email) in ["a@b", "user@localhost", "x@[127.0.0.1]"].iter().enumerate() {
        let response = server
            .post("/users")
            .json(&registration(&format!("user{}", i), email))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid email format");
    }
    assert_eq!(dir.user_count().await, 0);
}

#[tokio::test]
async fn test_register_reports_username_before_email() {
    let (server, _) = create_test_app();
    let response = server
        .post("/users")
        .json(&json!({ "username": "", "email": "bad", "password": "pa55word" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "username is required");
}

#[tokio::test]
async fn test_register_long_username_is_bad_request() {
    let (server, _) = create_test_app();
    let response = server
        .post("/users")
        .json(&registration(&"u".repeat(51), "long@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "username cannot be greater than 50 characters");
}

#[tokio::test]
async fn test_register_malformed_body_is_bad_request() {
    let (server, _) = create_test_app();
    let response = server
        .post("/users")
        .text("{\"username\": ")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid request payload");
}

// ============================================================================
// Token issuance (POST /tokens/authentication)
// ============================================================================

#[tokio::test]
async fn test_login_returns_token() {
    let (server, dir) = create_test_app();
    register(&server, "alice", "alice@example.com").await;

    let response = login(&server, "alice", "pa55word").await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    let token = body["auth_token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(dir.token_count().await, 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (server, _) = create_test_app();
    register(&server, "alice", "alice@example.com").await;

    let unknown = login(&server, "nobody", "pa55word").await;
    let wrong = login(&server, "alice", "wrong-password").await;

    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.text(), wrong.text());

    let body: Value = wrong.json();
    assert_eq!(body, json!({ "error": "invalid credentials" }));
}

#[tokio::test]
async fn test_login_malformed_body_is_bad_request() {
    let (server, _) = create_test_app();
    let response = server
        .post("/tokens/authentication")
        .json(&json!({ "username": "alice" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Protected route (GET /users/me)
// ============================================================================

#[tokio::test]
async fn test_me_with_token() {
    let (server, _) = create_test_app();
    register(&server, "alice", "alice@example.com").await;
    let body: Value = login(&server, "alice", "pa55word").await.json();
    let token = body["auth_token"].as_str().unwrap().to_string();

    let response = server
        .get("/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::VARY), "Authorization");
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_me_anonymous_requires_login() {
    let (server, _) = create_test_app();
    let response = server.get("/users/me").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.header(header::VARY), "Authorization");
    let body: Value = response.json();
    assert_eq!(body["error"], "you must be logged in");
}

#[tokio::test]
async fn test_me_with_malformed_header() {
    let (server, _) = create_test_app();

    for value in ["abc", "Bearer", "bearer abc", "Bearer a b"] {
        let response = server
            .get("/users/me")
            .add_header(header::AUTHORIZATION, HeaderValue::from_static(value))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid authorization header");
    }
}

#[tokio::test]
async fn test_me_with_unknown_token() {
    let (server, _) = create_test_app();
    let response = server
        .get("/users/me")
        .add_header(header::AUTHORIZATION, bearer(&"0f".repeat(32)))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "token expired or invalid");
}

#[tokio::test]
async fn test_public_routes_ignore_authorization_header() {
    let (server, _) = create_test_app();
    let response = server
        .get("/health")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("garbage"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

// ============================================================================
// API docs
// ============================================================================

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (server, _) = create_test_app();
    let response = server.get("/api-docs/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let doc: Value = response.json();
    assert!(doc["paths"].get("/users").is_some());
    assert!(doc["paths"].get("/tokens/authentication").is_some());
    assert!(doc["paths"].get("/users/me").is_some());
}
