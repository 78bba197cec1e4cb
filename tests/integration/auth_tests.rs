//! Authentication integration tests.
//!
//! Tests verify:
//! - The token endpoint issues bearer tokens for the configured user only
//! - Protected routes reject missing, malformed, foreign and expired tokens
//! - Rejected requests have no side effects
//! - Health and downloads stay public

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use qr_code_manager::server::auth::{JwtAuthority, TokenIssuer};

use super::test_utils::{
    authority, body_json, create_request, delete_request, list_request, token_request, TestApp,
    ADMIN_PASSWORD, ADMIN_USER, EXAMPLE_FILENAME,
};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn assert_bearer_challenge(response: &axum::response::Response) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

// =============================================================================
// Token Endpoint
// =============================================================================

#[tokio::test]
async fn test_token_issued_for_valid_credentials() {
    let app = TestApp::new();

    let response = app
        .send(token_request(ADMIN_USER, ADMIN_PASSWORD, Some("password")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_token_rejected_for_wrong_password() {
    let app = TestApp::new();

    let response = app
        .send(token_request(ADMIN_USER, "not-the-password", None))
        .await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_token_rejected_for_unknown_user() {
    let app = TestApp::new();

    let response = app.send(token_request("mallory", ADMIN_PASSWORD, None)).await;
    assert_bearer_challenge(&response);
}

#[tokio::test]
async fn test_token_rejects_other_grant_types() {
    let app = TestApp::new();

    let response = app
        .send(token_request(
            ADMIN_USER,
            ADMIN_PASSWORD,
            Some("client_credentials"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

// =============================================================================
// Protected Routes
// =============================================================================

#[tokio::test]
async fn test_create_without_token_has_no_side_effects() {
    let app = TestApp::new();

    let response = app
        .send(create_request(None, json!({"url": "https://example.com"})))
        .await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "not_authenticated");
    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_list_without_token() {
    let app = TestApp::new();

    let response = app.send(list_request(None)).await;
    assert_bearer_challenge(&response);
}

#[tokio::test]
async fn test_delete_without_token_keeps_image() {
    let app = TestApp::new();
    let token = app.token().await;

    app.send(create_request(Some(&token), json!({"url": "https://example.com"})))
        .await;

    let response = app.send(delete_request(None, EXAMPLE_FILENAME)).await;
    assert_bearer_challenge(&response);
    assert_eq!(app.files(), vec![EXAMPLE_FILENAME.to_string()]);
}

#[tokio::test]
async fn test_wrong_scheme_rejected() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/qr-codes/")
        .header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_scheme");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = TestApp::new();

    let response = app.send(list_request(Some("not.a.jwt"))).await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_from_different_key_rejected() {
    let app = TestApp::new();

    let foreign = JwtAuthority::new("some-other-secret", ADMIN_USER, ADMIN_PASSWORD)
        .issue_token(ADMIN_USER, ADMIN_PASSWORD)
        .unwrap();

    let response = app.send(list_request(Some(&foreign.access_token))).await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new();

    let expired = authority()
        .sign_with_expiry(ADMIN_USER, now_secs() - 60)
        .unwrap();

    let response = app
        .send(create_request(
            Some(&expired),
            json!({"url": "https://example.com"}),
        ))
        .await;
    assert_bearer_challenge(&response);

    let body = body_json(response).await;
    assert_eq!(body["error"], "token_expired");
    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_token_signed_by_same_authority_accepted() {
    let app = TestApp::new();

    let token = authority()
        .sign_with_expiry(ADMIN_USER, now_secs() + 300)
        .unwrap();

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Public Routes
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_public() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_not_challenged() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/qr-codes/a/b")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
