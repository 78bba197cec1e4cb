//! Test utilities for integration tests.
//!
//! [`TestApp`] wires a router to a fresh temporary image directory and offers
//! request builders for the protected endpoints.

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use qr_code_manager::server::auth::JwtAuthority;
use qr_code_manager::{create_router, QrService, QrStore, RouterConfig};

pub const SECRET: &str = "integration-test-secret";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secret";
pub const BASE_URL: &str = "http://localhost:3000";

/// Filename of the QR code for `https://example.com`.
pub const EXAMPLE_FILENAME: &str = "aHR0cHM6Ly9leGFtcGxlLmNvbQ.png";

pub fn authority() -> JwtAuthority {
    JwtAuthority::new(SECRET, ADMIN_USER, ADMIN_PASSWORD)
}

/// A router over its own temporary directory.
pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let service = QrService::new(QrStore::new(dir.path()));
        let router = create_router(
            service,
            authority(),
            RouterConfig::new(BASE_URL).with_tracing(false),
        )
        .unwrap();
        Self { dir, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Obtain a token for the bootstrap user through `POST /token`.
    pub async fn token(&self) -> String {
        let response = self
            .send(token_request(ADMIN_USER, ADMIN_PASSWORD, None))
            .await;
        assert!(response.status().is_success());
        let body = body_json(response).await;
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Sorted names of the files currently in the image directory.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn read_file(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(name)).unwrap()
    }
}

pub fn token_request(username: &str, password: &str, grant_type: Option<&str>) -> Request<Body> {
    let mut form = format!("username={}&password={}", username, password);
    if let Some(grant) = grant_type {
        form.push_str(&format!("&grant_type={}", grant));
    }
    Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

pub fn create_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/qr-codes/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn list_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/qr-codes/");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete_request(token: Option<&str>, filename: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("DELETE")
        .uri(format!("/qr-codes/{}", filename));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Check if data starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}
