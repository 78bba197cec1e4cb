//! Lifecycle tests: create, list, download and delete.
//!
//! Tests verify:
//! - Created images land in the directory under the reversible filename
//! - Duplicate creates return 409 and leave the stored image untouched
//! - Listing decodes filenames back to their URLs
//! - Deleting removes the image and advertises the create link

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use super::test_utils::{
    body_bytes, body_json, create_request, delete_request, is_valid_png, list_request, TestApp,
    BASE_URL, EXAMPLE_FILENAME,
};

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_returns_download_url_and_links() {
    let app = TestApp::new();
    let token = app.token().await;

    let response = app
        .send(create_request(
            Some(&token),
            json!({"url": "https://example.com", "size": 10}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["message"], "QR code created successfully.");
    assert_eq!(
        body["qr_code_url"],
        format!("{}/downloads/{}", BASE_URL, EXAMPLE_FILENAME)
    );
    assert_eq!(body["links"][0]["rel"], "self");
    assert_eq!(body["links"][0]["href"], body["qr_code_url"]);
    assert_eq!(body["links"][1]["rel"], "delete");
    assert_eq!(
        body["links"][1]["href"],
        format!("{}/qr-codes/{}", BASE_URL, EXAMPLE_FILENAME)
    );

    assert_eq!(app.files(), vec![EXAMPLE_FILENAME.to_string()]);
    assert!(is_valid_png(&app.read_file(EXAMPLE_FILENAME)));
}

#[tokio::test]
async fn test_create_without_trailing_slash() {
    let app = TestApp::new();
    let token = app.token().await;

    let request = Request::builder()
        .method("POST")
        .uri("/qr-codes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(json!({"url": "https://example.com"}).to_string()))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_create_conflicts_without_rewriting() {
    let app = TestApp::new();
    let token = app.token().await;

    let first = app
        .send(create_request(Some(&token), json!({"url": "https://example.com"})))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let original = app.read_file(EXAMPLE_FILENAME);

    // Different rendering options must not replace the stored image
    let second = app
        .send(create_request(
            Some(&token),
            json!({
                "url": "https://example.com",
                "fill_color": "black",
                "back_color": "yellow",
                "size": 3
            }),
        ))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body = body_json(second).await;
    assert_eq!(body["message"], "QR code already exists.");
    assert_eq!(
        body["qr_code_url"],
        format!("{}/downloads/{}", BASE_URL, EXAMPLE_FILENAME)
    );
    assert_eq!(body["links"].as_array().unwrap().len(), 2);

    assert_eq!(app.files().len(), 1);
    assert_eq!(app.read_file(EXAMPLE_FILENAME), original);
}

#[tokio::test]
async fn test_concurrent_creates_store_one_image() {
    let app = TestApp::new();
    let token = app.token().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        let request = create_request(Some(&token), json!({"url": "https://example.com/race"}));
        handles.push(tokio::spawn(async move {
            use tower::ServiceExt;
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(app.files().len(), 1);
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_list_empty_directory() {
    let app = TestApp::new();
    let token = app.token().await;

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_list_returns_source_urls() {
    let app = TestApp::new();
    let token = app.token().await;

    for url in ["https://example.com", "https://www.rust-lang.org/learn"] {
        let response = app
            .send(create_request(Some(&token), json!({"url": url})))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let mut urls: Vec<&str> = entries
        .iter()
        .map(|e| e["qr_code_url"].as_str().unwrap())
        .collect();
    urls.sort();
    assert_eq!(
        urls,
        vec!["https://example.com", "https://www.rust-lang.org/learn"]
    );

    let example = entries
        .iter()
        .find(|e| e["qr_code_url"] == "https://example.com")
        .unwrap();
    assert_eq!(example["message"], "QR code available");
    assert_eq!(example["links"].as_array().unwrap().len(), 1);
    assert_eq!(example["links"][0]["rel"], "self");
    assert_eq!(
        example["links"][0]["href"],
        format!("{}/downloads/{}", BASE_URL, EXAMPLE_FILENAME)
    );
}

#[tokio::test]
async fn test_list_skips_foreign_files() {
    let app = TestApp::new();
    let token = app.token().await;

    app.send(create_request(Some(&token), json!({"url": "https://example.com"})))
        .await;
    std::fs::write(app.dir.path().join("notes.txt"), b"hello").unwrap();
    std::fs::write(app.dir.path().join("!!!.png"), b"not a qr").unwrap();
    std::fs::write(app.dir.path().join(".partial.png"), b"").unwrap();
    std::fs::create_dir(app.dir.path().join("nested.png")).unwrap();

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["qr_code_url"], "https://example.com");
}

#[tokio::test]
async fn test_list_missing_directory_is_server_error() {
    let app = TestApp::new();
    let token = app.token().await;

    std::fs::remove_dir_all(app.dir.path()).unwrap();

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "directory_not_found");
    assert_eq!(body["status"], 500);
}

// =============================================================================
// Download
// =============================================================================

#[tokio::test]
async fn test_download_created_image() {
    let app = TestApp::new();
    let token = app.token().await;

    app.send(create_request(Some(&token), json!({"url": "https://example.com"})))
        .await;

    // Downloads are public
    let request = Request::builder()
        .uri(format!("/downloads/{}", EXAMPLE_FILENAME))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), app.read_file(EXAMPLE_FILENAME).as_slice());
}

#[tokio::test]
async fn test_download_missing_image() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/downloads/bm9wZQ.png")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_hides_temp_and_foreign_files() {
    let app = TestApp::new();

    std::fs::write(app.dir.path().join(".qr-inflight.tmp"), b"partial").unwrap();
    std::fs::write(app.dir.path().join(".qr-inflight.png"), b"partial").unwrap();
    std::fs::write(app.dir.path().join("notes.txt"), b"private").unwrap();

    for path in [
        "/downloads/.qr-inflight.tmp",
        "/downloads/%2Eqr-inflight.tmp",
        "/downloads/.qr-inflight.png",
        "/downloads/notes.txt",
        "/downloads/..%2Fsecret.png",
    ] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_removes_image() {
    let app = TestApp::new();
    let token = app.token().await;

    app.send(create_request(Some(&token), json!({"url": "https://example.com"})))
        .await;

    let response = app
        .send(delete_request(Some(&token), EXAMPLE_FILENAME))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get(header::LINK).unwrap(),
        &format!("<{}/qr-codes/>; rel=\"create\"", BASE_URL)
    );
    assert!(body_bytes(response).await.is_empty());

    assert!(app.files().is_empty());

    let response = app.send(list_request(Some(&token))).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_delete_missing_image() {
    let app = TestApp::new();
    let token = app.token().await;

    let response = app
        .send(delete_request(Some(&token), EXAMPLE_FILENAME))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_delete_rejects_names_outside_store() {
    let app = TestApp::new();
    let token = app.token().await;

    std::fs::write(app.dir.path().join("keep.txt"), b"keep").unwrap();

    for name in ["keep.txt", "..%2Fkeep.png", ".hidden.png"] {
        let response = app.send(delete_request(Some(&token), name)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", name);
    }

    assert_eq!(app.files(), vec!["keep.txt".to_string()]);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let app = TestApp::new();
    let token = app.token().await;
    let create = json!({"url": "https://example.com", "size": 10});

    let response = app.send(create_request(Some(&token), create.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["qr_code_url"]
        .as_str()
        .unwrap()
        .ends_with("aHR0cHM6Ly9leGFtcGxlLmNvbQ.png"));
    assert_eq!(app.files().len(), 1);

    let response = app
        .send(delete_request(Some(&token), EXAMPLE_FILENAME))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.files().is_empty());

    let response = app.send(create_request(Some(&token), create)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.files().len(), 1);
}
