//! Integration tests for the bookmark API
//!
//! These tests drive the full router: routing, extraction, ownership checks,
//! service orchestration and error mapping.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::DateTime;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use athena::error::FetchStage;
use athena::fetcher::HttpContentFetcher;
use athena::route::{create_app, AppState};
use athena::service::BookmarkService;
use common::{memory_backend, redb_backend, Backend, StubFetcher};

/// Creates an app over `backend` with a fetcher returning fixed metadata
fn setup_test_app_with(backend: &Backend, fetcher: StubFetcher) -> Router {
    let service = BookmarkService::new(backend.repo.clone(), Arc::new(fetcher));
    create_app(AppState::new(service, None))
}

fn setup_test_app() -> (Router, Backend) {
    let backend = memory_backend();
    let app = setup_test_app_with(
        &backend,
        StubFetcher::returning("X", "https://x.test/img.png", "about X"),
    );
    (app, backend)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn request(method: &str, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create(app: &Router, user: &str, url: &str) -> Value {
    let response = app
        .clone()
        .oneshot(request("POST", "/api/bookmarks", user, Some(json!({ "url": url }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response.into_body()).await
}

#[tokio::test]
async fn test_create_bookmark_success() {
    let (app, _backend) = setup_test_app();

    let body = create(&app, "u1", "https://x.test").await;

    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["url"], "https://x.test");
    assert_eq!(body["title"], "X");
    assert_eq!(body["main_image_url"], "https://x.test/img.png");
    assert_eq!(body["content_summary"], "about X");
    assert_eq!(body["is_archived"], false);
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn test_create_bookmark_with_id_is_rejected() {
    let (app, _backend) = setup_test_app();

    let response = app
        .oneshot(request(
            "POST",
            "/api/bookmarks",
            "u1",
            Some(json!({ "url": "https://x.test", "id": "chosen" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["error"], "bookmark id must be empty");
}

#[tokio::test]
async fn test_create_bookmark_enrichment_failure() {
    let backend = memory_backend();
    let app = setup_test_app_with(&backend, StubFetcher::failing_at(FetchStage::MainImage));

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookmarks",
            "u1",
            Some(json!({ "url": "https://x.test" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "enrichment_failed");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to fetch main image URL for URL https://x.test"));

    let response = app
        .oneshot(request("GET", "/api/bookmarks", "u1", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_create_bookmark_with_unusable_url_is_bad_request() {
    let backend = memory_backend();
    let fetcher = HttpContentFetcher::new(std::time::Duration::from_secs(1)).unwrap();
    let service = BookmarkService::new(backend.repo.clone(), Arc::new(fetcher));
    let app = create_app(AppState::new(service, None));

    for url in ["not a url", "ftp://x.test/file"] {
        let response = app
            .clone()
            .oneshot(request("POST", "/api/bookmarks", "u1", Some(json!({ "url": url }))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{url}");
        let body = response_json(response.into_body()).await;
        assert_eq!(body["code"], "invalid_argument");
    }
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let (app, _backend) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/bookmarks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_all_bookmarks_newest_first() {
    let (app, _backend) = setup_test_app();
    create(&app, "u1", "https://x.test/1").await;
    create(&app, "u1", "https://x.test/2").await;
    create(&app, "u2", "https://y.test").await;

    let response = app
        .oneshot(request("GET", "/api/bookmarks", "u1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|b| b["user_id"] == "u1"));
    let created_at = |item: &Value| {
        DateTime::parse_from_rfc3339(item["created_at"].as_str().unwrap()).unwrap()
    };
    assert!(created_at(&items[0]) >= created_at(&items[1]));
}

#[tokio::test]
async fn test_list_with_pagination_envelope() {
    let (app, _backend) = setup_test_app();
    for i in 0..5 {
        create(&app, "u1", &format!("https://x.test/{i}")).await;
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/api/bookmarks?page=2&page_size=2", "u1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["total_count"], 5);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["bookmarks"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(request("GET", "/api/bookmarks?page=0&page_size=500", "u1", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_get_bookmark_checks_ownership() {
    let (app, _backend) = setup_test_app();
    let created = create(&app, "u1", "https://x.test").await;
    let uri = format!("/api/bookmarks/{}", created["id"].as_str().unwrap());

    let response = app.clone().oneshot(request("GET", &uri, "u1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response.into_body()).await, created);

    let response = app.clone().oneshot(request("GET", &uri, "u2", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "forbidden");

    let response = app
        .oneshot(request("GET", "/api/bookmarks/missing", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_archive_bookmark_flow() {
    let backend = redb_backend();
    let app = setup_test_app_with(&backend, StubFetcher::returning("X", "", ""));
    let created = create(&app, "u1", "https://x.test").await;
    let uri = format!("/api/bookmarks/{}/archive", created["id"].as_str().unwrap());

    let response = app.clone().oneshot(request("PUT", &uri, "u2", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let response = app.clone().oneshot(request("PUT", &uri, "u1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response.into_body()).await;
        assert_eq!(body["is_archived"], true);
        assert_eq!(body["created_at"], created["created_at"]);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/api/bookmarks?archived=true", "u1", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(request("GET", "/api/bookmarks", "u1", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_delete_bookmark_success() {
    let (app, _backend) = setup_test_app();
    let created = create(&app, "u1", "https://x.test").await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/bookmarks/{id}");

    let response = app.clone().oneshot(request("DELETE", &uri, "u1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["message"], "Bookmark deleted successfully");
    assert_eq!(body["deleted_id"], id);

    let response = app.oneshot(request("DELETE", &uri, "u1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_bookmark_forbidden_for_other_user() {
    let (app, _backend) = setup_test_app();
    let created = create(&app, "u1", "https://x.test").await;
    let uri = format!("/api/bookmarks/{}", created["id"].as_str().unwrap());

    let response = app.clone().oneshot(request("DELETE", &uri, "u2", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.oneshot(request("GET", &uri, "u1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _backend) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
