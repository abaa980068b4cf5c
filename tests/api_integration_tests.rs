//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use lease_cache::cache::{CacheManager, ManualClock};
use lease_cache::storage::MemoryEngine;
use lease_cache::{api::create_router, AppState, CacheConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

async fn create_ready_app() -> (Router, ManualClock) {
    let clock = ManualClock::new(0);
    let manager = CacheManager::with_clock(
        Arc::new(MemoryEngine::new()),
        CacheConfig::with_lease_ms(10_000),
        Arc::new(clock.clone()),
    );
    let state = AppState::new(manager);
    state.cache.initialize().await.unwrap();
    (create_router(state), clock)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_set(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let (app, _clock) = create_ready_app().await;

    let response = app
        .oneshot(put_set(r#"{"key":"test_key","value":{"nested":[1,2]}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_empty_key() {
    let (app, _clock) = create_ready_app().await;

    let response = app
        .oneshot(put_set(r#"{"key":"","value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_set_endpoint_reserved_key() {
    let (app, _clock) = create_ready_app().await;

    let response = app
        .oneshot(put_set(
            r#"{"key":"__lease_cache__/STORE_EXPIRATION","value":0}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let (app, _clock) = create_ready_app().await;

    let set_response = app
        .clone()
        .oneshot(put_set(r#"{"key":"get_key","value":{"x":1}}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(get("/get/get_key")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], json!({"x": 1}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _clock) = create_ready_app().await;

    let response = app.oneshot(get("/get/nonexistent_key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_endpoint_expired_entry() {
    let (app, clock) = create_ready_app().await;

    let set_response = app
        .clone()
        .oneshot(put_set(r#"{"key":"short","value":"soon gone","expire_after_ms":2}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    clock.set(1);
    let response = app.clone().oneshot(get("/get/short")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    clock.set(2);
    let response = app.clone().oneshot(get("/get/short")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stats = body_to_json(app.oneshot(get("/stats")).await.unwrap().into_body()).await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["expirations"], 1);
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint() {
    let (app, _clock) = create_ready_app().await;

    app.clone()
        .oneshot(put_set(r#"{"key":"a","value":1}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/get/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The lease survives a clear
    let stats = body_to_json(app.oneshot(get("/stats")).await.unwrap().into_body()).await;
    assert_eq!(stats["store_expires_at"], "1970-01-01T00:00:10+00:00");
}

// == Readiness ==

#[tokio::test]
async fn test_routes_before_initialization() {
    let manager = CacheManager::new(Arc::new(MemoryEngine::new()), CacheConfig::default());
    let state = AppState::new(manager);
    let app = create_router(state.clone());

    let health = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let json = body_to_json(health.into_body()).await;
    assert_eq!(json["ready"], false);

    let response = app
        .clone()
        .oneshot(put_set(r#"{"key":"k","value":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.cache.initialize().await.unwrap();
    let health = body_to_json(app.oneshot(get("/health")).await.unwrap().into_body()).await;
    assert_eq!(health["ready"], true);
}

// == Live Server ==

#[tokio::test]
async fn test_live_server_round_trip() {
    let (app, _clock) = create_ready_app().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let response = client
        .put(format!("{}/set", base))
        .json(&json!({"key": "live", "value": ["a", "b"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = client
        .get(format!("{}/get/live", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"], json!(["a", "b"]));

    server.abort();
}
