//! Common test utilities
#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use wallet_settle::store::Stores;
use wallet_settle::{api, App, Config};

/// Config for tests: no artificial job delay
pub fn test_config() -> Config {
    Config {
        job_delay: Duration::ZERO,
        ..Config::default()
    }
}

/// Start an engine over fresh in-memory stores
pub fn start_app(config: &Config) -> App {
    App::start(config, Stores::in_memory())
}

pub fn router(app: &App) -> Router {
    api::build_router(app.state())
}

/// Poll `check` until it returns true or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Send one request and return the status and JSON body (Null if not JSON)
pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri, None).await
}

pub async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, "POST", uri, Some(body)).await
}
