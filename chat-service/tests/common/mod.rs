#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use chat_service::config::{Adapter, ChatConfig, OpenAiSettings};
use chat_service::services::providers::mock::MockCompletionProvider;
use chat_service::startup::{build_router, AppState};
use secrecy::Secret;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Config for tests: port 0, no environment lookups.
pub fn test_config(adapter: Adapter, base_url: &str) -> ChatConfig {
    ChatConfig {
        common: service_core::config::Config { port: 0 },
        adapter,
        log_level: "error".to_string(),
        otlp_endpoint: None,
        openai: OpenAiSettings {
            api_key: Secret::new("test-api-key".to_string()),
            base_url: base_url.to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 5,
        },
        relay: adapter.default_profile(),
    }
}

pub fn app_with_config(config: &ChatConfig, provider: Arc<MockCompletionProvider>) -> Router {
    build_router(AppState::new(config, provider))
}

pub fn app(adapter: Adapter, provider: Arc<MockCompletionProvider>) -> Router {
    app_with_config(&test_config(adapter, "http://127.0.0.1:9"), provider)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not UTF-8")
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}
