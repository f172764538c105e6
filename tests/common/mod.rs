#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Drives one request through the router. Empty bodies decode to `Value::Null`.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("AccessToken", token);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok(TestResponse {
        status,
        headers,
        body,
    })
}

pub async fn get(router: &Router, uri: &str) -> Result<TestResponse> {
    send(router, "GET", uri, None, None).await
}

pub async fn get_as(router: &Router, uri: &str, token: &str) -> Result<TestResponse> {
    send(router, "GET", uri, Some(token), None).await
}

/// Error bodies always carry the status code alongside the message.
pub fn assert_error(response: &TestResponse, status: StatusCode) {
    assert_eq!(response.status, status, "body: {}", response.body);
    assert_eq!(response.body["code"], status.as_u16());
    assert!(
        response.body["message"].is_string(),
        "missing message: {}",
        response.body
    );
}
