//! # Response Mapping Middleware
//!
//! Handlers already answer errors with the JSON envelope through
//! `AppError`. Rejections produced by axum itself (malformed JSON, missing
//! query parameters, wrong method, oversized bodies) are plain text; this
//! middleware rewrites them into the same shape:
//!
//! ```text
//! { "success": false, "error": "<rejection text>", "code": "InvalidInput" }
//! ```
//!
//! Body extraction failures (415, 422) are reported as 400.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

/// Rejection texts are short; anything longer is truncated.
const MAX_REJECTION_BYTES: usize = 16 * 1024;

pub async fn map_res(req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if status.is_server_error() {
        error!("[RESPONSE] Server error: {}", status);
    }

    if !(status.is_client_error() || status.is_server_error()) || is_json(&res) {
        return res;
    }

    let (status, code) = match status {
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            (StatusCode::BAD_REQUEST, "InvalidInput")
        }
        s => (s, code_for(s)),
    };

    let (parts, body) = res.into_parts();
    let text = match to_bytes(body, MAX_REJECTION_BYTES).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).trim().to_string(),
        _ => parts
            .status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    debug!("[RESPONSE] Mapped {} rejection to JSON: {}", parts.status, text);

    let mut mapped = (
        status,
        Json(json!({ "success": false, "error": text, "code": code })),
    )
        .into_response();

    // Keep headers like `Allow` and `X-Request-ID`, minus the stale length and type.
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != axum::http::header::CONTENT_LENGTH {
            mapped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    mapped
}

fn is_json(res: &Response<Body>) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "InvalidInput",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "NotFound",
        StatusCode::METHOD_NOT_ALLOWED => "MethodNotAllowed",
        StatusCode::CONFLICT => "Conflict",
        StatusCode::PAYLOAD_TOO_LARGE => "PayloadTooLarge",
        s if s.is_server_error() => "Internal",
        _ => "InvalidInput",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_plain_text_rejection_becomes_envelope() {
        let app = Router::new()
            .route("/teapot", get(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "missing field `amount`") }))
            .layer(middleware::from_fn(map_res));

        let res = app
            .oneshot(Request::builder().uri("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["code"], "InvalidInput");
        assert_eq!(value["error"], "missing field `amount`");
    }

    #[tokio::test]
    async fn test_method_not_allowed_keeps_status() {
        let app = Router::new()
            .route("/only-get", get(|| async { "ok" }))
            .layer(middleware::from_fn(map_res));

        let res = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/only-get")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], "MethodNotAllowed");
    }
}
