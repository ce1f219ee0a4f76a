//! Middleware for logging API requests and responses.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many bytes are truncated in `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 256;

/// The largest body the middleware will buffer.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// JSON fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 5] = [
    "password",
    "current_password",
    "new_password",
    "confirm_password",
    "token",
];

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both are logged at the `info` level with the body truncated to [LOG_BODY_LENGTH_LIMIT] bytes,
/// and the full body is logged at the `debug` level. Passwords and tokens in JSON bodies are
/// redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        tracing::warn!("request body for {} exceeded {MAX_BODY_BYTES} bytes", parts.uri);
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    };
    log_request(&parts, &redact_body(&parts.headers, &bytes));

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&parts, &redact_body(&parts.headers, &bytes));

    Response::from_parts(parts, Body::from(bytes))
}

fn is_json(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn redact_body(headers: &axum::http::HeaderMap, bytes: &Bytes) -> String {
    if is_json(headers) {
        if let Ok(mut json) = serde_json::from_slice::<Value>(bytes) {
            redact_json(&mut json);
            return json.to_string();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *field = Value::String(REDACTED.to_owned());
                } else {
                    redact_json(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}

/// Cut `body` to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(body: &str) -> &str {
    if body.len() <= LOG_BODY_LENGTH_LIMIT {
        return body;
    }

    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "received {} {} body: {}...",
            parts.method,
            parts.uri,
            truncate(body)
        );
        tracing::debug!("full request body: {body}");
    } else {
        tracing::info!("received {} {} body: {body}", parts.method, parts.uri);
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("sending {} body: {}...", parts.status, truncate(body));
        tracing::debug!("full response body: {body}");
    } else {
        tracing::info!("sending {} body: {body}", parts.status);
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Bytes,
        http::{HeaderMap, HeaderValue, header::CONTENT_TYPE},
        middleware,
        routing::post,
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::{LOG_BODY_LENGTH_LIMIT, logging_middleware, redact_body, truncate};

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn redacts_nested_passwords() {
        let body = Bytes::from(
            json!({
                "email": "test@example.com",
                "password": "hunter2",
                "change": { "new_password": "hunter3" },
            })
            .to_string(),
        );

        let redacted: Value = serde_json::from_str(&redact_body(&json_headers(), &body)).unwrap();

        assert_eq!(redacted["email"], "test@example.com");
        assert_eq!(redacted["password"], "********");
        assert_eq!(redacted["change"]["new_password"], "********");
    }

    #[test]
    fn leaves_non_json_bodies_alone() {
        let body = Bytes::from_static(b"password=hunter2");

        assert_eq!(redact_body(&HeaderMap::new(), &body), "password=hunter2");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let body = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&body);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn passes_body_through() {
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).unwrap();

        let response = server
            .post("/echo")
            .json(&json!({ "password": "hunter2" }))
            .await;

        response.assert_status_ok();
        response.assert_text(r#"{"password":"hunter2"}"#);
    }
}
