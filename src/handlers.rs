/// Axum handlers for the proxy server
use crate::AppState;
use crate::client::HttpClient;
use crate::credential::Credential;
use crate::errors::ProxyError;
use crate::models::HealthResponse;
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Request, State, rejection::BytesRejection},
    http::{
        HeaderMap, HeaderValue, Method, Uri,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

pub const MODELS_PATH: &str = "/v1/models";

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

const RAW_FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[instrument(skip(state))]
pub async fn health<T: HttpClient>(State(state): State<AppState<T>>) -> Json<HealthResponse> {
    Json(HealthResponse::running(state.upstream.display_url()))
}

/// Forwards a models listing to the upstream. Any inbound body is ignored: the upstream always
/// sees a bodiless GET.
#[instrument(skip(state))]
pub async fn list_models<T: HttpClient>(
    State(state): State<AppState<T>>,
) -> Result<Response, ProxyError> {
    info!("Received models request");
    let credential = require_credential(&state)?;
    let req = outbound_request(&state, Method::GET, MODELS_PATH, &credential)?
        .body(Body::empty())
        .map_err(|e| ProxyError::Transport(e.to_string()))?;
    forward(&state, req).await
}

/// Forwards a chat completion to the upstream with the body re-serialized exactly as received.
/// Streaming flags are not inspected; the whole upstream response is buffered before relaying.
#[instrument(skip(state, headers, body))]
pub async fn chat_completions<T: HttpClient>(
    State(state): State<AppState<T>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProxyError> {
    let body = body.inspect_err(|e| debug!("Rejected request body: {}", e))?;
    let payload = inbound_json(&headers, &body)?;
    info!("Received chat completions request");
    let credential = require_credential(&state)?;

    let body = serde_json::to_vec(&payload).map_err(|e| ProxyError::Transport(e.to_string()))?;
    let req = outbound_request(&state, Method::POST, CHAT_COMPLETIONS_PATH, &credential)?
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| ProxyError::Transport(e.to_string()))?;
    forward(&state, req).await
}

/// Interprets an inbound body the way a lenient JSON body parser does. Bodies that are empty or
/// not declared as `application/json` become `{}`; declared JSON must be an object or array.
fn inbound_json(headers: &HeaderMap, body: &Bytes) -> Result<Value, ProxyError> {
    if !is_json_content_type(headers) || body.is_empty() {
        debug!("No JSON body supplied, forwarding an empty object");
        return Ok(Value::Object(Default::default()));
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProxyError::MalformedJson(e.to_string()))?;
    if !(value.is_object() || value.is_array()) {
        return Err(ProxyError::MalformedJson(
            "top-level value must be an object or array".into(),
        ));
    }
    Ok(value)
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

fn require_credential<T: HttpClient>(state: &AppState<T>) -> Result<Credential, ProxyError> {
    state.upstream.credentials.credential().ok_or_else(|| {
        warn!("No credential available, refusing to contact upstream");
        ProxyError::MissingCredential
    })
}

fn outbound_request<T: HttpClient>(
    state: &AppState<T>,
    method: Method,
    path: &str,
    credential: &Credential,
) -> Result<axum::http::request::Builder, ProxyError> {
    let url = state
        .upstream
        .endpoint(path)
        .map_err(|e| ProxyError::Transport(e.to_string()))?;
    let uri = Uri::try_from(url.as_str()).map_err(|e| ProxyError::Transport(e.to_string()))?;
    debug!("Forwarding {} to {}", method, uri);

    Ok(axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, credential.bearer()))
}

async fn forward<T: HttpClient>(state: &AppState<T>, req: Request) -> Result<Response, ProxyError> {
    let uri = req.uri().clone();
    let response = state.http_client.send(req).await.map_err(|e| {
        error!("Error forwarding request to upstream {}: {}", uri, e);
        ProxyError::Transport(error_chain(e.as_ref()))
    })?;
    relay(response).await
}

/// Relays an upstream response with its status untouched. Bodies that parse as JSON are
/// re-emitted as JSON, anything else is passed through byte for byte.
pub async fn relay(response: Response) -> Result<Response, ProxyError> {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        error!("Error reading upstream response body: {}", e);
        ProxyError::Transport(error_chain(&e))
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(json) => {
            debug!("Relaying JSON response with status {}", parts.status);
            Ok((parts.status, Json(json)).into_response())
        }
        Err(_) => {
            debug!("Relaying raw response with status {}", parts.status);
            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(RAW_FALLBACK_CONTENT_TYPE));
            Ok((parts.status, [(CONTENT_TYPE, content_type)], bytes).into_response())
        }
    }
}

/// Renders an error and its sources, e.g. `client error (Connect): connection refused`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    fn json_headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_inbound_json_accepts_objects_and_arrays() {
        let headers = json_headers("application/json; charset=utf-8");
        let value = inbound_json(&headers, &Bytes::from_static(br#"{"model":"gpt-4"}"#)).unwrap();
        assert_eq!(value["model"], "gpt-4");
        let value = inbound_json(&headers, &Bytes::from_static(b" [1, 2] ")).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_inbound_json_without_json_content_type_is_empty_object() {
        let value = inbound_json(&HeaderMap::new(), &Bytes::from_static(b"not even json")).unwrap();
        assert_eq!(value, serde_json::json!({}));
        let value = inbound_json(&json_headers("text/plain"), &Bytes::from_static(b"[1]")).unwrap();
        assert_eq!(value, serde_json::json!({}));
        let value = inbound_json(&json_headers("application/json"), &Bytes::new()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_inbound_json_rejects_scalars_and_syntax_errors() {
        let headers = json_headers("application/json");
        for body in [r#""hi""#, "42", "null", "{oops", "   "] {
            let err = inbound_json(&headers, &Bytes::copy_from_slice(body.as_bytes())).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        assert_eq!(error_chain(&Outer(Inner)), "outer: inner");
        assert_eq!(error_chain(&Inner), "inner");
    }

    #[tokio::test]
    async fn test_relay_keeps_upstream_content_type_for_raw_bodies() {
        let upstream = Response::builder()
            .status(StatusCode::BAD_GATEWAY)
            .header(CONTENT_TYPE, "text/html")
            .body(Body::from("<html>bad gateway</html>"))
            .unwrap();

        let relayed = relay(upstream).await.unwrap();
        assert_eq!(relayed.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(relayed.headers()[CONTENT_TYPE], "text/html");
        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html>bad gateway</html>");
    }

    #[tokio::test]
    async fn test_relay_empty_body_is_passed_through_raw() {
        let upstream = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .unwrap();

        let relayed = relay(upstream).await.unwrap();
        assert_eq!(relayed.status(), StatusCode::NO_CONTENT);
        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_relay_reserializes_json_preserving_key_order() {
        let upstream = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{ "z": 1,  "a": [true, null] }"#))
            .unwrap();

        let relayed = relay(upstream).await.unwrap();
        assert_eq!(relayed.headers()[CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"z":1,"a":[true,null]}"#);
    }
}
