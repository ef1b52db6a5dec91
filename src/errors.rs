use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::ErrorBody;

/// Everything that stops a request from being relayed. Errors reported by the upstream itself
/// are not in here: those are passed back to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("OPENAI_API_KEY is missing in environment variables")]
    MissingCredential,
    #[error("{0}")]
    Transport(String),
    #[error(transparent)]
    InvalidBody(#[from] BytesRejection),
    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential | ProxyError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::InvalidBody(rejection) => rejection.status(),
            ProxyError::MalformedJson(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
