//! Service-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Startup failures while wiring the client and token storage.
///
/// Any of these aborts the process before the listener binds.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Config(#[from] common::Error),

    #[error("imgur client: {0}")]
    Client(#[from] imgur_auth::Error),

    #[error("token storage: {0}")]
    Storage(#[from] token_store::Error),
}

/// Per-request authentication failures.
///
/// The middleware never retries or recovers from these; they are rendered
/// as the request's response and the downstream handler does not run.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("imgur: {0}")]
    Imgur(#[from] imgur_auth::Error),

    #[error("token storage: {0}")]
    Storage(#[from] token_store::Error),

    #[error("no route named {0:?}")]
    UnknownRoute(String),
}

impl AuthError {
    /// Metric/log label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Imgur(e) if e.is_rejected_grant() => "rejected_grant",
            AuthError::Imgur(_) => "imgur",
            AuthError::Storage(_) => "storage",
            AuthError::UnknownRoute(_) => "unknown_route",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::Imgur(_) => StatusCode::BAD_GATEWAY,
            AuthError::Storage(_) | AuthError::UnknownRoute(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": "auth_error",
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
