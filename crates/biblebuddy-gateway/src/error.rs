use crate::sanitizer::Rejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use biblebuddy_core::BuddyError;
use tracing::warn;

/// Errors returned by the JSON API as `{"error": {"kind", "message"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Buddy(#[from] BuddyError),

    #[error("Rate limit exceeded, slow down")]
    RateLimited,

    #[error("Message exceeds {max} characters ({len})")]
    TooLong { len: usize, max: usize },

    /// The request body was not the expected JSON document.
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Empty => ApiError::Buddy(BuddyError::EmptyMessage),
            Rejection::TooLong { len, max } => ApiError::TooLong { len, max },
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::TooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidBody { status, .. } => *status,
            ApiError::Buddy(e) => match e {
                BuddyError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
                BuddyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                BuddyError::TurnInProgress | BuddyError::Cancelled => StatusCode::CONFLICT,
                BuddyError::EmptyMessage => StatusCode::BAD_REQUEST,
                BuddyError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                BuddyError::Unauthorized(_)
                | BuddyError::RunFailed { .. }
                | BuddyError::EmptyReply
                | BuddyError::MalformedResponse(_)
                | BuddyError::Http(_) => StatusCode::BAD_GATEWAY,
                BuddyError::Config(_) | BuddyError::Json(_) | BuddyError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::RateLimited => "rate_limited",
            ApiError::TooLong { .. } => "message_too_long",
            ApiError::InvalidBody { .. } => "invalid_body",
            ApiError::Buddy(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(kind = self.kind(), status = %status, error = %self, "Request failed");
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
