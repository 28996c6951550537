use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error surfaced to HTTP callers as `{error, details?}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Body missing, not JSON, or of the wrong shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{error}: {details}")]
    Internal { error: String, details: String },
    /// Malformed structured model output; the raw text travels back for diagnosis.
    #[error("{error}: {parse_error}")]
    Unparseable {
        error: String,
        raw: String,
        parse_error: String,
    },
}

impl ApiError {
    pub fn internal(error: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            error: error.into(),
            details: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } | Self::Unparseable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(error) | Self::NotFound(error) => json!({ "error": error }),
            Self::InvalidBody(details) => json!({ "error": "Invalid request body", "details": details }),
            Self::Internal { error, details } => json!({ "error": error, "details": details }),
            Self::Unparseable {
                error,
                raw,
                parse_error,
            } => json!({ "error": error, "details": raw, "parseError": parse_error }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

/// `Json` whose rejections render through [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
