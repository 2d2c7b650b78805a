// Error responses for the management API
// Every failure is returned as {"error": {"message": ..., "code": ...}}

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::ConfigError;
use crate::router::ResolveError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_management_key",
            "Invalid management key",
        )
    }
}

/// `Json` extractor whose rejection is rendered as an `ApiError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let status = match err {
            ResolveError::ModelNotAllowed { .. } => StatusCode::FORBIDDEN,
            ResolveError::EmptyModel => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::DuplicateMapping(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_mapping", err.to_string())
            }
            ConfigError::MappingNotFound(_) | ConfigError::ProviderNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            ConfigError::Invalid(_) => Self::bad_request(err.to_string()),
            ConfigError::Io(_) | ConfigError::Parse { .. } | ConfigError::Serialize(_) => {
                tracing::error!("Config write failed: {}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    err.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": {
                    "message": self.message,
                    "code": self.code,
                }
            })),
        )
            .into_response()
    }
}
