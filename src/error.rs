use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::domain::lifecycle::LifecycleError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business rule violation with a stable machine-readable code.
    #[error("{message}")]
    Domain {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn domain(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Error::Domain {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, code, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Some("unauthorized"), msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, Some("forbidden"), msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, Some("not_found"), msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, Some("conflict"), msg),
            Error::Domain {
                status,
                code,
                message,
            } => (status, Some(code), message),
            Error::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Some("validation_error"),
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, None, err.to_string()),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                None,
                format!("External service error: {}", err),
            ),
            Error::Database(err) => {
                tracing::error!(error = ?err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "Database error".to_string(),
                )
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, None, msg)
            }
            Error::Anyhow(err) => {
                tracing::error!(error = ?err, "unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "An unexpected error occurred".to_string(),
                )
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = match code {
            Some(code) => json!({ "error": error_message, "code": code }),
            None => json!({ "error": error_message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Conflict(db_err.message().to_string())
            }
            other => Error::Database(other),
        }
    }
}

impl From<LifecycleError> for Error {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { .. } => {
                Error::domain(StatusCode::CONFLICT, "invalid_transition", err.to_string())
            }
            LifecycleError::WrongActor { .. } => {
                Error::domain(StatusCode::FORBIDDEN, "forbidden_actor", err.to_string())
            }
            LifecycleError::UnknownStatus(_) => Error::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value as JsonValue;

    async fn body_of(err: Error) -> (StatusCode, JsonValue) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn domain_errors_carry_their_code() {
        let (status, body) = body_of(Error::domain(
            StatusCode::FORBIDDEN,
            "review_hard_block",
            "Leave your pending reviews first",
        ))
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "review_hard_block");
        assert_eq!(body["error"], "Leave your pending reviews first");
    }

    #[tokio::test]
    async fn bad_request_has_no_code() {
        let (status, body) = body_of(Error::BadRequest("nope".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn row_not_found_maps_to_404() {
        let (status, body) = body_of(Error::from(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }
}
