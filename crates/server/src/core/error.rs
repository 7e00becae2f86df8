use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
    // Request shape
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Signup/login payload pre-check failure.
    #[error("validation failed: {0}")]
    Validation(String),

    // Auth
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("conflict: {0}")]
    Conflict(String),

    // Model
    #[error("not found: {0}")]
    NotFound(String),

    // Generic
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::FORBIDDEN,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal detail stays in the logs.
    fn client_message(&self) -> String {
        match self {
            Error::BadRequest(msg)
            | Error::Validation(msg)
            | Error::Conflict(msg)
            | Error::NotFound(msg) => msg.clone(),
            Error::Unauthenticated => "invalid or missing token".to_string(),
            Error::Database(e) => {
                error!(error = %e, "database error");
                "internal server error".to_string()
            }
            Error::Internal(msg) => {
                error!(message = %msg, "internal server error");
                "internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "status": status.as_u16(),
            "data": {
                "message": self.client_message()
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}
