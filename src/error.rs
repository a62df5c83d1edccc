use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::SessionError,
    models::{AdminType, MessageResponse},
};

/// ServiceError
///
/// The error taxonomy shared by the credential service and the endpoint
/// layer. Each variant maps to exactly one HTTP status code; the `Display`
/// string doubles as the human-readable `message` field of the response body.
///
/// `InvalidCredentials` intentionally uses a single message for both "no such
/// user/admin-type combination" and "wrong password", so a caller cannot
/// probe which part failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid request fields. Surfaced as 400.
    #[error("{0}")]
    Validation(String),

    /// Unknown (username, admin type) pair or wrong password. Surfaced as 401.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A record already exists for the named admin type. Surfaced as 409.
    #[error("User exists for {0}")]
    Conflict(AdminType),

    /// The delete/update target does not exist. Surfaced as 404.
    #[error("User not found")]
    NotFound,

    /// Underlying persistence failure. Surfaced as a generic 500; the
    /// database detail is logged server-side only.
    #[error("Server error")]
    Store(#[from] sqlx::Error),

    /// Password hashing failure. Surfaced as a generic 500.
    #[error("Server error")]
    Hash(#[from] bcrypt::BcryptError),

    /// Session token minting failure. Surfaced as a generic 500.
    #[error("Server error")]
    Session(#[from] SessionError),
}

impl From<crate::models::InvalidAdminType> for ServiceError {
    fn from(err: crate::models::InvalidAdminType) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Store(e) => {
                tracing::error!("credential store error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Hash(e) => {
                tracing::error!("password hashing error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Session(e) => {
                tracing::error!("session token error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = MessageResponse {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
