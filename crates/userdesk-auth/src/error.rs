//! Authentication error types

use axum::http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use userdesk_db::DbError;

use crate::jwt::TokenType;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are deliberately not told apart.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token signature mismatch")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Expected {expected} token, got {actual}")]
    WrongTokenType { expected: TokenType, actual: TokenType },

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("User not found or inactive")]
    UserNotFoundOrInactive,

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    #[error("User not found")]
    UserNotFound,

    #[error("Not enough privileges")]
    InsufficientPrivileges,

    #[error("Not enough permissions")]
    NotOwner,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InactiveUser => StatusCode::BAD_REQUEST,
            AuthError::InsufficientPrivileges | AuthError::NotOwner => StatusCode::FORBIDDEN,
            AuthError::PasswordHash(_) | AuthError::Jwt(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message safe to return to the client.
    ///
    /// Token failures collapse into one message so callers cannot probe
    /// which check rejected them.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Incorrect email or password",
            AuthError::InactiveUser => "Inactive user",
            AuthError::InvalidToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::WrongTokenType { .. }
            | AuthError::InvalidAuthHeader => "Could not validate credentials",
            AuthError::MissingAuthHeader => "Not authenticated",
            AuthError::InvalidRefreshToken => "Invalid refresh token",
            AuthError::UserNotFoundOrInactive => "User not found or inactive",
            AuthError::UserNotFound => "User not found",
            AuthError::InsufficientPrivileges => "Not enough privileges",
            AuthError::NotOwner => "Not enough permissions",
            AuthError::PasswordHash(_) | AuthError::Jwt(_) | AuthError::Database(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Authentication failed internally: {}", self);
        }

        let body = axum::Json(json!({
            "detail": self.client_message()
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
