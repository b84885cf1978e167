use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signing secret is empty or unavailable")]
    MissingSigningSecret,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token could not be parsed: {0}")]
    Malformed(String),
    #[error("token expired")]
    Expired,
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

impl AuthError {
    /// Stable label for logs and metrics; never sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingSigningSecret => "missing_secret",
            AuthError::Signing(_) => "signing",
            AuthError::Malformed(_) => "malformed",
            AuthError::Expired => "expired",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::MissingAuthorization => "missing_header",
            AuthError::InvalidAuthorization => "invalid_header",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(value.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingSigningSecret | AuthError::Signing(_) => {
                ApiError::internal("Failed to generate access token")
            }
            // Token failures collapse to one response so callers cannot tell
            // which check rejected them.
            _ => ApiError::unauthorized(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
