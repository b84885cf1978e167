use axum::response::{IntoResponse, Response};
use common_auth::{AuthError, GuardError};
use common_http_errors::ApiError;
use thiserror::Error;
use tracing::{error, warn};

use crate::password::PasswordError;
use crate::policy::PolicyError;
use crate::store::StoreError;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is inactive")]
    AccountInactive,
    #[error(transparent)]
    Token(#[from] AuthError),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    InvalidConfiguration(#[from] PolicyError),
    #[error("email already registered")]
    ConflictingRegistration,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ServiceError::BadRequest {
            code,
            message: message.into(),
        }
    }
}

impl From<GuardError> for ServiceError {
    fn from(value: GuardError) -> Self {
        ServiceError::Forbidden(value.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        ServiceError::Internal(value.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidCredentials => ApiError::Unauthorized {
                code: "invalid_credentials",
                message: Some(INVALID_CREDENTIALS_MESSAGE.into()),
            },
            ServiceError::AccountInactive => {
                ApiError::forbidden("account_inactive", "User account is inactive")
            }
            ServiceError::Token(err) => err.into(),
            ServiceError::Forbidden(message) => ApiError::forbidden("forbidden", message),
            ServiceError::InvalidConfiguration(err) => {
                ApiError::bad_request("invalid_configuration", err.to_string())
            }
            ServiceError::ConflictingRegistration => {
                ApiError::conflict("email_taken", "Email already exists")
            }
            ServiceError::NotFound(code) => ApiError::not_found(code),
            ServiceError::BadRequest { code, message } => ApiError::bad_request(code, message),
            ServiceError::Store(StoreError::Conflict(message)) => {
                ApiError::conflict("conflict", message)
            }
            ServiceError::Store(_) | ServiceError::Internal(_) => ApiError::internal_server_error(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            ServiceError::Store(StoreError::Backend(_)) | ServiceError::Internal(_) => {
                error!(error = %self, "request failed");
            }
            ServiceError::Forbidden(_) | ServiceError::AccountInactive => {
                warn!(error = %self, "request denied");
            }
            _ => {}
        }
        ApiError::from(self).into_response()
    }
}
