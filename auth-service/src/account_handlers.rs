use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use common_auth::{AuthContext, OptionalAuth};
use serde::{Deserialize, Serialize};

use crate::accounts::{login, register_account};
use crate::error::ServiceError;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let result = login(
        state.store.as_ref(),
        &state.tokens,
        &request.email,
        &request.password,
        Utc::now(),
    )
    .await;

    let outcome = match result {
        Ok(outcome) => {
            state.record_login_metric("success");
            outcome
        }
        Err(err) => {
            state.record_login_metric(match err {
                ServiceError::InvalidCredentials => "invalid_credentials",
                ServiceError::AccountInactive => "inactive",
                _ => "error",
            });
            return Err(err);
        }
    };

    let claims = outcome.issued.claims;
    Ok(Json(LoginResponse {
        access_token: outcome.issued.token,
        token_type: "Bearer",
        expires_at: claims.expires_at,
        user: SessionUser {
            id: claims.user_id,
            email: claims.email,
            roles: claims.roles,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: SessionUser,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    let claims = auth.into_claims();
    Json(MeResponse {
        user: SessionUser {
            id: claims.user_id,
            email: claims.email,
            roles: claims.roles,
        },
        issued_at: claims.issued_at,
        expires_at: claims.expires_at,
    })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: RegisteredUser,
}

pub async fn register(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ServiceError> {
    let result = register_account(
        state.store.as_ref(),
        &state.policies,
        auth.claims(),
        &request.email,
        &request.password,
    )
    .await;

    state.metrics.registration_decision(match &result {
        Ok(_) => "created",
        Err(ServiceError::Forbidden(_)) => "denied",
        Err(ServiceError::ConflictingRegistration) => "conflict",
        Err(ServiceError::BadRequest { .. }) => "invalid",
        Err(_) => "error",
    });

    let user = result?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: RegisteredUser {
                id: user.id,
                email: user.email,
                is_active: user.is_active,
            },
        }),
    ))
}
