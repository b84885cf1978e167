use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use common_auth::{AuthContext, Operation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ServiceError;
use crate::store::{UserRecord, UserSummary};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

impl UserDetail {
    fn from_record(user: UserRecord, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            roles,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserSummary>,
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UserList>, ServiceError> {
    auth.authorize(Operation::ListUsers)?;
    let users = state.store.list_users().await?;
    Ok(Json(UserList { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
) -> Result<Json<UserDetail>, ServiceError> {
    auth.authorize(Operation::ViewUser)?;
    load_detail(&state, user_id).await.map(Json)
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub is_active: bool,
}

pub async fn update_user_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<UserDetail>, ServiceError> {
    auth.authorize(Operation::UpdateUserStatus)?;
    if !state.store.set_user_active(user_id, update.is_active).await? {
        return Err(ServiceError::NotFound("user_not_found"));
    }
    info!(
        user_id,
        is_active = update.is_active,
        actor = auth.claims.user_id,
        "updated user status"
    );
    load_detail(&state, user_id).await.map(Json)
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ServiceError> {
    auth.authorize(Operation::DeleteUser)?;
    if !state.store.delete_user(user_id).await? {
        return Err(ServiceError::NotFound("user_not_found"));
    }
    info!(user_id, actor = auth.claims.user_id, "deleted user");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn load_detail(state: &AppState, user_id: i64) -> Result<UserDetail, ServiceError> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(ServiceError::NotFound("user_not_found"))?;
    let roles = state.store.roles_for_user(user_id).await?;
    Ok(UserDetail::from_record(user, roles))
}
