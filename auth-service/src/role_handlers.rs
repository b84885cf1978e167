use axum::{extract::State, http::StatusCode, Json};
use common_auth::{AuthContext, Operation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ServiceError;
use crate::store::RoleRecord;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RoleList {
    pub roles: Vec<RoleRecord>,
}

pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<RoleList>, ServiceError> {
    auth.authorize(Operation::ListRoles)?;
    let roles = state.store.list_roles().await?;
    Ok(Json(RoleList { roles }))
}

#[derive(Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedRole {
    pub created: bool,
    pub role: RoleRecord,
}

/// Creating a name that already exists is not an error; the existing role is
/// returned with `created: false`.
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(new_role): Json<NewRole>,
) -> Result<(StatusCode, Json<CreatedRole>), ServiceError> {
    auth.authorize(Operation::CreateRole)?;
    let name = new_role.name.trim();
    if name.is_empty() {
        return Err(ServiceError::bad_request("invalid_role", "Role name is required"));
    }

    match state.store.create_role(name, new_role.description.trim()).await? {
        Some(role) => {
            info!(
                role = %role.name,
                role_id = role.id,
                actor = auth.claims.user_id,
                "created role"
            );
            Ok((StatusCode::CREATED, Json(CreatedRole { created: true, role })))
        }
        None => {
            let role = state
                .store
                .find_role(name)
                .await?
                .ok_or(ServiceError::NotFound("role_not_found"))?;
            Ok((StatusCode::OK, Json(CreatedRole { created: false, role })))
        }
    }
}

#[derive(Deserialize)]
pub struct RoleAssignment {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResult {
    pub user_id: i64,
    pub role: String,
    pub changed: bool,
}

pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RoleAssignment>,
) -> Result<Json<AssignmentResult>, ServiceError> {
    auth.authorize(Operation::AssignRole)?;
    let role = resolve_assignment(&state, &request).await?;
    let changed = state.store.assign_role(request.user_id, role.id).await?;
    info!(
        user_id = request.user_id,
        role = %role.name,
        changed,
        actor = auth.claims.user_id,
        "assigned role"
    );
    Ok(Json(AssignmentResult {
        user_id: request.user_id,
        role: role.name,
        changed,
    }))
}

/// Existing tokens keep the revoked role until they expire.
pub async fn revoke_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RoleAssignment>,
) -> Result<Json<AssignmentResult>, ServiceError> {
    auth.authorize(Operation::RevokeRole)?;
    let role = resolve_assignment(&state, &request).await?;
    let changed = state.store.revoke_role(request.user_id, role.id).await?;
    info!(
        user_id = request.user_id,
        role = %role.name,
        changed,
        actor = auth.claims.user_id,
        "revoked role"
    );
    Ok(Json(AssignmentResult {
        user_id: request.user_id,
        role: role.name,
        changed,
    }))
}

async fn resolve_assignment(
    state: &AppState,
    request: &RoleAssignment,
) -> Result<RoleRecord, ServiceError> {
    let role = state
        .store
        .find_role(request.role.trim())
        .await?
        .ok_or(ServiceError::NotFound("role_not_found"))?;
    if state.store.find_user(request.user_id).await?.is_none() {
        return Err(ServiceError::NotFound("user_not_found"));
    }
    Ok(role)
}
