use std::fmt;

use common_http_errors::ApiError;
use thiserror::Error;
use tracing::warn;

use crate::claims::Claims;
use crate::roles::{ROLE_ADMIN, ROLE_SUPER_ADMIN};

const SUPER_ADMIN_ONLY: &[&str] = &[ROLE_SUPER_ADMIN];
const ADMINISTRATORS: &[&str] = &[ROLE_SUPER_ADMIN, ROLE_ADMIN];

/// Administrative operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListUsers,
    ViewUser,
    UpdateUserStatus,
    DeleteUser,
    ListRoles,
    CreateRole,
    AssignRole,
    RevokeRole,
    ListPolicies,
    ViewPolicy,
    UpsertPolicies,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::ListUsers,
        Operation::ViewUser,
        Operation::UpdateUserStatus,
        Operation::DeleteUser,
        Operation::ListRoles,
        Operation::CreateRole,
        Operation::AssignRole,
        Operation::RevokeRole,
        Operation::ListPolicies,
        Operation::ViewPolicy,
        Operation::UpsertPolicies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListUsers => "users.list",
            Operation::ViewUser => "users.view",
            Operation::UpdateUserStatus => "users.update_status",
            Operation::DeleteUser => "users.delete",
            Operation::ListRoles => "roles.list",
            Operation::CreateRole => "roles.create",
            Operation::AssignRole => "roles.assign",
            Operation::RevokeRole => "roles.revoke",
            Operation::ListPolicies => "policies.list",
            Operation::ViewPolicy => "policies.view",
            Operation::UpsertPolicies => "policies.upsert",
        }
    }

    /// Roles allowed to perform the operation; holding any one suffices.
    pub fn required_roles(self) -> &'static [&'static str] {
        use Operation::*;
        match self {
            ListUsers | ViewUser | UpdateUserStatus => ADMINISTRATORS,
            DeleteUser | ListRoles | CreateRole | AssignRole | RevokeRole | ListPolicies
            | ViewPolicy | UpsertPolicies => SUPER_ADMIN_ONLY,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("{operation} requires one of: {}", .required.join(", "))]
    Forbidden {
        operation: Operation,
        required: &'static [&'static str],
    },
}

impl From<GuardError> for ApiError {
    fn from(value: GuardError) -> Self {
        ApiError::forbidden("forbidden", value.to_string())
    }
}

/// Decides whether `claims` may perform `operation`.
pub fn authorize(claims: &Claims, operation: Operation) -> Result<(), GuardError> {
    let required = operation.required_roles();
    if claims.has_any_role(required) {
        return Ok(());
    }

    warn!(
        user_id = claims.user_id,
        operation = %operation,
        roles = ?claims.roles,
        "role_check_failed"
    );
    Err(GuardError::Forbidden {
        operation,
        required,
    })
}
