//! Credential and policy persistence contract.
//!
//! The service only talks to storage through these traits. Consistency under
//! concurrent writers (duplicate emails, duplicate role links, racing policy
//! upserts) is delegated to the implementation: unique constraints and upserts
//! in PostgreSQL, a single write lock in memory.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row joined with the names of the roles it holds.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RoleRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PolicyRecord {
    pub name: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        if let Some(db_err) = value.as_database_error() {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        Self::Backend(value.to_string())
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<UserRecord>>;
    /// Inserts an active user. A taken email yields [`StoreError::Conflict`].
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord>;
    /// Returns `false` when no such user exists.
    async fn set_user_active(&self, id: i64, is_active: bool) -> StoreResult<bool>;
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;
    /// Role names held by the user, ordered by role id.
    async fn roles_for_user(&self, user_id: i64) -> StoreResult<Vec<String>>;

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;
    async fn find_role(&self, name: &str) -> StoreResult<Option<RoleRecord>>;
    /// `None` when a role with that name already exists.
    async fn create_role(&self, name: &str, description: &str)
        -> StoreResult<Option<RoleRecord>>;
    /// Idempotent; `true` only when a new link was written.
    async fn assign_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool>;
    async fn revoke_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_policy(&self, name: &str) -> StoreResult<Option<PolicyRecord>>;
    async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>>;
    /// Inserts or overwrites `name`, advancing `updated_at`.
    async fn upsert_policy(&self, name: &str, value: &str) -> StoreResult<PolicyRecord>;
}

#[async_trait]
pub trait AuthStore: CredentialStore + PolicyStore {
    async fn health_check(&self) -> StoreResult<()>;
}
