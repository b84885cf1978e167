use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    AuthStore, CredentialStore, PolicyRecord, PolicyStore, RoleRecord, StoreError, StoreResult,
    UserRecord, UserSummary,
};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash, is_active, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash, is_active, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (email, password_hash, is_active, created_at, updated_at)
             VALUES ($1, $2, TRUE, NOW(), NOW())
             RETURNING id, email, password_hash, is_active, created_at, updated_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_active(&self, id: i64, is_active: bool) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET is_active = $1, updated_at = NOW() WHERE id = $2")
                .bind(is_active)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.email, u.is_active, u.created_at,
                    COALESCE(
                        array_agg(r.name ORDER BY r.id) FILTER (WHERE r.name IS NOT NULL),
                        '{}'
                    ) AS roles
             FROM users u
             LEFT JOIN user_roles ur ON u.id = ur.user_id
             LEFT JOIN roles r ON ur.role_id = r.id
             GROUP BY u.id
             ORDER BY u.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn roles_for_user(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON r.id = ur.role_id
             WHERE ur.user_id = $1
             ORDER BY r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        let roles =
            sqlx::query_as::<_, RoleRecord>("SELECT id, name, description FROM roles ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(roles)
    }

    async fn find_role(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let role = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, name, description FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn create_role(
        &self,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<RoleRecord>> {
        let role = sqlx::query_as::<_, RoleRecord>(
            "INSERT INTO roles (name, description) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn assign_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PolicyStore for PgStore {
    async fn get_policy(&self, name: &str) -> StoreResult<Option<PolicyRecord>> {
        let policy = sqlx::query_as::<_, PolicyRecord>(
            "SELECT name, value, updated_at FROM auth_policies WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(policy)
    }

    async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>> {
        let policies = sqlx::query_as::<_, PolicyRecord>(
            "SELECT name, value, updated_at FROM auth_policies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(policies)
    }

    async fn upsert_policy(&self, name: &str, value: &str) -> StoreResult<PolicyRecord> {
        let policy = sqlx::query_as::<_, PolicyRecord>(
            "INSERT INTO auth_policies (name, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (name)
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
             RETURNING name, value, updated_at",
        )
        .bind(name)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(policy)
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, ping).await {
            Ok(result) => result.map(|_| ()).map_err(StoreError::from),
            Err(_) => Err(StoreError::Backend("health check timed out".to_string())),
        }
    }
}
