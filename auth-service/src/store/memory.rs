use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{
    AuthStore, CredentialStore, PolicyRecord, PolicyStore, RoleRecord, StoreError, StoreResult,
    UserRecord, UserSummary,
};

/// Process-local store with the same uniqueness rules as the SQL schema.
/// Used by tests and for running the service without a database.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, UserRecord>,
    roles: BTreeMap<i64, RoleRecord>,
    user_roles: BTreeSet<(i64, i64)>,
    policies: BTreeMap<String, PolicyRecord>,
    next_user_id: i64,
    next_role_id: i64,
}

impl Inner {
    fn role_names(&self, user_id: i64) -> Vec<String> {
        self.user_roles
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .filter_map(|(_, role_id)| self.roles.get(role_id))
            .map(|role| role.name.clone())
            .collect()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

/// Strictly later than `previous`, so repeated writes always advance.
fn advance(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let inner = self.read()?;
        Ok(inner.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let mut inner = self.write()?;
        if inner.users.values().any(|user| user.email == email) {
            return Err(StoreError::Conflict(format!("email {email}")));
        }

        inner.next_user_id += 1;
        let now = Utc::now();
        let user = UserRecord {
            id: inner.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_active(&self, id: i64, is_active: bool) -> StoreResult<bool> {
        let mut inner = self.write()?;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                user.updated_at = advance(Some(user.updated_at));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let removed = inner.users.remove(&id).is_some();
        inner.user_roles.retain(|(user_id, _)| *user_id != id);
        Ok(removed)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .values()
            .map(|user| UserSummary {
                id: user.id,
                email: user.email.clone(),
                is_active: user.is_active,
                created_at: user.created_at,
                roles: inner.role_names(user.id),
            })
            .collect())
    }

    async fn roles_for_user(&self, user_id: i64) -> StoreResult<Vec<String>> {
        Ok(self.read()?.role_names(user_id))
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn find_role(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let inner = self.read()?;
        Ok(inner.roles.values().find(|role| role.name == name).cloned())
    }

    async fn create_role(
        &self,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<RoleRecord>> {
        let mut inner = self.write()?;
        if inner.roles.values().any(|role| role.name == name) {
            return Ok(None);
        }

        inner.next_role_id += 1;
        let role = RoleRecord {
            id: inner.next_role_id,
            name: name.to_string(),
            description: description.to_string(),
        };
        inner.roles.insert(role.id, role.clone());
        Ok(Some(role))
    }

    async fn assign_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool> {
        let mut inner = self.write()?;
        if !inner.users.contains_key(&user_id) || !inner.roles.contains_key(&role_id) {
            return Err(StoreError::Backend(format!(
                "cannot link user {user_id} to role {role_id}: missing row"
            )));
        }
        Ok(inner.user_roles.insert((user_id, role_id)))
    }

    async fn revoke_role(&self, user_id: i64, role_id: i64) -> StoreResult<bool> {
        Ok(self.write()?.user_roles.remove(&(user_id, role_id)))
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn get_policy(&self, name: &str) -> StoreResult<Option<PolicyRecord>> {
        Ok(self.read()?.policies.get(name).cloned())
    }

    async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>> {
        Ok(self.read()?.policies.values().cloned().collect())
    }

    async fn upsert_policy(&self, name: &str, value: &str) -> StoreResult<PolicyRecord> {
        let mut inner = self.write()?;
        let previous = inner.policies.get(name).map(|policy| policy.updated_at);
        let record = PolicyRecord {
            name: name.to_string(),
            value: value.to_string(),
            updated_at: advance(previous),
        };
        inner.policies.insert(name.to_string(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}
