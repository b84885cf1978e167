use common_auth::ROLE_SUPER_ADMIN;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::password::hash_password_async;
use crate::store::{CredentialStore, RoleRecord};

const SUPER_ADMIN_DESCRIPTION: &str = "Has all system permissions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub user_id: i64,
    pub role_id: i64,
    pub created_role: bool,
    pub created_user: bool,
    pub linked: bool,
}

/// Ensures the `super_admin` role, the bootstrap account and the link between
/// them exist. An existing account keeps its password.
pub async fn seed_super_admin<S>(
    store: &S,
    email: &str,
    password: &str,
) -> ServiceResult<SeedReport>
where
    S: CredentialStore + ?Sized,
{
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ServiceError::bad_request(
            "seed_credentials_missing",
            "SUPERADMIN_EMAIL and SUPERADMIN_PASSWORD must be set",
        ));
    }

    let (role, created_role) = ensure_role(store, ROLE_SUPER_ADMIN, SUPER_ADMIN_DESCRIPTION).await?;

    let (user_id, created_user) = match store.find_user_by_email(email).await? {
        Some(user) => {
            info!(user_id = user.id, "found bootstrap user");
            (user.id, false)
        }
        None => {
            let hash = hash_password_async(password).await?;
            let user = store.create_user(email, &hash).await?;
            info!(user_id = user.id, "created bootstrap user");
            (user.id, true)
        }
    };

    let linked = store.assign_role(user_id, role.id).await?;
    if linked {
        info!(user_id, role_id = role.id, "linked bootstrap user to super_admin");
    }

    Ok(SeedReport {
        user_id,
        role_id: role.id,
        created_role,
        created_user,
        linked,
    })
}

async fn ensure_role<S>(
    store: &S,
    name: &str,
    description: &str,
) -> ServiceResult<(RoleRecord, bool)>
where
    S: CredentialStore + ?Sized,
{
    if let Some(role) = store.find_role(name).await? {
        return Ok((role, false));
    }
    if let Some(role) = store.create_role(name, description).await? {
        info!(role = name, role_id = role.id, "created role");
        return Ok((role, true));
    }
    // Lost a race with a concurrent seeder.
    store
        .find_role(name)
        .await?
        .map(|role| (role, false))
        .ok_or(ServiceError::NotFound("role_not_found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryStore::new();
        let first = seed_super_admin(&store, "root@x.com", "pw").await.unwrap();
        assert!(first.created_role && first.created_user && first.linked);

        let second = seed_super_admin(&store, "root@x.com", "other").await.unwrap();
        assert_eq!(second.user_id, first.user_id);
        assert!(!second.created_role && !second.created_user && !second.linked);

        let user = store.find_user(first.user_id).await.unwrap().unwrap();
        assert!(verify_password("pw", &user.password_hash));
        assert_eq!(store.roles_for_user(first.user_id).await.unwrap(), vec!["super_admin"]);
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected() {
        let store = InMemoryStore::new();
        assert!(seed_super_admin(&store, " ", "pw").await.is_err());
        assert!(seed_super_admin(&store, "root@x.com", "").await.is_err());
    }
}
