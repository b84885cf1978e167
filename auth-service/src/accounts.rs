//! Login and registration, independent of the HTTP layer.

use chrono::{DateTime, Utc};
use common_auth::{Claims, IssuedToken, TokenService, TokenSubject};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::password::{hash_password_async, verify_password_async};
use crate::policy::{PolicyEngine, RegistrationDecision};
use crate::store::{CredentialStore, StoreError, UserRecord};

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserRecord,
    pub issued: IssuedToken,
}

/// Checks a credential pair and issues a token carrying the user's current
/// roles. Unknown email and wrong password fail identically; the inactive
/// flag is only revealed to a caller who knows the password.
pub async fn login<S>(
    store: &S,
    tokens: &TokenService,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> ServiceResult<LoginOutcome>
where
    S: CredentialStore + ?Sized,
{
    let Some(user) = store.find_user_by_email(email.trim()).await? else {
        verify_password_async(password, None).await?;
        return Err(ServiceError::InvalidCredentials);
    };

    if !verify_password_async(password, Some(&user.password_hash)).await? {
        warn!(user_id = user.id, "password mismatch");
        return Err(ServiceError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = user.id, "login refused for inactive account");
        return Err(ServiceError::AccountInactive);
    }

    let roles = store.roles_for_user(user.id).await?;
    let issued = tokens.issue(
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            roles,
        },
        now,
    )?;

    info!(user_id = user.id, "login succeeded");
    Ok(LoginOutcome { user, issued })
}

/// Creates an active account if the registration policy admits `requester`.
pub async fn register_account<S>(
    store: &S,
    policies: &PolicyEngine,
    requester: Option<&Claims>,
    email: &str,
    password: &str,
) -> ServiceResult<UserRecord>
where
    S: CredentialStore + ?Sized,
{
    let (mode, decision) = policies.decide_registration(requester).await;
    if let RegistrationDecision::Deny(reason) = decision {
        warn!(
            mode = %mode,
            reason = reason.as_str(),
            requester = requester.map(|claims| claims.user_id),
            "registration denied"
        );
        return Err(ServiceError::Forbidden(reason.message().to_string()));
    }

    let email = email.trim();
    validate_registration(email, password)?;

    let hash = hash_password_async(password).await?;
    let user = store
        .create_user(email, &hash)
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => ServiceError::ConflictingRegistration,
            other => ServiceError::Store(other),
        })?;

    info!(
        user_id = user.id,
        mode = %mode,
        requester = requester.map(|claims| claims.user_id),
        "registered user"
    );
    Ok(user)
}

fn validate_registration(email: &str, password: &str) -> ServiceResult<()> {
    let well_formed = email
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed {
        return Err(ServiceError::bad_request("invalid_email", "A valid email is required"));
    }
    if password.is_empty() {
        return Err(ServiceError::bad_request("invalid_password", "Password must not be empty"));
    }
    Ok(())
}
