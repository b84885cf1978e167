use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::roles;

/// Identity carried by a validated token.
///
/// The role list is a snapshot taken at issuance; later role changes are only
/// visible after the user logs in again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Convenience helper for role checks.
    pub fn has_role(&self, role: &str) -> bool {
        roles::has_role(&self.roles, role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, allowed: &[S]) -> bool {
        roles::has_any_role(&self.roles, allowed)
    }
}

/// Wire layout of the signed payload.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    pub(crate) sub: i64,
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) roles: Vec<String>,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

impl From<&Claims> for ClaimsRepr {
    fn from(value: &Claims) -> Self {
        Self {
            sub: value.user_id,
            email: value.email.clone(),
            roles: value.roles.clone(),
            iat: value.issued_at.timestamp(),
            exp: value.expires_at.timestamp(),
        }
    }
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let issued_at = Utc
            .timestamp_opt(value.iat, 0)
            .single()
            .ok_or_else(|| AuthError::Malformed(format!("iat out of range: {}", value.iat)))?;
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::Malformed(format!("exp out of range: {}", value.exp)))?;

        Ok(Self {
            user_id: value.sub,
            email: value.email,
            roles: value.roles,
            issued_at,
            expires_at,
        })
    }
}
