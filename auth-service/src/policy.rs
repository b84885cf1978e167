//! Registration gating driven by values in the policy store.
//!
//! Policy values keep their historical wire encoding: `registration_mode` is a
//! JSON string literal (`"open"`) and `allowed_roles_for_registration` a
//! bracketed list of quoted names (`["admin","service"]`). Both are decoded
//! into typed values here and nowhere else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use common_auth::{Claims, ROLE_SUPER_ADMIN};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{PolicyRecord, PolicyStore, StoreResult};

pub const REGISTRATION_MODE_POLICY: &str = "registration_mode";
pub const ALLOWED_REGISTRATION_ROLES_POLICY: &str = "allowed_roles_for_registration";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy '{name}' has unrecognised value {value}")]
    InvalidConfiguration { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    Open,
    Restricted,
    SuperAdminOnly,
}

impl RegistrationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationMode::Open => "open",
            RegistrationMode::Restricted => "restricted",
            RegistrationMode::SuperAdminOnly => "super_admin_only",
        }
    }

    /// Decodes a stored value, quoted or bare.
    pub fn from_wire(raw: &str) -> Result<Self, PolicyError> {
        unquote(raw.trim()).parse()
    }

    pub fn to_wire(self) -> String {
        format!("\"{}\"", self.as_str())
    }
}

impl FromStr for RegistrationMode {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(RegistrationMode::Open),
            "restricted" => Ok(RegistrationMode::Restricted),
            "super_admin_only" => Ok(RegistrationMode::SuperAdminOnly),
            other => Err(PolicyError::InvalidConfiguration {
                name: REGISTRATION_MODE_POLICY,
                value: format!("'{other}'"),
            }),
        }
    }
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role names allowed to register accounts in restricted mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleList(Vec<String>);

impl RoleList {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            roles
                .into_iter()
                .map(Into::into)
                .map(|role: String| role.trim().to_string())
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }

    /// Accepts a JSON array, a JSON string wrapping one, or the legacy
    /// bracket literal split on commas. Legacy values cannot carry a comma
    /// inside a role name.
    pub fn from_wire(raw: &str) -> Result<Self, PolicyError> {
        let trimmed = raw.trim();
        if let Ok(roles) = serde_json::from_str::<Vec<String>>(trimmed) {
            return Ok(Self::new(roles));
        }
        if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
            if let Ok(roles) = serde_json::from_str::<Vec<String>>(inner.trim()) {
                return Ok(Self::new(roles));
            }
        }

        let body = unquote(trimmed)
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| PolicyError::InvalidConfiguration {
                name: ALLOWED_REGISTRATION_ROLES_POLICY,
                value: raw.to_string(),
            })?;

        Ok(Self::new(
            body.split(',').map(|item| item.trim().trim_matches('"')),
        ))
    }

    pub fn to_wire(&self) -> String {
        let quoted: Vec<String> = self.0.iter().map(|role| format!("\"{role}\"")).collect();
        format!("[{}]", quoted.join(","))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strips one pair of surrounding double quotes.
pub fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    LoginRequired,
    SuperAdminRequired,
    RoleNotPermitted,
}

impl DenyReason {
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::LoginRequired => "Registration requires an authenticated requester",
            DenyReason::SuperAdminRequired => "Only Super Admin can register users",
            DenyReason::RoleNotPermitted => "Your role cannot register users",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::LoginRequired => "login_required",
            DenyReason::SuperAdminRequired => "super_admin_required",
            DenyReason::RoleNotPermitted => "role_not_permitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationDecision {
    Allow,
    Deny(DenyReason),
}

/// Pure gating rule for one registration attempt.
pub fn authorize_registration(
    mode: RegistrationMode,
    requester: Option<&Claims>,
    allowed_roles: &RoleList,
) -> RegistrationDecision {
    match (mode, requester) {
        (RegistrationMode::Open, _) => RegistrationDecision::Allow,
        (_, None) => RegistrationDecision::Deny(DenyReason::LoginRequired),
        (RegistrationMode::SuperAdminOnly, Some(claims)) => {
            if claims.has_role(ROLE_SUPER_ADMIN) {
                RegistrationDecision::Allow
            } else {
                RegistrationDecision::Deny(DenyReason::SuperAdminRequired)
            }
        }
        (RegistrationMode::Restricted, Some(claims)) => {
            if claims.has_any_role(allowed_roles.as_slice()) {
                RegistrationDecision::Allow
            } else {
                RegistrationDecision::Deny(DenyReason::RoleNotPermitted)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct UpsertReport {
    pub applied: Vec<PolicyRecord>,
    pub failed: Vec<PolicyFailure>,
}

impl UpsertReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Reads policy values on every call; nothing is cached.
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Absent, unreadable and unrecognised values all resolve to
    /// [`RegistrationMode::SuperAdminOnly`].
    pub async fn resolve_registration_mode(&self) -> RegistrationMode {
        let raw = match self.store.get_policy(REGISTRATION_MODE_POLICY).await {
            Ok(Some(policy)) => policy.value,
            Ok(None) => {
                warn!("registration_mode policy missing; defaulting to super_admin_only");
                return RegistrationMode::SuperAdminOnly;
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "could not read registration_mode; defaulting to super_admin_only"
                );
                return RegistrationMode::SuperAdminOnly;
            }
        };

        RegistrationMode::from_wire(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "defaulting to super_admin_only");
            RegistrationMode::SuperAdminOnly
        })
    }

    /// An unreadable or undecodable list is treated as empty, which denies
    /// every restricted registration.
    pub async fn allowed_registration_roles(&self) -> RoleList {
        match self.store.get_policy(ALLOWED_REGISTRATION_ROLES_POLICY).await {
            Ok(Some(policy)) => RoleList::from_wire(&policy.value).unwrap_or_else(|err| {
                warn!(error = %err, "ignoring malformed allowed-roles policy");
                RoleList::default()
            }),
            Ok(None) => RoleList::default(),
            Err(err) => {
                warn!(error = %err, "could not read allowed-roles policy");
                RoleList::default()
            }
        }
    }

    pub async fn decide_registration(
        &self,
        requester: Option<&Claims>,
    ) -> (RegistrationMode, RegistrationDecision) {
        let mode = self.resolve_registration_mode().await;
        let allowed = match mode {
            RegistrationMode::Restricted => self.allowed_registration_roles().await,
            _ => RoleList::default(),
        };
        (mode, authorize_registration(mode, requester, &allowed))
    }

    pub async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>> {
        self.store.list_policies().await
    }

    pub async fn get_policy(&self, name: &str) -> StoreResult<Option<PolicyRecord>> {
        self.store.get_policy(name).await
    }

    /// Applies each entry independently. A failing key is reported in the
    /// result and never undoes or blocks the others.
    pub async fn upsert_policies(&self, updates: BTreeMap<String, String>) -> UpsertReport {
        let mut report = UpsertReport::default();

        for (name, value) in updates {
            let encoded = match canonical_value(&name, &value) {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!(policy = %name, error = %err, "rejected policy value");
                    report.failed.push(PolicyFailure {
                        name,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            match self.store.upsert_policy(&name, &encoded).await {
                Ok(record) => {
                    info!(policy = %name, value = %record.value, "policy updated");
                    report.applied.push(record);
                }
                Err(err) => {
                    warn!(policy = %name, error = %err, "failed to update policy");
                    report.failed.push(PolicyFailure {
                        name,
                        error: err.to_string(),
                    });
                }
            }
        }

        report
    }
}

/// Validates known policies and re-encodes them in wire form; other names
/// pass through untouched.
fn canonical_value(name: &str, value: &str) -> Result<String, PolicyError> {
    match name {
        REGISTRATION_MODE_POLICY => {
            RegistrationMode::from_wire(value).map(RegistrationMode::to_wire)
        }
        ALLOWED_REGISTRATION_ROLES_POLICY => {
            RoleList::from_wire(value).map(|roles| roles.to_wire())
        }
        _ => Ok(value.to_string()),
    }
}
