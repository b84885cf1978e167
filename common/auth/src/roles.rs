pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";

/// Exact, case-sensitive membership test.
pub fn has_role(roles: &[String], target: &str) -> bool {
    roles.iter().any(|role| role == target)
}

/// True when `roles` and `allowed` share at least one entry. An empty
/// `allowed` set never matches.
pub fn has_any_role<S: AsRef<str>>(roles: &[String], allowed: &[S]) -> bool {
    allowed
        .iter()
        .any(|candidate| has_role(roles, candidate.as_ref()))
}
