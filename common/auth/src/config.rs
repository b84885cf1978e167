use std::fmt;

use chrono::Duration;

/// Lifetime of an access token when nothing else is configured.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Upper bound on a configured token lifetime (30 days).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 3600;

/// Runtime configuration for signing and validating access tokens.
///
/// Built once at startup and handed to [`crate::TokenService`]; the secret is
/// never re-read from the environment afterwards.
#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    /// Lifetime of an issued token in seconds.
    pub ttl_seconds: i64,
    /// Grace applied to the expiry check. Zero unless explicitly configured.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            leeway_seconds: 0,
        }
    }

    pub fn with_ttl(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Adjust the allowed clock skew.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// `None` when the configured lifetime is outside `1..=MAX_TOKEN_TTL_SECONDS`.
    pub fn ttl(&self) -> Option<Duration> {
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&self.ttl_seconds) {
            return None;
        }
        Duration::try_seconds(self.ttl_seconds)
    }

    pub fn leeway(&self) -> Duration {
        Duration::seconds(i64::from(self.leeway_seconds))
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}
