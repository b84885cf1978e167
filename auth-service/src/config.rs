use anyhow::{anyhow, bail, Context, Result};
use common_auth::{JwtConfig, DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
        }
    }
}

/// Immutable service configuration, read once at startup.
#[derive(Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub pool: PoolSettings,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("database_url", &"<redacted>")
            .field("jwt", &self.jwt)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("cors_origins", &self.cors_origins)
            .field("pool", &self.pool)
            .finish()
    }
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Builds a config from any key lookup; `load_service_config` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let jwt = jwt_config_from(&lookup)?;

        let host = lookup("HOST")
            .and_then(|value| normalize_optional(&value))
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse HOST")?;
        let port = parse_number(&lookup, "PORT")?.unwrap_or(8080);

        let request_timeout = Duration::from_secs(
            parse_number(&lookup, "AUTH_REQUEST_TIMEOUT_SECS")?.unwrap_or(10),
        );

        let cors_origins = lookup("AUTH_CORS_ORIGINS")
            .map(|value| parse_list(&value))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());

        let defaults = PoolSettings::default();
        let pool = PoolSettings {
            max_connections: parse_number(&lookup, "AUTH_DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            min_connections: parse_number(&lookup, "AUTH_DB_MIN_CONNECTIONS")?
                .unwrap_or(defaults.min_connections),
        };
        if pool.min_connections > pool.max_connections {
            bail!(
                "AUTH_DB_MIN_CONNECTIONS ({}) exceeds AUTH_DB_MAX_CONNECTIONS ({})",
                pool.min_connections,
                pool.max_connections
            );
        }

        Ok(Self {
            database_url,
            jwt,
            host,
            port,
            request_timeout,
            cors_origins,
            pool,
        })
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    ServiceConfig::from_lookup(|key| env::var(key).ok())
}

/// Signing configuration alone. A missing or blank secret is fatal.
pub fn jwt_config_from<F>(lookup: &F) -> Result<JwtConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup("JWT_SECRET")
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("JWT_SECRET must be set to a non-empty value"))?;
    let ttl =
        parse_number::<i64, _>(lookup, "JWT_TTL_SECONDS")?.unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
    if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&ttl) {
        bail!("JWT_TTL_SECONDS must be between 1 and {MAX_TOKEN_TTL_SECONDS}");
    }
    let leeway = parse_number(lookup, "JWT_LEEWAY_SECONDS")?.unwrap_or(0);

    Ok(JwtConfig::new(secret.into_bytes())
        .with_ttl(ttl)
        .with_leeway(leeway))
}

pub fn migrations_dir() -> String {
    env::var("AUTH_MIGRATIONS_DIR")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "migrations".to_string())
}

fn parse_number<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| normalize_optional(&value))
        .map(|value| value.parse::<T>())
        .transpose()
        .with_context(|| format!("Failed to parse {key}"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

pub(crate) fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
