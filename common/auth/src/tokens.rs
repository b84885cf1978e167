use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::claims::{Claims, ClaimsRepr};
use crate::config::{JwtConfig, MAX_TOKEN_TTL_SECONDS};
use crate::error::{AuthError, AuthResult};

/// Identity to embed in a freshly issued token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and validates HS256 access tokens.
///
/// Stateless: nothing about issued tokens is kept server-side, so a token
/// stays valid until `expires_at` regardless of later account changes.
pub struct TokenService {
    ttl: Duration,
    leeway: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Fails when the secret is empty or the lifetime is out of range; callers
    /// treat this as fatal at startup.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        if config.secret().is_empty() {
            return Err(AuthError::MissingSigningSecret);
        }
        let ttl = config.ttl().ok_or_else(|| {
            AuthError::Signing(format!(
                "token lifetime must be between 1 and {MAX_TOKEN_TTL_SECONDS}s, got {}s",
                config.ttl_seconds
            ))
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller-supplied clock in `validate`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Ok(Self {
            ttl,
            leeway: config.leeway(),
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Errors here are server-side failures, never a problem with a token.
    pub fn issue(&self, subject: TokenSubject, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.ttl.num_seconds())
            .ok_or_else(|| AuthError::Signing("token expiry overflows".to_string()))?;
        let repr = ClaimsRepr {
            sub: subject.user_id,
            email: subject.email,
            roles: subject.roles,
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &repr, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        let claims = Claims::try_from(repr)
            .map_err(|err| AuthError::Signing(format!("issued claims out of range: {err}")))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verifies the signature, then requires `now < expires_at` (plus any
    /// configured leeway).
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let data = decode::<ClaimsRepr>(token, &self.decoding_key, &self.validation)?;
        let claims = Claims::try_from(data.claims)?;

        if now >= claims.expires_at + self.leeway {
            return Err(AuthError::Expired);
        }

        debug!(user_id = claims.user_id, "validated access token");
        Ok(claims)
    }
}
