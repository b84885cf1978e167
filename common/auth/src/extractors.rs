use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::debug;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::guards::{authorize, GuardError, Operation};
use crate::tokens::TokenService;

/// Verified identity attached to a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub token: String,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.claims.has_role(role)
    }

    pub fn authorize(&self, operation: Operation) -> Result<(), GuardError> {
        authorize(&self.claims, operation)
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

/// Validates the bearer token carried by `headers`.
///
/// This is the only place request tokens are checked; the middleware and both
/// extractors go through it.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> AuthResult<AuthContext> {
    let header_value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorization)?;

    let token = parse_bearer(header_value)?;
    match tokens.validate(&token, Utc::now()) {
        Ok(claims) => Ok(AuthContext { claims, token }),
        Err(err) => {
            debug!(kind = err.kind(), error = %err, "rejected bearer token");
            Err(err)
        }
    }
}

/// Middleware for routes that always require a caller identity. Rejects the
/// request with 401 before any handler runs.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = authenticate(request.headers(), &tokens)?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(context.clone());
        }

        let tokens = Arc::<TokenService>::from_ref(state);
        let context = authenticate(&parts.headers, &tokens)?;
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}

/// Identity for routes where authentication is optional.
///
/// No `Authorization` header yields `None`; a header that is present but does
/// not validate is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthContext>);

impl OptionalAuth {
    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref().map(|context| &context.claims)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Self(None));
        }
        AuthContext::from_request_parts(parts, state)
            .await
            .map(|context| Self(Some(context)))
    }
}

fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}
