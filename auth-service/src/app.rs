use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, State};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Json, Router};
use common_auth::{require_auth, TokenService};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, warn};

use crate::account_handlers::{login_user, me, register};
use crate::config::ServiceConfig;
use crate::metrics::AuthMetrics;
use crate::policy::PolicyEngine;
use crate::policy_handlers::{get_policy, list_policies, upsert_policies};
use crate::role_handlers::{assign_role, create_role, list_roles, revoke_role};
use crate::store::{AuthStore, PolicyStore};
use crate::user_handlers::{delete_user, get_user, list_users, update_user_status};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthStore>,
    pub tokens: Arc<TokenService>,
    pub policies: Arc<PolicyEngine>,
    pub metrics: Arc<AuthMetrics>,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl AppState {
    pub fn new<S>(store: Arc<S>, tokens: TokenService, metrics: AuthMetrics) -> Self
    where
        S: AuthStore + 'static,
    {
        let policy_store: Arc<dyn PolicyStore> = store.clone();
        Self {
            store,
            tokens: Arc::new(tokens),
            policies: Arc::new(PolicyEngine::new(policy_store)),
            metrics: Arc::new(metrics),
        }
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }
}

/// Transport settings applied around every route.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            cors_origins: Vec::new(),
        }
    }
}

impl From<&ServiceConfig> for HttpSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

pub fn router(state: AppState, http: &HttpSettings) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user).delete(delete_user))
        .route("/admin/users/:id/status", patch(update_user_status))
        .route("/admin/roles", get(list_roles).post(create_role))
        .route("/admin/assign-role", post(assign_role))
        .route("/admin/revoke-role", delete(revoke_role))
        .route("/superadmin/policies", get(list_policies).post(upsert_policies))
        .route("/superadmin/policies/:name", get(get_policy))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    // Registration authenticates optionally, so it stays outside the layer.
    let api = Router::new()
        .route("/login", post(login_user))
        .route("/register", post(register))
        .merge(protected);

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(http.request_timeout))
        .layer(cors_layer(&http.cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db = match state.store.health_check().await {
        Ok(()) => "connected",
        Err(err) => {
            warn!(error = %err, "health check failed");
            "disconnected"
        }
    };
    Json(json!({ "status": "ok", "db": db }))
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            common_http_errors::ApiError::internal_server_error().into_response()
        }
    }
}
