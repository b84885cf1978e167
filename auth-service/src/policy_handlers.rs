use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use common_auth::{AuthContext, Operation};
use serde::Serialize;
use tracing::info;

use crate::error::ServiceError;
use crate::policy::UpsertReport;
use crate::store::PolicyRecord;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PolicyList {
    pub policies: Vec<PolicyRecord>,
}

pub async fn list_policies(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<PolicyList>, ServiceError> {
    auth.authorize(Operation::ListPolicies)?;
    let policies = state.policies.list_policies().await?;
    Ok(Json(PolicyList { policies }))
}

pub async fn get_policy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(name): Path<String>,
) -> Result<Json<PolicyRecord>, ServiceError> {
    auth.authorize(Operation::ViewPolicy)?;
    state
        .policies
        .get_policy(&name)
        .await?
        .map(Json)
        .ok_or(ServiceError::NotFound("policy_not_found"))
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub applied_count: usize,
    #[serde(flatten)]
    pub report: UpsertReport,
}

/// Always 200 once authorized; per-key failures are listed in the body.
pub async fn upsert_policies(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(updates): Json<BTreeMap<String, String>>,
) -> Result<Json<UpsertResponse>, ServiceError> {
    auth.authorize(Operation::UpsertPolicies)?;
    if updates.is_empty() {
        return Err(ServiceError::bad_request("empty_policy_update", "No policies supplied"));
    }

    let report = state.policies.upsert_policies(updates).await;
    state.metrics.policy_writes("applied", report.applied.len());
    state.metrics.policy_writes("failed", report.failed.len());
    info!(
        applied = report.applied.len(),
        failed = report.failed.len(),
        actor = auth.claims.user_id,
        "policy upsert finished"
    );

    Ok(Json(UpsertResponse {
        applied_count: report.applied_count(),
        report,
    }))
}
