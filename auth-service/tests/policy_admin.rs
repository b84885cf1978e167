mod support;

use std::sync::Arc;

use async_trait::async_trait;
use auth_service::policy::{PolicyEngine, REGISTRATION_MODE_POLICY};
use auth_service::store::{InMemoryStore, PolicyRecord, PolicyStore, StoreError, StoreResult};
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::collections::BTreeMap;
use support::TestApp;

#[tokio::test]
async fn upsert_then_read_back_is_idempotent() {
    let app = TestApp::new();
    let root = app.token_for(1, &["super_admin"]);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/superadmin/policies",
            Some(&root),
            Some(json!({ "a": "1", "b": "2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied_count"], 2);

    let (_, first) = app
        .send(Method::GET, "/api/v1/superadmin/policies/a", Some(&root), None)
        .await;
    assert_eq!(first["value"], "1");

    app.send(
        Method::POST,
        "/api/v1/superadmin/policies",
        Some(&root),
        Some(json!({ "a": "1", "b": "2" })),
    )
    .await;

    let (_, second) = app
        .send(Method::GET, "/api/v1/superadmin/policies/a", Some(&root), None)
        .await;
    assert_eq!(second["value"], "1");
    let timestamp = |body: &serde_json::Value| -> chrono::DateTime<chrono::Utc> {
        body["updated_at"].as_str().unwrap().parse().unwrap()
    };
    let (before, after) = (timestamp(&first), timestamp(&second));
    assert!(after > before);

    let (_, list) = app
        .send(Method::GET, "/api/v1/superadmin/policies", Some(&root), None)
        .await;
    let names: Vec<&str> = list["policies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn invalid_registration_mode_is_reported_per_key() {
    let app = TestApp::new();
    let root = app.token_for(1, &["super_admin"]);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/superadmin/policies",
            Some(&root),
            Some(json!({ "registration_mode": "\"wide_open\"", "other": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied_count"], 1);
    assert_eq!(body["failed"][0]["name"], "registration_mode");

    let (status, _) = app
        .send(Method::GET, "/api/v1/superadmin/policies/registration_mode", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn policy_routes_require_super_admin() {
    let app = TestApp::new();
    let admin = app.token_for(2, &["admin"]);

    let (status, body) = app
        .send(Method::GET, "/api/v1/superadmin/policies", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/superadmin/policies",
            Some(&admin),
            Some(json!({ "registration_mode": "\"open\"" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

/// Refuses writes for one policy name and delegates everything else.
struct FlakyPolicies {
    inner: InMemoryStore,
    broken: &'static str,
}

#[async_trait]
impl PolicyStore for FlakyPolicies {
    async fn get_policy(&self, name: &str) -> StoreResult<Option<PolicyRecord>> {
        self.inner.get_policy(name).await
    }

    async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>> {
        self.inner.list_policies().await
    }

    async fn upsert_policy(&self, name: &str, value: &str) -> StoreResult<PolicyRecord> {
        if name == self.broken {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.upsert_policy(name, value).await
    }
}

#[tokio::test]
async fn one_failing_write_does_not_abort_the_rest() {
    let engine = PolicyEngine::new(Arc::new(FlakyPolicies {
        inner: InMemoryStore::new(),
        broken: "b",
    }));

    let updates = BTreeMap::from([
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
        ("c".to_string(), "3".to_string()),
    ]);
    let report = engine.upsert_policies(updates).await;

    assert_eq!(report.applied_count(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "b");
    assert_eq!(engine.get_policy("a").await.unwrap().unwrap().value, "1");
    assert_eq!(engine.get_policy("c").await.unwrap().unwrap().value, "3");
    assert!(engine.get_policy("b").await.unwrap().is_none());
}

#[tokio::test]
async fn unreadable_mode_falls_back_to_super_admin_only() {
    struct Down;

    #[async_trait]
    impl PolicyStore for Down {
        async fn get_policy(&self, _name: &str) -> StoreResult<Option<PolicyRecord>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn list_policies(&self) -> StoreResult<Vec<PolicyRecord>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn upsert_policy(&self, _name: &str, _value: &str) -> StoreResult<PolicyRecord> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    let engine = PolicyEngine::new(Arc::new(Down));
    assert_eq!(
        engine.resolve_registration_mode().await,
        auth_service::policy::RegistrationMode::SuperAdminOnly
    );
    let report = engine
        .upsert_policies(BTreeMap::from([(
            REGISTRATION_MODE_POLICY.to_string(),
            "\"open\"".to_string(),
        )]))
        .await;
    assert_eq!(report.applied_count(), 0);
    assert_eq!(report.failed.len(), 1);
}
