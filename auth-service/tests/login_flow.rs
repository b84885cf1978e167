mod support;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use common_auth::TokenService;
use support::TestApp;

#[tokio::test]
async fn login_returns_token_with_assigned_roles() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "CorrectHorse!", &["admin", "editor"]).await;

    let (status, body) = app.login("a@x.com", "CorrectHorse!").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["roles"], serde_json::json!(["admin", "editor"]));

    let token = body["access_token"].as_str().unwrap();
    let claims = app.tokens.validate(token, Utc::now()).unwrap();
    assert_eq!(claims.user_id, id);
    assert_eq!(claims.roles, vec!["admin", "editor"]);
    assert_eq!(claims.expires_at - claims.issued_at, chrono::Duration::hours(1));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_share_a_response() {
    let app = TestApp::new();
    app.add_user("a@x.com", "CorrectHorse!", &[]).await;

    let (wrong_status, wrong_body) = app.login("a@x.com", "nope").await;
    let (unknown_status, unknown_body) = app.login("ghost@x.com", "CorrectHorse!").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["code"], "invalid_credentials");
}

#[tokio::test]
async fn inactive_account_is_forbidden() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &[]).await;
    let super_admin = app.token_for(99, &["super_admin"]);

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/admin/users/{id}/status"),
            Some(&super_admin),
            Some(serde_json::json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = app.login("a@x.com", "pw").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "account_inactive");

    let (status, _) = app.login("a@x.com", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_echoes_validated_claims() {
    let app = TestApp::new();
    app.add_user("a@x.com", "pw", &["editor"]).await;
    let (_, login) = app.login("a@x.com", "pw").await;
    let token = login["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.send(Method::GET, "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["roles"], serde_json::json!(["editor"]));
    let issued: DateTime<Utc> = body["issued_at"].as_str().unwrap().parse().unwrap();
    let expires: DateTime<Utc> = body["expires_at"].as_str().unwrap().parse().unwrap();
    assert!(expires > issued);
}

#[tokio::test]
async fn protected_routes_fail_closed() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/v1/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.send(Method::GET, "/api/v1/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = TokenService::new(common_auth::JwtConfig::new("someone-else"))
        .unwrap()
        .issue(
            common_auth::TokenSubject {
                user_id: 1,
                email: "x@x.com".into(),
                roles: vec!["super_admin".into()],
            },
            Utc::now(),
        )
        .unwrap()
        .token;
    let (status, _) = app
        .send(Method::GET, "/api/v1/admin/roles", Some(&foreign), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let issued = app
        .tokens
        .issue(
            common_auth::TokenSubject {
                user_id: 1,
                email: "a@x.com".into(),
                roles: vec![],
            },
            Utc::now() - chrono::Duration::hours(2),
        )
        .unwrap();

    let (status, _) = app
        .send(Method::GET, "/api/v1/me", Some(&issued.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_version_and_metrics_are_public() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["db"], "connected");

    let (status, body) = app.send(Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "auth-service");

    app.login("ghost@x.com", "pw").await;
    let (status, body) = app.send(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .unwrap()
        .contains("auth_login_attempts_total{outcome=\"invalid_credentials\"} 1"));
}
