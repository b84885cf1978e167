mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn admins_can_list_and_view_users() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &["editor"]).await;
    let admin = app.token_for(50, &["admin"]);

    let (status, body) = app.send(Method::GET, "/api/v1/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"][0]["email"], "a@x.com");
    assert_eq!(body["users"][0]["roles"], json!(["editor"]));
    assert!(body["users"][0].get("password_hash").is_none());

    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/admin/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (status, body) = app
        .send(Method::GET, "/api/v1/admin/users/9999", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "user_not_found");
}

#[tokio::test]
async fn plain_users_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let editor = app.token_for(7, &["editor"]);

    let (status, _) = app.send(Method::GET, "/api/v1/admin/users", Some(&editor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, "/api/v1/admin/roles", Some(&editor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_super_admin_deletes_users() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &[]).await;
    let uri = format!("/api/v1/admin/users/{id}");

    let admin = app.token_for(50, &["admin"]);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let root = app.token_for(1, &["super_admin"]);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_lifecycle() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &[]).await;
    let root = app.token_for(1, &["super_admin"]);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/admin/roles",
            Some(&root),
            Some(json!({ "name": "editor", "description": "Edits content" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);

    let (status, body) = app
        .send(Method::POST, "/api/v1/admin/roles", Some(&root), Some(json!({ "name": "editor" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);

    let assignment = json!({ "user_id": id, "role": "editor" });
    let (status, body) = app
        .send(Method::POST, "/api/v1/admin/assign-role", Some(&root), Some(assignment.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    let (_, body) = app
        .send(Method::POST, "/api/v1/admin/assign-role", Some(&root), Some(assignment.clone()))
        .await;
    assert_eq!(body["changed"], false);

    let (_, login) = app.login("a@x.com", "pw").await;
    assert_eq!(login["user"]["roles"], json!(["editor"]));

    let (status, body) = app
        .send(Method::DELETE, "/api/v1/admin/revoke-role", Some(&root), Some(assignment))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (_, login) = app.login("a@x.com", "pw").await;
    assert_eq!(login["user"]["roles"], json!([]));
}

#[tokio::test]
async fn assigning_unknown_role_or_user_is_not_found() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &["editor"]).await;
    let root = app.token_for(1, &["super_admin"]);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/admin/assign-role",
            Some(&root),
            Some(json!({ "user_id": id, "role": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "role_not_found");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/admin/assign-role",
            Some(&root),
            Some(json!({ "user_id": 4242, "role": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "user_not_found");
}

#[tokio::test]
async fn stale_token_keeps_revoked_role_until_expiry() {
    let app = TestApp::new();
    let id = app.add_user("a@x.com", "pw", &["admin"]).await;
    let (_, login) = app.login("a@x.com", "pw").await;
    let token = login["access_token"].as_str().unwrap().to_string();

    let root = app.token_for(1, &["super_admin"]);
    app.send(
        Method::DELETE,
        "/api/v1/admin/revoke-role",
        Some(&root),
        Some(json!({ "user_id": id, "role": "admin" })),
    )
    .await;

    let (status, _) = app.send(Method::GET, "/api/v1/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}
