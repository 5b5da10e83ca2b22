use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use portier::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Cheap Argon2 params keep the suite fast; verification reads the
    // params back from each stored hash, so behavior is unchanged.
    config.security.argon2_memory_cost_kib = 256;
    config.security.argon2_time_cost = 1;

    let state = portier::api::create_app_state(config, None)
        .await
        .expect("Failed to create app state");
    portier::api::router(state)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Token {token}"));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

async fn register(app: &Router, username: &str, password: &str) -> (Value, String) {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["auth_token"].as_str().unwrap().to_string();
    (body["data"].clone(), token)
}

#[tokio::test]
async fn test_register_and_fetch_profile() {
    let app = spawn_app().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({
            "username": "alice",
            "password": "p@ssw0rd",
            "first_name": "Alice",
            "last_name": "Lidell",
            "email": "alice@example.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["username"], "alice");
    assert_eq!(data["first_name"], "Alice");
    assert_eq!(data["email"], "alice@example.com");
    assert_eq!(data["auth_token"].as_str().unwrap().len(), 64);
    assert!(data["created_at"].is_string());

    // The public id is a server-assigned UUID and the hash never leaks.
    let public_id = data["public_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(public_id).is_ok());
    assert!(data.get("password").is_none());
    assert!(data.get("password_hash").is_none());
    assert!(data.get("is_staff").is_none());

    // Reads are public: no credentials needed, and no token in the body.
    let (status, body) = send_json(&app, "GET", &format!("/api/v1/users/{public_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["public_id"], public_id);
    assert!(body["data"].get("auth_token").is_none());
}

#[tokio::test]
async fn test_register_requires_username_and_password() {
    let app = spawn_app().await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": "", "password": "p@ssw0rd"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, "POST", "/api/v1/users", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_ignores_privilege_and_identity_fields() {
    let app = spawn_app().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({
            "username": "bob",
            "password": "p@ssw0rd",
            "is_staff": true,
            "is_superuser": true,
            "uuid": "forged",
            "public_id": "forged"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_ne!(data["public_id"], "forged");
    assert!(uuid::Uuid::parse_str(data["public_id"].as_str().unwrap()).is_ok());
    assert!(data.get("is_staff").is_none());
    assert!(data.get("is_superuser").is_none());
}

#[tokio::test]
async fn test_duplicate_username_rejected_even_after_soft_delete() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "p@ssw0rd").await;
    let public_id = account["public_id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": "alice", "password": "other-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Soft-delete the first account; the username slot stays occupied.
    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{public_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": "alice", "password": "other-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_endpoint_returns_existing_token() {
    let app = spawn_app().await;

    let (_, token) = register(&app, "alice", "p@ss").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "p@ss"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token"].as_str().unwrap(), token);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "nobody", "password": "p@ss"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_profile_self() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "p@ssw0rd").await;
    let public_id = account["public_id"].as_str().unwrap();

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}"),
        Some(&token),
        Some(json!({
            "first_name": "X",
            "username": "hijacked",
            "public_id": "forged"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "X");
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["public_id"], public_id);

    // The change is persisted and publicly visible.
    let (status, body) = send_json(&app, "GET", &format!("/api/v1/users/{public_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "X");
}

#[tokio::test]
async fn test_update_profile_authorization() {
    let app = spawn_app().await;

    let (alice, _alice_token) = register(&app, "alice", "p@ssw0rd").await;
    let (_, bob_token) = register(&app, "bob", "p@ssw0rd").await;
    let alice_id = alice["public_id"].as_str().unwrap();

    let update = json!({"first_name": "X"});

    // Another account's token: forbidden, not unauthorized.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}"),
        Some(&bob_token),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No token at all.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}"),
        None,
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A token that resolves to nothing.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}"),
        Some("invalid"),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A malformed id is 404 before any authorization question arises.
    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/v1/users/invalid",
        None,
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A well-formed id that was never issued is 404 too, even for a
    // caller holding a valid token.
    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/v1/users/00000000-0000-4000-8000-000000000000",
        Some(&bob_token),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_profile_rejects_invalid_email() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "p@ssw0rd").await;
    let public_id = account["public_id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}"),
        Some(&token),
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}"),
        Some(&token),
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_password_key_in_profile_update_is_ignored() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "orig-pass").await;
    let public_id = account["public_id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}"),
        Some(&token),
        Some(json!({"first_name": "X", "password": "hijacked1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The authenticatable password did not change.
    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "orig-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "hijacked1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "orig-pass").await;
    let public_id = account["public_id"].as_str().unwrap();

    // Wrong old password: rejected, hash untouched.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}/password"),
        Some(&token),
        Some(json!({"old_password": "wrong", "new_password": "n3w-passw0rd"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "orig-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Correct old password rotates the secret but not the token.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}/password"),
        Some(&token),
        Some(json!({"old_password": "orig-pass", "new_password": "n3w-passw0rd"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "n3w-passw0rd"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token"].as_str().unwrap(), token);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "orig-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_requires_strong_new_password() {
    let app = spawn_app().await;

    let (account, token) = register(&app, "alice", "orig-pass").await;
    let public_id = account["public_id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{public_id}/password"),
        Some(&token),
        Some(json!({"old_password": "orig-pass", "new_password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api-token-auth",
        None,
        Some(json!({"username": "alice", "password": "orig-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_requires_self() {
    let app = spawn_app().await;

    let (alice, _) = register(&app, "alice", "p@ssw0rd").await;
    let (_, bob_token) = register(&app, "bob", "p@ssw0rd").await;
    let alice_id = alice["public_id"].as_str().unwrap();

    let body = json!({"old_password": "p@ssw0rd", "new_password": "n3w-passw0rd"});

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}/password"),
        Some(&bob_token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}/password"),
        None,
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_account() {
    let app = spawn_app().await;

    let (alice, alice_token) = register(&app, "alice", "p@ssw0rd").await;
    let (_, bob_token) = register(&app, "bob", "p@ssw0rd").await;
    let alice_id = alice["public_id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{alice_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{alice_id}"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{alice_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Once removed, the account is invisible to every normal path.
    let (status, _) = send_json(&app, "GET", &format!("/api/v1/users/{alice_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/users/{alice_id}"),
        Some(&alice_token),
        Some(json!({"first_name": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/users/{alice_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_system_status_is_public() {
    let app = spawn_app().await;

    let (status, body) = send_json(&app, "GET", "/api/v1/system/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["version"].is_string());
    assert_eq!(body["data"]["database"], "ok");
}
