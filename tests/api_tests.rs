use login_portal::{
    AppConfig, AppState, CredentialService, InMemoryRepository, RepositoryState, create_router,
    models::UserEntry,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Boots the full router on an ephemeral port over the in-memory store.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let service = CredentialService::with_hash_cost(repo, 4);
    let config = AppConfig::default();

    let state = AppState { service, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

fn client() -> reqwest::Client {
    // Cookie store on, so the session cookie round-trips like a browser.
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("failed to build client")
}

async fn add_user(app: &TestApp, client: &reqwest::Client, body: serde_json::Value) -> reqwest::Response {
    client
        .post(format!("{}/api/add-user", app.address))
        .json(&body)
        .send()
        .await
        .expect("add-user request failed")
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_responses_are_not_cacheable() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store"
    );
}

#[tokio::test]
async fn test_login_session_lifecycle() {
    let app = spawn_app().await;
    let client = client();

    // Provision a camp admin; adminType as a plain string.
    let response = add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": "camp" }),
    )
    .await;
    assert_eq!(response.status(), 201);

    // No session yet.
    let response = client
        .get(format!("{}/api/session", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Login opens a session.
    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "password": "pw1", "adminType": "camp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Login successful");

    // The cookie now resolves to the logged-in identity.
    let response = client
        .get(format!("{}/api/session", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let session: serde_json::Value = response.json().await.unwrap();
    assert_eq!(session["username"], "alice");
    assert_eq!(session["adminType"], "camp");

    // Logout clears it again.
    let response = client
        .post(format!("{}/api/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/session", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_login_rejections() {
    let app = spawn_app().await;
    let client = client();

    add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": "camp" }),
    )
    .await;

    // Missing field.
    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "adminType": "camp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Missing fields");

    // Unknown admin type.
    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "password": "pw1", "adminType": "root" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Wrong admin area for an existing credential.
    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "password": "pw1", "adminType": "enroll" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_add_user_array_listing_and_conflict() {
    let app = spawn_app().await;
    let client = client();

    // adminType as an array grants both areas in one call.
    let response = add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": ["camp", "enroll"] }),
    )
    .await;
    assert_eq!(response.status(), 201);

    // A second add for any held type conflicts.
    let response = add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw2", "adminType": "enroll" }),
    )
    .await;
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User exists for enroll");

    // The listing groups both types under one entry.
    let response = client
        .get(format!("{}/api/users", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let users: Vec<UserEntry> = response.json().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");
    assert_eq!(users[0].admin_type.len(), 2);
}

#[tokio::test]
async fn test_delete_endpoints() {
    let app = spawn_app().await;
    let client = client();

    add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": ["camp", "enroll"] }),
    )
    .await;

    // Single-type delete leaves the sibling record.
    let response = client
        .delete(format!("{}/api/users/alice/camp", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let users: Vec<UserEntry> = client
        .get(format!("{}/api/users", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].admin_type.len(), 1);

    // Deleting the same record again is 404.
    let response = client
        .delete(format!("{}/api/users/alice/camp", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Whole-username delete removes the rest.
    let response = client
        .delete(format!("{}/api/users/alice", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let users: Vec<UserEntry> = client
        .get(format!("{}/api/users", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_update_user_password_rotation() {
    let app = spawn_app().await;
    let client = client();

    add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": "camp" }),
    )
    .await;

    let response = client
        .put(format!("{}/api/users/alice/camp", app.address))
        .json(&json!({ "newPassword": "pw2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Old password rejected, new one accepted.
    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "password": "pw1", "adminType": "camp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alice", "password": "pw2", "adminType": "camp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_update_user_conflict_and_not_found() {
    let app = spawn_app().await;
    let client = client();

    add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": ["camp", "enroll"] }),
    )
    .await;

    // Moving camp onto the occupied enroll key conflicts.
    let response = client
        .put(format!("{}/api/users/alice/camp", app.address))
        .json(&json!({ "newAdminType": "enroll" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Unknown target is 404.
    let response = client
        .put(format!("{}/api/users/ghost/camp", app.address))
        .json(&json!({ "newPassword": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_replace_user_endpoint() {
    let app = spawn_app().await;
    let client = client();

    add_user(
        &app,
        &client,
        json!({ "username": "alice", "password": "pw1", "adminType": "camp" }),
    )
    .await;

    // Rename and widen the grant set with a fresh password.
    let response = client
        .put(format!("{}/api/update-user", app.address))
        .json(&json!({
            "username": "alice",
            "newUsername": "alicia",
            "adminType": ["camp", "enroll"],
            "newPassword": "pw2"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "username": "alicia", "password": "pw2", "adminType": "enroll" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Widening without a password is rejected up front.
    let response = client
        .put(format!("{}/api/update-user", app.address))
        .json(&json!({ "username": "alicia", "adminType": ["camp", "enroll"] }))
        .send()
        .await
        .unwrap();
    // Both types already exist under alicia, so carrying hashes works.
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("{}/api/users/alicia/enroll", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .put(format!("{}/api/update-user", app.address))
        .json(&json!({ "username": "alicia", "adminType": ["camp", "enroll"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_login_page_served_at_root() {
    let app = spawn_app().await;

    let response = client()
        .get(format!("{}/", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("loginForm"));
}
