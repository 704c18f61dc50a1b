//! Integration tests for registration, login, logout and sessions.

use serde_json::{Value, json};

use rolodex_integration_tests::TestApp;

#[tokio::test]
async fn register_login_and_fetch_profile() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("alice").await;
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");

    let resp = app
        .client
        .get(app.url("/api/profile"))
        .send()
        .await
        .expect("profile request");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("profile body");
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    // The password hash must never appear in a response.
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn unauthenticated_requests_get_401_envelopes() {
    let app = TestApp::spawn().await;

    for path in ["/api/contacts", "/api/tags", "/api/profile"] {
        let resp = app
            .client
            .get(app.url(path))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), 401, "{path} should require auth");

        let body: Value = resp.json().await.expect("error body");
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn duplicate_email_registration_is_rejected() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .post(app.url("/api/register"))
        .json(&json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "hunter2!",
        }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .post(app.url("/api/login"))
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), 401);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .post(app.url("/api/logout"))
        .send()
        .await
        .expect("logout request");
    assert_eq!(resp.status(), 200);

    // The session is gone.
    let resp = app
        .client
        .get(app.url("/api/profile"))
        .send()
        .await
        .expect("profile request");
    assert_eq!(resp.status(), 401);

    // Logging out again without a session is a client error.
    let resp = app
        .client
        .post(app.url("/api/logout"))
        .send()
        .await
        .expect("logout request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn profile_update_merges_and_renames() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .put(app.url("/api/profile"))
        .json(&json!({ "username": "alice-renamed" }))
        .send()
        .await
        .expect("profile update");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("profile body");
    assert_eq!(body["user"]["username"], "alice-renamed");
    // Email untouched by the merge.
    assert_eq!(body["user"]["email"], "alice@example.com");

    // The old password still works after a no-password update.
    let resp = app
        .client
        .post(app.url("/api/login"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter2!" }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn delete_account_cascades_and_logs_out() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    app.create_tag(json!({ "name": "work" })).await;
    app.create_contact(json!({ "first_name": "Ada", "last_name": "Lovelace" }))
        .await;

    let resp = app
        .client
        .delete(app.url("/api/delete_account"))
        .send()
        .await
        .expect("delete account request");
    assert_eq!(resp.status(), 200);

    // Session destroyed.
    let resp = app
        .client
        .get(app.url("/api/profile"))
        .send()
        .await
        .expect("profile request");
    assert_eq!(resp.status(), 401);

    // Credentials no longer work.
    let resp = app
        .client
        .post(app.url("/api/login"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter2!" }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), 401);
}
