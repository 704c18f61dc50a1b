//! Integration tests for contact CRUD and ownership isolation.

use serde_json::{Value, json};

use rolodex_integration_tests::TestApp;

#[tokio::test]
async fn create_and_fetch_roundtrip() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let created = app
        .create_contact(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "company_name": "Analytical Engines Ltd",
            "phone": "555-0100",
            "custom_fields": { "birthday": "1815-12-10" },
        }))
        .await;

    let id = created["id"].as_i64().expect("contact id");
    let resp = app
        .client
        .get(app.url(&format!("/api/contacts/{id}")))
        .send()
        .await
        .expect("fetch request");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("contact body");
    let contact = &body["contact"];
    assert_eq!(contact["first_name"], "Ada");
    assert_eq!(contact["last_name"], "Lovelace");
    assert_eq!(contact["company_name"], "Analytical Engines Ltd");
    assert_eq!(contact["phone"], "555-0100");
    assert_eq!(contact["custom_fields"]["birthday"], "1815-12-10");
    assert_eq!(contact["tags"], json!([]));
    // Internal columns stay internal.
    assert!(contact.get("user_id").is_none());
}

#[tokio::test]
async fn create_requires_both_names() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .post(app.url("/api/contacts"))
        .json(&json!({ "first_name": "Ada" }))
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn update_merges_only_supplied_fields() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let created = app
        .create_contact(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "phone": "555-0100",
        }))
        .await;
    let id = created["id"].as_i64().expect("contact id");

    let resp = app
        .client
        .put(app.url(&format!("/api/contacts/{id}")))
        .json(&json!({ "comment": "met at the salon" }))
        .send()
        .await
        .expect("update request");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("contact body");
    let contact = &body["contact"];
    assert_eq!(contact["comment"], "met at the salon");
    assert_eq!(contact["first_name"], "Ada");
    assert_eq!(contact["phone"], "555-0100");
}

#[tokio::test]
async fn delete_removes_the_contact() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let created = app
        .create_contact(json!({ "first_name": "Ada", "last_name": "Lovelace" }))
        .await;
    let id = created["id"].as_i64().expect("contact id");

    let resp = app
        .client
        .delete(app.url(&format!("/api/contacts/{id}")))
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/api/contacts/{id}")))
        .send()
        .await
        .expect("fetch request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn missing_contact_is_404() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .client
        .get(app.url("/api/contacts/9999"))
        .send()
        .await
        .expect("fetch request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn contacts_are_invisible_across_users() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let created = app
        .create_contact(json!({ "first_name": "Ada", "last_name": "Lovelace" }))
        .await;
    let id = created["id"].as_i64().expect("contact id");

    // Bob, a different user with his own session.
    let bob = app.fresh_client();
    app.register_and_login_as(&bob, "bob").await;

    // Bob's listing is empty.
    let resp = bob
        .get(app.url("/api/contacts"))
        .send()
        .await
        .expect("list request");
    let body: Value = resp.json().await.expect("list body");
    assert_eq!(body["contacts"], json!([]));

    // Direct access to Alice's contact is forbidden, and leaks no fields.
    for method in ["GET", "DELETE"] {
        let url = app.url(&format!("/api/contacts/{id}"));
        let resp = match method {
            "GET" => bob.get(url).send().await,
            _ => bob.delete(url).send().await,
        }
        .expect("request");
        assert_eq!(resp.status(), 403, "{method} should be forbidden");

        let body: Value = resp.json().await.expect("error body");
        assert_eq!(body["success"], false);
        assert!(body.get("contact").is_none());
    }

    // Still intact for Alice.
    let resp = app
        .client
        .get(app.url(&format!("/api/contacts/{id}")))
        .send()
        .await
        .expect("fetch request");
    assert_eq!(resp.status(), 200);
}
