//! Integration tests for bulk import.

use serde_json::Value;

use rolodex_integration_tests::TestApp;

#[tokio::test]
async fn csv_import_creates_contacts_for_the_importer() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let csv = b"first_name,last_name,email\n\
                Ada,Lovelace,ada@example.com\n\
                Grace,Hopper,grace@example.com\n\
                Alan,Turing,alan@example.com\n"
        .to_vec();

    let resp = app.import_file("contacts.csv", csv).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.expect("import body");
    assert_eq!(body["success"], true);
    assert_eq!(body["imported"], 3);

    let resp = app
        .client
        .get(app.url("/api/contacts"))
        .send()
        .await
        .expect("list request");
    let body: Value = resp.json().await.expect("list body");
    let contacts = body["contacts"].as_array().expect("contacts array");
    assert_eq!(contacts.len(), 3);
    assert_eq!(contacts[0]["first_name"], "Ada");
    assert_eq!(contacts[0]["email"], "ada@example.com");
    assert_eq!(contacts[0]["custom_fields"], serde_json::json!({}));
}

#[tokio::test]
async fn json_import_maps_known_fields_and_ignores_unknown() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let payload = br#"[
        {"first_name": "Ada", "last_name": "Lovelace", "phone": "555-0100", "shoe_size": 7},
        {"first_name": "Grace", "last_name": "Hopper"}
    ]"#
    .to_vec();

    let resp = app.import_file("contacts.json", payload).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.expect("import body");
    assert_eq!(body["imported"], 2);

    let resp = app
        .client
        .get(app.url("/api/contacts"))
        .send()
        .await
        .expect("list request");
    let body: Value = resp.json().await.expect("list body");
    let contacts = body["contacts"].as_array().expect("contacts array");
    assert_eq!(contacts[0]["phone"], "555-0100");
    // Unknown columns are dropped, not stored as custom fields.
    assert_eq!(contacts[0]["custom_fields"], serde_json::json!({}));
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app.import_file("contacts.txt", b"whatever".to_vec()).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Unsupported file format.");
}

#[tokio::test]
async fn import_with_an_invalid_record_is_atomic() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    // Second record is missing its first name.
    let csv = b"first_name,last_name\nAda,Lovelace\n,Hopper\n".to_vec();

    let resp = app.import_file("contacts.csv", csv).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    let error = body["error"].as_str().expect("error message");
    assert!(error.contains("record 2"), "error names the bad record: {error}");

    // Nothing was imported.
    let resp = app
        .client
        .get(app.url("/api/contacts"))
        .send()
        .await
        .expect("list request");
    let body: Value = resp.json().await.expect("list body");
    assert_eq!(body["contacts"], serde_json::json!([]));
}

#[tokio::test]
async fn corrupt_excel_payload_is_a_parse_error() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let resp = app
        .import_file("contacts.xlsx", b"not actually a workbook".to_vec())
        .await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let app = TestApp::spawn().await;
    app.register_and_login("alice").await;

    let form = reqwest::multipart::Form::new().text("note", "no file here");
    let resp = app
        .client
        .post(app.url("/api/contacts/import"))
        .multipart(form)
        .send()
        .await
        .expect("import request");
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "No file uploaded.");
}
