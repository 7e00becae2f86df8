mod common;

use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{ScriptedSource, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_profile_read_and_partial_update() {
    let app = TestApp::new(ScriptedSource::replying(&["ok"])).await;
    let token = app.signup("Ann", "a@b.com", "secure1").await;

    let (status, profile) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Ann");
    assert_eq!(profile["email"], "a@b.com");
    assert_eq!(profile["blood_type"], "");

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/me",
            Some(&token),
            Some(json!({ "blood_type": "1+", "allergies": "pollen", "snils": "123-456-789 00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(profile["name"], "Ann");
    assert_eq!(profile["blood_type"], "1+");
    assert_eq!(profile["allergies"], "pollen");
    assert_eq!(profile["snils"], "123-456-789 00");
    assert_eq!(profile["chronic_conditions"], "");
}

#[tokio::test]
async fn test_drug_inventory_lifecycle() {
    let app = TestApp::new(ScriptedSource::replying(&["ok"])).await;
    let ann = app.signup("Ann", "a@b.com", "secure1").await;
    let bob = app.signup("Bob", "bob@b.com", "secure1").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/drugs/add",
            Some(&ann),
            Some(json!({
                "name": "Ibuprofen",
                "type": "tablet",
                "description": "pain relief",
                "expiry": "2027-07-12T23:45:00Z",
                "location": "kitchen",
                "manufacturer": "ACME",
                "dose": "200mg",
                "amount": "30"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let drug_id = body["data"].as_i64().unwrap();

    let (_, body) = app.json(Method::GET, "/auth/drugs", Some(&ann), None).await;
    let drugs = body["data"].as_array().unwrap();
    assert_eq!(drugs.len(), 1);
    assert_eq!(drugs[0]["type"], "tablet");
    assert_eq!(drugs[0]["expiry"], "2027-07-12T23:45:00Z");

    let (_, body) = app.json(Method::GET, "/auth/drugs", Some(&bob), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let remove = format!("/auth/drugs/remove/{}", drug_id);
    let (status, _) = app.request(Method::POST, &remove, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request(Method::POST, &remove, Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, "/auth/drugs", Some(&ann), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_document_upload_round_trip() {
    let app = TestApp::new(ScriptedSource::replying(&["ok"])).await;
    let token = app.signup("Ann", "a@b.com", "secure1").await;
    let encoded = STANDARD.encode(b"\x89PNG fake image");

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/documents/add",
            Some(&token),
            Some(json!({
                "name": "X-ray",
                "type": "image",
                "date": "2025-07-12T23:45:00Z",
                "doctor": "Dr. Ivanov",
                "file_data": encoded
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let doc_id = body["data"].as_i64().unwrap();

    let (_, body) = app.json(Method::GET, "/auth/documents", Some(&token), None).await;
    let doc = &body["data"][0];
    assert_eq!(doc["id"], doc_id);
    assert_eq!(doc["file_data"], encoded);
    assert_eq!(doc["doctor"], "Dr. Ivanov");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/auth/documents/remove/{}", doc_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_records_require_auth() {
    let app = TestApp::new(ScriptedSource::replying(&["ok"])).await;
    for uri in ["/auth/me", "/auth/drugs", "/auth/documents"] {
        let (status, _) = app.request(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}
