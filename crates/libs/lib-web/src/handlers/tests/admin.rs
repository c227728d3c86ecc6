//! Users, proofs, notifications, analytics, audit, settings and IPFS.

use super::{spawn_app, TestApp};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use lib_core::model::store::enums::Role;
use serde_json::json;

const BOUNDARY: &str = "relief-ledger-test-boundary";

/// `multipart/form-data` body with text fields and an optional file part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Issue, redeem and return `(transaction_id, beneficiary_token, vendor_token, admin_token)`.
async fn redeemed_transaction(app: &TestApp, seed: u8) -> (i64, String, String, String) {
    let (admin, admin_token) = app.user(seed, Role::Admin).await;
    let (beneficiary, beneficiary_token) = app.user(seed + 1, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(seed + 2, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;

    let (_, voucher) = app
        .post(
            "/api/vouchers",
            &admin_token,
            json!({ "beneficiary_id": beneficiary.id, "disaster_id": disaster_id, "amount": 100 }),
        )
        .await;
    let (_, redeemed) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["data"]["code"], "amount": 60 }),
        )
        .await;
    let tx_id = redeemed["data"]["transaction"]["id"].as_i64().unwrap();
    (tx_id, beneficiary_token, vendor_token, admin_token)
}

// ========== Users ==========

#[tokio::test]
async fn test_user_administration() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(80, Role::Admin).await;
    let (_, government) = app.user(81, Role::Government).await;
    let (target, target_token) = app.user(82, Role::Beneficiary).await;

    // Act
    let (denied, _) = app.get("/api/users", &target_token).await;
    let (listed, list) = app.get("/api/users?role=beneficiary", &government).await;
    let (verified, verify_body) = app
        .call(Method::POST, &format!("/api/users/{}/verify", target.id), Some(&government), None)
        .await;
    let (promoted, role_body) = app
        .call(
            Method::PUT,
            &format!("/api/users/{}/role", target.id),
            Some(&admin_token),
            Some(json!({ "role": "ngo" })),
        )
        .await;
    let (self_role, _) = app
        .call(
            Method::PUT,
            &format!("/api/users/{}/role", admin.id),
            Some(&admin_token),
            Some(json!({ "role": "donor" })),
        )
        .await;

    // Assert
    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(listed, StatusCode::OK);
    assert_eq!(list["data"]["pagination"]["total"], 1);
    assert_eq!(verified, StatusCode::OK);
    assert_eq!(verify_body["data"]["is_verified"], true);
    assert_eq!(promoted, StatusCode::OK);
    assert_eq!(role_body["data"]["role"], "ngo");
    assert_eq!(self_role, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_own_profile() {
    let app = spawn_app().await;
    let (_, token) = app.user(83, Role::Donor).await;
    let (_, other) = app.user(84, Role::Donor).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/users/me",
            Some(&token),
            Some(json!({ "name": "Generous Donor", "email": "Giver@Example.org" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Generous Donor");
    assert_eq!(body["data"]["email"], "giver@example.org");

    let (taken, _) = app
        .call(
            Method::PUT,
            "/api/users/me",
            Some(&other),
            Some(json!({ "email": "giver@example.org" })),
        )
        .await;
    assert_eq!(taken, StatusCode::CONFLICT);
}

// ========== Proofs ==========

#[tokio::test]
async fn test_proof_upload_and_review() {
    // Arrange
    let app = spawn_app().await;
    let (tx_id, beneficiary, vendor, admin) = redeemed_transaction(&app, 85).await;
    let tx_field = tx_id.to_string();
    let body = multipart_body(
        &[("transaction_id", &tx_field), ("description", "Receipt photo")],
        Some(("receipt.png", "image/png", b"\x89PNG fake image bytes")),
    );

    // Act
    let (status, proof) = app.send(multipart_request("/api/proofs", &vendor, body)).await;
    let proof_id = proof["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/proofs/{}/review", proof_id);
    let (pending, _) = app
        .post(&review_uri, &admin, json!({ "status": "pending" }))
        .await;
    let (reviewed, review) = app
        .post(&review_uri, &admin, json!({ "status": "verified", "notes": "Matches ledger" }))
        .await;
    let (again, _) = app
        .post(&review_uri, &admin, json!({ "status": "rejected" }))
        .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(proof["data"]["status"], "pending");
    assert_eq!(proof["data"]["content_type"], "image/png");
    assert!(proof["data"]["ipfs_cid"].as_str().unwrap().starts_with("bafk"));
    assert_eq!(pending, StatusCode::BAD_REQUEST);
    assert_eq!(reviewed, StatusCode::OK);
    assert_eq!(review["data"]["status"], "verified");
    assert_eq!(again, StatusCode::CONFLICT);

    let (_, listed) = app
        .get(&format!("/api/proofs/transaction/{}", tx_id), &beneficiary)
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_proof_upload_rejections() {
    let app = spawn_app().await;
    let (tx_id, _, vendor, _) = redeemed_transaction(&app, 88).await;
    let (_, stranger) = app.user(91, Role::Beneficiary).await;
    let tx_field = tx_id.to_string();

    let wrong_type = multipart_body(
        &[("transaction_id", &tx_field)],
        Some(("notes.txt", "text/plain", b"hello")),
    );
    let (status, body) = app.send(multipart_request("/api/proofs", &vendor, wrong_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidInput");

    let no_file = multipart_body(&[("transaction_id", &tx_field)], None);
    let (status, _) = app.send(multipart_request("/api/proofs", &vendor, no_file)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let outsider = multipart_body(
        &[("transaction_id", &tx_field)],
        Some(("receipt.pdf", "application/pdf", b"%PDF-1.4")),
    );
    let (status, _) = app.send(multipart_request("/api/proofs", &stranger, outsider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ========== Notifications ==========

#[tokio::test]
async fn test_staff_broadcast_to_role() {
    // Arrange
    let app = spawn_app().await;
    let (_, ngo) = app.user(92, Role::Ngo).await;
    let (_, first) = app.user(93, Role::Beneficiary).await;
    let (_, second) = app.user(94, Role::Beneficiary).await;
    let (_, donor) = app.user(95, Role::Donor).await;

    // Act
    let (status, body) = app
        .post(
            "/api/notifications/send",
            &ngo,
            json!({ "role": "beneficiary", "title": "Distribution", "message": "Water at noon" }),
        )
        .await;
    let (ambiguous, _) = app
        .post(
            "/api/notifications/send",
            &ngo,
            json!({ "title": "Hello", "message": "Nobody" }),
        )
        .await;
    let (forbidden, _) = app
        .post(
            "/api/notifications/send",
            &donor,
            json!({ "role": "beneficiary", "title": "Spam", "message": "Spam" }),
        )
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipients"], 2);
    assert_eq!(body["data"]["in_app"], 2);
    assert_eq!(ambiguous, StatusCode::BAD_REQUEST);
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    for token in [&first, &second] {
        let (_, unread) = app.get("/api/notifications/unread-count", token).await;
        assert_eq!(unread["data"]["unread"], 1);
    }
    let (_, donor_unread) = app.get("/api/notifications/unread-count", &donor).await;
    assert_eq!(donor_unread["data"]["unread"], 0);
}

#[tokio::test]
async fn test_notification_inbox() {
    let app = spawn_app().await;
    let (_, admin) = app.user(96, Role::Admin).await;
    let (user, token) = app.user(97, Role::Beneficiary).await;
    for title in ["One", "Two"] {
        app.post(
            "/api/notifications/send",
            &admin,
            json!({ "user_id": user.id, "title": title, "message": "Body" }),
        )
        .await;
    }

    let (_, inbox) = app.get("/api/notifications", &token).await;
    let items = inbox["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let first_id = items[0]["id"].as_i64().unwrap();

    let (status, read) = app
        .call(Method::POST, &format!("/api/notifications/{}/read", first_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["data"]["is_read"], true);

    let (_, unread_only) = app.get("/api/notifications?unread_only=true", &token).await;
    assert_eq!(unread_only["data"]["items"].as_array().unwrap().len(), 1);

    let (_, all) = app.call(Method::POST, "/api/notifications/read-all", Some(&token), None).await;
    assert_eq!(all["data"], 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/notifications/{}", first_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/notifications/{}", first_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ========== Analytics and Audit ==========

#[tokio::test]
async fn test_analytics_are_staff_only() {
    let app = spawn_app().await;
    let (_, _, vendor, admin) = redeemed_transaction(&app, 100).await;

    let (denied, _) = app.get("/api/analytics/overview", &vendor).await;
    let (status, overview) = app.get("/api/analytics/overview", &admin).await;
    let (series_status, series) = app.get("/api/analytics/timeseries?days=7", &admin).await;
    let (top_status, top) = app.get("/api/analytics/top-vendors?limit=5", &admin).await;

    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["data"]["funding"]["raised"], 1_000);
    assert_eq!(overview["data"]["funding"]["allocated"], 100);
    assert_eq!(overview["data"]["funding"]["disbursed"], 60);
    assert_eq!(overview["data"]["transactions"], 1);
    assert_eq!(series_status, StatusCode::OK);
    assert_eq!(series["data"]["days"], 7);
    assert_eq!(top_status, StatusCode::OK);
    assert_eq!(top["data"][0]["total_redeemed"], 60);
}

#[tokio::test]
async fn test_audit_trail() {
    let app = spawn_app().await;
    let (tx_id, beneficiary, _, admin) = redeemed_transaction(&app, 104).await;

    let (denied, _) = app.get("/api/audit", &beneficiary).await;
    let (status, logs) = app.get("/api/audit?action=transaction.redeem", &admin).await;
    let (history_status, history) = app
        .get(&format!("/api/audit/transaction/{}", tx_id), &admin)
        .await;

    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["data"]["pagination"]["total"], 1);
    assert_eq!(logs["data"]["items"][0]["details"]["amount"], 60);
    assert_eq!(history_status, StatusCode::OK);
    assert!(!history["data"].as_array().unwrap().is_empty());
}

// ========== Settings ==========

#[tokio::test]
async fn test_settings_visibility() {
    // Arrange
    let app = spawn_app().await;
    let (_, admin) = app.user(108, Role::Admin).await;
    let (_, donor) = app.user(109, Role::Donor).await;
    let private = "/api/settings/voucher.default_expiry_days";

    // Act
    let (public_list, public) = app.call(Method::GET, "/api/settings", None, None).await;
    let (_, all) = app.get("/api/settings", &admin).await;
    let (anonymous, _) = app.call(Method::GET, private, None, None).await;
    let (non_admin, _) = app.get(private, &donor).await;
    let (allowed, setting) = app.get(private, &admin).await;
    let (missing, _) = app.call(Method::GET, "/api/settings/no.such.key", None, None).await;

    // Assert
    assert_eq!(public_list, StatusCode::OK);
    let public_keys: Vec<&str> = public["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert!(public_keys.contains(&"platform.name"));
    assert!(!public_keys.contains(&"voucher.default_expiry_days"));
    assert!(all["data"].as_array().unwrap().len() > public_keys.len());
    assert_eq!(anonymous, StatusCode::UNAUTHORIZED);
    assert_eq!(non_admin, StatusCode::FORBIDDEN);
    assert_eq!(allowed, StatusCode::OK);
    assert_eq!(setting["data"]["value"], 90);
    assert_eq!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upsert_setting_invalidates_cache() {
    let app = spawn_app().await;
    let (_, admin) = app.user(110, Role::Admin).await;
    let (_, donor) = app.user(111, Role::Donor).await;
    let uri = "/api/settings/platform.name";

    let (_, before) = app.call(Method::GET, uri, None, None).await;
    assert!(before["data"]["value"].is_string());

    let (denied, _) = app
        .call(Method::PUT, uri, Some(&donor), Some(json!({ "value": "Hijacked" })))
        .await;
    assert_eq!(denied, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::PUT, uri, Some(&admin), Some(json!({ "value": "Relief Ops", "is_public": true })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = app.call(Method::GET, uri, None, None).await;
    assert_eq!(after["data"]["value"], "Relief Ops");

    let (bad_key, _) = app
        .call(Method::PUT, "/api/settings/bad%20key", Some(&admin), Some(json!({ "value": 1 })))
        .await;
    assert_eq!(bad_key, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cache_administration() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(112, Role::Admin).await;
    let (_, donor) = app.user(113, Role::Donor).await;
    let id = app.disaster(admin.id, 0).await;
    app.call(Method::GET, &format!("/api/disasters/{}", id), None, None).await;

    let (denied, _) = app.get("/api/settings/cache/stats", &donor).await;
    assert_eq!(denied, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/settings/cache/stats", &admin_token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::DELETE, "/api/settings/cache?pattern=disasters:*", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pattern"], "disasters:*");
    assert!(body["data"]["removed"].as_u64().unwrap() >= 1);
}

// ========== IPFS ==========

#[tokio::test]
async fn test_ipfs_endpoints() {
    let app = spawn_app().await;
    let (_, admin) = app.user(114, Role::Admin).await;
    let (_, donor) = app.user(115, Role::Donor).await;

    let (status, pinned) = app
        .post("/api/ipfs/json", &donor, json!({ "content": { "report": "week 1" } }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cid = pinned["data"]["cid"].as_str().unwrap().to_string();

    let (status, info) = app.get(&format!("/api/ipfs/{}", cid), &donor).await;
    assert_eq!(status, StatusCode::OK);
    assert!(info["data"]["gateway_url"].as_str().unwrap().ends_with(&cid));

    let upload = multipart_body(&[], Some(("map.pdf", "application/pdf", b"%PDF-1.4 map")));
    let (status, file) = app.send(multipart_request("/api/ipfs/upload", &donor, upload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["data"]["size"], 12);

    let (denied, _) = app
        .call(Method::DELETE, &format!("/api/ipfs/{}", cid), Some(&donor), None)
        .await;
    let (removed, _) = app
        .call(Method::DELETE, &format!("/api/ipfs/{}", cid), Some(&admin), None)
        .await;
    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(removed, StatusCode::OK);
}

