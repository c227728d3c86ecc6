//! Disasters, vendors, vouchers, redemptions and reversals.

use super::{spawn_app, TestApp};
use axum::http::{Method, StatusCode};
use lib_core::model::store::enums::Role;
use crate::services::MAX_AMOUNT;
use lib_core::model::store::DisasterRepository;
use serde_json::{json, Value};

/// Staff issues a voucher; returns the response body's `data`.
async fn issue(app: &TestApp, staff: &str, beneficiary_id: i64, disaster_id: i64, amount: i64) -> (StatusCode, Value) {
    let (status, body) = app
        .post(
            "/api/vouchers",
            staff,
            json!({
                "beneficiary_id": beneficiary_id,
                "disaster_id": disaster_id,
                "amount": amount,
                "allowed_categories": ["Food", "water"]
            }),
        )
        .await;
    (status, body["data"].clone())
}

// ========== Disasters ==========

#[tokio::test]
async fn test_create_disaster_requires_manager_role() {
    // Arrange
    let app = spawn_app().await;
    let (_, beneficiary) = app.user(30, Role::Beneficiary).await;
    let (_, government) = app.user(31, Role::Government).await;
    let request = json!({
        "name": "Coastal Cyclone",
        "location": "Delta",
        "latitude": 21.5,
        "longitude": 89.9,
        "severity": "critical",
        "funding_goal": 500_000
    });

    // Act
    let (denied, _) = app.post("/api/disasters", &beneficiary, request.clone()).await;
    let (status, body) = app.post("/api/disasters", &government, request).await;

    // Assert
    assert_eq!(denied, StatusCode::FORBIDDEN);
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["severity"], "critical");
    assert_eq!(body["data"]["total_funding"], 0);
}

#[tokio::test]
async fn test_public_disaster_reads() {
    let app = spawn_app().await;
    let (admin, _) = app.user(32, Role::Admin).await;
    let id = app.disaster(admin.id, 1_000).await;

    let (status, list) = app.call(Method::GET, "/api/disasters", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"]["pagination"]["total"], 1);

    let (status, one) = app.call(Method::GET, &format!("/api/disasters/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["data"]["total_funding"], 1_000);

    let (status, _) = app.call(Method::GET, "/api/disasters/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nearby_disasters_sorted_by_distance() {
    // Arrange
    let app = spawn_app().await;
    let (_, government) = app.user(33, Role::Government).await;
    for (name, lat) in [("Far", 10.5), ("Near", 10.05), ("Outside", 30.0)] {
        app.post(
            "/api/disasters",
            &government,
            json!({ "name": name, "location": "Valley", "latitude": lat, "longitude": 20.0 }),
        )
        .await;
    }

    // Act
    let (status, body) = app
        .call(Method::GET, "/api/disasters/nearby?lat=10.0&lng=20.0&radius_km=100", None, None)
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Near", "Far"]);
    assert!(body["data"][0]["distance_km"].as_f64().unwrap() < 10.0);
}

#[tokio::test]
async fn test_nearby_rejects_bad_radius() {
    let app = spawn_app().await;

    let (status, _) = app
        .call(Method::GET, "/api/disasters/nearby?lat=0&lng=0&radius_km=-5", None, None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fund_disaster_updates_totals() {
    // Arrange
    let app = spawn_app().await;
    let (admin, _) = app.user(34, Role::Admin).await;
    let (_, donor) = app.user(35, Role::Donor).await;
    let id = app.disaster(admin.id, 0).await;

    // Warm the cache so the write has something to invalidate
    app.call(Method::GET, &format!("/api/disasters/{}", id), None, None).await;

    // Act
    let (status, body) = app
        .post(&format!("/api/disasters/{}/fund", id), &donor, json!({ "amount": 2_500 }))
        .await;
    let (zero, _) = app
        .post(&format!("/api/disasters/{}/fund", id), &donor, json!({ "amount": 0 }))
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["disaster"]["total_funding"], 2_500);
    assert!(body["data"]["receipt"]["tx_hash"].as_str().is_some());
    assert_eq!(zero, StatusCode::BAD_REQUEST);

    let (_, fresh) = app.call(Method::GET, &format!("/api/disasters/{}", id), None, None).await;
    assert_eq!(fresh["data"]["total_funding"], 2_500);
}

#[tokio::test]
async fn test_fund_rejects_amounts_that_would_overflow() {
    // Arrange
    let app = spawn_app().await;
    let (admin, _) = app.user(116, Role::Admin).await;
    let (_, donor) = app.user(117, Role::Donor).await;
    let id = app.disaster(admin.id, 0).await;
    let uri = format!("/api/disasters/{}/fund", id);

    // Act
    let (too_large, body) = app.post(&uri, &donor, json!({ "amount": i64::MAX })).await;
    let (at_cap, _) = app.post(&uri, &donor, json!({ "amount": MAX_AMOUNT })).await;

    DisasterRepository::add_funding(&app.state.db, id, i64::MAX - MAX_AMOUNT - 5)
        .await
        .unwrap()
        .unwrap();
    let (full, _) = app.post(&uri, &donor, json!({ "amount": 10 })).await;
    let (read, disaster) = app.call(Method::GET, &format!("/api/disasters/{}", id), None, None).await;

    // Assert
    assert_eq!(too_large, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidInput");
    assert_eq!(at_cap, StatusCode::OK);
    assert_eq!(full, StatusCode::BAD_REQUEST);
    assert_eq!(read, StatusCode::OK);
    assert_eq!(disaster["data"]["total_funding"], i64::MAX - 5);
}

#[tokio::test]
async fn test_resolved_disaster_rejects_funding() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(36, Role::Admin).await;
    let (_, donor) = app.user(37, Role::Donor).await;
    let id = app.disaster(admin.id, 0).await;

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/disasters/{}", id),
            Some(&admin_token),
            Some(json!({ "status": "resolved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&format!("/api/disasters/{}/fund", id), &donor, json!({ "amount": 100 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_disaster_with_vendors_conflicts() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(38, Role::Admin).await;
    let (vendor_user, _) = app.user(39, Role::Vendor).await;
    let busy = app.disaster(admin.id, 0).await;
    let empty = app.disaster(admin.id, 0).await;
    app.approved_vendor(&vendor_user, busy, admin.id).await;

    // Act
    let (conflict, _) = app
        .call(Method::DELETE, &format!("/api/disasters/{}", busy), Some(&admin_token), None)
        .await;
    let (deleted, _) = app
        .call(Method::DELETE, &format!("/api/disasters/{}", empty), Some(&admin_token), None)
        .await;

    // Assert
    assert_eq!(conflict, StatusCode::CONFLICT);
    assert_eq!(deleted, StatusCode::OK);
}

// ========== Vendors ==========

#[tokio::test]
async fn test_vendor_registration_and_approval() {
    // Arrange
    let app = spawn_app().await;
    let (admin, _) = app.user(40, Role::Admin).await;
    let (_, ngo) = app.user(41, Role::Ngo).await;
    let (vendor_user, vendor_token) = app.user(42, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 0).await;

    // Act
    let (status, body) = app
        .post(
            "/api/vendors",
            &vendor_token,
            json!({ "disaster_id": disaster_id, "business_name": "Water Point", "category": "WATER" }),
        )
        .await;
    let vendor_id = body["data"]["id"].as_i64().unwrap();
    let (duplicate, _) = app
        .post(
            "/api/vendors",
            &vendor_token,
            json!({ "disaster_id": disaster_id, "business_name": "Again", "category": "water" }),
        )
        .await;
    let (self_approve, _) = app
        .call(Method::POST, &format!("/api/vendors/{}/approve", vendor_id), Some(&vendor_token), None)
        .await;
    let (approved, approved_body) = app
        .call(Method::POST, &format!("/api/vendors/{}/approve", vendor_id), Some(&ngo), None)
        .await;
    let (again, _) = app
        .call(Method::POST, &format!("/api/vendors/{}/approve", vendor_id), Some(&ngo), None)
        .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["category"], "water");
    assert_eq!(body["data"]["wallet_address"], vendor_user.wallet_address);
    assert_eq!(duplicate, StatusCode::CONFLICT);
    assert_eq!(self_approve, StatusCode::FORBIDDEN);
    assert_eq!(approved, StatusCode::OK);
    assert_eq!(approved_body["data"]["status"], "approved");
    assert_eq!(again, StatusCode::CONFLICT);

    let (_, listed) = app
        .call(Method::GET, &format!("/api/disasters/{}/vendors", disaster_id), None, None)
        .await;
    assert_eq!(listed["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_beneficiary_cannot_register_vendor() {
    let app = spawn_app().await;
    let (admin, _) = app.user(43, Role::Admin).await;
    let (_, beneficiary) = app.user(44, Role::Beneficiary).await;
    let disaster_id = app.disaster(admin.id, 0).await;

    let (status, _) = app
        .post(
            "/api/vendors",
            &beneficiary,
            json!({ "disaster_id": disaster_id, "business_name": "Shop", "category": "food" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ========== Vouchers ==========

#[tokio::test]
async fn test_issue_voucher_allocates_funds() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(45, Role::Admin).await;
    let (beneficiary, beneficiary_token) = app.user(46, Role::Beneficiary).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;

    // Act
    let (status, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 600).await;
    let (over, _) = issue(&app, &admin_token, beneficiary.id, disaster_id, 500).await;
    let (denied, _) = issue(&app, &beneficiary_token, beneficiary.id, disaster_id, 10).await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(voucher["amount"], 600);
    assert_eq!(voucher["remaining_amount"], 600);
    assert_eq!(voucher["status"], "active");
    assert_eq!(voucher["allowed_categories"], json!(["food", "water"]));
    assert_eq!(over, StatusCode::CONFLICT);
    assert_eq!(denied, StatusCode::FORBIDDEN);

    let disaster = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(disaster.total_allocated, 600);

    let (_, mine) = app.get("/api/vouchers/mine", &beneficiary_token).await;
    assert_eq!(mine["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_issue_voucher_rejects_oversized_amount() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(118, Role::Admin).await;
    let (beneficiary, _) = app.user(119, Role::Beneficiary).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;

    let (status, _) = issue(&app, &admin_token, beneficiary.id, disaster_id, MAX_AMOUNT + 1).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let disaster = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(disaster.total_allocated, 0);
}

#[tokio::test]
async fn test_voucher_only_visible_to_owner_or_staff() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(47, Role::Admin).await;
    let (beneficiary, owner) = app.user(48, Role::Beneficiary).await;
    let (_, stranger) = app.user(49, Role::Beneficiary).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 100).await;
    let uri = format!("/api/vouchers/{}", voucher["id"]);

    assert_eq!(app.get(&uri, &owner).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, &admin_token).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, &stranger).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_redeem_voucher_by_code() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(50, Role::Admin).await;
    let (beneficiary, beneficiary_token) = app.user(51, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(52, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    let vendor = app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 300).await;
    let code = voucher["code"].as_str().unwrap().to_string();

    // Act
    let (status, body) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": code, "amount": 120, "description": "rice" }),
        )
        .await;
    let (too_much, _) = app
        .post("/api/transactions", &vendor_token, json!({ "voucher_code": code, "amount": 500 }))
        .await;
    let (bad_category, _) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": code, "amount": 10, "category": "fuel" }),
        )
        .await;
    let (not_vendor, _) = app
        .post("/api/transactions", &beneficiary_token, json!({ "voucher_code": code, "amount": 10 }))
        .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["transaction"]["status"], "confirmed");
    assert_eq!(body["data"]["transaction"]["category"], "food");
    assert_eq!(body["data"]["voucher"]["remaining_amount"], 180);
    assert_eq!(
        body["data"]["transaction"]["tx_hash"],
        body["data"]["receipt"]["tx_hash"]
    );
    assert_eq!(too_much, StatusCode::BAD_REQUEST);
    assert_eq!(bad_category, StatusCode::BAD_REQUEST);
    assert_eq!(not_vendor, StatusCode::FORBIDDEN);

    let disaster = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(disaster.total_disbursed, 120);

    let (_, vendor_view) = app.get(&format!("/api/vendors/{}", vendor.id), &vendor_token).await;
    assert_eq!(vendor_view["data"]["total_redeemed"], 120);

    // Issue and redemption notices
    let (_, unread) = app.get("/api/notifications/unread-count", &beneficiary_token).await;
    assert_eq!(unread["data"]["unread"], 2);

    let (_, mine) = app.get("/api/transactions", &beneficiary_token).await;
    assert_eq!(mine["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_full_redemption_marks_voucher_used() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(53, Role::Admin).await;
    let (beneficiary, _) = app.user(54, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(55, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 200).await;
    let uri = format!("/api/vouchers/{}/redeem", voucher["id"]);

    let (status, body) = app.post(&uri, &vendor_token, json!({ "amount": 200 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["voucher"]["status"], "used");
    assert_eq!(body["data"]["voucher"]["remaining_amount"], 0);

    let (again, response) = app.post(&uri, &vendor_token, json!({ "amount": 1 })).await;
    assert_eq!(again, StatusCode::CONFLICT);
    assert_eq!(response["code"], "Conflict");
}

#[tokio::test]
async fn test_revoked_voucher_cannot_be_redeemed() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(56, Role::Admin).await;
    let (beneficiary, _) = app.user(57, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(58, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 400).await;

    // Act
    let (status, revoked) = app
        .call(
            Method::POST,
            &format!("/api/vouchers/{}/revoke", voucher["id"]),
            Some(&admin_token),
            None,
        )
        .await;
    let (redeem, _) = app
        .post(
            &format!("/api/vouchers/{}/redeem", voucher["id"]),
            &vendor_token,
            json!({ "amount": 10 }),
        )
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["data"]["released_amount"], 400);
    assert_eq!(redeem, StatusCode::CONFLICT);

    let disaster = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(disaster.total_allocated, 0);
}

#[tokio::test]
async fn test_expired_voucher_cannot_be_redeemed() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(59, Role::Admin).await;
    let (beneficiary, _) = app.user(60, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(61, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 100).await;

    sqlx::query("UPDATE vouchers SET expires_at = ? WHERE id = ?")
        .bind(chrono::Utc::now() - chrono::Duration::days(1))
        .bind(voucher["id"].as_i64().unwrap())
        .execute(&app.state.db)
        .await
        .unwrap();

    let (status, body) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["code"], "amount": 10 }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Voucher has expired");
}

#[tokio::test]
async fn test_vendor_outside_disaster_cannot_redeem() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(62, Role::Admin).await;
    let (beneficiary, _) = app.user(63, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(64, Role::Vendor).await;
    let voucher_disaster = app.disaster(admin.id, 1_000).await;
    let other_disaster = app.disaster(admin.id, 0).await;
    app.approved_vendor(&vendor_user, other_disaster, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, voucher_disaster, 100).await;

    let (status, _) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["code"], "amount": 10 }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ========== Transactions ==========

#[tokio::test]
async fn test_failed_transaction_is_reversed() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(65, Role::Admin).await;
    let (beneficiary, _) = app.user(66, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(67, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    let vendor = app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 250).await;
    let (_, redeemed) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["code"], "amount": 250 }),
        )
        .await;
    let tx_id = redeemed["data"]["transaction"]["id"].as_i64().unwrap();
    let status_uri = format!("/api/transactions/{}/status", tx_id);

    // Act
    let (direct, _) = app
        .call(Method::PATCH, &status_uri, Some(&admin_token), Some(json!({ "status": "failed" })))
        .await;
    let (flagged, _) = app
        .call(Method::PATCH, &status_uri, Some(&admin_token), Some(json!({ "status": "flagged" })))
        .await;
    let (failed, body) = app
        .call(
            Method::PATCH,
            &status_uri,
            Some(&admin_token),
            Some(json!({ "status": "failed", "reason": "duplicate charge" })),
        )
        .await;

    // Assert
    assert_eq!(direct, StatusCode::CONFLICT);
    assert_eq!(flagged, StatusCode::OK);
    assert_eq!(failed, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");

    let (_, voucher_view) = app
        .get(&format!("/api/vouchers/{}", voucher["id"]), &admin_token)
        .await;
    assert_eq!(voucher_view["data"]["remaining_amount"], 250);
    assert_eq!(voucher_view["data"]["status"], "active");

    let disaster = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(disaster.total_disbursed, 0);

    let (_, vendor_view) = app.get(&format!("/api/vendors/{}", vendor.id), &admin_token).await;
    assert_eq!(vendor_view["data"]["total_redeemed"], 0);

    let (terminal, _) = app
        .call(Method::PATCH, &status_uri, Some(&admin_token), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(terminal, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_transaction_on_revoked_voucher_releases_allocation() {
    // Arrange
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(120, Role::Admin).await;
    let (beneficiary, _) = app.user(121, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(122, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    let vendor = app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 400).await;
    let (_, redeemed) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["code"], "amount": 150 }),
        )
        .await;
    let tx_id = redeemed["data"]["transaction"]["id"].as_i64().unwrap();
    let (revoked, _) = app
        .call(
            Method::POST,
            &format!("/api/vouchers/{}/revoke", voucher["id"]),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(revoked, StatusCode::OK);

    let before = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(before.total_allocated, 150);
    assert_eq!(before.total_disbursed, 150);

    // Act
    let status_uri = format!("/api/transactions/{}/status", tx_id);
    app.call(Method::PATCH, &status_uri, Some(&admin_token), Some(json!({ "status": "flagged" })))
        .await;
    let (failed, _) = app
        .call(Method::PATCH, &status_uri, Some(&admin_token), Some(json!({ "status": "failed" })))
        .await;

    // Assert
    assert_eq!(failed, StatusCode::OK);

    let after = DisasterRepository::find_by_id(&app.state.db, disaster_id).await.unwrap().unwrap();
    assert_eq!(after.total_allocated, 0);
    assert_eq!(after.total_disbursed, 0);
    assert_eq!(after.total_funding, 1_000);

    let (_, voucher_view) = app
        .get(&format!("/api/vouchers/{}", voucher["id"]), &admin_token)
        .await;
    assert_eq!(voucher_view["data"]["status"], "revoked");
    assert_eq!(voucher_view["data"]["remaining_amount"], 250);

    let (_, vendor_view) = app.get(&format!("/api/vendors/{}", vendor.id), &admin_token).await;
    assert_eq!(vendor_view["data"]["total_redeemed"], 0);
}

#[tokio::test]
async fn test_transaction_visibility_and_chain_lookup() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(68, Role::Admin).await;
    let (beneficiary, beneficiary_token) = app.user(69, Role::Beneficiary).await;
    let (_, stranger) = app.user(70, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(71, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 100).await;
    let (_, redeemed) = app
        .post(
            "/api/transactions",
            &vendor_token,
            json!({ "voucher_code": voucher["code"], "amount": 40 }),
        )
        .await;
    let tx_id = redeemed["data"]["transaction"]["id"].as_i64().unwrap();
    let uri = format!("/api/transactions/{}", tx_id);

    assert_eq!(app.get(&uri, &beneficiary_token).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, &vendor_token).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, &stranger).await.0, StatusCode::FORBIDDEN);

    let (status, chain) = app.get(&format!("{}/chain", uri), &vendor_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chain["data"]["transaction_id"], tx_id);
    assert!(chain["data"]["tx_hash"].as_str().is_some());

    let (_, vendor_list) = app.get("/api/transactions", &vendor_token).await;
    assert_eq!(vendor_list["data"]["pagination"]["total"], 1);
    let (_, stranger_list) = app.get("/api/transactions", &stranger).await;
    assert_eq!(stranger_list["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_disaster_stats_reflect_activity() {
    let app = spawn_app().await;
    let (admin, admin_token) = app.user(72, Role::Admin).await;
    let (beneficiary, _) = app.user(73, Role::Beneficiary).await;
    let (vendor_user, vendor_token) = app.user(74, Role::Vendor).await;
    let disaster_id = app.disaster(admin.id, 1_000).await;
    app.approved_vendor(&vendor_user, disaster_id, admin.id).await;
    let (_, voucher) = issue(&app, &admin_token, beneficiary.id, disaster_id, 500).await;
    app.post(
        "/api/transactions",
        &vendor_token,
        json!({ "voucher_code": voucher["code"], "amount": 200 }),
    )
    .await;

    let (status, stats) = app
        .call(Method::GET, &format!("/api/disasters/{}/stats", disaster_id), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["total_funding"], 1_000);
    assert_eq!(stats["data"]["total_allocated"], 500);
    assert_eq!(stats["data"]["total_disbursed"], 200);
    assert_eq!(stats["data"]["unallocated"], 500);
    assert_eq!(stats["data"]["vouchers"]["active"], 1);
    assert_eq!(stats["data"]["approved_vendors"], 1);
    assert_eq!(stats["data"]["transactions"], 1);
}
