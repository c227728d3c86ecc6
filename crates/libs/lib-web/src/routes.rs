//! # Route Table
//!
//! Every `/api` route. Each domain has a public router and a protected one;
//! the protected router carries `require_auth` as a route layer, so unmatched
//! paths still fall through to the 404 handler.
//!
//! Settings reads run under `optional_auth`: anonymous callers see public
//! settings, admins see everything.

use crate::handlers::{
    analytics, audit, auth, disasters, ipfs, notifications, proofs, settings, transactions, users,
    vendors, vouchers,
};
use crate::middleware::{optional_auth, require_auth};
use crate::server::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};

/// Request body ceiling for multipart uploads. The per-setting file limit is
/// checked by the handler.
pub const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// All `/api` routes, ready to merge into the application router.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/nonce/{wallet}", get(auth::nonce))
        .route("/api/auth/wallet-login", post(auth::wallet_login))
        // Disasters
        .route("/api/disasters", get(disasters::list_disasters))
        .route("/api/disasters/nearby", get(disasters::nearby_disasters))
        .route("/api/disasters/{id}", get(disasters::get_disaster))
        .route("/api/disasters/{id}/stats", get(disasters::disaster_stats))
        .route("/api/disasters/{id}/vendors", get(disasters::disaster_vendors));

    let optional = Router::new()
        .route("/api/settings", get(settings::list_settings))
        .route("/api/settings/{key}", get(settings::get_setting))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let uploads = Router::new()
        .route("/api/proofs", post(proofs::upload_proof))
        .route("/api/ipfs/upload", post(ipfs::upload_file))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let protected = Router::new()
        // Auth
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/sessions", get(auth::list_sessions))
        .route("/api/auth/sessions/{id}", delete(auth::revoke_session))
        .route("/api/auth/api-keys", post(auth::create_api_key).get(auth::list_api_keys))
        .route("/api/auth/api-keys/{id}", delete(auth::revoke_api_key))
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::get_me).put(users::update_me))
        .route("/api/users/{id}", get(users::get_user).delete(users::delete_user))
        .route("/api/users/{id}/role", put(users::set_role))
        .route("/api/users/{id}/verify", post(users::verify_user))
        .route("/api/users/{id}/status", put(users::set_status))
        // Disasters
        .route("/api/disasters", post(disasters::create_disaster))
        .route(
            "/api/disasters/{id}",
            put(disasters::update_disaster).delete(disasters::delete_disaster),
        )
        .route("/api/disasters/{id}/fund", post(disasters::fund_disaster))
        // Vendors
        .route("/api/vendors", post(vendors::register_vendor).get(vendors::list_vendors))
        .route("/api/vendors/me", get(vendors::my_vendor))
        .route("/api/vendors/{id}", get(vendors::get_vendor).put(vendors::update_vendor))
        .route("/api/vendors/{id}/approve", post(vendors::approve_vendor))
        .route("/api/vendors/{id}/suspend", post(vendors::suspend_vendor))
        .route("/api/vendors/{id}/transactions", get(vendors::vendor_transactions))
        // Vouchers
        .route("/api/vouchers", post(vouchers::issue_voucher).get(vouchers::list_vouchers))
        .route("/api/vouchers/mine", get(vouchers::my_vouchers))
        .route("/api/vouchers/code/{code}", get(vouchers::get_voucher_by_code))
        .route("/api/vouchers/{id}", get(vouchers::get_voucher))
        .route("/api/vouchers/{id}/revoke", post(vouchers::revoke_voucher))
        .route("/api/vouchers/{id}/redeem", post(vouchers::redeem_voucher))
        // Transactions
        .route("/api/transactions", post(transactions::redeem).get(transactions::list_transactions))
        .route("/api/transactions/{id}", get(transactions::get_transaction))
        .route("/api/transactions/{id}/chain", get(transactions::chain_lookup))
        .route("/api/transactions/{id}/status", patch(transactions::update_status))
        // Proofs
        .route("/api/proofs", get(proofs::list_proofs))
        .route("/api/proofs/transaction/{id}", get(proofs::proofs_for_transaction))
        .route("/api/proofs/{id}", get(proofs::get_proof))
        .route("/api/proofs/{id}/review", post(proofs::review_proof))
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/send", post(notifications::send_notification))
        .route("/api/notifications/{id}", delete(notifications::delete_notification))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        // Analytics
        .route("/api/analytics/overview", get(analytics::overview))
        .route("/api/analytics/disasters/{id}", get(analytics::disaster_breakdown))
        .route("/api/analytics/top-vendors", get(analytics::top_vendors))
        .route("/api/analytics/timeseries", get(analytics::timeseries))
        // Audit
        .route("/api/audit", get(audit::list_audit_logs))
        .route("/api/audit/{entity_type}/{entity_id}", get(audit::entity_history))
        // Settings
        .route("/api/settings/cache/stats", get(settings::cache_stats))
        .route("/api/settings/cache", delete(settings::invalidate_cache))
        .route(
            "/api/settings/{key}",
            put(settings::upsert_setting).delete(settings::delete_setting),
        )
        // IPFS
        .route("/api/ipfs/json", post(ipfs::pin_json))
        .route("/api/ipfs/{cid}", get(ipfs::gateway_info).delete(ipfs::unpin))
        .merge(uploads)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(optional).merge(protected)
}
