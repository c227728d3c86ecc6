//! # Authentication Handlers
//!
//! ## Overview
//!
//! - Registration with a wallet address (and optionally email/password)
//! - Password login by email or wallet address
//! - Wallet login: sign the nonce message with the wallet's Ed25519 key
//! - Session management and personal API keys
//!
//! Every successful login opens a `sessions` row; the returned JWT is only
//! accepted while that session is unrevoked and unexpired.
//!
//! ## Example
//!
//! ```text
//! POST /api/auth/register {"wallet_address": "...", "name": "Amina", "role": "beneficiary"}
//!   -> 201 {"success": true, "data": {"user": {...}, "token": "eyJ...", "expires_at": "..."}}
//! ```

use crate::handlers::{client_info, created, invalid, ok, ok_with, ApiResult, Created};
use crate::server::AppState;
use crate::services::{AuditService, SessionService};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use lib_auth::{
    generate_api_key, hash_password, login_message, validate_wallet_address,
    verify_password, verify_wallet_signature,
};
use lib_core::dto::{
    AuthResponse, ChangePasswordRequest, CreateApiKeyRequest, CreatedApiKey, LoginRequest,
    NonceResponse, RegisterRequest, WalletLoginRequest,
};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::{ApiKey, Session, User, UserForCreate};
use lib_core::model::store::{ApiKeyRepository, SessionRepository, UserRepository};
use lib_core::{AppError, Ctx, Result};
use lib_utils::{days_from_now, validate_email, validate_not_empty, validate_phone};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

const MAX_API_KEY_DAYS: i64 = 3650;

/// Register a new account and open a session.
///
/// # Validation
///
/// - `wallet_address` must decode to a 32-byte Ed25519 key
/// - `role` limited to beneficiary (default), donor or vendor
/// - `email` well-formed, `password` at least 8 characters
/// - wallet and email unique (409)
#[instrument(skip(state, headers, req), fields(wallet = %req.wallet_address))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Created<AuthResponse> {
    info!("[REGISTER] New registration request");

    let wallet_address = req.wallet_address.trim().to_string();
    validate_wallet_address(&wallet_address)?;
    validate_not_empty(&req.name, "name").map_err(invalid)?;

    let role = req.role.unwrap_or(Role::Beneficiary);
    if !role.is_self_assignable() {
        warn!("[REGISTER] Rejected self-assigned role {}", role);
        return Err(AppError::InvalidInput(format!("Role '{}' cannot be self-assigned", role)));
    }

    let email = normalize_email(req.email)?;
    let phone = normalize_phone(req.phone)?;

    if UserRepository::find_by_wallet(&state.db, &wallet_address).await?.is_some() {
        warn!("[REGISTER] Wallet already registered");
        return Err(AppError::Conflict("Wallet address already registered".to_string()));
    }
    if let Some(email) = &email {
        if UserRepository::find_by_email(&state.db, email).await?.is_some() {
            warn!("[REGISTER] Email already registered: {}", email);
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
    }

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = UserRepository::create(
        &state.db,
        &UserForCreate {
            wallet_address,
            name: req.name.trim().to_string(),
            email,
            phone,
            password_hash,
            role,
        },
    )
    .await?;
    info!("[REGISTER] Created user {} as {}", user.id, user.role);

    let client = client_info(&headers);
    let ctx = Ctx { client_ip: client.ip_address.clone(), ..Ctx::new(user.id, user.role) };
    AuditService::record(&state.db, &ctx, "user.register", "user", user.id, json!({ "role": user.role })).await;

    let auth = SessionService::issue(&state.db, &state.config, user, &client).await?;
    created(auth, "Registration successful")
}

/// Password login. `identifier` is an email address or a wallet address.
#[instrument(skip(state, headers, req))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let identifier = req.identifier.trim();
    let user = if identifier.contains('@') {
        UserRepository::find_by_email(&state.db, &identifier.to_lowercase()).await?
    } else {
        UserRepository::find_by_wallet(&state.db, identifier).await?
    };

    let user = user.ok_or_else(|| {
        warn!("[LOGIN] Unknown identifier");
        AppError::Unauthorized("Invalid credentials".to_string())
    })?;

    let hash = user.password_hash.as_deref().ok_or_else(|| {
        warn!("[LOGIN] User {} has no password set", user.id);
        AppError::Unauthorized("Password login is not enabled for this account".to_string())
    })?;

    if !verify_password(&req.password, hash)? {
        warn!("[LOGIN] Wrong password for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_active {
        warn!("[LOGIN] Inactive user {}", user.id);
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    UserRepository::update_last_login(&state.db, user.id).await?;
    info!("[LOGIN] User {} logged in", user.id);

    let auth = SessionService::issue(&state.db, &state.config, user, &client_info(&headers)).await?;
    ok_with(auth, "Login successful")
}

/// Current nonce and the exact message the wallet must sign.
pub async fn nonce(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<NonceResponse> {
    let user = UserRepository::find_by_wallet(&state.db, wallet.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Wallet not registered".to_string()))?;

    let message = login_message(&user.nonce);
    ok(NonceResponse { wallet_address: user.wallet_address, nonce: user.nonce, message })
}

/// Login with an Ed25519 signature over the nonce message.
///
/// The nonce rotates after a successful login, so a signature is single-use.
#[instrument(skip(state, headers, req), fields(wallet = %req.wallet_address))]
pub async fn wallet_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WalletLoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = UserRepository::find_by_wallet(&state.db, req.wallet_address.trim())
        .await?
        .ok_or_else(|| {
            warn!("[WALLET LOGIN] Unknown wallet");
            AppError::Unauthorized("Invalid wallet credentials".to_string())
        })?;

    let message = login_message(&user.nonce);
    verify_wallet_signature(&user.wallet_address, &message, req.signature.trim()).map_err(|e| {
        warn!("[WALLET LOGIN] Signature rejected for user {}: {}", user.id, e);
        AppError::Unauthorized("Invalid wallet signature".to_string())
    })?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    UserRepository::rotate_nonce(&state.db, user.id).await?;
    UserRepository::update_last_login(&state.db, user.id).await?;
    info!("[WALLET LOGIN] User {} logged in", user.id);

    let auth = SessionService::issue(&state.db, &state.config, user, &client_info(&headers)).await?;
    ok_with(auth, "Login successful")
}

/// Revoke the session behind the current token.
pub async fn logout(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<()> {
    let session_id = ctx.session_id.as_deref().ok_or_else(|| {
        AppError::InvalidInput("Logout requires a session token; revoke the API key instead".to_string())
    })?;

    SessionRepository::revoke(&state.db, session_id, ctx.user_id).await?;
    info!("[LOGOUT] Session {} revoked", session_id);
    ok_with((), "Logged out")
}

pub async fn me(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<User> {
    let user = UserRepository::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    ok(user)
}

/// Set or change the password. Other sessions are revoked.
#[instrument(skip(state, ctx, req), fields(user_id = ctx.user_id))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Value> {
    let user = UserRepository::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(hash) = user.password_hash.as_deref() {
        let current = req
            .current_password
            .as_deref()
            .ok_or_else(|| AppError::InvalidInput("current_password is required".to_string()))?;
        if !verify_password(current, hash)? {
            warn!("[PASSWORD] Wrong current password for user {}", user.id);
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }
    }

    let new_hash = hash_password(&req.new_password)?;
    UserRepository::set_password(&state.db, user.id, &new_hash).await?;

    let revoked = SessionRepository::revoke_all_for_user(&state.db, user.id, ctx.session_id.as_deref()).await?;
    info!("[PASSWORD] User {} changed password, {} other sessions revoked", user.id, revoked);

    AuditService::record(&state.db, &ctx, "user.change_password", "user", user.id, json!({ "revoked_sessions": revoked })).await;
    ok_with(json!({ "revoked_sessions": revoked }), "Password updated")
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
) -> ApiResult<Vec<Session>> {
    ok(SessionRepository::list_active_for_user(&state.db, ctx.user_id).await?)
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if SessionRepository::revoke(&state.db, &id, ctx.user_id).await? == 0 {
        return Err(AppError::NotFound("Session not found".to_string()));
    }
    debug!("[SESSION] User {} revoked session {}", ctx.user_id, id);
    ok_with((), "Session revoked")
}

/// Create a personal API key. The raw key is only returned here.
#[instrument(skip(state, ctx, req), fields(user_id = ctx.user_id))]
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Created<CreatedApiKey> {
    validate_not_empty(&req.name, "name").map_err(invalid)?;

    let expires_at = match req.expires_in_days {
        Some(days) if !(1..=MAX_API_KEY_DAYS).contains(&days) => {
            return Err(AppError::InvalidInput(format!(
                "expires_in_days must be between 1 and {}",
                MAX_API_KEY_DAYS
            )))
        }
        Some(days) => Some(days_from_now(days)),
        None => None,
    };

    let generated = generate_api_key();
    let api_key = ApiKeyRepository::create(
        &state.db,
        ctx.user_id,
        req.name.trim(),
        &generated.prefix,
        &generated.hash,
        expires_at,
    )
    .await?;
    info!("[API KEY] Created key {} ({}) for user {}", api_key.id, api_key.key_prefix, ctx.user_id);

    AuditService::record(&state.db, &ctx, "api_key.create", "api_key", api_key.id, json!({ "name": api_key.name })).await;
    created(CreatedApiKey { api_key, key: generated.raw }, "Store this key now; it will not be shown again")
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
) -> ApiResult<Vec<ApiKey>> {
    ok(ApiKeyRepository::list_for_user(&state.db, ctx.user_id).await?)
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    if ApiKeyRepository::revoke(&state.db, id, ctx.user_id).await? == 0 {
        return Err(AppError::NotFound("API key not found".to_string()));
    }
    AuditService::record(&state.db, &ctx, "api_key.revoke", "api_key", id, json!({})).await;
    ok_with((), "API key revoked")
}

// region: --- Field normalization

/// Trimmed, lowercased and validated email; blank means none.
pub(crate) fn normalize_email(email: Option<String>) -> Result<Option<String>> {
    match email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()) {
        Some(email) => {
            validate_email(&email).map_err(invalid)?;
            Ok(Some(email))
        }
        None => Ok(None),
    }
}

pub(crate) fn normalize_phone(phone: Option<String>) -> Result<Option<String>> {
    match phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        Some(phone) => {
            validate_phone(&phone).map_err(invalid)?;
            Ok(Some(phone))
        }
        None => Ok(None),
    }
}

// endregion: --- Field normalization
