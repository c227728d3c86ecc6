//! # Authentication Middleware
//!
//! Resolves the caller of a request into a [`Ctx`] and injects it into the
//! request extensions.
//!
//! Two credentials are accepted:
//!
//! - `Authorization: Bearer <jwt>`: the token's session (`sid`) must belong to
//!   the same user and be neither revoked nor expired
//! - `X-API-Key: <key>`: looked up by SHA-256 digest; must be unrevoked and
//!   unexpired
//!
//! In both cases the user is re-read from the database, so a role change or a
//! deactivation takes effect on the next request. A missing user is 401, an
//! inactive one 403.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/auth/me", get(handlers::auth::me))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```
//!
//! Handlers then extract `Extension<Ctx>`. Routes that serve both anonymous and
//! signed-in callers use [`optional_auth`] and extract `Extension<OptionalCtx>`.

use crate::middleware::mw_logging::client_ip;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use lib_auth::{decode_jwt, hash_api_key};
use lib_core::model::store::models::User;
use lib_core::model::store::{ApiKeyRepository, SessionRepository, UserRepository};
use lib_core::{AppError, Ctx, Result};
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Caller context on routes where authentication is optional.
#[derive(Clone, Debug)]
pub struct OptionalCtx(pub Option<Ctx>);

/// Reject the request with 401 unless valid credentials are present.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let ctx = resolve_ctx(&state, req.headers()).await?.ok_or_else(|| {
        warn!("[AUTH] Missing credentials for {}", req.uri().path());
        AppError::Unauthorized("Authentication required".to_string())
    })?;

    debug!("[AUTH] Authenticated user {} ({})", ctx.user_id, ctx.role);
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Resolve credentials when present. Anonymous requests pass through;
/// invalid credentials are still rejected.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let ctx = resolve_ctx(&state, req.headers()).await?;
    req.extensions_mut().insert(OptionalCtx(ctx));
    Ok(next.run(req).await)
}

async fn resolve_ctx(state: &AppState, headers: &HeaderMap) -> Result<Option<Ctx>> {
    if let Some(raw_key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return ctx_from_api_key(state, raw_key.trim(), headers).await.map(Some);
    }

    let Some(auth_header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
        return Ok(None);
    };

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("[AUTH] Invalid Authorization header format");
        AppError::Unauthorized("Invalid Authorization header format".to_string())
    })?;

    let claims = decode_jwt(token.trim(), &state.config.jwt_secret).map_err(|e| {
        warn!("[AUTH] JWT validation failed: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;
    let user_id = claims.user_id()?;

    let session = SessionRepository::find_by_id(&state.db, &claims.sid)
        .await?
        .filter(|s| s.user_id == user_id && s.is_active(Utc::now()))
        .ok_or_else(|| {
            warn!("[AUTH] Session {} is revoked, expired or foreign", claims.sid);
            AppError::Unauthorized("Session expired or revoked".to_string())
        })?;

    let user = load_active_user(state, user_id).await?;

    if let Err(e) = SessionRepository::touch(&state.db, &session.id).await {
        warn!("[AUTH] Could not touch session {}: {}", session.id, e);
    }

    Ok(Some(Ctx {
        user_id: user.id,
        role: user.role,
        session_id: Some(session.id),
        api_key_id: None,
        client_ip: client_ip(headers),
    }))
}

async fn ctx_from_api_key(state: &AppState, raw_key: &str, headers: &HeaderMap) -> Result<Ctx> {
    let api_key = ApiKeyRepository::find_by_hash(&state.db, &hash_api_key(raw_key))
        .await?
        .ok_or_else(|| {
            warn!("[AUTH] Unknown API key");
            AppError::Unauthorized("Invalid API key".to_string())
        })?;

    if !api_key.is_usable(Utc::now()) {
        warn!("[AUTH] API key {} is revoked or expired", api_key.id);
        return Err(AppError::Unauthorized("API key expired or revoked".to_string()));
    }

    let user = load_active_user(state, api_key.user_id).await?;

    if let Err(e) = ApiKeyRepository::touch(&state.db, api_key.id).await {
        warn!("[AUTH] Could not touch API key {}: {}", api_key.id, e);
    }

    Ok(Ctx {
        user_id: user.id,
        role: user.role,
        session_id: None,
        api_key_id: Some(api_key.id),
        client_ip: client_ip(headers),
    })
}

async fn load_active_user(state: &AppState, user_id: i64) -> Result<User> {
    let user = UserRepository::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_active {
        warn!("[AUTH] Rejected inactive user {}", user.id);
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }
    Ok(user)
}
