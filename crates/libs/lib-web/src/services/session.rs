//! # Session Service
//!
//! Every login creates a `sessions` row; the JWT carries its id in `sid` so a
//! logout or password change can revoke the token before it expires.

use chrono::{Duration, Utc};
use lib_auth::encode_jwt;
use lib_core::dto::AuthResponse;
use lib_core::model::store::models::User;
use lib_core::model::store::SessionRepository;
use lib_core::{Config, DbPool, Result};
use tracing::{debug, instrument};

/// Client details stored with a session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

pub struct SessionService;

impl SessionService {
    /// Open a session for `user` and sign a token for it.
    #[instrument(skip(pool, config, user, client), fields(user_id = user.id))]
    pub async fn issue(
        pool: &DbPool,
        config: &Config,
        user: User,
        client: &ClientInfo,
    ) -> Result<AuthResponse> {
        let expires_at = Utc::now() + Duration::hours(config.jwt_expiration_hours);
        let session = SessionRepository::create(
            pool,
            user.id,
            client.user_agent.as_deref(),
            client.ip_address.as_deref(),
            expires_at,
        )
        .await?;

        let token = encode_jwt(
            user.id,
            &user.wallet_address,
            user.role.as_str(),
            &session.id,
            &config.jwt_secret,
            config.jwt_expiration_hours,
        )?;
        debug!("[SESSION] Opened session {} for user {}", session.id, user.id);

        Ok(AuthResponse { user, token, expires_at })
    }
}
