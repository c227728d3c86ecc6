//! # Authentication Data Transfer Objects
//!
//! ## Endpoints Using These DTOs
//!
//! - `POST /api/auth/register` - [`RegisterRequest`] -> [`AuthResponse`]
//! - `POST /api/auth/login` - [`LoginRequest`] -> [`AuthResponse`]
//! - `GET /api/auth/nonce/{wallet}` -> [`NonceResponse`]
//! - `POST /api/auth/wallet-login` - [`WalletLoginRequest`] -> [`AuthResponse`]
//! - `POST /api/auth/change-password` - [`ChangePasswordRequest`]
//! - `POST /api/auth/api-keys` - [`CreateApiKeyRequest`] -> [`CreatedApiKey`]
//!
//! ## Wallet Login Flow
//!
//! ```text
//! GET  /api/auth/nonce/9aE476sH92Vz7DMPyq5WLPkrKWivxeuTKEFKd2sZZcde
//!   -> {"wallet_address": "...", "nonce": "3f2a...", "message": "Sign in to ReliefLedger\n\nNonce: 3f2a..."}
//! POST /api/auth/wallet-login
//!   {"wallet_address": "...", "signature": "<base58 ed25519 signature of message>"}
//!   -> {"user": {...}, "token": "eyJ...", "expires_at": "..."}
//! ```
//!
//! The nonce rotates after every successful wallet login, so a captured
//! signature cannot be replayed.

use crate::model::store::enums::Role;
use crate::model::store::models::{ApiKey, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Self-service registration.
///
/// # Validation Rules (Server-Side)
///
/// - `wallet_address` must be a base58-encoded 32-byte public key
/// - `role` may only be `beneficiary` (default), `donor` or `vendor`
/// - `email` must be well-formed when present; `password` at least 8 characters
/// - wallet and email must be unique
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub wallet_address: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Password login. `identifier` is an email address or a wallet address.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletLoginRequest {
    pub wallet_address: String,
    /// Base58 ed25519 signature over the nonce message
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NonceResponse {
    pub wallet_address: String,
    pub nonce: String,
    /// Exact text the wallet must sign
    pub message: String,
}

/// Returned by register, login and wallet login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// `current_password` is required when the account already has a password.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub expires_in_days: Option<i64>,
}

/// A freshly created key. `key` is shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    #[serde(flatten)]
    pub api_key: ApiKey,
    pub key: String,
}
