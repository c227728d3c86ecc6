//! # Request Context
//!
//! The authenticated caller of a request. Built by the auth middleware and read
//! by handlers through `Extension<Ctx>`.

use crate::error::{AppError, Result};
use crate::model::store::enums::Role;

#[derive(Clone, Debug)]
pub struct Ctx {
    pub user_id: i64,
    pub role: Role,
    /// Set when authenticated with a session token
    pub session_id: Option<String>,
    /// Set when authenticated with an API key
    pub api_key_id: Option<i64>,
    pub client_ip: Option<String>,
}

impl Ctx {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self {
            user_id,
            role,
            session_id: None,
            api_key_id: None,
            client_ip: None,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<()> {
        self.require_role(Role::STAFF)
    }

    pub fn require_admin(&self) -> Result<()> {
        self.require_role(&[Role::Admin])
    }

    /// The caller is `user_id` or is staff.
    pub fn require_self_or_staff(&self, user_id: i64) -> Result<()> {
        if self.user_id == user_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}
