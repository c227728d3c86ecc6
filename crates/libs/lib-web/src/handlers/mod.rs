//! # HTTP Request Handlers
//!
//! Axum handlers organized by feature domain. Each module covers one
//! `/api/<domain>` prefix; business rules that span several repositories live
//! in [`crate::services`].
//!
//! ## Handler Modules
//!
//! - **[`auth`]**: register, password and wallet login, sessions, API keys
//! - **[`users`]**: profiles and role/verification/status administration
//! - **[`disasters`]**: disaster zones, funding and stats
//! - **[`vendors`]**: vendor registration and approval
//! - **[`vouchers`]**: issuing, looking up, revoking and redeeming vouchers
//! - **[`transactions`]**: redemptions, ledger receipts and status changes
//! - **[`proofs`]**: proof-of-aid uploads and review
//! - **[`notifications`]**: inbox and staff broadcasts
//! - **[`analytics`]**, **[`audit`]**, **[`settings`]**, **[`ipfs`]**
//!
//! ## Handler Architecture
//!
//! ```rust,ignore
//! async fn handler(
//!     State(state): State<AppState>,        // Shared state
//!     Extension(ctx): Extension<Ctx>,       // Caller, set by require_auth
//!     Json(payload): Json<RequestBody>,     // Request body
//! ) -> ApiResult<Data> {
//!     ctx.require_staff()?;
//!     ok(data)
//! }
//! ```
//!
//! Errors are `lib_core::AppError` and render as
//! `{"success": false, "error": ..., "code": ...}`.

pub mod analytics;
pub mod audit;
pub mod auth;
pub mod disasters;
pub mod ipfs;
pub mod notifications;
pub mod proofs;
pub mod settings;
pub mod transactions;
pub mod users;
pub mod vendors;
pub mod vouchers;

#[cfg(test)]
mod tests;

use crate::middleware::client_ip;
use crate::services::session::ClientInfo;
use axum::{
    extract::Multipart,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use lib_core::dto::ApiResponse;
use lib_core::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;

// region: --- Responses

/// Success body of a handler.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// `201 Created` with a success body.
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>)>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

pub fn ok_with<T: Serialize>(data: T, message: &str) -> ApiResult<T> {
    Ok(Json(ApiResponse::with_message(data, message)))
}

pub fn created<T: Serialize>(data: T, message: &str) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(data, message))))
}

// endregion: --- Responses

// region: --- Request helpers

/// User agent and address stored with a new session.
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ip_address: client_ip(headers),
    }
}

/// Map a `(String)` validation failure from `lib_utils` to 400.
pub fn invalid(message: String) -> AppError {
    AppError::InvalidInput(message)
}

/// The `file` part of a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus the optional `file` part of a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_file(self) -> Result<(HashMap<String, String>, UploadedFile)> {
        match self.file {
            Some(file) if !file.bytes.is_empty() => Ok((self.fields, file)),
            Some(_) => Err(AppError::InvalidInput("Uploaded file is empty".to_string())),
            None => Err(AppError::InvalidInput("Missing 'file' field".to_string())),
        }
    }
}

/// Collect a multipart body. The part named `file` is kept as bytes; every
/// other part is read as text.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.bin").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.file = Some(UploadedFile { file_name, content_type, bytes: bytes.to_vec() });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::InvalidInput("Upload exceeds the request size limit".to_string())
    } else {
        AppError::InvalidInput(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// `image/png; charset=...` -> `image/png`
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

// endregion: --- Request helpers
