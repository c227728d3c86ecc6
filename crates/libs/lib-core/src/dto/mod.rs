//! # Data Transfer Objects (DTOs)
//!
//! Request and response bodies for the REST API, plus the envelope every
//! response is wrapped in.
//!
//! ## Wire Format
//!
//! Success responses are `{"success": true, "data": ..., "message"?: ...}`.
//! Lists put `{"items": [...], "pagination": {...}}` in `data`.
//! Field names are snake_case.

pub mod admin;
pub mod auth;
pub mod relief;

pub use admin::*;
pub use auth::*;
pub use relief::*;

use crate::model::store::Page;
use serde::{Deserialize, Serialize};

/// Standard success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data, message: None }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data, message: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: Page, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + page.limit - 1) / page.limit };
        Self { page: page.number(), limit: page.limit, total, total_pages }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Self { items, pagination: PaginationMeta::new(page, total) }
    }
}

/// Bare `?page=&limit=` query for list endpoints without filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(Page::new(Some(2), Some(10)), 25);
        assert_eq!(meta, PaginationMeta { page: 2, limit: 10, total: 25, total_pages: 3 });

        let empty = PaginationMeta::new(Page::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(json!({ "id": 1 }))).unwrap();
        assert_eq!(body, json!({ "success": true, "data": { "id": 1 } }));

        let body = serde_json::to_value(ApiResponse::with_message((), "Done")).unwrap();
        assert_eq!(body["message"], "Done");
    }
}
