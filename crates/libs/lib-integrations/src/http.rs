//! Shared HTTP plumbing for the live clients.

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_client(service: &'static str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build {service} HTTP client: {e}")))
}

pub(crate) fn transport_error(service: &'static str, err: reqwest::Error) -> Error {
    Error::Http { service, message: err.to_string() }
}

/// Check the status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(service: &'static str, response: Response) -> Result<T> {
    let response = ensure_success(service, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| Error::InvalidResponse { service, message: e.to_string() })
}

pub(crate) async fn ensure_success(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::Provider { service, status: status.as_u16(), message })
}
