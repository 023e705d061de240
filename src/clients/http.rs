// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared HTTP plumbing for the gateway clients.

use crate::error::GatewayError;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by both gateways.
pub fn build_http_client() -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| GatewayError::Transport(format!("failed building HTTP client: {e}")))
}

/// Access token of the signed-in user, shared between the auth and storage
/// clients. Storage requests fall back to the project key when empty.
#[derive(Clone, Default)]
pub struct AccessToken(Arc<RwLock<Option<String>>>);

impl AccessToken {
    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    pub fn set(&self, token: &str) {
        *self.0.write() = Some(token.to_string());
    }

    pub fn clear(&self) {
        *self.0.write() = None;
    }
}

/// Error bodies from the auth and storage APIs use different field names.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Check response status and return an error if not successful.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(body);

    if status.as_u16() == 429 {
        tracing::warn!("Rate limit hit (429)");
    }

    Err(GatewayError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Check response and parse JSON body.
pub(crate) async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    check_response(response)
        .await?
        .json()
        .await
        .map_err(|e| GatewayError::Decode(format!("JSON parse error: {e}")))
}

/// Percent-encode each segment of an object key, keeping the separators.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
