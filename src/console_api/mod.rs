//! ConsoleApi - Supplementary Console Endpoints
//!
//! ## Responsibilities
//!
//! - Typed clients for the console surfaces beyond the camera registry:
//!   authentication, incident alerts, vehicle logs / traffic flow, and
//!   the vehicle whitelist
//!
//! Each client is a thin reqwest wrapper over one route group; response
//! types mirror the backend schemas field for field. Session state is a
//! bearer token handed out by [`auth::AuthClient`] and attached by the
//! other clients when present.

pub mod auth;
pub mod incidents;
pub mod vehicles;
pub mod whitelist;

use crate::error::{Error, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

/// Attach a bearer token when one is held
pub(crate) fn with_bearer(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Map a non-success response to a typed error, preferring the backend's
/// own detail message when the body carries one
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(|d| d.as_str())
                .map(String::from)
        })
        .unwrap_or(body);

    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(detail),
        StatusCode::CONFLICT => Error::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(detail),
        _ => Error::Api(format!("{}: {}", status, detail)),
    })
}
