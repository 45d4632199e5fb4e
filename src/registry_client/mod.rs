//! RegistryClient - Camera Registry API Adapter
//!
//! ## Responsibilities
//!
//! - Camera CRUD against the registry backend
//! - Playback URL provisioning calls (single + bulk)
//! - Response envelope tolerance (`items` wrapping)

use crate::camera_directory::types::{CameraRecord, CreateCameraRequest, UpdateCameraRequest};
use crate::error::{Error, Result};
use serde_json::json;
use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Operations the provisioning and directory layers need from the registry.
///
/// Split out as a trait so orchestration logic can be driven against an
/// in-memory backend in tests.
#[allow(async_fn_in_trait)]
pub trait RegistryApi {
    async fn list_cameras(&self) -> Result<Vec<CameraRecord>>;
    async fn get_camera(&self, camera_id: &str) -> Result<CameraRecord>;
    async fn create_camera(&self, req: &CreateCameraRequest) -> Result<CameraRecord>;
    async fn update_camera(&self, camera_id: &str, req: &UpdateCameraRequest)
        -> Result<CameraRecord>;
    async fn delete_camera(&self, camera_id: &str) -> Result<()>;

    /// Single-camera provisioning call. The response shape is not fixed;
    /// callers normalize it with [`crate::provisioning::merge`].
    async fn generate_playback(&self, source_url: &str) -> Result<serde_json::Value>;

    /// Batched provisioning call for many source URLs at once.
    async fn generate_playback_bulk(&self, source_urls: &[String]) -> Result<serde_json::Value>;
}

/// RegistryClient instance
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Create new RegistryClient
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create new RegistryClient with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a non-2xx response into an API error, preferring the
    /// backend's `detail`/`message` text when the body is JSON.
    async fn api_error(resp: reqwest::Response) -> Error {
        let status = resp.status();
        let body: Option<serde_json::Value> = resp.json().await.ok();
        let message = body
            .as_ref()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status.as_u16() {
            404 => Error::NotFound(message),
            400 | 422 => Error::Validation(message),
            401 | 403 => Error::Unauthorized(message),
            409 => Error::Conflict(message),
            _ => Error::Api(message),
        }
    }

    /// Unwrap a camera list payload, tolerating an `items` envelope
    fn unwrap_camera_list(payload: serde_json::Value) -> Result<Vec<CameraRecord>> {
        let items = match payload {
            serde_json::Value::Array(arr) => serde_json::Value::Array(arr),
            serde_json::Value::Object(mut obj) => obj
                .remove("items")
                .ok_or_else(|| Error::Parse("camera list missing items array".to_string()))?,
            other => {
                return Err(Error::Parse(format!(
                    "unexpected camera list payload: {}",
                    other
                )))
            }
        };
        Ok(serde_json::from_value(items)?)
    }
}

impl RegistryApi for RegistryClient {
    async fn list_cameras(&self) -> Result<Vec<CameraRecord>> {
        let url = format!("{}/api/cameras", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        let payload: serde_json::Value = resp.json().await?;
        Self::unwrap_camera_list(payload)
    }

    async fn get_camera(&self, camera_id: &str) -> Result<CameraRecord> {
        let url = format!(
            "{}/api/cameras/{}",
            self.base_url,
            urlencoding::encode(camera_id)
        );
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn create_camera(&self, req: &CreateCameraRequest) -> Result<CameraRecord> {
        let url = format!("{}/api/cameras", self.base_url);
        let resp = self.client.post(&url).json(req).send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn update_camera(
        &self,
        camera_id: &str,
        req: &UpdateCameraRequest,
    ) -> Result<CameraRecord> {
        let url = format!(
            "{}/api/cameras/{}",
            self.base_url,
            urlencoding::encode(camera_id)
        );
        let resp = self.client.put(&url).json(req).send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn delete_camera(&self, camera_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/cameras/{}",
            self.base_url,
            urlencoding::encode(camera_id)
        );
        let resp = self.client.delete(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        tracing::debug!(camera_id = %camera_id, "Camera deleted in registry");
        Ok(())
    }

    async fn generate_playback(&self, source_url: &str) -> Result<serde_json::Value> {
        let url = format!("{}/api/cameras/generate-hls", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "rtsp_url": source_url }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn generate_playback_bulk(&self, source_urls: &[String]) -> Result<serde_json::Value> {
        let url = format!("{}/api/generate-hls-bulk", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "rtsp_urls": source_urls }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.json().await?)
    }
}
