//! Camera directory data types
//!
//! Record shapes exchanged with the camera registry API. Field names on
//! the wire follow the registry contract (`rtsp_url` / `hls_url`); the
//! console model calls them source and playback URLs.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URL scheme the registry accepts for camera sources
pub const SOURCE_SCHEME: &str = "rtsp://";

/// Camera record as held by the console
///
/// `playback_url` is derived from `source_url` by the provisioning
/// backend and may lag creation. It is never present without a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRecord {
    pub camera_id: String,
    pub name: String,

    /// Origin stream locator (RTSP)
    #[serde(rename = "rtsp_url", default)]
    pub source_url: Option<String>,

    /// Derived adaptive-stream locator (HLS), present once provisioned
    #[serde(rename = "hls_url", default)]
    pub playback_url: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CameraRecord {
    /// Whether the source locator is present and uses the registry scheme
    pub fn has_wellformed_source(&self) -> bool {
        self.source_url
            .as_deref()
            .map(|u| u.starts_with(SOURCE_SCHEME))
            .unwrap_or(false)
    }

    /// Whether this camera should be picked up by a provisioning sweep
    pub fn needs_provisioning(&self) -> bool {
        self.has_wellformed_source()
            && self
                .playback_url
                .as_deref()
                .map(|u| u.trim().is_empty())
                .unwrap_or(true)
    }
}

/// Camera creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCameraRequest {
    pub camera_id: String,
    pub name: String,
    #[serde(rename = "rtsp_url", default)]
    pub source_url: Option<String>,
}

/// Camera update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCameraRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "rtsp_url", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Validate a creation request against the registry's rules
pub fn validate_create(req: &CreateCameraRequest) -> Result<()> {
    if req.camera_id.trim().is_empty() || req.camera_id.len() > 64 {
        return Err(Error::Validation(
            "camera_id must be 1-64 characters".to_string(),
        ));
    }
    if req.name.trim().is_empty() {
        return Err(Error::Validation("camera name is required".to_string()));
    }
    validate_source_url(req.source_url.as_deref())
}

/// Validate an update request
pub fn validate_update(req: &UpdateCameraRequest) -> Result<()> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("camera name must not be empty".to_string()));
        }
    }
    validate_source_url(req.source_url.as_deref())
}

fn validate_source_url(source_url: Option<&str>) -> Result<()> {
    match source_url {
        Some(url) if !url.starts_with(SOURCE_SCHEME) => Err(Error::Validation(format!(
            "source URL must start with {}",
            SOURCE_SCHEME
        ))),
        _ => Ok(()),
    }
}
