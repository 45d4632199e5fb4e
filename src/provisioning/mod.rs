//! Provisioning - Playback URL Orchestration
//!
//! ## Responsibilities
//!
//! - Selection of cameras that still need a playback URL
//! - Per-camera in-flight guard so a camera is provisioned at most once
//!   per outstanding attempt
//! - Normalizing and applying bulk provisioning results
//!
//! The guard set and sweep latch are plain owned state; the
//! [`crate::camera_directory`] module decides where they live and when
//! they reset. Mutations happen synchronously relative to the triggering
//! call, never across an await, which keeps them safe under cooperative
//! scheduling without extra locking.

pub mod merge;

use crate::camera_directory::types::CameraRecord;
use std::collections::HashSet;

/// Set of camera IDs with a provisioning attempt currently in flight
#[derive(Debug, Default)]
pub struct ProvisioningGuardSet {
    in_flight: HashSet<String>,
}

impl ProvisioningGuardSet {
    /// Create empty guard set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a camera as in flight. Returns false if it already was.
    pub fn begin(&mut self, camera_id: &str) -> bool {
        self.in_flight.insert(camera_id.to_string())
    }

    /// Clear a camera's in-flight marker once its attempt settles,
    /// success or failure, so a later sweep can retry.
    pub fn settle(&mut self, camera_id: &str) {
        self.in_flight.remove(camera_id);
    }

    /// Whether a camera currently has an attempt in flight
    pub fn contains(&self, camera_id: &str) -> bool {
        self.in_flight.contains(camera_id)
    }

    /// Wholesale reset, used when the collection is reloaded
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// A camera selected for a provisioning attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionTarget {
    pub camera_id: String,
    pub source_url: String,
}

/// Outcome of a provisioning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Cameras included in the outbound request
    pub attempted: usize,
    /// Cameras that gained a playback URL
    pub resolved: usize,
}

/// Select cameras eligible for a provisioning sweep: well-formed source,
/// no playback URL, and not already guarded. Marks every selected camera
/// in the guard set before returning.
pub fn select_and_guard(
    cameras: &[CameraRecord],
    guard: &mut ProvisioningGuardSet,
) -> Vec<ProvisionTarget> {
    let mut targets = Vec::new();

    for camera in cameras {
        if !camera.needs_provisioning() || guard.contains(&camera.camera_id) {
            continue;
        }
        // needs_provisioning implies source_url is present
        let Some(source_url) = camera.source_url.clone() else {
            continue;
        };
        guard.begin(&camera.camera_id);
        targets.push(ProvisionTarget {
            camera_id: camera.camera_id.clone(),
            source_url,
        });
    }

    targets
}

/// Distinct source URLs for the outbound bulk request, in first-seen order
pub fn distinct_sources(targets: &[ProvisionTarget]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| seen.insert(t.source_url.as_str()))
        .map(|t| t.source_url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn camera(id: &str, source: Option<&str>, playback: Option<&str>) -> CameraRecord {
        CameraRecord {
            camera_id: id.to_string(),
            name: id.to_string(),
            source_url: source.map(String::from),
            playback_url: playback.map(String::from),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_select_filters_and_guards() {
        let cameras = vec![
            camera("cam1", Some("rtsp://host/1"), None),
            camera("cam2", Some("rtsp://host/2"), Some("https://host/2.m3u8")),
            camera("cam3", None, None),
            camera("cam4", Some("http://host/4"), None),
        ];
        let mut guard = ProvisioningGuardSet::new();

        let targets = select_and_guard(&cameras, &mut guard);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].camera_id, "cam1");
        assert!(guard.contains("cam1"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_guarded_camera_is_skipped() {
        let cameras = vec![camera("cam1", Some("rtsp://host/1"), None)];
        let mut guard = ProvisioningGuardSet::new();

        let first = select_and_guard(&cameras, &mut guard);
        assert_eq!(first.len(), 1);

        // Second sweep while the attempt is still in flight selects nothing
        let second = select_and_guard(&cameras, &mut guard);
        assert!(second.is_empty());

        // After the attempt settles the camera is eligible again
        guard.settle("cam1");
        let third = select_and_guard(&cameras, &mut guard);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_distinct_sources_dedupes() {
        let targets = vec![
            ProvisionTarget {
                camera_id: "cam1".to_string(),
                source_url: "rtsp://host/shared".to_string(),
            },
            ProvisionTarget {
                camera_id: "cam2".to_string(),
                source_url: "rtsp://host/shared".to_string(),
            },
            ProvisionTarget {
                camera_id: "cam3".to_string(),
                source_url: "rtsp://host/3".to_string(),
            },
        ];
        let sources = distinct_sources(&targets);
        assert_eq!(sources, vec!["rtsp://host/shared", "rtsp://host/3"]);
    }
}
