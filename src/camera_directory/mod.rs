//! CameraDirectory - Camera Collection Lifecycle
//!
//! ## Responsibilities
//!
//! - Owns the console's view of the camera collection
//! - Owns the provisioning guard set and the run-once sweep latch,
//!   with reset tied to "collection reloaded from the registry"
//! - Drives bulk/single provisioning and merges results
//!
//! Stream sessions are not held here: each rendered card owns its own
//! [`crate::stream_session::StreamSession`] and releases it on unmount
//! or when this directory drops the camera from the collection.

pub mod types;

use crate::error::{Error, Result};
use crate::provisioning::merge;
use crate::provisioning::{
    distinct_sources, select_and_guard, ProvisionOutcome, ProvisionTarget, ProvisioningGuardSet,
};
use crate::registry_client::RegistryApi;
use tokio::sync::RwLock;
use types::{CameraRecord, CreateCameraRequest, UpdateCameraRequest};

/// CameraDirectory instance
pub struct CameraDirectory<R: RegistryApi> {
    registry: R,
    cameras: RwLock<Vec<CameraRecord>>,
    guard: RwLock<ProvisioningGuardSet>,
    /// Latch for the automatic post-load sweep; reset only by refresh()
    swept: RwLock<bool>,
}

impl<R: RegistryApi> CameraDirectory<R> {
    /// Create new directory backed by a registry client
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            cameras: RwLock::new(Vec::new()),
            guard: RwLock::new(ProvisioningGuardSet::new()),
            swept: RwLock::new(false),
        }
    }

    /// Snapshot of the current collection
    pub async fn cameras(&self) -> Vec<CameraRecord> {
        self.cameras.read().await.clone()
    }

    /// Look up one camera by ID
    pub async fn get(&self, camera_id: &str) -> Option<CameraRecord> {
        self.cameras
            .read()
            .await
            .iter()
            .find(|c| c.camera_id == camera_id)
            .cloned()
    }

    /// Reload the collection from the registry.
    ///
    /// Clears the guard set wholesale and re-arms the sweep latch; both
    /// are scoped to one loaded generation of the collection.
    pub async fn refresh(&self) -> Result<Vec<CameraRecord>> {
        let mut fetched = self.registry.list_cameras().await?;
        enforce_derivation_invariant(&mut fetched);

        {
            let mut cameras = self.cameras.write().await;
            *cameras = fetched.clone();
        }
        self.guard.write().await.clear();
        *self.swept.write().await = false;

        tracing::info!(count = fetched.len(), "Camera collection refreshed");
        Ok(fetched)
    }

    /// Run the provisioning sweep if it has not yet run for the current
    /// load of the collection. Re-renders and unrelated state changes
    /// call this freely; only the first call per load does work.
    pub async fn sweep_once(&self) -> Result<ProvisionOutcome> {
        {
            let mut swept = self.swept.write().await;
            if *swept {
                return Ok(ProvisionOutcome::default());
            }
            *swept = true;
        }
        self.provision_missing().await
    }

    /// Provision every camera that has a well-formed source URL, no
    /// playback URL, and no attempt already in flight. One batched
    /// request; partial success is expected and not an error.
    pub async fn provision_missing(&self) -> Result<ProvisionOutcome> {
        // Selection and guard marking happen synchronously under the
        // locks, before any request is awaited
        let targets = {
            let cameras = self.cameras.read().await;
            let mut guard = self.guard.write().await;
            select_and_guard(&cameras, &mut guard)
        };

        if targets.is_empty() {
            return Ok(ProvisionOutcome::default());
        }

        let sources = distinct_sources(&targets);
        tracing::info!(
            cameras = targets.len(),
            sources = sources.len(),
            "Requesting bulk playback provisioning"
        );

        let payload = match self.registry.generate_playback_bulk(&sources).await {
            Ok(payload) => payload,
            Err(e) => {
                // Settle on failure too, so a later sweep can retry
                self.settle_targets(&targets).await;
                tracing::warn!(error = %e, "Bulk provisioning request failed");
                return Err(e);
            }
        };

        let map = merge::extract_bulk_map(&payload);
        let resolved = {
            let mut cameras = self.cameras.write().await;
            merge::apply_bulk_map(&mut cameras, &map)
        };
        self.settle_targets(&targets).await;

        tracing::info!(
            attempted = targets.len(),
            resolved = resolved,
            "Bulk provisioning settled"
        );
        Ok(ProvisionOutcome {
            attempted: targets.len(),
            resolved,
        })
    }

    /// Provision a single camera, used right after create/edit so the
    /// operator does not wait for the next full sweep. Returns whether a
    /// playback URL was attached.
    pub async fn provision_one(&self, camera_id: &str) -> Result<bool> {
        let source_url = {
            let cameras = self.cameras.read().await;
            let mut guard = self.guard.write().await;
            let Some(camera) = cameras.iter().find(|c| c.camera_id == camera_id) else {
                return Err(Error::NotFound(format!("Camera {} not found", camera_id)));
            };
            if !camera.needs_provisioning() || !guard.begin(camera_id) {
                return Ok(false);
            }
            camera.source_url.clone().unwrap_or_default()
        };

        let result = self.registry.generate_playback(&source_url).await;
        self.guard.write().await.settle(camera_id);

        let payload = result.map_err(|e| Error::Provisioning {
            camera_id: camera_id.to_string(),
            message: e.to_string(),
        })?;

        let Some(playback_url) = merge::normalize_single(&payload) else {
            tracing::warn!(
                camera_id = %camera_id,
                "Provisioning returned no usable playback URL"
            );
            return Ok(false);
        };

        let mut cameras = self.cameras.write().await;
        if let Some(camera) = cameras.iter_mut().find(|c| c.camera_id == camera_id) {
            // The source may have changed while the request was in
            // flight; a stale result must not attach
            if camera.source_url.as_deref() == Some(source_url.as_str()) {
                camera.playback_url = Some(playback_url);
                tracing::info!(camera_id = %camera_id, "Playback URL attached");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Create a camera in the registry, add it to the collection, and
    /// kick off single-camera provisioning when a source is present.
    pub async fn create_camera(&self, req: CreateCameraRequest) -> Result<CameraRecord> {
        types::validate_create(&req)?;

        let record = self.registry.create_camera(&req).await?;
        {
            let mut cameras = self.cameras.write().await;
            cameras.push(record.clone());
        }

        if record.needs_provisioning() {
            if let Err(e) = self.provision_one(&record.camera_id).await {
                tracing::warn!(
                    camera_id = %record.camera_id,
                    error = %e,
                    "Provisioning after create failed; next sweep will retry"
                );
            }
        }

        self.get(&record.camera_id)
            .await
            .ok_or_else(|| Error::Internal("created camera missing from collection".to_string()))
    }

    /// Update a camera. A changed source URL invalidates the derived
    /// playback URL before re-provisioning.
    pub async fn update_camera(
        &self,
        camera_id: &str,
        req: UpdateCameraRequest,
    ) -> Result<CameraRecord> {
        types::validate_update(&req)?;

        let mut updated = self.registry.update_camera(camera_id, &req).await?;
        if updated.playback_url.is_some() && updated.source_url.is_none() {
            updated.playback_url = None;
        }

        {
            let mut cameras = self.cameras.write().await;
            if let Some(existing) = cameras.iter_mut().find(|c| c.camera_id == camera_id) {
                // Keep the already-provisioned playback URL only while the
                // source it was derived from is unchanged
                if updated.playback_url.is_none()
                    && existing.source_url == updated.source_url
                {
                    updated.playback_url = existing.playback_url.clone();
                }
                *existing = updated.clone();
            } else {
                cameras.push(updated.clone());
            }
        }

        if updated.needs_provisioning() {
            if let Err(e) = self.provision_one(camera_id).await {
                tracing::warn!(
                    camera_id = %camera_id,
                    error = %e,
                    "Provisioning after update failed; next sweep will retry"
                );
            }
        }

        self.get(camera_id)
            .await
            .ok_or_else(|| Error::Internal("updated camera missing from collection".to_string()))
    }

    /// Delete a camera from the registry and the collection. The owning
    /// card must unbind its stream session when the record disappears.
    pub async fn delete_camera(&self, camera_id: &str) -> Result<()> {
        self.registry.delete_camera(camera_id).await?;

        {
            let mut cameras = self.cameras.write().await;
            cameras.retain(|c| c.camera_id != camera_id);
        }
        self.guard.write().await.settle(camera_id);

        tracing::info!(camera_id = %camera_id, "Camera removed from directory");
        Ok(())
    }

    /// Number of cameras with a provisioning attempt in flight
    pub async fn in_flight(&self) -> usize {
        self.guard.read().await.len()
    }

    async fn settle_targets(&self, targets: &[ProvisionTarget]) {
        let mut guard = self.guard.write().await;
        for target in targets {
            guard.settle(&target.camera_id);
        }
    }
}

/// Drop any playback URL that has no source to be derived from
fn enforce_derivation_invariant(cameras: &mut [CameraRecord]) {
    for camera in cameras.iter_mut() {
        if camera.playback_url.is_some() && camera.source_url.is_none() {
            tracing::warn!(
                camera_id = %camera.camera_id,
                "Dropping playback URL without a source URL"
            );
            camera.playback_url = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// In-memory registry backend for directory tests
    #[derive(Clone)]
    struct MockRegistry {
        cameras: Arc<Mutex<Vec<CameraRecord>>>,
        /// Canned bulk response; tests swap the shape
        bulk_response: Arc<Mutex<Value>>,
        bulk_calls: Arc<AtomicUsize>,
        single_calls: Arc<AtomicUsize>,
        /// Simulated latency before the bulk response settles
        bulk_delay: Duration,
    }

    impl MockRegistry {
        fn new(cameras: Vec<CameraRecord>) -> Self {
            Self {
                cameras: Arc::new(Mutex::new(cameras)),
                bulk_response: Arc::new(Mutex::new(json!({}))),
                bulk_calls: Arc::new(AtomicUsize::new(0)),
                single_calls: Arc::new(AtomicUsize::new(0)),
                bulk_delay: Duration::from_millis(0),
            }
        }

        fn with_bulk_delay(mut self, delay: Duration) -> Self {
            self.bulk_delay = delay;
            self
        }

        async fn set_bulk_response(&self, value: Value) {
            *self.bulk_response.lock().await = value;
        }
    }

    impl RegistryApi for MockRegistry {
        async fn list_cameras(&self) -> crate::Result<Vec<CameraRecord>> {
            Ok(self.cameras.lock().await.clone())
        }

        async fn get_camera(&self, camera_id: &str) -> crate::Result<CameraRecord> {
            self.cameras
                .lock()
                .await
                .iter()
                .find(|c| c.camera_id == camera_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(camera_id.to_string()))
        }

        async fn create_camera(&self, req: &CreateCameraRequest) -> crate::Result<CameraRecord> {
            let record = CameraRecord {
                camera_id: req.camera_id.clone(),
                name: req.name.clone(),
                source_url: req.source_url.clone(),
                playback_url: None,
                created_at: Utc::now(),
                updated_at: None,
            };
            self.cameras.lock().await.push(record.clone());
            Ok(record)
        }

        async fn update_camera(
            &self,
            camera_id: &str,
            req: &UpdateCameraRequest,
        ) -> crate::Result<CameraRecord> {
            let mut cameras = self.cameras.lock().await;
            let camera = cameras
                .iter_mut()
                .find(|c| c.camera_id == camera_id)
                .ok_or_else(|| Error::NotFound(camera_id.to_string()))?;
            if let Some(name) = &req.name {
                camera.name = name.clone();
            }
            if let Some(source) = &req.source_url {
                camera.source_url = Some(source.clone());
            }
            camera.updated_at = Some(Utc::now());
            camera.playback_url = None;
            Ok(camera.clone())
        }

        async fn delete_camera(&self, camera_id: &str) -> crate::Result<()> {
            self.cameras
                .lock()
                .await
                .retain(|c| c.camera_id != camera_id);
            Ok(())
        }

        async fn generate_playback(&self, source_url: &str) -> crate::Result<Value> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "hls_url": playback_for(source_url), "needs_restart": false }))
        }

        async fn generate_playback_bulk(&self, _source_urls: &[String]) -> crate::Result<Value> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            if !self.bulk_delay.is_zero() {
                tokio::time::sleep(self.bulk_delay).await;
            }
            Ok(self.bulk_response.lock().await.clone())
        }
    }

    fn playback_for(source: &str) -> String {
        format!("{}.m3u8", source.replace("rtsp://", "https://"))
    }

    fn camera(id: &str, source: Option<&str>) -> CameraRecord {
        CameraRecord {
            camera_id: id.to_string(),
            name: id.to_string(),
            source_url: source.map(String::from),
            playback_url: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_empty_selection_sends_no_request() {
        let registry = MockRegistry::new(vec![camera("cam1", None)]);
        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        let outcome = directory.provision_missing().await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::default());
        assert_eq!(registry.bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guarded_idempotence_single_outbound_batch() {
        let registry = MockRegistry::new(vec![camera("cam1", Some("rtsp://host/1"))])
            .with_bulk_delay(Duration::from_millis(50));
        registry
            .set_bulk_response(json!({ "rtsp://host/1": "https://host/1.m3u8" }))
            .await;

        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        // Second call lands while the first request is still in flight
        let (first, second) =
            tokio::join!(directory.provision_missing(), directory.provision_missing());

        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(registry.bulk_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.attempted + second.attempted, 1);
        assert_eq!(first.resolved + second.resolved, 1);
    }

    #[tokio::test]
    async fn test_merge_shapes_produce_identical_collections() {
        let shapes = [
            json!({
                "rtsp://host/1": "https://host/1.m3u8",
                "rtsp://host/2": "https://host/2.m3u8"
            }),
            json!([
                { "rtsp_url": "rtsp://host/1", "ok": true, "hls_url": "https://host/1.m3u8" },
                { "rtsp_url": "rtsp://host/2", "ok": true, "hls_url": "https://host/2.m3u8" }
            ]),
            json!({ "needs_restart": false, "items": [
                { "rtsp_url": "rtsp://host/1", "ok": true, "hls_url": "https://host/1.m3u8" },
                { "rtsp_url": "rtsp://host/2", "ok": true, "hls_url": "https://host/2.m3u8" }
            ]}),
        ];

        let mut collections = Vec::new();
        for shape in shapes {
            let registry = MockRegistry::new(vec![
                camera("cam1", Some("rtsp://host/1")),
                camera("cam2", Some("rtsp://host/2")),
            ]);
            registry.set_bulk_response(shape).await;

            let directory = CameraDirectory::new(registry);
            directory.refresh().await.unwrap();
            let outcome = directory.provision_missing().await.unwrap();
            assert_eq!(outcome.resolved, 2);

            let snapshot: Vec<(String, Option<String>)> = directory
                .cameras()
                .await
                .into_iter()
                .map(|c| (c.camera_id, c.playback_url))
                .collect();
            collections.push(snapshot);
        }

        assert_eq!(collections[0], collections[1]);
        assert_eq!(collections[1], collections[2]);
    }

    #[tokio::test]
    async fn test_partial_success_leaves_unresolved_untouched() {
        let registry = MockRegistry::new(vec![
            camera("cam1", Some("rtsp://host/1")),
            camera("cam2", Some("rtsp://host/2")),
            camera("cam3", Some("rtsp://host/3")),
        ]);
        registry
            .set_bulk_response(json!({ "items": [
                { "rtsp_url": "rtsp://host/1", "ok": true, "hls_url": "https://host/1.m3u8" },
                { "rtsp_url": "rtsp://host/2", "ok": true, "hls_url": "https://host/2.m3u8" },
                { "rtsp_url": "rtsp://host/3", "ok": false, "error": "unreachable" }
            ]}))
            .await;

        let directory = CameraDirectory::new(registry);
        directory.refresh().await.unwrap();

        let outcome = directory.provision_missing().await.unwrap();
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.resolved, 2);

        let cam3 = directory.get("cam3").await.unwrap();
        assert!(cam3.playback_url.is_none());
        // All guards settled, so the failed camera can be retried
        assert_eq!(directory.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_latch_runs_once_per_load() {
        let registry = MockRegistry::new(vec![camera("cam1", Some("rtsp://host/1"))]);
        registry
            .set_bulk_response(json!({ "rtsp://host/1": "https://host/1.m3u8" }))
            .await;

        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        directory.sweep_once().await.unwrap();
        directory.sweep_once().await.unwrap();
        assert_eq!(registry.bulk_calls.load(Ordering::SeqCst), 1);

        // A fresh load re-arms the latch; cam1 is provisioned now though,
        // so the sweep selects nothing and sends nothing
        directory.refresh().await.unwrap();
        directory.sweep_once().await.unwrap();
        assert_eq!(registry.bulk_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bulk_failure_settles_guards_for_retry() {
        #[derive(Clone)]
        struct FailingBulk(MockRegistry);

        impl RegistryApi for FailingBulk {
            async fn list_cameras(&self) -> crate::Result<Vec<CameraRecord>> {
                self.0.list_cameras().await
            }
            async fn get_camera(&self, camera_id: &str) -> crate::Result<CameraRecord> {
                self.0.get_camera(camera_id).await
            }
            async fn create_camera(
                &self,
                req: &CreateCameraRequest,
            ) -> crate::Result<CameraRecord> {
                self.0.create_camera(req).await
            }
            async fn update_camera(
                &self,
                camera_id: &str,
                req: &UpdateCameraRequest,
            ) -> crate::Result<CameraRecord> {
                self.0.update_camera(camera_id, req).await
            }
            async fn delete_camera(&self, camera_id: &str) -> crate::Result<()> {
                self.0.delete_camera(camera_id).await
            }
            async fn generate_playback(&self, source_url: &str) -> crate::Result<Value> {
                self.0.generate_playback(source_url).await
            }
            async fn generate_playback_bulk(
                &self,
                _source_urls: &[String],
            ) -> crate::Result<Value> {
                Err(Error::Api("bulk endpoint unavailable".to_string()))
            }
        }

        let registry = FailingBulk(MockRegistry::new(vec![camera(
            "cam1",
            Some("rtsp://host/1"),
        )]));
        let directory = CameraDirectory::new(registry);
        directory.refresh().await.unwrap();

        assert!(directory.provision_missing().await.is_err());
        assert_eq!(directory.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_create_triggers_single_provisioning() {
        let registry = MockRegistry::new(Vec::new());
        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        let record = directory
            .create_camera(CreateCameraRequest {
                camera_id: "cam1".to_string(),
                name: "Gate".to_string(),
                source_url: Some("rtsp://host/1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(registry.single_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            record.playback_url.as_deref(),
            Some("https://host/1.m3u8")
        );
    }

    #[tokio::test]
    async fn test_update_source_change_invalidates_playback() {
        let mut seeded = camera("cam1", Some("rtsp://host/old"));
        seeded.playback_url = Some("https://host/old.m3u8".to_string());

        let registry = MockRegistry::new(vec![seeded]);
        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        let record = directory
            .update_camera(
                "cam1",
                UpdateCameraRequest {
                    name: None,
                    source_url: Some("rtsp://host/new".to_string()),
                },
            )
            .await
            .unwrap();

        // Old derived URL discarded, fresh one provisioned for the new source
        assert_eq!(
            record.playback_url.as_deref(),
            Some("https://host/new.m3u8")
        );
    }

    #[tokio::test]
    async fn test_update_without_source_change_keeps_playback() {
        let mut seeded = camera("cam1", Some("rtsp://host/1"));
        seeded.playback_url = Some("https://host/1.m3u8".to_string());

        let registry = MockRegistry::new(vec![seeded]);
        let directory = CameraDirectory::new(registry.clone());
        directory.refresh().await.unwrap();

        let record = directory
            .update_camera(
                "cam1",
                UpdateCameraRequest {
                    name: Some("Renamed".to_string()),
                    source_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(record.name, "Renamed");
        assert_eq!(record.playback_url.as_deref(), Some("https://host/1.m3u8"));
        assert_eq!(registry.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_and_unguards() {
        let registry = MockRegistry::new(vec![camera("cam1", Some("rtsp://host/1"))]);
        let directory = CameraDirectory::new(registry);
        directory.refresh().await.unwrap();

        directory.delete_camera("cam1").await.unwrap();
        assert!(directory.get("cam1").await.is_none());
        assert_eq!(directory.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_scrubs_underived_playback() {
        let mut bad = camera("cam1", None);
        bad.playback_url = Some("https://host/ghost.m3u8".to_string());

        let registry = MockRegistry::new(vec![bad]);
        let directory = CameraDirectory::new(registry);
        let cameras = directory.refresh().await.unwrap();
        assert!(cameras[0].playback_url.is_none());
    }
}
