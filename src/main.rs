//! Nxtra Console
//!
//! Main entry point. Loads the camera collection, runs the one-shot
//! provisioning sweep, and reports per-camera playback status.

use nxtra_console::camera_directory::types::CameraRecord;
use nxtra_console::state::{ConsoleConfig, ConsoleState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nxtra_console=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Nxtra Console v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConsoleConfig::default();
    tracing::info!(
        api_url = %config.api_url,
        http_timeout_secs = config.http_timeout_secs,
        "Configuration loaded"
    );

    let state = ConsoleState::new(config);

    // Load the collection, then provision whatever lacks a playback URL
    let cameras = state.directory.refresh().await?;
    tracing::info!(count = cameras.len(), "Camera collection loaded");

    match state.directory.sweep_once().await {
        Ok(outcome) => {
            tracing::info!(
                attempted = outcome.attempted,
                resolved = outcome.resolved,
                "Provisioning sweep complete"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Provisioning sweep failed; cameras stay unprovisioned");
        }
    }

    for camera in state.directory.cameras().await {
        report_camera(&camera);
    }

    Ok(())
}

fn report_camera(camera: &CameraRecord) {
    let status = if camera.playback_url.is_some() {
        "ready"
    } else if camera.has_wellformed_source() {
        "pending"
    } else {
        "no source"
    };

    tracing::info!(
        camera_id = %camera.camera_id,
        name = %camera.name,
        status = status,
        playback_url = camera.playback_url.as_deref().unwrap_or("-"),
        "Camera status"
    );
}
