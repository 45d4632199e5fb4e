//! Application state
//!
//! Holds all shared components and configuration

use crate::camera_directory::CameraDirectory;
use crate::console_api::auth::AuthClient;
use crate::console_api::incidents::IncidentClient;
use crate::console_api::vehicles::VehicleClient;
use crate::console_api::whitelist::WhitelistClient;
use crate::registry_client::RegistryClient;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Console backend base URL
    pub api_url: String,
    /// HTTP timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("NXTRA_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            http_timeout_secs: std::env::var("NXTRA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        }
    }
}

/// Shared console components
#[derive(Clone)]
pub struct ConsoleState {
    /// Application config
    pub config: ConsoleConfig,
    /// Camera collection, provisioning sweep state included
    pub directory: Arc<CameraDirectory<RegistryClient>>,
    /// Operator authentication
    pub auth: Arc<AuthClient>,
    /// Incident alert board
    pub incidents: Arc<IncidentClient>,
    /// Vehicle logs and traffic flow
    pub vehicles: Arc<VehicleClient>,
    /// Vehicle whitelist
    pub whitelist: Arc<WhitelistClient>,
}

impl ConsoleState {
    /// Wire up all components against one backend
    pub fn new(config: ConsoleConfig) -> Self {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let registry = RegistryClient::with_timeout(&config.api_url, timeout);

        Self {
            directory: Arc::new(CameraDirectory::new(registry)),
            auth: Arc::new(AuthClient::with_timeout(&config.api_url, timeout)),
            incidents: Arc::new(IncidentClient::with_timeout(&config.api_url, timeout)),
            vehicles: Arc::new(VehicleClient::with_timeout(&config.api_url, timeout)),
            whitelist: Arc::new(WhitelistClient::with_timeout(&config.api_url, timeout)),
            config,
        }
    }
}
