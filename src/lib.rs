//! Nxtra Console Library
//!
//! Operator console core for the Nxtra surveillance platform
//!
//! ## Architecture (6 Components)
//!
//! 1. CameraDirectory - Camera collection, derivation invariant, sweep state
//! 2. Provisioning - Playback URL orchestration (guards, bulk merge)
//! 3. RegistryClient - Camera registry REST adapter
//! 4. StreamSession - Per-card playback state machine and fault recovery
//! 5. ConsoleApi - Auth, incidents, vehicles, whitelist clients
//! 6. State - Configuration and component wiring
//!
//! ## Design Principles
//!
//! - The collection is the single source of truth for camera records
//! - Playback URLs are derived state, never authored by the operator
//! - Sessions are owned by the card that renders them, not by the directory

pub mod camera_directory;
pub mod console_api;
pub mod error;
pub mod provisioning;
pub mod registry_client;
pub mod state;
pub mod stream_session;

pub use error::{Error, Result};
pub use state::{ConsoleConfig, ConsoleState};
