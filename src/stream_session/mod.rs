//! StreamSession - Stream Lifecycle Controller
//!
//! ## Responsibilities
//!
//! - Attach one playback URL to one media sink
//! - Infer liveness from heuristic player signals
//! - Bounded in-place recovery for network/media faults
//! - Guaranteed ordered teardown (no duplicate bindings on a sink)
//!
//! One session exists per (camera, playback URL) pairing currently
//! rendered, owned exclusively by the card that created it. The state
//! machine is synchronous; the player glue pushes [`PlayerEvent`]s in as
//! they arrive, so all transition logic is testable with a scripted fake
//! client and sink.

pub mod events;

pub use events::{ClientFaultKind, FaultClass, PlayerEvent, StreamFault};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Automatic recovery attempts per fault class per session.
/// Replenished whenever playback is confirmed live again.
const RECOVERY_BUDGET: u8 = 3;

/// Stream session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No URL bound; sink cleared
    Idle,
    /// URL bound, manifest requested (or native playback attempted)
    Attaching,
    /// Play issued, waiting for first confirmed media progress
    Buffering,
    /// Playback confirmed by at least one progress/segment signal
    Live,
    /// Sink paused/waiting/stalled after being live; may self-resume
    Stalled,
    /// Fatal network fault; client restarting its load loop
    RecoveringNetwork,
    /// Fatal media fault; client attempting internal media recovery
    RecoveringMedia,
    /// Unrecoverable fault or terminal teardown; create a new session to retry
    Destroyed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Attaching => "attaching",
            SessionState::Buffering => "buffering",
            SessionState::Live => "live",
            SessionState::Stalled => "stalled",
            SessionState::RecoveringNetwork => "recovering_network",
            SessionState::RecoveringMedia => "recovering_media",
            SessionState::Destroyed => "destroyed",
        }
    }
}

/// Media output element the stream is rendered into
pub trait MediaSink {
    /// Whether the platform plays adaptive streams natively (Safari-style)
    fn supports_native_hls(&self) -> bool;
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    fn play(&mut self);
}

/// Adaptive-streaming client instance (hls.js-style engine)
pub trait AdaptiveClient {
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self);
    /// Restart the load loop from the current position (network recovery)
    fn start_load(&mut self);
    /// Internal media-error recovery, no manifest re-fetch
    fn recover_media(&mut self);
    fn stop_load(&mut self);
    fn detach_media(&mut self);
    /// Full release of the instance and any internal worker
    fn destroy(&mut self);
}

/// Stream session controller
pub struct StreamSession<S, C, F>
where
    S: MediaSink,
    C: AdaptiveClient,
    F: FnMut() -> C,
{
    session_id: Uuid,
    camera_id: String,
    sink: S,
    make_client: F,
    client: Option<C>,
    state: SessionState,
    playback_url: Option<String>,
    live_since: Option<DateTime<Utc>>,
    network_budget: u8,
    media_budget: u8,
}

impl<S, C, F> StreamSession<S, C, F>
where
    S: MediaSink,
    C: AdaptiveClient,
    F: FnMut() -> C,
{
    /// Create a new unbound session for a camera
    pub fn new(camera_id: &str, sink: S, make_client: F) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            camera_id: camera_id.to_string(),
            sink,
            make_client,
            client: None,
            state: SessionState::Idle,
            playback_url: None,
            live_since: None,
            network_budget: RECOVERY_BUDGET,
            media_budget: RECOVERY_BUDGET,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Liveness flag exposed to the card: true only while `Live`.
    /// No debounce; the flag flips with the state machine.
    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn playback_url(&self) -> Option<&str> {
        self.playback_url.as_deref()
    }

    pub fn live_since(&self) -> Option<DateTime<Utc>> {
        self.live_since
    }

    /// Badge text for the card
    pub fn status_label(&self) -> &'static str {
        match self.state {
            SessionState::Idle => "No Stream",
            SessionState::Live => "Live",
            SessionState::Destroyed => "Unavailable",
            _ => "Loading...",
        }
    }

    /// Bind a playback URL to the sink. If a binding already exists it is
    /// fully torn down first; two sessions never run against one sink.
    pub fn bind(&mut self, url: &str) -> crate::Result<()> {
        if self.state == SessionState::Destroyed {
            return Err(crate::Error::Session(format!(
                "session {} is destroyed; create a new session to rebind",
                self.session_id
            )));
        }

        if self.state != SessionState::Idle {
            self.teardown();
        }

        self.playback_url = Some(url.to_string());
        self.network_budget = RECOVERY_BUDGET;
        self.media_budget = RECOVERY_BUDGET;
        self.set_state(SessionState::Attaching);

        if self.sink.supports_native_hls() {
            // Native path: no adaptive client, play is issued immediately
            self.sink.set_source(url);
            self.sink.play();
            self.set_state(SessionState::Buffering);
        } else {
            let mut client = (self.make_client)();
            client.load_source(url);
            client.attach_media();
            self.client = Some(client);
            // Buffering once the manifest parses and play is issued
        }

        Ok(())
    }

    /// Explicit unbind: ordered teardown, back to `Idle`.
    /// Equivalent to a card unmount or a URL clear.
    pub fn unbind(&mut self) {
        if self.state == SessionState::Idle || self.state == SessionState::Destroyed {
            return;
        }
        self.teardown();
        self.set_state(SessionState::Idle);
    }

    /// Feed one player event through the state machine
    pub fn handle_event(&mut self, event: PlayerEvent) {
        let event = match event {
            PlayerEvent::Fault(fault) => {
                self.handle_fault(fault);
                return;
            }
            other => other,
        };

        match (self.state, &event) {
            // Manifest ready: issue play, wait for first progress
            (SessionState::Attaching, PlayerEvent::ManifestParsed) => {
                self.sink.play();
                self.set_state(SessionState::Buffering);
            }
            // A segment arriving while attaching means the manifest went
            // through; playback still needs confirming
            (SessionState::Attaching, PlayerEvent::SegmentLoaded) => {
                self.sink.play();
                self.set_state(SessionState::Buffering);
            }

            // First confirmed progress after attach/recovery.
            // Heuristic OR: no single signal is reliable on its own.
            (
                SessionState::Buffering,
                PlayerEvent::Progress
                | PlayerEvent::SegmentLoaded
                | PlayerEvent::NativePlaybackStarted,
            ) => {
                self.enter_live();
            }

            (SessionState::Live, PlayerEvent::Waiting | PlayerEvent::Paused | PlayerEvent::Stalled) => {
                self.set_state(SessionState::Stalled);
            }

            // The player self-resumed
            (SessionState::Stalled, PlayerEvent::Progress | PlayerEvent::SegmentLoaded) => {
                self.enter_live();
            }

            // Recovery confirmed by renewed client activity; playback
            // resumption itself must be re-confirmed from Buffering
            (
                SessionState::RecoveringNetwork | SessionState::RecoveringMedia,
                PlayerEvent::ManifestParsed
                | PlayerEvent::Progress
                | PlayerEvent::SegmentLoaded
                | PlayerEvent::NativePlaybackStarted,
            ) => {
                self.set_state(SessionState::Buffering);
            }

            _ => {
                tracing::trace!(
                    session_id = %self.session_id,
                    camera_id = %self.camera_id,
                    state = self.state.as_str(),
                    event = ?event,
                    "Player event ignored in current state"
                );
            }
        }
    }

    fn handle_fault(&mut self, fault: StreamFault) {
        if !fault.fatal {
            tracing::debug!(
                session_id = %self.session_id,
                camera_id = %self.camera_id,
                kind = ?fault.kind,
                "Transient fault absorbed by client"
            );
            return;
        }

        if self.state == SessionState::Idle || self.state == SessionState::Destroyed {
            return;
        }

        match fault.kind.class() {
            FaultClass::Network => self.recover(fault, SessionState::RecoveringNetwork),
            FaultClass::Media => self.recover(fault, SessionState::RecoveringMedia),
            FaultClass::Unrecoverable => {
                tracing::warn!(
                    session_id = %self.session_id,
                    camera_id = %self.camera_id,
                    kind = ?fault.kind,
                    detail = fault.detail.as_deref().unwrap_or(""),
                    "Unrecoverable fault - destroying session"
                );
                self.destroy();
            }
        }
    }

    fn recover(&mut self, fault: StreamFault, target: SessionState) {
        // Native path has no client to instruct; nothing to recover in place
        if self.client.is_none() {
            tracing::warn!(
                session_id = %self.session_id,
                camera_id = %self.camera_id,
                kind = ?fault.kind,
                "Fatal fault without adaptive client - destroying session"
            );
            self.destroy();
            return;
        }

        let network = target == SessionState::RecoveringNetwork;
        let budget = if network {
            self.network_budget
        } else {
            self.media_budget
        };

        if budget == 0 {
            tracing::warn!(
                session_id = %self.session_id,
                camera_id = %self.camera_id,
                kind = ?fault.kind,
                "Recovery budget exhausted - destroying session"
            );
            self.destroy();
            return;
        }

        if let Some(client) = self.client.as_mut() {
            if network {
                self.network_budget -= 1;
                client.start_load();
            } else {
                self.media_budget -= 1;
                client.recover_media();
            }
        }

        tracing::info!(
            session_id = %self.session_id,
            camera_id = %self.camera_id,
            kind = ?fault.kind,
            remaining = budget - 1,
            "In-place recovery attempted"
        );
        self.set_state(target);
    }

    fn enter_live(&mut self) {
        self.live_since = Some(Utc::now());
        self.network_budget = RECOVERY_BUDGET;
        self.media_budget = RECOVERY_BUDGET;
        self.set_state(SessionState::Live);
    }

    fn destroy(&mut self) {
        self.teardown();
        self.set_state(SessionState::Destroyed);
    }

    /// Ordered release: stop the client loop, detach it, release the
    /// instance, then clear the sink's source. Only after this may a new
    /// binding attach. Skipping or reordering these steps is how duplicate
    /// decoders leak under rapid URL churn.
    fn teardown(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.stop_load();
            client.detach_media();
            client.destroy();
        }
        self.sink.clear_source();
        self.playback_url = None;
        self.live_since = None;
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        tracing::debug!(
            session_id = %self.session_id,
            camera_id = %self.camera_id,
            from = self.state.as_str(),
            to = next.as_str(),
            live = next == SessionState::Live,
            "Session state transition"
        );
        self.state = next;
    }
}
