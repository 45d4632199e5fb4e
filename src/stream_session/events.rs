//! Stream session event and fault vocabulary
//!
//! Everything the controller reacts to arrives as a [`PlayerEvent`],
//! whether it originated from the media sink element or from the
//! adaptive-streaming client. Faults carry the client's own kind tag plus
//! its fatal flag; classification into recovery buckets happens here so
//! the state machine only ever sees the three-way [`FaultClass`].

use serde::{Deserialize, Serialize};

/// Events delivered to a stream session by the player glue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Adaptive client parsed the stream manifest
    ManifestParsed,
    /// Native playback path reported it started playing
    NativePlaybackStarted,
    /// Sink reported play progress (timeupdate/playing analog)
    Progress,
    /// Adaptive client confirmed a media segment loaded
    SegmentLoaded,
    /// Sink is waiting for data
    Waiting,
    /// Sink was paused
    Paused,
    /// Sink reported a stall
    Stalled,
    /// Fault reported by the adaptive client or the sink
    Fault(StreamFault),
}

/// Fault kinds an adaptive-streaming client can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientFaultKind {
    ManifestLoadFailed,
    ManifestParseFailed,
    SegmentLoadFailed,
    SegmentTimeout,
    KeyLoadFailed,
    DecodeFailed,
    BufferAppendFailed,
    BufferStalled,
    MuxFailed,
    KeySystemFailed,
    SinkPlaybackFailed,
    Internal,
}

/// Recovery buckets for fatal faults
///
/// Exhaustive and exclusive: every fatal fault lands in exactly one
/// bucket. Network and media get bounded in-place recovery; anything
/// else destroys the session rather than looping on an unrecoverable
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    Network,
    Media,
    Unrecoverable,
}

impl ClientFaultKind {
    /// Classify into a recovery bucket
    pub fn class(self) -> FaultClass {
        match self {
            ClientFaultKind::ManifestLoadFailed
            | ClientFaultKind::ManifestParseFailed
            | ClientFaultKind::SegmentLoadFailed
            | ClientFaultKind::SegmentTimeout
            | ClientFaultKind::KeyLoadFailed => FaultClass::Network,

            ClientFaultKind::DecodeFailed
            | ClientFaultKind::BufferAppendFailed
            | ClientFaultKind::BufferStalled => FaultClass::Media,

            ClientFaultKind::MuxFailed
            | ClientFaultKind::KeySystemFailed
            | ClientFaultKind::SinkPlaybackFailed
            | ClientFaultKind::Internal => FaultClass::Unrecoverable,
        }
    }

    /// All kinds, for table-driven tests
    pub const ALL: [ClientFaultKind; 12] = [
        ClientFaultKind::ManifestLoadFailed,
        ClientFaultKind::ManifestParseFailed,
        ClientFaultKind::SegmentLoadFailed,
        ClientFaultKind::SegmentTimeout,
        ClientFaultKind::KeyLoadFailed,
        ClientFaultKind::DecodeFailed,
        ClientFaultKind::BufferAppendFailed,
        ClientFaultKind::BufferStalled,
        ClientFaultKind::MuxFailed,
        ClientFaultKind::KeySystemFailed,
        ClientFaultKind::SinkPlaybackFailed,
        ClientFaultKind::Internal,
    ];
}

/// A fault as reported by the underlying client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFault {
    pub kind: ClientFaultKind,
    /// Only fatal faults are acted on; transient ones self-heal
    pub fatal: bool,
    pub detail: Option<String>,
}

impl StreamFault {
    pub fn fatal(kind: ClientFaultKind) -> Self {
        Self {
            kind,
            fatal: true,
            detail: None,
        }
    }

    pub fn transient(kind: ClientFaultKind) -> Self {
        Self {
            kind,
            fatal: false,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
