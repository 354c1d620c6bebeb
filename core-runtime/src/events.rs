//! # Resolution and playback events
//!
//! The pipeline publishes a [`ResolutionEvent`] for every chain transition and
//! live sessions publish [`PlaybackEvent`]s, both wrapped in [`CoreEvent`] on a
//! `tokio::sync::broadcast` [`EventBus`]. Hosts subscribe to drive UI such as
//! "trying alternate player" toasts.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ResolutionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.emit(CoreEvent::Resolution(ResolutionEvent::FallbackTriggered {
//!     from: "youtube".to_string(),
//!     to: "webview".to_string(),
//! }))
//! .ok();
//!
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.description(), "Falling back to next adapter");
//! # }
//! ```
//!
//! A subscriber that falls more than the buffer size behind gets
//! `RecvError::Lagged(n)` and keeps receiving newer events. Emitting with no
//! subscribers fails, and publishers ignore that.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Source classification and fallback-chain traversal
    Resolution(ResolutionEvent),
    /// State of an established playback session
    Playback(PlaybackEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Resolution(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Level a host should log or surface this event at.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Resolution(ResolutionEvent::Exhausted { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Resolution(ResolutionEvent::AttemptFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Resolution(ResolutionEvent::AttemptSkipped { .. }) => EventSeverity::Info,
            CoreEvent::Resolution(ResolutionEvent::FallbackTriggered { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Warning { .. }) => EventSeverity::Warning,
            CoreEvent::Resolution(ResolutionEvent::Succeeded { .. }) => EventSeverity::Info,
            CoreEvent::Resolution(ResolutionEvent::Classified { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Resolution Events
// ============================================================================

/// Pipeline transitions for one `resolve()` call.
///
/// Adapter kinds are carried as their wire names (`"native"`, `"youtube"`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResolutionEvent {
    /// The URL was classified and a chain built.
    Classified {
        /// URL with query string removed.
        url: String,
        kind: String,
        platform: String,
        chain: Vec<String>,
    },
    /// An adapter attempt began.
    AttemptStarted {
        adapter: String,
        /// 1-based.
        attempt: u32,
    },
    /// An adapter attempt failed and was torn down.
    AttemptFailed {
        adapter: String,
        attempt: u32,
        code: String,
        message: String,
        duration_ms: u64,
    },
    /// A chain entry was passed over because the runtime cannot deliver it.
    AttemptSkipped {
        adapter: String,
        attempt: u32,
        reason: String,
    },
    /// The pipeline is moving on to the next chain entry.
    FallbackTriggered { from: String, to: String },
    /// An adapter passed its liveness test.
    Succeeded {
        adapter: String,
        attempt: u32,
        duration_ms: u64,
    },
    /// Every chain entry failed (or the chain was empty).
    Exhausted {
        attempts: u32,
        chain: Vec<String>,
        code: String,
    },
    /// The caller abandoned the resolution.
    Cancelled { attempt: u32 },
}

impl ResolutionEvent {
    fn description(&self) -> &str {
        match self {
            ResolutionEvent::Classified { .. } => "Source classified",
            ResolutionEvent::AttemptStarted { .. } => "Adapter attempt started",
            ResolutionEvent::AttemptFailed { .. } => "Adapter attempt failed",
            ResolutionEvent::AttemptSkipped { .. } => "Adapter skipped by capability check",
            ResolutionEvent::FallbackTriggered { .. } => "Falling back to next adapter",
            ResolutionEvent::Succeeded { .. } => "Playback source resolved",
            ResolutionEvent::Exhausted { .. } => "All adapters failed",
            ResolutionEvent::Cancelled { .. } => "Resolution cancelled",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events from an established playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    Started { adapter: String },
    Paused { adapter: String, position_ms: u64 },
    Buffering { adapter: String, buffering: bool },
    PositionChanged {
        adapter: String,
        position_ms: u64,
        duration_ms: Option<u64>,
        buffered_percentage: f32,
    },
    Ended { adapter: String },
    /// Non-blocking problem (e.g. seeking disabled without byte ranges).
    Warning {
        adapter: String,
        code: String,
        message: String,
    },
    Error {
        adapter: String,
        code: String,
        message: String,
        recoverable: bool,
    },
    /// The session released its adapter.
    Destroyed { adapter: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Buffering { .. } => "Buffering state changed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::Ended { .. } => "Playback ended",
            PlaybackEvent::Warning { .. } => "Playback warning",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::Destroyed { .. } => "Playback session destroyed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by the pipeline, sessions and host subscribers.
///
/// Clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of subscribers reached; errors when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
