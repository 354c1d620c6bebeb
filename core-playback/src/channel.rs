//! # Web Player Message Channel
//!
//! Typed protocol between web-backed adapters and the page running inside a
//! [`WebPlayerHost`](bridge_traits::playback::WebPlayerHost).
//!
//! ## Outbound
//!
//! ```json
//! {"command": "seek", "parameters": [42.0], "version": 1}
//! ```
//!
//! `parameters` is always a positional array, empty for bare commands.
//!
//! ## Inbound
//!
//! ```json
//! {"type": "stateChange", "state": 1}
//! {"type": "timeupdate", "currentTime": 12.5, "buffered": 0.4}
//! {"type": "error", "code": 150, "message": "embedding disabled", "fatal": true}
//! ```
//!
//! Inbound text is untrusted. It is parsed into a `serde_json::Value` first and
//! then validated field by field, so an unknown `type` is skipped and a
//! malformed payload never reaches adapter state.

use serde_json::{json, Value};
use std::time::Duration;

/// Protocol version spoken by this side of the channel.
pub const CHANNEL_VERSION: u32 = 1;

// ============================================================================
// Outbound Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum WebCommand {
    Play,
    Pause,
    Stop,
    Seek { seconds: f64 },
    SetVolume { volume: f32 },
    Mute,
    Unmute,
    SetPlaybackRate { rate: f32 },
    SetQuality { quality: String },
    Destroy,
}

impl WebCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WebCommand::Play => "play",
            WebCommand::Pause => "pause",
            WebCommand::Stop => "stop",
            WebCommand::Seek { .. } => "seek",
            WebCommand::SetVolume { .. } => "setVolume",
            WebCommand::Mute => "mute",
            WebCommand::Unmute => "unmute",
            WebCommand::SetPlaybackRate { .. } => "setPlaybackRate",
            WebCommand::SetQuality { .. } => "setQuality",
            WebCommand::Destroy => "destroy",
        }
    }

    fn parameters(&self) -> Value {
        match self {
            WebCommand::Seek { seconds } => json!([seconds]),
            // Pages expect the 0-100 scale used by embedded players.
            WebCommand::SetVolume { volume } => json!([(volume * 100.0).round() as u32]),
            WebCommand::SetPlaybackRate { rate } => json!([rate]),
            WebCommand::SetQuality { quality } => json!([quality]),
            _ => json!([]),
        }
    }

    /// Wire form posted to the page.
    pub fn to_json(&self) -> String {
        json!({
            "command": self.name(),
            "parameters": self.parameters(),
            "version": CHANNEL_VERSION,
        })
        .to_string()
    }
}

// ============================================================================
// Inbound Messages
// ============================================================================

/// Player state reported by the page.
///
/// Numeric codes follow the YouTube IFrame convention, which generic pages
/// reuse; named states are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebPlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl WebPlayerState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(WebPlayerState::Unstarted),
            0 => Some(WebPlayerState::Ended),
            1 => Some(WebPlayerState::Playing),
            2 => Some(WebPlayerState::Paused),
            3 => Some(WebPlayerState::Buffering),
            5 => Some(WebPlayerState::Cued),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "unstarted" | "idle" => Some(WebPlayerState::Unstarted),
            "ended" => Some(WebPlayerState::Ended),
            "playing" => Some(WebPlayerState::Playing),
            "paused" => Some(WebPlayerState::Paused),
            "buffering" | "waiting" => Some(WebPlayerState::Buffering),
            "cued" | "ready" => Some(WebPlayerState::Cued),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebMessage {
    Ready {
        version: u32,
    },
    StateChange(WebPlayerState),
    Error {
        /// Platform error code as text (`"150"`, `"MEDIA_ERR_NETWORK"`, ...).
        code: String,
        message: String,
        fatal: bool,
    },
    TimeUpdate {
        current_time: f64,
        /// Loaded fraction, `0.0..=1.0`.
        buffered: Option<f64>,
    },
    DurationChange {
        duration: f64,
    },
}

/// Outcome of parsing one inbound text message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(WebMessage),
    /// Well-formed message of a type this side does not handle.
    Ignored(String),
    /// Not JSON, or a known type with an invalid payload.
    Malformed(String),
}

pub fn parse_inbound(text: &str) -> Inbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return Inbound::Malformed(format!("invalid JSON: {e}")),
    };

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Inbound::Malformed("missing message type".to_string());
    };

    // Payload fields may be inline or nested under `data`.
    let data = value
        .get("data")
        .filter(|data| data.is_object())
        .unwrap_or(&value);

    let message = match kind {
        "ready" => {
            let version = data
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(CHANNEL_VERSION);
            WebMessage::Ready { version }
        }
        "stateChange" => {
            let state = match data.get("state") {
                Some(Value::Number(n)) => n.as_i64().and_then(WebPlayerState::from_code),
                Some(Value::String(s)) => WebPlayerState::from_name(s),
                _ => None,
            };
            match state {
                Some(state) => WebMessage::StateChange(state),
                None => return Inbound::Malformed("unknown player state".to_string()),
            }
        }
        "error" => {
            let code = match data.get("code") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => "unknown".to_string(),
            };
            WebMessage::Error {
                code,
                message: data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                fatal: data.get("fatal").and_then(Value::as_bool).unwrap_or(false),
            }
        }
        "timeupdate" => match finite(data.get("currentTime")) {
            Some(current_time) => WebMessage::TimeUpdate {
                current_time,
                buffered: finite(data.get("buffered")),
            },
            None => return Inbound::Malformed("timeupdate without currentTime".to_string()),
        },
        "durationchange" => match finite(data.get("duration")) {
            Some(duration) => WebMessage::DurationChange { duration },
            None => return Inbound::Malformed("durationchange without duration".to_string()),
        },
        other => return Inbound::Ignored(other.to_string()),
    };

    Inbound::Message(message)
}

/// Non-negative number small enough to become a [`Duration`].
fn finite(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|v| Duration::try_from_secs_f64(*v).is_ok())
}
