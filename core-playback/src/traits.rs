//! # Player Adapter Abstractions
//!
//! Every playback strategy (native file, adaptive stream, YouTube IFrame,
//! cloud share, social embed, generic web player) is a [`PlayerAdapter`]. The
//! pipeline and the session only ever talk to this trait.
//!
//! ## Error model
//!
//! Control operations (`play`, `seek`, ...) never return errors. They clamp
//! their inputs, update [`PlaybackState`] and notify subscribers; failures are
//! published through [`PlayerAdapter::on_error`]. Only
//! [`initialize`](PlayerAdapter::initialize) returns a `Result`, because the
//! pipeline needs to know whether an attempt got off the ground at all.

use async_trait::async_trait;
use core_media::codec::{StreamProtocol, VideoCodec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::listeners::Subscription;

// ============================================================================
// Adapter Kinds
// ============================================================================

/// Closed set of playback strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Native,
    Hls,
    Dash,
    YouTube,
    Cloud,
    Social,
    WebView,
    /// Server-side transcoding; no implementation ships with the core.
    Transcode,
    /// RTMP/RTSP ingest playback; no implementation ships with the core.
    Rtmp,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Native => "native",
            AdapterKind::Hls => "hls",
            AdapterKind::Dash => "dash",
            AdapterKind::YouTube => "youtube",
            AdapterKind::Cloud => "cloud",
            AdapterKind::Social => "social",
            AdapterKind::WebView => "webview",
            AdapterKind::Transcode => "transcode",
            AdapterKind::Rtmp => "rtmp",
        }
    }

    /// Adapters that run inside the embedded web runtime.
    pub fn is_web_backed(&self) -> bool {
        matches!(
            self,
            AdapterKind::YouTube | AdapterKind::Social | AdapterKind::WebView
        )
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Static feature set of an adapter kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCapabilities {
    pub protocols: Vec<StreamProtocol>,
    pub video_codecs: Vec<VideoCodec>,
    /// Maximum vertical resolution, when bounded.
    pub max_resolution: Option<u32>,
    pub supports_seek: bool,
    pub supports_playback_rate: bool,
    pub supports_quality_selection: bool,
    pub supports_pip: bool,
}

impl PlayerCapabilities {
    pub fn for_kind(kind: AdapterKind) -> Self {
        use StreamProtocol as P;
        use VideoCodec as V;

        match kind {
            AdapterKind::Native | AdapterKind::Cloud => Self {
                protocols: vec![P::Progressive, P::Hls],
                video_codecs: vec![V::H264, V::Hevc, V::Vp9, V::Av1],
                max_resolution: None,
                supports_seek: true,
                supports_playback_rate: true,
                supports_quality_selection: false,
                supports_pip: true,
            },
            AdapterKind::Hls => Self {
                protocols: vec![P::Hls],
                video_codecs: vec![V::H264, V::Hevc],
                max_resolution: None,
                supports_seek: true,
                supports_playback_rate: true,
                supports_quality_selection: true,
                supports_pip: true,
            },
            AdapterKind::Dash => Self {
                protocols: vec![P::Dash],
                video_codecs: vec![V::H264, V::Vp9, V::Av1],
                max_resolution: None,
                supports_seek: true,
                supports_playback_rate: true,
                supports_quality_selection: true,
                supports_pip: true,
            },
            AdapterKind::YouTube => Self {
                protocols: vec![P::Hls, P::Dash],
                video_codecs: vec![V::H264, V::Vp9, V::Av1],
                max_resolution: Some(2160),
                supports_seek: true,
                supports_playback_rate: true,
                supports_quality_selection: true,
                supports_pip: false,
            },
            AdapterKind::Social | AdapterKind::WebView => Self {
                protocols: vec![P::Progressive, P::Hls],
                video_codecs: vec![V::H264, V::Vp9],
                max_resolution: Some(1080),
                supports_seek: kind == AdapterKind::WebView,
                supports_playback_rate: false,
                supports_quality_selection: false,
                supports_pip: false,
            },
            AdapterKind::Transcode | AdapterKind::Rtmp => Self {
                protocols: vec![if kind == AdapterKind::Rtmp { P::Rtmp } else { P::Progressive }],
                video_codecs: vec![V::H264],
                max_resolution: Some(1080),
                supports_seek: kind == AdapterKind::Transcode,
                supports_playback_rate: false,
                supports_quality_selection: false,
                supports_pip: false,
            },
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Observable playback state. Written only by the active adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_buffering: bool,
    pub is_seeking: bool,
    pub has_ended: bool,
    pub current_time: Duration,
    pub duration: Option<Duration>,
    /// `0.0..=100.0`
    pub buffered_percentage: f32,
    pub volume: f32,
    pub is_muted: bool,
    pub playback_rate: f32,
    pub error: Option<PlayerError>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            is_buffering: false,
            is_seeking: false,
            has_ended: false,
            current_time: Duration::ZERO,
            duration: None,
            buffered_percentage: 0.0,
            volume: 1.0,
            is_muted: false,
            playback_rate: 1.0,
            error: None,
        }
    }
}

/// Selectable rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Identifier passed back to [`PlayerAdapter::set_quality`].
    pub id: String,
    pub label: String,
    pub bandwidth: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl QualityLevel {
    pub const AUTO_ID: &'static str = "auto";

    pub fn auto() -> Self {
        Self {
            id: Self::AUTO_ID.to_string(),
            label: "Auto".to_string(),
            bandwidth: None,
            width: None,
            height: None,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.id == Self::AUTO_ID
    }
}

pub type StateCallback = Arc<dyn Fn(&PlaybackState) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&PlayerError) + Send + Sync>;

// ============================================================================
// Adapter Trait
// ============================================================================

/// A playback strategy.
///
/// Adapters are created per attempt by the factory and are single-use: after
/// [`destroy`](Self::destroy) every operation is a no-op.
#[async_trait]
pub trait PlayerAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    fn capabilities(&self) -> PlayerCapabilities {
        PlayerCapabilities::for_kind(self.kind())
    }

    /// Load the source. An `Err` fails the current attempt.
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError>;

    async fn play(&self);

    async fn pause(&self);

    /// Pause and rewind to the start.
    async fn stop(&self);

    /// Clamped to `[0, duration]` when the duration is known.
    async fn seek(&self, position: Duration);

    /// Clamped to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32);

    async fn set_muted(&self, muted: bool);

    /// Clamped to `0.25..=4.0`.
    async fn set_playback_rate(&self, rate: f32);

    /// Select a quality level by id; `"auto"` restores adaptive selection.
    async fn set_quality(&self, quality_id: &str);

    fn state(&self) -> PlaybackState;

    fn quality_levels(&self) -> Vec<QualityLevel>;

    fn on_state_change(&self, callback: StateCallback) -> Subscription;

    fn on_error(&self, callback: ErrorCallback) -> Subscription;

    /// Release the backend and drop all subscribers. Idempotent.
    async fn destroy(&self);
}
