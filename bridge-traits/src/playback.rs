//! Playback bridge traits.
//!
//! Media decoding and rendering never happen in the core. Adapters drive one
//! of two opaque host runtimes:
//!
//! - [`NativePlayerBackend`]: the platform media stack (AVPlayer, ExoPlayer,
//!   GStreamer, an HTML `<video>` element, ...).
//! - [`WebPlayerHost`]: an embedded web runtime that loads a page (for example
//!   a YouTube IFrame player) and exchanges JSON text messages with it.
//!
//! Both report back through an unbounded channel handed over at load/mount
//! time so the adapter side can consume events without holding host locks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;

/// Delivery protocol hint for the native backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaProtocol {
    /// Single progressive file (mp4, webm, ...).
    Progressive,
    Hls,
    Dash,
}

/// Request handed to [`NativePlayerBackend::load`].
#[derive(Debug, Clone)]
pub struct MediaLoadRequest {
    pub url: String,
    pub protocol: MediaProtocol,
    /// Extra request headers (Referer, cookies, ...).
    pub headers: HashMap<String, String>,
    pub autoplay: bool,
    pub looping: bool,
    pub muted: bool,
    /// Normalized to `0.0..=1.0`.
    pub volume: f32,
    pub playback_rate: f32,
    /// Only fetch metadata until playback is requested.
    pub metadata_only: bool,
}

impl MediaLoadRequest {
    pub fn new(url: impl Into<String>, protocol: MediaProtocol) -> Self {
        Self {
            url: url.into(),
            protocol,
            headers: HashMap::new(),
            autoplay: false,
            looping: false,
            muted: false,
            volume: 1.0,
            playback_rate: 1.0,
            metadata_only: false,
        }
    }
}

/// Failure category reported by a native backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    Network,
    Decode,
    UnsupportedFormat,
    Aborted,
    Other,
}

/// Event emitted by a native backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Media is loaded and ready to play.
    Ready { duration: Option<Duration> },
    Playing,
    Paused,
    Buffering(bool),
    Seeking(bool),
    Progress {
        position: Duration,
        /// `0.0..=1.0`
        buffered_fraction: f32,
    },
    DurationChanged(Duration),
    Ended,
    Error {
        kind: BackendErrorKind,
        message: String,
        /// Whether the backend can continue with the current media.
        fatal: bool,
    },
}

/// Opaque platform media player.
///
/// One instance serves one adapter; it is released with [`release`](Self::release).
#[async_trait]
pub trait NativePlayerBackend: Send + Sync {
    /// Load media. Events for this media are sent to `events` until release.
    async fn load(
        &self,
        request: MediaLoadRequest,
        events: UnboundedSender<BackendEvent>,
    ) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    async fn set_volume(&self, volume: f32) -> Result<()>;

    async fn set_muted(&self, muted: bool) -> Result<()>;

    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Pin an adaptive variant by bandwidth, or `None` for automatic selection.
    async fn select_variant(&self, bandwidth: Option<u64>) -> Result<()> {
        let _ = bandwidth;
        Ok(())
    }

    /// Release all native resources. Must tolerate repeated calls.
    async fn release(&self) -> Result<()>;

    /// Whether this backend can handle `protocol` at all.
    fn supports_protocol(&self, protocol: MediaProtocol) -> bool {
        let _ = protocol;
        true
    }
}

/// Creates a fresh [`NativePlayerBackend`] per adapter attempt.
pub trait NativePlayerBackendProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn NativePlayerBackend>>;
}

/// Page to be loaded into the embedded web runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum WebPageContent {
    /// Navigate to a URL.
    Url(String),
    /// Load inline HTML against a base URL (origin matters for IFrame APIs).
    Html { html: String, base_url: String },
}

/// Web runtime configuration for one mount.
#[derive(Debug, Clone, PartialEq)]
pub struct WebPlayerPage {
    pub content: WebPageContent,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
    pub allows_inline_playback: bool,
    pub requires_user_action_for_playback: bool,
    pub allows_fullscreen: bool,
}

impl WebPlayerPage {
    pub fn url(url: impl Into<String>) -> Self {
        Self::with_content(WebPageContent::Url(url.into()))
    }

    pub fn html(html: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_content(WebPageContent::Html {
            html: html.into(),
            base_url: base_url.into(),
        })
    }

    fn with_content(content: WebPageContent) -> Self {
        Self {
            content,
            user_agent: None,
            headers: HashMap::new(),
            allows_inline_playback: true,
            requires_user_action_for_playback: false,
            allows_fullscreen: true,
        }
    }
}

/// Embedded web runtime (WKWebView, Android WebView, iframe, webview2, ...).
///
/// Communication is text only: outbound JSON commands through
/// [`post_message`](Self::post_message), inbound JSON messages on the channel
/// passed to [`mount`](Self::mount).
#[async_trait]
pub trait WebPlayerHost: Send + Sync {
    async fn mount(&self, page: WebPlayerPage, inbound: UnboundedSender<String>) -> Result<()>;

    async fn post_message(&self, message: String) -> Result<()>;

    /// Tear down the page. Must tolerate repeated calls.
    async fn unmount(&self) -> Result<()>;
}

/// Creates a fresh [`WebPlayerHost`] per adapter attempt.
pub trait WebPlayerHostProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn WebPlayerHost>>;
}
