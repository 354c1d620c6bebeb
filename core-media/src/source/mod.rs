//! # Source Classification
//!
//! Maps an arbitrary URL to a [`SourceInfo`]: what kind of source it is, which
//! platform serves it, and what playing it will require (an embedded web
//! player, an age gate, an entitlement tier).
//!
//! Classification is a pure, total function. It never performs I/O and never
//! fails: malformed input produces [`SourceKind::Unsupported`] with an
//! `error_message`.

mod classifier;
mod platforms;

pub use classifier::classify;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::Container;

/// Adaptive or live stream flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Hls,
    Dash,
    /// RTMP/RTMPS/RTSP live ingest URLs.
    Rtmp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Twitter,
    Instagram,
    TikTok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    GoogleDrive,
    Dropbox,
    OneDrive,
    Mega,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdultPlatform {
    Pornhub,
    Xvideos,
    Xhamster,
    Redtube,
    Youporn,
}

/// Membership tier a source requires before playback is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementTier {
    Basic,
    Premium,
    Vip,
}

/// Source category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variant", rename_all = "snake_case")]
pub enum SourceKind {
    /// Progressive media file.
    Direct,
    Stream(StreamType),
    #[serde(rename = "youtube")]
    YouTube,
    Vimeo,
    Twitch,
    Facebook,
    Dailymotion,
    SocialMedia(SocialPlatform),
    CloudDrive(CloudProvider),
    Adult(AdultPlatform),
    /// HTTP(S) URL nothing recognized; only a web player can try it.
    Unknown,
    Unsupported,
}

impl SourceKind {
    /// Sources addressed by a platform id rather than by a media URL.
    pub fn is_id_addressable(&self) -> bool {
        matches!(
            self,
            SourceKind::YouTube
                | SourceKind::Vimeo
                | SourceKind::Twitch
                | SourceKind::Facebook
                | SourceKind::Dailymotion
                | SourceKind::SocialMedia(_)
                | SourceKind::CloudDrive(_)
                | SourceKind::Adult(_)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Direct => "direct",
            SourceKind::Stream(StreamType::Hls) => "stream_hls",
            SourceKind::Stream(StreamType::Dash) => "stream_dash",
            SourceKind::Stream(StreamType::Rtmp) => "stream_rtmp",
            SourceKind::YouTube => "youtube",
            SourceKind::Vimeo => "vimeo",
            SourceKind::Twitch => "twitch",
            SourceKind::Facebook => "facebook",
            SourceKind::Dailymotion => "dailymotion",
            SourceKind::SocialMedia(_) => "social_media",
            SourceKind::CloudDrive(_) => "cloud_drive",
            SourceKind::Adult(_) => "adult",
            SourceKind::Unknown => "unknown",
            SourceKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a URL.
///
/// Invariants upheld by [`classify`]:
/// - `kind == Unsupported` implies `error_message.is_some()`
/// - `video_id` is only set when `kind.is_id_addressable()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Input exactly as given (trimmed).
    pub original_url: String,
    pub kind: SourceKind,
    /// Human-readable platform name ("YouTube", "Google Drive", "Direct").
    pub platform_label: String,
    /// Container or manifest extension (`mp4`, `m3u8`, `mpd`, ...).
    pub stream_subtype: Option<String>,
    pub container: Option<Container>,
    pub video_id: Option<String>,
    /// Directly playable URL for cloud shares with a resolver.
    pub resolved_url: Option<String>,
    /// Platform embed-player URL, when one can be built.
    pub embed_url: Option<String>,
    pub requires_embedded_web_player: bool,
    pub requires_age_gate: bool,
    pub requires_entitlement_tier: Option<EntitlementTier>,
    pub error_message: Option<String>,
}

impl SourceInfo {
    pub(crate) fn new(original_url: impl Into<String>, kind: SourceKind, label: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            kind,
            platform_label: label.into(),
            stream_subtype: None,
            container: None,
            video_id: None,
            resolved_url: None,
            embed_url: None,
            requires_embedded_web_player: false,
            requires_age_gate: false,
            requires_entitlement_tier: None,
            error_message: None,
        }
    }

    pub(crate) fn unsupported(original_url: impl Into<String>, message: impl Into<String>) -> Self {
        let mut info = Self::new(original_url, SourceKind::Unsupported, "Unsupported");
        info.error_message = Some(message.into());
        info
    }

    pub fn is_supported(&self) -> bool {
        self.kind != SourceKind::Unsupported
    }

    /// URL a player should load: the resolved direct link when known.
    pub fn playable_url(&self) -> &str {
        self.resolved_url.as_deref().unwrap_or(&self.original_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serialization_is_tagged() {
        let json = serde_json::to_value(SourceKind::CloudDrive(CloudProvider::GoogleDrive)).unwrap();
        assert_eq!(json["kind"], "cloud_drive");
        assert_eq!(json["variant"], "google_drive");

        let json = serde_json::to_value(SourceKind::YouTube).unwrap();
        assert_eq!(json["kind"], "youtube");
    }

    #[test]
    fn playable_url_prefers_resolved() {
        let mut info = SourceInfo::new(
            "https://drive.google.com/file/d/abc/view",
            SourceKind::CloudDrive(CloudProvider::GoogleDrive),
            "Google Drive",
        );
        assert_eq!(info.playable_url(), "https://drive.google.com/file/d/abc/view");

        info.resolved_url = Some("https://drive.google.com/uc?export=download&id=abc".to_string());
        assert_eq!(
            info.playable_url(),
            "https://drive.google.com/uc?export=download&id=abc"
        );
    }

    #[test]
    fn entitlement_tiers_are_ordered() {
        assert!(EntitlementTier::Vip > EntitlementTier::Premium);
        assert!(EntitlementTier::Premium > EntitlementTier::Basic);
    }
}
