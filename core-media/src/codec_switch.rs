//! # Codec Switching
//!
//! Decides what to do when a source's codecs are not playable here. The
//! switcher only produces a [`CodecSwitchDecision`]; it never transcodes or
//! re-fetches anything itself.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::capabilities::CapabilityDetector;
use crate::codec::{AudioCodec, Codec, VideoCodec};

const CODEC_SWITCH_CONFIDENCE: f32 = 0.9;
const CODEC_SWITCH_DELAY_MS: u64 = 500;
const TRANSCODE_CONFIDENCE: f32 = 0.7;
const TRANSCODE_DELAY_MS: u64 = 5_000;
const WEB_PLAYER_CONFIDENCE: f32 = 0.8;
const WEB_PLAYER_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodingPreferences {
    /// Offer server-side transcoding as a strategy.
    pub enable_transcoding: bool,
    /// Offer an embedded web player / alternative source.
    pub allow_web_player_fallback: bool,
}

impl Default for TranscodingPreferences {
    fn default() -> Self {
        Self {
            enable_transcoding: false,
            allow_web_player_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Request a rendition in a different, supported codec.
    CodecSwitch,
    Transcode,
    /// Hand the source to an embedded web player or an alternative source.
    WebPlayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStrategy {
    pub kind: StrategyKind,
    pub target_codec: Option<Codec>,
    pub confidence: f32,
    /// 0.0 (none) to 1.0 (best to worst codec in the ranking).
    pub estimated_quality_loss: f32,
    pub estimated_delay_ms: u64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecSwitchDecision {
    pub should_switch: bool,
    pub original_codec: Codec,
    pub target_codec: Option<Codec>,
    pub strategies: Vec<FallbackStrategy>,
    /// Mean of the strategy confidences; 1.0 when nothing needs switching.
    pub confidence: f32,
    /// Sum of the strategy delays.
    pub estimated_delay_ms: u64,
}

impl CodecSwitchDecision {
    fn no_switch(original: Codec) -> Self {
        Self {
            should_switch: false,
            original_codec: original,
            target_codec: None,
            strategies: Vec::new(),
            confidence: 1.0,
            estimated_delay_ms: 0,
        }
    }

    /// Highest-priority strategy.
    pub fn primary_strategy(&self) -> Option<&FallbackStrategy> {
        self.strategies.first()
    }
}

/// Quality cost of replacing `from` with `to`, normalized by the ranking span.
///
/// Zero when either codec is unranked, when the kinds differ, or when the
/// target ranks at least as high.
pub fn estimate_quality_loss(from: Codec, to: Codec) -> f32 {
    fn loss<T: PartialEq>(ranking: &[T], from: &T, to: &T) -> f32 {
        let (Some(from), Some(to)) = (
            ranking.iter().position(|c| c == from),
            ranking.iter().position(|c| c == to),
        ) else {
            return 0.0;
        };
        if to <= from || ranking.len() < 2 {
            return 0.0;
        }
        (to - from) as f32 / (ranking.len() - 1) as f32
    }

    match (from, to) {
        (Codec::Video(from), Codec::Video(to)) => loss(&VideoCodec::QUALITY_RANKING, &from, &to),
        (Codec::Audio(from), Codec::Audio(to)) => loss(&AudioCodec::QUALITY_RANKING, &from, &to),
        _ => 0.0,
    }
}

/// Builds codec switch decisions against a [`CapabilityDetector`].
pub struct CodecSwitcher {
    detector: Arc<CapabilityDetector>,
    preferences: TranscodingPreferences,
}

impl CodecSwitcher {
    pub fn new(detector: Arc<CapabilityDetector>) -> Self {
        Self {
            detector,
            preferences: TranscodingPreferences::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: TranscodingPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn preferences(&self) -> TranscodingPreferences {
        self.preferences
    }

    /// Decide using the static capability table.
    pub fn decide(&self, video: VideoCodec, audio: Option<AudioCodec>) -> CodecSwitchDecision {
        let video_ok = self.detector.is_codec_supported(video);
        let audio_ok = audio.map_or(true, |a| self.detector.is_codec_supported(a));
        self.build(video, audio, video_ok, audio_ok)
    }

    /// Decide using runtime codec tests (memoized by the detector).
    pub async fn decide_probed(&self, video: VideoCodec, audio: Option<AudioCodec>) -> CodecSwitchDecision {
        let video_ok = self.detector.test_codec_support(video).await.supported;
        let audio_ok = match audio {
            Some(audio) => self.detector.test_codec_support(audio).await.supported,
            None => true,
        };
        self.build(video, audio, video_ok, audio_ok)
    }

    fn build(
        &self,
        video: VideoCodec,
        audio: Option<AudioCodec>,
        video_ok: bool,
        audio_ok: bool,
    ) -> CodecSwitchDecision {
        let original = Codec::Video(video);
        if video_ok && audio_ok {
            return CodecSwitchDecision::no_switch(original);
        }

        let mut unsupported = Vec::with_capacity(2);
        if !video_ok {
            unsupported.push(Codec::Video(video));
        }
        if let (Some(audio), false) = (audio, audio_ok) {
            unsupported.push(Codec::Audio(audio));
        }

        let mut strategies = Vec::new();

        for codec in &unsupported {
            let Some(target) = CapabilityDetector::suggested_fallback_codec(*codec) else {
                continue;
            };
            if !self.detector.is_codec_supported(target) {
                continue;
            }
            strategies.push(FallbackStrategy {
                kind: StrategyKind::CodecSwitch,
                target_codec: Some(target),
                confidence: CODEC_SWITCH_CONFIDENCE,
                estimated_quality_loss: estimate_quality_loss(*codec, target),
                estimated_delay_ms: CODEC_SWITCH_DELAY_MS,
                description: format!("Switch {} to {}", codec, target),
            });
        }
        let switch_built = !strategies.is_empty();

        if self.preferences.enable_transcoding {
            let source = unsupported[0];
            let target = CapabilityDetector::suggested_fallback_codec(source);
            strategies.push(FallbackStrategy {
                kind: StrategyKind::Transcode,
                target_codec: target,
                confidence: TRANSCODE_CONFIDENCE,
                estimated_quality_loss: target.map_or(0.0, |t| estimate_quality_loss(source, t)),
                estimated_delay_ms: TRANSCODE_DELAY_MS,
                description: match target {
                    Some(target) => format!("Transcode {} to {}", source, target),
                    None => format!("Transcode {}", source),
                },
            });
        }

        if !switch_built && self.preferences.allow_web_player_fallback {
            strategies.push(FallbackStrategy {
                kind: StrategyKind::WebPlayer,
                target_codec: None,
                confidence: WEB_PLAYER_CONFIDENCE,
                estimated_quality_loss: 0.0,
                estimated_delay_ms: WEB_PLAYER_DELAY_MS,
                description: "Play through an embedded web player".to_string(),
            });
        }

        let confidence = if strategies.is_empty() {
            0.0
        } else {
            strategies.iter().map(|s| s.confidence).sum::<f32>() / strategies.len() as f32
        };
        let estimated_delay_ms = strategies.iter().map(|s| s.estimated_delay_ms).sum();
        let target_codec = strategies
            .iter()
            .find(|s| s.kind == StrategyKind::CodecSwitch)
            .and_then(|s| s.target_codec);

        debug!(
            original = %original,
            strategies = strategies.len(),
            confidence,
            "Codec switch decision"
        );

        CodecSwitchDecision {
            should_switch: true,
            original_codec: original,
            target_codec,
            strategies,
            confidence,
            estimated_delay_ms,
        }
    }
}
