//! # Capability Detection
//!
//! Answers "can this runtime play X?" for codecs, containers and delivery
//! protocols.
//!
//! Detection reads [`PlatformInfo`] once and materializes a static
//! per-family table ([`FormatCapabilities`]). Runtime codec tests go further
//! and ask the host's [`CodecProbe`]; those are slow, so each codec is tested
//! at most once (concurrent callers share one in-flight probe) until
//! [`CapabilityDetector::reset`].

use bridge_traits::platform::{CodecProbe, PlatformFamily, PlatformInfo};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::codec::{AudioCodec, Codec, Container, StreamProtocol, VideoCodec};

/// Default timeout for a runtime codec probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// What the current runtime can decode and deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCapabilities {
    pub platform: PlatformFamily,
    pub containers: HashSet<Container>,
    pub video_codecs: HashSet<VideoCodec>,
    pub audio_codecs: HashSet<AudioCodec>,
    pub protocols: HashSet<StreamProtocol>,
    pub hardware_accelerated: HashSet<Codec>,
}

impl FormatCapabilities {
    /// Static table for a runtime family.
    pub fn for_family(family: PlatformFamily) -> Self {
        use AudioCodec as A;
        use Container as C;
        use StreamProtocol as P;
        use VideoCodec as V;

        let (containers, video, audio, protocols, hardware): (
            &[Container],
            &[VideoCodec],
            &[AudioCodec],
            &[StreamProtocol],
            &[VideoCodec],
        ) = match family {
            PlatformFamily::Ios | PlatformFamily::MacOs => (
                &[C::Mp4, C::M4v, C::Mov, C::Ts, C::ThreeGp],
                &[V::H264, V::Hevc],
                &[A::Aac, A::Mp3, A::Ac3, A::Eac3, A::Flac],
                &[P::Progressive, P::Hls],
                &[V::H264, V::Hevc],
            ),
            PlatformFamily::Android => (
                &[C::Mp4, C::M4v, C::Webm, C::Mkv, C::Ogg, C::ThreeGp, C::Ts],
                &[V::H264, V::Hevc, V::Vp8, V::Vp9, V::Av1],
                &[A::Aac, A::Mp3, A::Opus, A::Vorbis, A::Flac],
                &[P::Progressive, P::Hls, P::Dash],
                &[V::H264, V::Hevc, V::Vp9],
            ),
            PlatformFamily::Windows => (
                &[C::Mp4, C::M4v, C::Webm, C::Ogg, C::Ogv, C::Mkv, C::Mov, C::Ts],
                &[V::H264, V::Hevc, V::Vp8, V::Vp9, V::Av1],
                &[A::Aac, A::Mp3, A::Opus, A::Vorbis, A::Flac, A::Ac3, A::Eac3],
                &[P::Progressive, P::Hls, P::Dash],
                &[V::H264, V::Hevc],
            ),
            PlatformFamily::Linux => (
                &[C::Mp4, C::M4v, C::Webm, C::Ogg, C::Ogv, C::Mkv, C::Ts],
                &[V::H264, V::Vp8, V::Vp9, V::Av1],
                &[A::Aac, A::Mp3, A::Opus, A::Vorbis, A::Flac],
                &[P::Progressive, P::Hls, P::Dash],
                &[V::H264],
            ),
            PlatformFamily::Web => (
                &[C::Mp4, C::M4v, C::Webm, C::Ogg, C::Ogv],
                &[V::H264, V::Vp8, V::Vp9, V::Av1],
                &[A::Aac, A::Mp3, A::Opus, A::Vorbis, A::Flac],
                &[P::Progressive, P::Hls, P::Dash],
                &[V::H264],
            ),
        };

        Self {
            platform: family,
            containers: containers.iter().copied().collect(),
            video_codecs: video.iter().copied().collect(),
            audio_codecs: audio.iter().copied().collect(),
            protocols: protocols.iter().copied().collect(),
            hardware_accelerated: hardware.iter().copied().map(Codec::Video).collect(),
        }
    }

    pub fn supports_codec(&self, codec: Codec) -> bool {
        match codec {
            Codec::Video(video) => self.video_codecs.contains(&video),
            Codec::Audio(audio) => self.audio_codecs.contains(&audio),
        }
    }
}

/// Where a [`CodecTestResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSource {
    /// Host codec probe answered.
    Probe,
    /// No probe, or the probe failed or timed out.
    StaticTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecTestResult {
    pub codec: Codec,
    pub supported: bool,
    pub hardware_accelerated: bool,
    pub source: TestSource,
}

/// Detects and caches runtime format capabilities.
pub struct CapabilityDetector {
    platform: Arc<dyn PlatformInfo>,
    codec_probe: Option<Arc<dyn CodecProbe>>,
    probe_timeout: Duration,
    detected: RwLock<Option<Arc<FormatCapabilities>>>,
    codec_tests: Mutex<HashMap<Codec, Arc<OnceCell<CodecTestResult>>>>,
}

impl CapabilityDetector {
    pub fn new(
        platform: Arc<dyn PlatformInfo>,
        codec_probe: Option<Arc<dyn CodecProbe>>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            codec_probe,
            probe_timeout,
            detected: RwLock::new(None),
            codec_tests: Mutex::new(HashMap::new()),
        }
    }

    /// Detect capabilities, consulting the platform only on first use.
    pub fn detect_capabilities(&self) -> Arc<FormatCapabilities> {
        if let Some(detected) = self.detected.read().as_ref() {
            return Arc::clone(detected);
        }

        let mut slot = self.detected.write();
        // Another caller may have finished while we waited for the write lock
        if let Some(detected) = slot.as_ref() {
            return Arc::clone(detected);
        }

        let family = self.platform.family();
        let mut capabilities = FormatCapabilities::for_family(family);

        let reported: HashSet<Codec> = self
            .platform
            .hardware_decoders()
            .iter()
            .filter_map(|name| name.parse::<Codec>().ok())
            .collect();
        if !reported.is_empty() {
            for codec in &reported {
                match codec {
                    Codec::Video(video) => capabilities.video_codecs.insert(*video),
                    Codec::Audio(audio) => capabilities.audio_codecs.insert(*audio),
                };
            }
            capabilities.hardware_accelerated = reported;
        }

        debug!(
            platform = %family,
            video_codecs = capabilities.video_codecs.len(),
            audio_codecs = capabilities.audio_codecs.len(),
            "Detected format capabilities"
        );

        let capabilities = Arc::new(capabilities);
        *slot = Some(Arc::clone(&capabilities));
        capabilities
    }

    pub fn is_codec_supported(&self, codec: impl Into<Codec>) -> bool {
        self.detect_capabilities().supports_codec(codec.into())
    }

    pub fn needs_fallback(&self, codec: impl Into<Codec>) -> bool {
        !self.is_codec_supported(codec)
    }

    pub fn is_hardware_accelerated(&self, codec: impl Into<Codec>) -> bool {
        let codec: Codec = codec.into();
        self.detect_capabilities().hardware_accelerated.contains(&codec)
    }

    pub fn is_container_supported(&self, container: Container) -> bool {
        self.detect_capabilities().containers.contains(&container)
    }

    pub fn is_protocol_supported(&self, protocol: StreamProtocol) -> bool {
        self.detect_capabilities().protocols.contains(&protocol)
    }

    /// Widely supported substitute for a codec, if one exists.
    pub fn suggested_fallback_codec(codec: impl Into<Codec>) -> Option<Codec> {
        let codec: Codec = codec.into();
        match codec {
            Codec::Video(VideoCodec::Av1 | VideoCodec::Vp9 | VideoCodec::Vp8 | VideoCodec::Hevc) => {
                Some(Codec::Video(VideoCodec::H264))
            }
            Codec::Audio(
                AudioCodec::Ac3 | AudioCodec::Eac3 | AudioCodec::Dts | AudioCodec::Opus | AudioCodec::Vorbis,
            ) => Some(Codec::Audio(AudioCodec::Aac)),
            _ => None,
        }
    }

    /// Test a codec against the live runtime.
    ///
    /// Memoized per codec; concurrent callers for the same codec await a
    /// single probe. Probe errors and timeouts fall back to the static table.
    pub async fn test_codec_support(&self, codec: impl Into<Codec>) -> CodecTestResult {
        let codec = codec.into();
        let cell = {
            let mut tests = self.codec_tests.lock();
            Arc::clone(tests.entry(codec).or_default())
        };

        *cell.get_or_init(|| self.run_codec_test(codec)).await
    }

    async fn run_codec_test(&self, codec: Codec) -> CodecTestResult {
        let from_table = CodecTestResult {
            codec,
            supported: self.is_codec_supported(codec),
            hardware_accelerated: self.is_hardware_accelerated(codec),
            source: TestSource::StaticTable,
        };

        let Some(probe) = &self.codec_probe else {
            return from_table;
        };

        match tokio::time::timeout(self.probe_timeout, probe.probe_decoder(codec.as_str())).await {
            Ok(Ok(support)) => {
                debug!(
                    codec = %codec,
                    supported = support.supported,
                    hardware = support.hardware_accelerated,
                    "Codec probe answered"
                );
                CodecTestResult {
                    codec,
                    supported: support.supported,
                    hardware_accelerated: support.hardware_accelerated,
                    source: TestSource::Probe,
                }
            }
            Ok(Err(e)) => {
                warn!(codec = %codec, error = %e, "Codec probe failed, using static table");
                from_table
            }
            Err(_) => {
                warn!(
                    codec = %codec,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Codec probe timed out, using static table"
                );
                from_table
            }
        }
    }

    /// Drop detected capabilities and every memoized codec test.
    pub fn reset(&self) {
        *self.detected.write() = None;
        self.codec_tests.lock().clear();
    }
}
