//! Runtime Platform Abstractions
//!
//! The core never inspects the operating system directly. Hosts describe the
//! runtime through [`PlatformInfo`] and, optionally, expose a synthetic
//! decode-capability query through [`CodecProbe`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Broad runtime family. Codec tables and HLS adapter ordering are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Ios,
    MacOs,
    Android,
    Windows,
    Linux,
    /// Browser runtime (including embedded web views driven without a native host).
    Web,
}

impl PlatformFamily {
    /// Apple runtimes play HLS natively.
    pub fn is_apple(&self) -> bool {
        matches!(self, PlatformFamily::Ios | PlatformFamily::MacOs)
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, PlatformFamily::Ios | PlatformFamily::Android)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Ios => "ios",
            PlatformFamily::MacOs => "macos",
            PlatformFamily::Android => "android",
            PlatformFamily::Windows => "windows",
            PlatformFamily::Linux => "linux",
            PlatformFamily::Web => "web",
        }
    }
}

impl std::fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the current runtime.
///
/// # Platform Support
///
/// - **Desktop**: `cfg!(target_os)` plus optional GPU decoder enumeration
/// - **iOS / macOS**: `VTIsHardwareDecodeSupported`
/// - **Android**: `MediaCodecList`
/// - **Web**: `navigator.userAgent` and `MediaCapabilities`
pub trait PlatformInfo: Send + Sync {
    /// Runtime family.
    fn family(&self) -> PlatformFamily;

    /// Operating system version string, when known.
    fn os_version(&self) -> Option<String> {
        None
    }

    /// Codec names (e.g. `"h264"`, `"hevc"`) the platform decodes in hardware.
    ///
    /// An empty list means "unknown"; the static per-family table is used.
    fn hardware_decoders(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Outcome of a runtime decode-capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecoderSupport {
    pub supported: bool,
    pub hardware_accelerated: bool,
}

impl DecoderSupport {
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn software() -> Self {
        Self {
            supported: true,
            hardware_accelerated: false,
        }
    }

    pub fn hardware() -> Self {
        Self {
            supported: true,
            hardware_accelerated: true,
        }
    }
}

/// Synthetic decode-capability query (e.g. `MediaSource.isTypeSupported`,
/// `MediaCodecList.findDecoderForFormat`).
///
/// Probes may be slow and may fail; callers apply their own timeout and treat
/// errors as "use the static table".
#[async_trait]
pub trait CodecProbe: Send + Sync {
    /// Query whether `codec` (a normalized codec name such as `"av1"`) decodes.
    async fn probe_decoder(&self, codec: &str) -> Result<DecoderSupport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_family_detection() {
        assert!(PlatformFamily::Ios.is_apple());
        assert!(PlatformFamily::MacOs.is_apple());
        assert!(!PlatformFamily::Android.is_apple());
        assert!(!PlatformFamily::Web.is_apple());
    }

    #[test]
    fn family_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformFamily::MacOs).unwrap();
        assert_eq!(json, "\"macos\"");
        assert_eq!(PlatformFamily::Android.to_string(), "android");
    }

    #[test]
    fn decoder_support_constructors() {
        assert!(!DecoderSupport::unsupported().supported);
        assert!(DecoderSupport::software().supported);
        assert!(!DecoderSupport::software().hardware_accelerated);
        assert!(DecoderSupport::hardware().hardware_accelerated);
    }
}
