//! # Adapter Factory
//!
//! Maps a classified source to its ordered fallback chain and instantiates
//! adapters for chain entries.
//!
//! | Source | Chain |
//! |--------|-------|
//! | YouTube | youtube, webview |
//! | Cloud drive | cloud, webview |
//! | Social media | social, webview |
//! | HLS (Apple) | native, hls, webview |
//! | HLS (other) | hls, native, webview |
//! | DASH | dash, webview |
//! | RTMP/RTSP | rtmp, webview |
//! | Direct mp4/m4v/webm/ogg/ogv | native, webview |
//! | Direct mkv/avi/wmv/flv/mov | transcode, webview |
//! | Adult, Twitch, Facebook, Dailymotion, Vimeo | webview |
//! | Unknown, other direct | webview |
//! | Unsupported | *(empty)* |

use bridge_traits::http::HttpClient;
use bridge_traits::platform::PlatformFamily;
use bridge_traits::playback::{NativePlayerBackendProvider, WebPlayerHostProvider};
use core_media::source::StreamType;
use core_media::{CapabilityDetector, RangeProber, SourceInfo, SourceKind, StreamProtocol};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::{
    CloudAdapter, NativeAdapter, SocialAdapter, StreamAdapter, WebViewAdapter, YouTubeAdapter,
};
use crate::error::{PlaybackError, Result};
use crate::traits::{AdapterKind, PlayerAdapter};

// ============================================================================
// Fallback Chain
// ============================================================================

/// Ordered adapter kinds to try for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackChain(Vec<AdapterKind>);

impl FallbackChain {
    pub fn new(kinds: Vec<AdapterKind>) -> Self {
        Self(kinds)
    }

    pub fn kinds(&self) -> &[AdapterKind] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<AdapterKind> {
        self.0.get(index).copied()
    }

    pub fn first(&self) -> Option<AdapterKind> {
        self.get(0)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|kind| kind.as_str().to_string()).collect()
    }
}

impl fmt::Display for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[]");
        }
        f.write_str(&self.names().join(" -> "))
    }
}

/// Chain for `source` on a runtime of `family`.
pub fn fallback_chain(source: &SourceInfo, family: PlatformFamily) -> FallbackChain {
    use AdapterKind::*;

    let kinds = match source.kind {
        SourceKind::YouTube => vec![YouTube, WebView],
        SourceKind::CloudDrive(_) => vec![Cloud, WebView],
        SourceKind::SocialMedia(_) => vec![Social, WebView],
        SourceKind::Stream(StreamType::Hls) if family.is_apple() => vec![Native, Hls, WebView],
        SourceKind::Stream(StreamType::Hls) => vec![Hls, Native, WebView],
        SourceKind::Stream(StreamType::Dash) => vec![Dash, WebView],
        SourceKind::Stream(StreamType::Rtmp) => vec![Rtmp, WebView],
        SourceKind::Direct => match source.container {
            Some(container) if container.is_web_native() => vec![Native, WebView],
            Some(container) if container.needs_transcode() => vec![Transcode, WebView],
            _ => vec![WebView],
        },
        SourceKind::Adult(_)
        | SourceKind::Twitch
        | SourceKind::Facebook
        | SourceKind::Dailymotion
        | SourceKind::Vimeo
        | SourceKind::Unknown => vec![WebView],
        SourceKind::Unsupported => Vec::new(),
    };

    FallbackChain(kinds)
}

// ============================================================================
// Factory
// ============================================================================

/// Builds adapters from injected host runtimes.
pub struct AdapterFactory {
    platform: PlatformFamily,
    http_client: Arc<dyn HttpClient>,
    native_backend: Option<Arc<dyn NativePlayerBackendProvider>>,
    web_host: Option<Arc<dyn WebPlayerHostProvider>>,
    range_prober: Option<Arc<RangeProber>>,
    capabilities: Option<Arc<CapabilityDetector>>,
}

impl AdapterFactory {
    pub fn new(platform: PlatformFamily, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            platform,
            http_client,
            native_backend: None,
            web_host: None,
            range_prober: None,
            capabilities: None,
        }
    }

    pub fn with_native_backend(mut self, provider: Arc<dyn NativePlayerBackendProvider>) -> Self {
        self.native_backend = Some(provider);
        self
    }

    pub fn with_web_host(mut self, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        self.web_host = Some(provider);
        self
    }

    pub fn with_range_prober(mut self, prober: Arc<RangeProber>) -> Self {
        self.range_prober = Some(prober);
        self
    }

    /// Gate native, hls and dash entries on what the runtime can deliver.
    pub fn with_capability_detector(mut self, detector: Arc<CapabilityDetector>) -> Self {
        self.capabilities = Some(detector);
        self
    }

    pub fn platform(&self) -> PlatformFamily {
        self.platform
    }

    pub fn chain_for(&self, source: &SourceInfo) -> FallbackChain {
        fallback_chain(source, self.platform)
    }

    fn native(&self, kind: AdapterKind) -> Result<Arc<dyn NativePlayerBackendProvider>> {
        self.native_backend
            .clone()
            .ok_or(PlaybackError::AdapterUnavailable(kind))
    }

    fn web(&self, kind: AdapterKind) -> Result<Arc<dyn WebPlayerHostProvider>> {
        self.web_host
            .clone()
            .ok_or(PlaybackError::AdapterUnavailable(kind))
    }

    /// Why `kind` cannot play `source` on this runtime, if it cannot.
    ///
    /// Always `None` without a capability detector.
    pub fn unsupported_reason(&self, kind: AdapterKind, source: &SourceInfo) -> Option<String> {
        let detector = self.capabilities.as_ref()?;
        let protocol = match (kind, &source.kind) {
            (AdapterKind::Native, SourceKind::Direct) => {
                if let Some(container) = source.container {
                    if !detector.is_container_supported(container) {
                        return Some(format!(
                            "{} files are not playable on {}",
                            container.extension(),
                            self.platform
                        ));
                    }
                }
                StreamProtocol::Progressive
            }
            (AdapterKind::Native | AdapterKind::Hls, SourceKind::Stream(StreamType::Hls)) => {
                StreamProtocol::Hls
            }
            (AdapterKind::Dash, _) => StreamProtocol::Dash,
            _ => return None,
        };
        if detector.is_protocol_supported(protocol) {
            None
        } else {
            Some(format!("{protocol:?} delivery is not supported on {}", self.platform))
        }
    }

    /// Instantiate an adapter of `kind` for `source`.
    pub fn create(&self, kind: AdapterKind, source: &SourceInfo) -> Result<Arc<dyn PlayerAdapter>> {
        let source = source.clone();
        let adapter: Arc<dyn PlayerAdapter> = match kind {
            AdapterKind::Native => Arc::new(NativeAdapter::new(
                source,
                self.native(kind)?,
                self.range_prober.clone(),
            )),
            AdapterKind::Hls => Arc::new(StreamAdapter::hls(
                source,
                self.native(kind)?,
                Arc::clone(&self.http_client),
            )),
            AdapterKind::Dash => Arc::new(StreamAdapter::dash(
                source,
                self.native(kind)?,
                Arc::clone(&self.http_client),
            )),
            AdapterKind::Cloud => Arc::new(CloudAdapter::new(source, self.native(kind)?)),
            AdapterKind::YouTube => Arc::new(YouTubeAdapter::new(source, self.web(kind)?)),
            AdapterKind::Social => Arc::new(SocialAdapter::new(source, self.web(kind)?)),
            AdapterKind::WebView => Arc::new(WebViewAdapter::new(source, self.web(kind)?)),
            AdapterKind::Transcode | AdapterKind::Rtmp => {
                return Err(PlaybackError::AdapterUnavailable(kind))
            }
        };
        debug!(adapter = %kind, "Adapter created");
        Ok(adapter)
    }

    /// Chain for `source` plus an instance of its head.
    pub fn build(&self, source: &SourceInfo) -> (FallbackChain, Result<Arc<dyn PlayerAdapter>>) {
        let chain = self.chain_for(source);
        let head = match chain.first() {
            Some(kind) => match self.unsupported_reason(kind, source) {
                Some(reason) => Err(PlaybackError::UnsupportedFormat(reason)),
                None => self.create(kind, source),
            },
            None => Err(PlaybackError::UnsupportedSource(
                source
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("No adapter can play {}", source.platform_label)),
            )),
        };
        (chain, head)
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("platform", &self.platform)
            .field("native_backend", &self.native_backend.is_some())
            .field("web_host", &self.web_host.is_some())
            .field("range_prober", &self.range_prober.is_some())
            .field("capabilities", &self.capabilities.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_media::classify;

    fn chain(url: &str, family: PlatformFamily) -> Vec<AdapterKind> {
        fallback_chain(&classify(url), family).kinds().to_vec()
    }

    #[test]
    fn test_chain_table() {
        use AdapterKind::*;
        let linux = PlatformFamily::Linux;

        assert_eq!(chain("https://youtu.be/DzVKgumDkpo", linux), vec![YouTube, WebView]);
        assert_eq!(chain("https://cdn.example.com/a.mp4", linux), vec![Native, WebView]);
        assert_eq!(chain("https://cdn.example.com/video.mkv", linux), vec![Transcode, WebView]);
        assert_eq!(chain("https://cdn.example.com/a.mpd", linux), vec![Dash, WebView]);
        assert_eq!(chain("rtmp://live.example.com/app/key", linux), vec![Rtmp, WebView]);
        assert_eq!(chain("https://vimeo.com/76979871", linux), vec![WebView]);
        assert_eq!(chain("https://example.com/page", linux), vec![WebView]);
        assert!(chain("", linux).is_empty());
    }

    struct Family(PlatformFamily);

    impl bridge_traits::platform::PlatformInfo for Family {
        fn family(&self) -> PlatformFamily {
            self.0
        }
    }

    struct NoHttp;

    #[async_trait::async_trait]
    impl HttpClient for NoHttp {
        async fn execute(
            &self,
            request: bridge_traits::http::HttpRequest,
        ) -> bridge_traits::error::Result<bridge_traits::http::HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable(request.url))
        }
    }

    fn gated(family: PlatformFamily) -> AdapterFactory {
        let detector = CapabilityDetector::new(
            Arc::new(Family(family)),
            None,
            core_media::capabilities::DEFAULT_PROBE_TIMEOUT,
        );
        AdapterFactory::new(family, Arc::new(NoHttp)).with_capability_detector(Arc::new(detector))
    }

    #[test]
    fn test_unsupported_reason_follows_runtime_capabilities() {
        let ios = gated(PlatformFamily::Ios);
        let webm = classify("https://cdn.example.com/clip.webm");
        let mpd = classify("https://cdn.example.com/a.mpd");
        let hls = classify("https://cdn.example.com/live/master.m3u8");

        let reason = ios.unsupported_reason(AdapterKind::Native, &webm).unwrap();
        assert!(reason.contains("webm"), "{reason}");
        assert!(ios.unsupported_reason(AdapterKind::Dash, &mpd).is_some());
        assert_eq!(ios.unsupported_reason(AdapterKind::Native, &hls), None);
        assert_eq!(ios.unsupported_reason(AdapterKind::WebView, &webm), None);

        let linux = gated(PlatformFamily::Linux);
        assert_eq!(linux.unsupported_reason(AdapterKind::Native, &webm), None);
        assert_eq!(linux.unsupported_reason(AdapterKind::Dash, &mpd), None);

        let ungated = AdapterFactory::new(PlatformFamily::Ios, Arc::new(NoHttp));
        assert_eq!(ungated.unsupported_reason(AdapterKind::Native, &webm), None);
    }

    #[test]
    fn test_build_does_not_instantiate_unsupported_head() {
        let (chain, head) = gated(PlatformFamily::Ios).build(&classify("https://cdn.example.com/clip.webm"));
        assert_eq!(chain.to_string(), "native -> webview");
        assert!(matches!(head, Err(PlaybackError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_hls_order_depends_on_platform() {
        use AdapterKind::*;
        let url = "https://cdn.example.com/live/master.m3u8";
        assert_eq!(chain(url, PlatformFamily::Ios), vec![Native, Hls, WebView]);
        assert_eq!(chain(url, PlatformFamily::Android), vec![Hls, Native, WebView]);
    }

    #[test]
    fn test_chain_display() {
        let chain = FallbackChain::new(vec![AdapterKind::YouTube, AdapterKind::WebView]);
        assert_eq!(chain.to_string(), "youtube -> webview");
        assert_eq!(chain.names(), vec!["youtube", "webview"]);
        assert_eq!(FallbackChain::default().to_string(), "[]");
    }
}
