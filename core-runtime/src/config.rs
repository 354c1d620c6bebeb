//! # Host configuration
//!
//! [`CoreConfig`] carries the host bridges the core calls into plus the
//! pipeline and reporter tuning. [`CoreConfigBuilder::build`] validates
//! everything up front, so a host missing a playback runtime learns about it
//! at startup instead of on the first `resolve()`.
//!
//! | Bridge | Required | Default |
//! |--------|----------|---------|
//! | `NativePlayerBackendProvider` / `WebPlayerHostProvider` | at least one | none |
//! | `HttpClient` | yes | reqwest client with `desktop-shims` |
//! | `PlatformInfo` | yes | compile-target platform with `desktop-shims` |
//! | `CodecProbe` | no | static capability tables |
//! | `Clock` | no | system clock |
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .native_backend(Arc::new(AvPlayerProvider))
//!     .web_host(Arc::new(WkWebViewProvider))
//!     .pipeline(PipelineSettings::default().with_liveness_window(Duration::from_secs(2)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    time::{Clock, SystemClock},
    CodecProbe, HttpClient, NativePlayerBackendProvider, PlatformInfo, WebPlayerHostProvider,
};
use std::sync::Arc;
use std::time::Duration;

/// Timing and cache settings for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Quiet period after `initialize()` during which an `error`/`fatal`
    /// event fails the attempt.
    pub liveness_window: Duration,
    /// Hard ceiling for `initialize()` plus the liveness window.
    pub liveness_ceiling: Duration,
    /// Timeout for a single runtime codec probe.
    pub codec_probe_timeout: Duration,
    /// Timeout for a `HEAD` range probe.
    pub range_probe_timeout: Duration,
    /// Number of origins remembered by the range-support cache.
    pub range_cache_capacity: usize,
    /// Upper bound for exponential inter-attempt backoff.
    pub max_backoff: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            liveness_window: Duration::from_secs(3),
            liveness_ceiling: Duration::from_secs(10),
            codec_probe_timeout: Duration::from_secs(2),
            range_probe_timeout: Duration::from_secs(5),
            range_cache_capacity: 256,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl PipelineSettings {
    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = window;
        self
    }

    pub fn with_liveness_ceiling(mut self, ceiling: Duration) -> Self {
        self.liveness_ceiling = ceiling;
        self
    }

    pub fn with_codec_probe_timeout(mut self, timeout: Duration) -> Self {
        self.codec_probe_timeout = timeout;
        self
    }

    pub fn with_range_probe_timeout(mut self, timeout: Duration) -> Self {
        self.range_probe_timeout = timeout;
        self
    }

    pub fn with_range_cache_capacity(mut self, capacity: usize) -> Self {
        self.range_cache_capacity = capacity;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.liveness_ceiling < self.liveness_window {
            return Err(Error::invalid(
                "pipeline.liveness_ceiling",
                format!(
                    "{:?} is shorter than the liveness window ({:?})",
                    self.liveness_ceiling, self.liveness_window
                ),
            ));
        }

        if self.codec_probe_timeout.is_zero() {
            return Err(Error::invalid("pipeline.codec_probe_timeout", "must be non-zero"));
        }
        if self.range_probe_timeout.is_zero() {
            return Err(Error::invalid("pipeline.range_probe_timeout", "must be non-zero"));
        }
        if self.range_cache_capacity == 0 {
            return Err(Error::invalid("pipeline.range_cache_capacity", "must be non-zero"));
        }

        Ok(())
    }
}

/// Diagnostics reporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterSettings {
    /// Ring buffer size; the oldest report is evicted beyond this.
    pub capacity: usize,
    /// Optional collector endpoint; reports are POSTed as JSON when set.
    pub endpoint: Option<String>,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            endpoint: None,
        }
    }
}

impl ReporterSettings {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::invalid("reporter.capacity", "must be non-zero"));
        }

        match self.endpoint.as_deref().map(url::Url::parse) {
            Some(Ok(endpoint)) if !matches!(endpoint.scheme(), "http" | "https") => Err(
                Error::invalid("reporter.endpoint", format!("unsupported scheme `{}`", endpoint.scheme())),
            ),
            Some(Err(e)) => Err(Error::invalid("reporter.endpoint", e.to_string())),
            _ => Ok(()),
        }
    }
}

/// Core configuration.
///
/// Holds all dependencies and settings required to initialize the core.
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub platform: Arc<dyn PlatformInfo>,
    pub codec_probe: Option<Arc<dyn CodecProbe>>,
    pub native_backend: Option<Arc<dyn NativePlayerBackendProvider>>,
    pub web_host: Option<Arc<dyn WebPlayerHostProvider>>,
    pub clock: Arc<dyn Clock>,
    pub pipeline: PipelineSettings,
    pub reporter: ReporterSettings,
    /// Capacity of the broadcast event bus.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("platform", &self.platform.family())
            .field(
                "codec_probe",
                &self.codec_probe.as_ref().map(|_| "CodecProbe { ... }"),
            )
            .field(
                "native_backend",
                &self
                    .native_backend
                    .as_ref()
                    .map(|_| "NativePlayerBackendProvider { ... }"),
            )
            .field(
                "web_host",
                &self
                    .web_host
                    .as_ref()
                    .map(|_| "WebPlayerHostProvider { ... }"),
            )
            .field("pipeline", &self.pipeline)
            .field("reporter", &self.reporter)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.native_backend.is_none() && self.web_host.is_none() {
            return Err(Error::MissingBridge {
                bridge: "PlayerBackend",
                hint: "inject a NativePlayerBackendProvider (AVPlayer, ExoPlayer, GStreamer) \
                       or a WebPlayerHostProvider (WKWebView, Android WebView, iframe)"
                    .to_string(),
            });
        }

        if self.event_buffer_size == 0 {
            return Err(Error::invalid("event_buffer_size", "must be non-zero"));
        }

        self.pipeline.validate()?;
        self.reporter.validate()?;

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn missing_bridge(bridge: &'static str, mobile: &str) -> Error {
    Error::MissingBridge {
        bridge,
        hint: format!("enable the `desktop-shims` feature on desktop, or inject {mobile}"),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(missing_bridge("HttpClient", "a URLSession, OkHttp or fetch-backed client"))
}

#[cfg(feature = "desktop-shims")]
fn default_platform() -> Result<Arc<dyn PlatformInfo>> {
    Ok(Arc::new(bridge_desktop::DesktopPlatform::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_platform() -> Result<Arc<dyn PlatformInfo>> {
    Err(missing_bridge("PlatformInfo", "a PlatformInfo describing the runtime family"))
}

/// Collects bridges and settings; unset settings take their defaults.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    platform: Option<Arc<dyn PlatformInfo>>,
    codec_probe: Option<Arc<dyn CodecProbe>>,
    native_backend: Option<Arc<dyn NativePlayerBackendProvider>>,
    web_host: Option<Arc<dyn WebPlayerHostProvider>>,
    clock: Option<Arc<dyn Clock>>,
    pipeline: Option<PipelineSettings>,
    reporter: Option<ReporterSettings>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the runtime description.
    pub fn platform(mut self, platform: Arc<dyn PlatformInfo>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the optional runtime codec probe.
    pub fn codec_probe(mut self, probe: Arc<dyn CodecProbe>) -> Self {
        self.codec_probe = Some(probe);
        self
    }

    /// Sets the native player backend provider.
    pub fn native_backend(mut self, provider: Arc<dyn NativePlayerBackendProvider>) -> Self {
        self.native_backend = Some(provider);
        self
    }

    /// Sets the embedded web runtime provider.
    pub fn web_host(mut self, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        self.web_host = Some(provider);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn pipeline(mut self, settings: PipelineSettings) -> Self {
        self.pipeline = Some(settings);
        self
    }

    pub fn reporter(mut self, settings: ReporterSettings) -> Self {
        self.reporter = Some(settings);
        self
    }

    /// Default: 256
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a required bridge is missing or a setting is
    /// out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };

        let platform = match self.platform {
            Some(platform) => platform,
            None => default_platform()?,
        };

        let config = CoreConfig {
            http_client,
            platform,
            codec_probe: self.codec_probe,
            native_backend: self.native_backend,
            web_host: self.web_host,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            pipeline: self.pipeline.unwrap_or_default(),
            reporter: self.reporter.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(256),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult, HttpRequest, HttpResponse, NativePlayerBackend,
        PlatformFamily,
    };

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                headers: Default::default(),
                body: Default::default(),
            })
        }
    }

    struct MockPlatform;

    impl PlatformInfo for MockPlatform {
        fn family(&self) -> PlatformFamily {
            PlatformFamily::Android
        }
    }

    struct MockBackendProvider;

    impl NativePlayerBackendProvider for MockBackendProvider {
        fn create(&self) -> BridgeResult<Box<dyn NativePlayerBackend>> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "not used in config tests".to_string(),
            ))
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .platform(Arc::new(MockPlatform))
            .native_backend(Arc::new(MockBackendProvider))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.platform.family(), PlatformFamily::Android);
        assert!(config.native_backend.is_some());
        assert!(config.web_host.is_none());
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert_eq!(config.reporter.capacity, 100);
        assert_eq!(config.event_buffer_size, 256);
    }

    #[test]
    fn test_missing_backends_fail_fast() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .platform(Arc::new(MockPlatform))
            .build();

        match result {
            Err(Error::MissingBridge { bridge, .. }) => assert_eq!(bridge, "PlayerBackend"),
            other => panic!("Expected MissingBridge, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_without_shims() {
        let result = CoreConfig::builder()
            .platform(Arc::new(MockPlatform))
            .native_backend(Arc::new(MockBackendProvider))
            .build();

        assert!(matches!(
            result,
            Err(Error::MissingBridge { bridge: "HttpClient", .. })
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_injected() {
        let config = CoreConfig::builder()
            .native_backend(Arc::new(MockBackendProvider))
            .build()
            .unwrap();

        assert!(matches!(
            config.platform.family(),
            PlatformFamily::MacOs | PlatformFamily::Windows | PlatformFamily::Linux
        ));
    }

    #[test]
    fn test_pipeline_settings_validation() {
        let settings = PipelineSettings::default()
            .with_liveness_window(Duration::from_secs(5))
            .with_liveness_ceiling(Duration::from_secs(2));
        assert!(settings.validate().is_err());

        let settings = PipelineSettings::default().with_range_cache_capacity(0);
        assert!(settings.validate().is_err());

        let settings = PipelineSettings::default().with_range_probe_timeout(Duration::ZERO);
        let error = settings.validate().unwrap_err();
        assert_eq!(error.subject(), Some("pipeline.range_probe_timeout"));

        assert!(PipelineSettings::default().validate().is_ok());
    }

    #[test]
    fn test_reporter_settings_validation() {
        assert!(ReporterSettings::default().validate().is_ok());
        assert!(ReporterSettings::default().with_capacity(0).validate().is_err());
        assert!(ReporterSettings::default()
            .with_endpoint("ftp://collector")
            .validate()
            .is_err());
        assert!(ReporterSettings::default()
            .with_endpoint("not a url")
            .validate()
            .is_err());
        assert!(ReporterSettings::default()
            .with_endpoint("https://collector.example.com/reports")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected_by_build() {
        let result = complete_builder()
            .reporter(ReporterSettings::default().with_capacity(0))
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidSetting { setting: "reporter.capacity", .. })
        ));

        let result = complete_builder().event_buffer_size(0).build();
        assert!(matches!(
            result,
            Err(Error::InvalidSetting { setting: "event_buffer_size", .. })
        ));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(debug.contains("Android"));
    }
}
