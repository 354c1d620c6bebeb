//! Core service façade.
//!
//! Wires host-provided bridges from a [`CoreConfig`] into the shared
//! resolution services and exposes a single entry point,
//! [`CoreService::resolve`], that turns a URL into a live
//! [`PlaybackSession`].
//!
//! ```ignore
//! use core_playback::PlayerConfig;
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .native_backend(native_provider)
//!     .web_host(web_provider)
//!     .build()?;
//! let core = CoreService::new(config)?;
//!
//! match core.resolve("https://youtu.be/DzVKgumDkpo", PlayerConfig::default()).await {
//!     Ok(session) => session.play().await,
//!     Err(failure) => show_error(&failure.error),
//! }
//! ```
//!
//! Desktop hosts get reqwest-backed HTTP and compile-target platform
//! detection through the default `desktop-shims` feature.

pub mod error;

pub use error::{CoreError, ResolveError, Result};

use std::sync::Arc;

use bridge_traits::platform::PlatformFamily;
use bridge_traits::time::Clock;
use core_media::{
    classify, CapabilityDetector, CodecSwitcher, FormatCapabilities, RangeProber, SourceInfo,
};
use core_playback::{
    AdapterFactory, ErrorReporter, FallbackChain, HttpReportSubmitter, PipelineFailure,
    PlaybackSession, PlayerConfig, PlayerError, RedundancyPipeline,
};
use core_runtime::config::{CoreConfig, PipelineSettings};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_runtime::logging::redact_url;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share caches, the error log and the event bus.
#[derive(Clone)]
pub struct CoreService {
    platform: PlatformFamily,
    detector: Arc<CapabilityDetector>,
    switcher: Arc<CodecSwitcher>,
    prober: Arc<RangeProber>,
    reporter: Arc<ErrorReporter>,
    factory: Arc<AdapterFactory>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
}

impl CoreService {
    /// Build the service graph from `config`.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let platform = config.platform.family();
        let settings = config.pipeline.clone();

        let detector = Arc::new(CapabilityDetector::new(
            Arc::clone(&config.platform),
            config.codec_probe.clone(),
            settings.codec_probe_timeout,
        ));
        let switcher = Arc::new(CodecSwitcher::new(Arc::clone(&detector)));
        let prober = Arc::new(RangeProber::new(
            Arc::clone(&config.http_client),
            settings.range_probe_timeout,
            settings.range_cache_capacity,
        ));

        let mut reporter = ErrorReporter::new(config.reporter.capacity, Arc::clone(&config.clock));
        if let Some(endpoint) = &config.reporter.endpoint {
            reporter = reporter.with_submitter(Arc::new(HttpReportSubmitter::new(
                Arc::clone(&config.http_client),
                endpoint.clone(),
            )));
        }

        let mut factory = AdapterFactory::new(platform, Arc::clone(&config.http_client))
            .with_range_prober(Arc::clone(&prober))
            .with_capability_detector(Arc::clone(&detector));
        if let Some(provider) = config.native_backend.clone() {
            factory = factory.with_native_backend(provider);
        }
        if let Some(provider) = config.web_host.clone() {
            factory = factory.with_web_host(provider);
        }

        info!(
            platform = ?platform,
            native = config.native_backend.is_some(),
            web = config.web_host.is_some(),
            "Core service initialized"
        );

        Ok(Self {
            platform,
            detector,
            switcher,
            prober,
            reporter: Arc::new(reporter),
            factory: Arc::new(factory),
            event_bus: EventBus::new(config.event_buffer_size),
            clock: config.clock,
            settings,
        })
    }

    /// Fresh pipeline wired to this service. Keep it to cancel a resolution
    /// started with [`resolve_with`](Self::resolve_with).
    pub fn pipeline(&self) -> RedundancyPipeline {
        RedundancyPipeline::new(Arc::clone(&self.factory))
            .with_reporter(Arc::clone(&self.reporter))
            .with_event_bus(self.event_bus.clone())
            .with_clock(Arc::clone(&self.clock))
            .with_settings(&self.settings)
    }

    /// Classify `url` and walk its fallback chain until an adapter survives.
    pub async fn resolve(
        &self,
        url: &str,
        config: PlayerConfig,
    ) -> std::result::Result<PlaybackSession, ResolveError> {
        let pipeline = self.pipeline();
        self.resolve_with(&pipeline, url, config).await
    }

    /// [`resolve`](Self::resolve) on a caller-held pipeline.
    #[instrument(skip_all, fields(url = redact_url(url)))]
    pub async fn resolve_with(
        &self,
        pipeline: &RedundancyPipeline,
        url: &str,
        mut config: PlayerConfig,
    ) -> std::result::Result<PlaybackSession, ResolveError> {
        if config.url.is_empty() {
            config.url = url.to_string();
        }
        let source = classify(url);

        if let Err(e) = config.validate() {
            let error = PlayerError::from(e).with_source_url(url);
            self.reporter.report(&error, url, Default::default());
            return Err(ResolveError {
                error,
                chain: self.factory.chain_for(&source),
                source_info: source,
                attempts: Vec::new(),
            });
        }

        match pipeline.run(&source, &config).await {
            Ok(resolved) => Ok(PlaybackSession::new(
                resolved,
                source,
                Some(self.event_bus.clone()),
            )),
            Err(PipelineFailure {
                error,
                chain,
                attempts,
            }) => Err(ResolveError {
                error,
                source_info: source,
                chain,
                attempts,
            }),
        }
    }

    pub fn classify(&self, url: &str) -> SourceInfo {
        classify(url)
    }

    /// Fallback chain `url` would be resolved with on this runtime.
    pub fn chain_for(&self, url: &str) -> FallbackChain {
        self.factory.chain_for(&classify(url))
    }

    pub fn platform(&self) -> PlatformFamily {
        self.platform
    }

    pub fn capabilities(&self) -> Arc<FormatCapabilities> {
        self.detector.detect_capabilities()
    }

    pub fn capability_detector(&self) -> Arc<CapabilityDetector> {
        Arc::clone(&self.detector)
    }

    pub fn codec_switcher(&self) -> Arc<CodecSwitcher> {
        Arc::clone(&self.switcher)
    }

    pub fn range_prober(&self) -> Arc<RangeProber> {
        Arc::clone(&self.prober)
    }

    pub fn reporter(&self) -> Arc<ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Drop cached capability, codec probe and range probe results.
    pub fn reset_capabilities(&self) {
        self.detector.reset();
        self.prober.reset();
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("platform", &self.platform)
            .field("factory", &self.factory)
            .field("reporter", &self.reporter)
            .field("settings", &self.settings)
            .finish()
    }
}
