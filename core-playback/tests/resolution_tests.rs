//! End-to-end resolution tests for core-playback
//!
//! Drives the redundancy pipeline and playback session against scripted
//! native and web host runtimes:
//! - Fallback on errors raised inside the liveness window
//! - Chain exhaustion, unsupported sources and retry caps
//! - Cloud share and social embed routing
//! - Cancellation and adapter teardown
//! - Session event relay and destroy semantics

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::platform::PlatformFamily;
use bridge_traits::playback::{
    BackendErrorKind, BackendEvent, MediaLoadRequest, NativePlayerBackend,
    NativePlayerBackendProvider, WebPageContent, WebPlayerHost, WebPlayerHostProvider,
    WebPlayerPage,
};
use bridge_traits::time::SystemClock;
use bytes::Bytes;
use core_media::{classify, RangeProber};
use core_playback::{
    AdapterFactory, AdapterKind, ErrorCode, ErrorReporter, FallbackTransition, PipelineProgress,
    PipelineStage, PlaybackSession, PlayerConfig, RedundancyPipeline, RetryPolicy, Subscription,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, ResolutionEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

// ============================================================================
// Scripted Native Backend
// ============================================================================

#[derive(Default)]
struct NativeLog {
    created: AtomicUsize,
    loads: AtomicUsize,
    plays: AtomicUsize,
    seeks: AtomicUsize,
    released: AtomicUsize,
    urls: Mutex<Vec<String>>,
    events: Mutex<Option<UnboundedSender<BackendEvent>>>,
}

impl NativeLog {
    fn send(&self, event: BackendEvent) {
        if let Some(tx) = self.events.lock().as_ref() {
            tx.send(event).ok();
        }
    }
}

#[derive(Clone, Default)]
enum LoadBehavior {
    #[default]
    Succeed,
    Fail,
    Hang,
}

struct ScriptedNative {
    log: Arc<NativeLog>,
    behavior: LoadBehavior,
    /// Events sent right after a load succeeds.
    on_load: Vec<BackendEvent>,
}

impl ScriptedNative {
    fn new(behavior: LoadBehavior) -> Self {
        Self {
            log: Arc::new(NativeLog::default()),
            behavior,
            on_load: Vec::new(),
        }
    }

    fn with_on_load(mut self, events: Vec<BackendEvent>) -> Self {
        self.on_load = events;
        self
    }
}

impl NativePlayerBackendProvider for ScriptedNative {
    fn create(&self) -> BridgeResult<Box<dyn NativePlayerBackend>> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedBackend {
            log: Arc::clone(&self.log),
            behavior: self.behavior.clone(),
            on_load: self.on_load.clone(),
        }))
    }
}

struct ScriptedBackend {
    log: Arc<NativeLog>,
    behavior: LoadBehavior,
    on_load: Vec<BackendEvent>,
}

#[async_trait]
impl NativePlayerBackend for ScriptedBackend {
    async fn load(
        &self,
        request: MediaLoadRequest,
        events: UnboundedSender<BackendEvent>,
    ) -> BridgeResult<()> {
        self.log.loads.fetch_add(1, Ordering::SeqCst);
        self.log.urls.lock().push(request.url);
        match self.behavior {
            LoadBehavior::Fail => Err(BridgeError::OperationFailed("404 Not Found".to_string())),
            LoadBehavior::Hang => std::future::pending().await,
            LoadBehavior::Succeed => {
                for event in &self.on_load {
                    events.send(event.clone()).ok();
                }
                *self.log.events.lock() = Some(events);
                Ok(())
            }
        }
    }

    async fn play(&self) -> BridgeResult<()> {
        self.log.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> BridgeResult<()> {
        self.log.seeks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }

    async fn set_muted(&self, _muted: bool) -> BridgeResult<()> {
        Ok(())
    }

    async fn set_rate(&self, _rate: f32) -> BridgeResult<()> {
        Ok(())
    }

    async fn release(&self) -> BridgeResult<()> {
        self.log.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Scripted Web Host
// ============================================================================

#[derive(Default)]
struct WebLog {
    created: AtomicUsize,
    mounted: AtomicUsize,
    unmounted: AtomicUsize,
    pages: Mutex<Vec<WebPlayerPage>>,
    posted: Mutex<Vec<String>>,
}

struct ScriptedWeb {
    log: Arc<WebLog>,
    available: bool,
    /// Inbound messages per mount, in mount order. Later mounts stay quiet.
    scripts: Arc<Mutex<VecDeque<Vec<String>>>>,
}

impl ScriptedWeb {
    fn quiet() -> Self {
        Self {
            log: Arc::new(WebLog::default()),
            available: true,
            scripts: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::quiet()
        }
    }

    fn with_script(self, messages: Vec<&str>) -> Self {
        self.scripts
            .lock()
            .push_back(messages.into_iter().map(str::to_string).collect());
        self
    }
}

impl WebPlayerHostProvider for ScriptedWeb {
    fn create(&self) -> BridgeResult<Box<dyn WebPlayerHost>> {
        if !self.available {
            return Err(BridgeError::NotAvailable("no web runtime".to_string()));
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            log: Arc::clone(&self.log),
            scripts: Arc::clone(&self.scripts),
        }))
    }
}

struct ScriptedPage {
    log: Arc<WebLog>,
    scripts: Arc<Mutex<VecDeque<Vec<String>>>>,
}

#[async_trait]
impl WebPlayerHost for ScriptedPage {
    async fn mount(&self, page: WebPlayerPage, inbound: UnboundedSender<String>) -> BridgeResult<()> {
        self.log.mounted.fetch_add(1, Ordering::SeqCst);
        self.log.pages.lock().push(page);
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        for message in script {
            inbound.send(message).ok();
        }
        Ok(())
    }

    async fn post_message(&self, message: String) -> BridgeResult<()> {
        self.log.posted.lock().push(message);
        Ok(())
    }

    async fn unmount(&self) -> BridgeResult<()> {
        self.log.unmounted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Canned HTTP
// ============================================================================

#[derive(Default)]
struct CannedHttp {
    responses: HashMap<(String, String), (u16, Vec<(&'static str, &'static str)>, &'static str)>,
    calls: AtomicUsize,
}

impl CannedHttp {
    fn with(mut self, method: HttpMethod, url: &str, status: u16, headers: Vec<(&'static str, &'static str)>, body: &'static str) -> Self {
        self.responses
            .insert((format!("{method:?}"), url.to_string()), (status, headers, body));
        self
    }
}

#[async_trait]
impl HttpClient for CannedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = (format!("{:?}", request.method), request.url.clone());
        match self.responses.get(&key) {
            Some((status, headers, body)) => Ok(HttpResponse {
                status: *status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: Bytes::from_static(body.as_bytes()),
            }),
            None => Err(BridgeError::OperationFailed(format!(
                "connection refused: {}",
                request.url
            ))),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    native: Arc<NativeLog>,
    http: Arc<CannedHttp>,
    web: Arc<WebLog>,
    reporter: Arc<ErrorReporter>,
    bus: EventBus,
    pipeline: RedundancyPipeline,
}

fn harness(native: ScriptedNative, web: ScriptedWeb, http: CannedHttp, probe_ranges: bool) -> Harness {
    let native_log = Arc::clone(&native.log);
    let web_log = Arc::clone(&web.log);
    let canned = Arc::new(http);
    let http: Arc<dyn HttpClient> = canned.clone();

    let mut factory = AdapterFactory::new(PlatformFamily::Linux, Arc::clone(&http))
        .with_native_backend(Arc::new(native))
        .with_web_host(Arc::new(web));
    if probe_ranges {
        factory = factory.with_range_prober(Arc::new(RangeProber::new(
            Arc::clone(&http),
            Duration::from_secs(5),
            16,
        )));
    }

    let reporter = Arc::new(ErrorReporter::new(50, Arc::new(SystemClock)));
    let bus = EventBus::new(256);
    let pipeline = RedundancyPipeline::new(Arc::new(factory))
        .with_reporter(Arc::clone(&reporter))
        .with_event_bus(bus.clone());

    Harness {
        native: native_log,
        http: canned,
        web: web_log,
        reporter,
        bus,
        pipeline,
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const MP4_URL: &str = "https://cdn.example.com/media/clip.mp4";
const HLS_URL: &str = "https://cdn.example.com/live/master.m3u8";

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_youtube_embed_error_falls_back_to_webview() {
    let web = ScriptedWeb::quiet().with_script(vec![
        r#"{"type":"ready","version":1}"#,
        r#"{"type":"error","data":{"code":150,"message":"embedding disabled"}}"#,
    ]);
    let h = harness(ScriptedNative::new(LoadBehavior::Succeed), web, CannedHttp::default(), false);
    let mut rx = h.bus.subscribe();

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&transitions);
    let _fallbacks = h
        .pipeline
        .on_fallback(Arc::new(move |t: &FallbackTransition| seen.lock().push(*t)));

    let source = classify(YOUTUBE_URL);
    let resolved = h
        .pipeline
        .run(&source, &PlayerConfig::new(YOUTUBE_URL))
        .await
        .expect("webview should survive");

    assert_eq!(resolved.adapter.kind(), AdapterKind::WebView);
    assert_eq!(resolved.chain.to_string(), "youtube -> webview");
    assert_eq!(resolved.attempts.len(), 2);

    let first = &resolved.attempts[0];
    assert_eq!(first.adapter_kind, AdapterKind::YouTube);
    assert!(!first.succeeded);
    let error = first.error.as_ref().unwrap();
    assert_eq!(error.code, ErrorCode::EmbedError);
    assert!(!error.recoverable);
    assert_eq!(error.platform.as_deref(), Some("youtube"));
    assert!(resolved.attempts[1].succeeded);

    assert_eq!(
        *transitions.lock(),
        vec![FallbackTransition {
            from: AdapterKind::YouTube,
            to: AdapterKind::WebView
        }]
    );
    assert_eq!(h.pipeline.stage(), PipelineStage::Succeeded);

    // YouTube page torn down, webview page still mounted.
    assert_eq!(h.web.mounted.load(Ordering::SeqCst), 2);
    assert_eq!(h.web.unmounted.load(Ordering::SeqCst), 1);
    assert!(h.web.posted.lock().iter().any(|m| m.contains(r#""command":"destroy""#)));
    assert_eq!(h.native.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.reporter.len(), 1);

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(CoreEvent::Resolution(ResolutionEvent::Classified { .. }))
    ));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Resolution(ResolutionEvent::FallbackTriggered { from, to })
            if from == "youtube" && to == "webview"
    )));
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Resolution(ResolutionEvent::Succeeded { attempt: 2, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_all_adapters_failing_exhausts_chain() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Fail),
        ScriptedWeb::unavailable(),
        CannedHttp::default(),
        false,
    );

    let failure = h
        .pipeline
        .run(&classify(MP4_URL), &PlayerConfig::new(MP4_URL))
        .await
        .expect_err("nothing can play");

    assert_eq!(failure.error.code, ErrorCode::AllAdaptersFailed);
    assert!(failure.error.is_fatal());
    assert!(!failure.error.recoverable);
    assert!(failure.error.message.contains("native -> webview"));
    assert_eq!(failure.attempts.len(), 2);
    assert_eq!(
        failure.attempts[0].error.as_ref().unwrap().code,
        ErrorCode::LoadFailed
    );
    assert_eq!(
        failure.attempts[1].error.as_ref().unwrap().code,
        ErrorCode::BackendUnavailable
    );
    assert!(failure.attempts.iter().all(|a| !a.succeeded));
    assert_eq!(h.pipeline.stage(), PipelineStage::Exhausted);

    // Failed native attempt released its backend.
    assert_eq!(h.native.loads.load(Ordering::SeqCst), 1);
    assert_eq!(h.native.released.load(Ordering::SeqCst), 1);
    // Two attempt reports plus the terminal one.
    assert_eq!(h.reporter.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_source_makes_no_attempts() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );

    let failure = h
        .pipeline
        .run(&classify(""), &PlayerConfig::default())
        .await
        .expect_err("empty url is unsupported");

    assert_eq!(failure.error.code, ErrorCode::UnsupportedSource);
    assert!(failure.attempts.is_empty());
    assert!(failure.chain.is_empty());
    assert_eq!(h.native.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.web.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.pipeline.stage(), PipelineStage::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_backend_error_inside_window_triggers_fallback() {
    let native = ScriptedNative::new(LoadBehavior::Succeed).with_on_load(vec![BackendEvent::Error {
        kind: BackendErrorKind::Network,
        message: "connection reset".to_string(),
        fatal: true,
    }]);
    let h = harness(native, ScriptedWeb::quiet(), CannedHttp::default(), false);

    let resolved = h
        .pipeline
        .run(&classify(MP4_URL), &PlayerConfig::new(MP4_URL))
        .await
        .unwrap();

    assert_eq!(resolved.adapter.kind(), AdapterKind::WebView);
    assert_eq!(
        resolved.attempts[0].error.as_ref().unwrap().code,
        ErrorCode::NetworkError
    );
    assert_eq!(h.native.released.load(Ordering::SeqCst), 1);

    // The webview fallback loads the raw media URL.
    let pages = h.web.pages.lock();
    assert_eq!(pages[0].content, WebPageContent::Url(MP4_URL.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_warnings_do_not_fail_attempt() {
    let native = ScriptedNative::new(LoadBehavior::Succeed).with_on_load(vec![
        BackendEvent::Error {
            kind: BackendErrorKind::Aborted,
            message: "prefetch aborted".to_string(),
            fatal: false,
        },
        BackendEvent::Ready {
            duration: Some(Duration::from_secs(60)),
        },
    ]);
    let h = harness(native, ScriptedWeb::quiet(), CannedHttp::default(), false);

    let resolved = h
        .pipeline
        .run(&classify(MP4_URL), &PlayerConfig::new(MP4_URL))
        .await
        .unwrap();

    assert_eq!(resolved.adapter.kind(), AdapterKind::Native);
    assert_eq!(resolved.attempts.len(), 1);
    assert!(resolved.attempts[0].succeeded);
    assert_eq!(resolved.adapter.state().duration, Some(Duration::from_secs(60)));
    assert!(h.reporter.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hung_load_hits_liveness_ceiling() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Hang),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );

    let resolved = h
        .pipeline
        .run(&classify(MP4_URL), &PlayerConfig::new(MP4_URL))
        .await
        .unwrap();

    let first = &resolved.attempts[0];
    assert_eq!(first.error.as_ref().unwrap().code, ErrorCode::LivenessTimeout);
    assert!(first.duration_ms >= 10_000);
    assert_eq!(resolved.adapter.kind(), AdapterKind::WebView);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_still_walks_whole_chain() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );
    let config = PlayerConfig::new(HLS_URL).with_retry(RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    });

    // Manifest fetch is refused, the native entry takes over.
    let resolved = h.pipeline.run(&classify(HLS_URL), &config).await.unwrap();

    let kinds: Vec<AdapterKind> = resolved.attempts.iter().map(|a| a.adapter_kind).collect();
    assert_eq!(kinds, vec![AdapterKind::Hls, AdapterKind::Native]);
    assert_eq!(
        resolved.attempts[0].error.as_ref().unwrap().code,
        ErrorCode::NetworkError
    );
    assert_eq!(resolved.adapter.kind(), AdapterKind::Native);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_limit_caps_attempts() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );
    let config = PlayerConfig::new(HLS_URL).with_retry(RetryPolicy {
        attempt_limit: Some(1),
        ..RetryPolicy::default()
    });

    let failure = h.pipeline.run(&classify(HLS_URL), &config).await.unwrap_err();

    assert_eq!(failure.chain.len(), 3);
    assert_eq!(failure.attempts.len(), 1);
    assert_eq!(failure.attempts[0].adapter_kind, AdapterKind::Hls);
    assert_eq!(failure.error.code, ErrorCode::AllAdaptersFailed);
    assert_eq!(h.native.created.load(Ordering::SeqCst), 0);
}

/// Instants at which each attempt failed and the next one started.
fn record_timeline(pipeline: &RedundancyPipeline) -> (Arc<Mutex<Vec<(PipelineStage, Instant)>>>, Subscription) {
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&timeline);
    let subscription = pipeline.on_progress(Arc::new(move |progress: &PipelineProgress| {
        sink.lock().push((progress.stage, Instant::now()));
    }));
    (timeline, subscription)
}

fn gaps(timeline: &[(PipelineStage, Instant)]) -> Vec<Duration> {
    timeline
        .windows(2)
        .filter(|pair| pair[0].0 == PipelineStage::Failed && pair[1].0 == PipelineStage::Attempting)
        .map(|pair| pair[1].1 - pair[0].1)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_retry_delay_elapses_between_attempts() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Fail),
        ScriptedWeb::unavailable(),
        CannedHttp::default(),
        false,
    );
    let (timeline, _progress) = record_timeline(&h.pipeline);

    h.pipeline
        .run(&classify(HLS_URL), &PlayerConfig::new(HLS_URL))
        .await
        .unwrap_err();

    let gaps = gaps(&timeline.lock());
    assert_eq!(gaps.len(), 2);
    for gap in gaps {
        assert!(gap >= Duration::from_secs(2), "gap was {gap:?}");
        assert!(gap < Duration::from_secs(3), "gap was {gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_doubles_gap() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Fail),
        ScriptedWeb::unavailable(),
        CannedHttp::default(),
        false,
    );
    let (timeline, _progress) = record_timeline(&h.pipeline);
    let config = PlayerConfig::new(HLS_URL).with_retry(RetryPolicy {
        exponential_backoff: true,
        ..RetryPolicy::default()
    });

    let failure = h.pipeline.run(&classify(HLS_URL), &config).await.unwrap_err();
    assert_eq!(failure.attempts.len(), 3);

    let gaps = gaps(&timeline.lock());
    assert_eq!(gaps.len(), 2);
    assert!(gaps[0] >= Duration::from_secs(2) && gaps[0] < Duration::from_secs(4));
    assert!(gaps[1] >= Duration::from_secs(4), "second gap was {:?}", gaps[1]);
}

#[tokio::test(start_paused = true)]
async fn test_hls_manifest_feeds_quality_levels() {
    let playlist = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n\
low.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720\n\
mid.m3u8\n";
    let http = CannedHttp::default().with(HttpMethod::Get, HLS_URL, 200, vec![], playlist);
    let h = harness(ScriptedNative::new(LoadBehavior::Succeed), ScriptedWeb::quiet(), http, false);

    let resolved = h
        .pipeline
        .run(&classify(HLS_URL), &PlayerConfig::new(HLS_URL))
        .await
        .unwrap();

    assert_eq!(resolved.adapter.kind(), AdapterKind::Hls);
    let levels = resolved.adapter.quality_levels();
    assert_eq!(levels.len(), 3);
    assert!(levels[0].is_auto());
    assert_eq!(levels[1].height, Some(720));
    assert_eq!(h.native.urls.lock().as_slice(), [HLS_URL.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_destroys_attempting_adapter_once() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );
    let source = classify(MP4_URL);
    let config = PlayerConfig::new(MP4_URL);

    let (result, ()) = tokio::join!(h.pipeline.run(&source, &config), async {
        // Inside the 3 s liveness window of the native attempt.
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.pipeline.cancel();
    });

    let failure = result.unwrap_err();
    assert_eq!(failure.error.code, ErrorCode::PipelineCancelled);
    assert!(failure.attempts.is_empty());
    assert_eq!(h.pipeline.stage(), PipelineStage::Cancelled);
    assert_eq!(h.native.released.load(Ordering::SeqCst), 1);
    assert_eq!(h.web.created.load(Ordering::SeqCst), 0);

    // Cancellation is permanent.
    assert!(h.pipeline.is_cancelled());
    let failure = h.pipeline.run(&source, &config).await.unwrap_err();
    assert_eq!(failure.error.code, ErrorCode::PipelineCancelled);
}

#[tokio::test(start_paused = true)]
async fn test_range_unsupported_disables_seek_without_failing() {
    let http = CannedHttp::default().with(
        HttpMethod::Head,
        MP4_URL,
        200,
        vec![("Content-Length", "1048576")],
        "",
    );
    let h = harness(ScriptedNative::new(LoadBehavior::Succeed), ScriptedWeb::quiet(), http, true);

    let source = classify(MP4_URL);
    let resolved = h
        .pipeline
        .run(&source, &PlayerConfig::new(MP4_URL))
        .await
        .unwrap();
    assert_eq!(resolved.adapter.kind(), AdapterKind::Native);

    let session = PlaybackSession::new(resolved, source, None);
    assert!(!session.capabilities().supports_seek);

    session.seek(Duration::from_secs(30)).await;
    assert_eq!(h.native.seeks.load(Ordering::SeqCst), 0);
    assert_eq!(session.state().current_time, Duration::ZERO);
    assert_eq!(h.http.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drive_share_plays_resolved_download_natively() {
    let share = "https://drive.google.com/file/d/1AbC_dEf-234/view?usp=sharing";
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );

    let resolved = h
        .pipeline
        .run(&classify(share), &PlayerConfig::new(share))
        .await
        .unwrap();

    assert_eq!(resolved.chain.to_string(), "cloud -> webview");
    assert_eq!(resolved.adapter.kind(), AdapterKind::Cloud);
    assert_eq!(
        h.native.urls.lock().as_slice(),
        ["https://drive.google.com/uc?export=download&id=1AbC_dEf-234".to_string()]
    );
    assert_eq!(h.web.created.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_mega_share_falls_back_to_embed_page() {
    let share = "https://mega.nz/file/Xy12_ab3";
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );

    let resolved = h
        .pipeline
        .run(&classify(share), &PlayerConfig::new(share))
        .await
        .unwrap();

    assert_eq!(resolved.adapter.kind(), AdapterKind::WebView);
    assert_eq!(
        resolved.attempts[0].error.as_ref().unwrap().code,
        ErrorCode::UnsupportedSource
    );
    assert_eq!(h.native.loads.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.web.pages.lock()[0].content,
        WebPageContent::Url("https://mega.nz/embed/Xy12_ab3".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_tiktok_post_mounts_social_embed() {
    let post = "https://www.tiktok.com/@someone/video/7212345678901234567";
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );

    let resolved = h
        .pipeline
        .run(&classify(post), &PlayerConfig::new(post))
        .await
        .unwrap();

    assert_eq!(resolved.chain.to_string(), "social -> webview");
    assert_eq!(resolved.adapter.kind(), AdapterKind::Social);
    assert_eq!(resolved.attempts.len(), 1);
    assert_eq!(
        h.web.pages.lock()[0].content,
        WebPageContent::Url("https://www.tiktok.com/embed/v2/7212345678901234567".to_string())
    );
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_session_relays_events_and_destroys_once() {
    let h = harness(
        ScriptedNative::new(LoadBehavior::Succeed),
        ScriptedWeb::quiet(),
        CannedHttp::default(),
        false,
    );
    let source = classify(MP4_URL);
    let resolved = h
        .pipeline
        .run(&source, &PlayerConfig::new(MP4_URL))
        .await
        .unwrap();

    let session = PlaybackSession::new(resolved, source, Some(h.bus.clone()));
    let mut rx = h.bus.subscribe();

    assert_eq!(session.adapter_kind(), AdapterKind::Native);
    assert_eq!(session.attempts().len(), 1);
    assert_eq!(session.source().original_url, MP4_URL);

    session.play().await;
    assert_eq!(h.native.plays.load(Ordering::SeqCst), 1);
    assert!(session.state().is_playing);

    h.native.send(BackendEvent::Progress {
        position: Duration::from_secs(12),
        buffered_fraction: 0.25,
    });
    h.native.send(BackendEvent::Error {
        kind: BackendErrorKind::Decode,
        message: "corrupt frame".to_string(),
        fatal: false,
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let events = drain(&mut rx);
    assert!(events.contains(&CoreEvent::Playback(PlaybackEvent::Started {
        adapter: "native".to_string()
    })));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::PositionChanged { position_ms: 12_000, .. })
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::Error { code, recoverable: true, .. }) if code == "DECODE_ERROR"
    )));

    session.destroy().await;
    session.destroy().await;
    assert!(session.is_destroyed());
    assert_eq!(h.native.released.load(Ordering::SeqCst), 1);

    session.play().await;
    assert_eq!(h.native.plays.load(Ordering::SeqCst), 1);

    let destroyed = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Destroyed { .. })))
        .count();
    assert_eq!(destroyed, 1);
}
