//! # Redundancy Pipeline
//!
//! Walks a source's fallback chain until one adapter survives its liveness
//! test.
//!
//! ## States
//!
//! ```text
//! Idle -> Attempting(1) -> Succeeded
//!                       -> Failed(1) -> Attempting(2) -> ... -> Exhausted
//!      (any point)      -> Cancelled
//! ```
//!
//! ## Liveness test
//!
//! After `initialize` returns, the adapter must stay free of `error`/`fatal`
//! events for the liveness window (3 s by default). `initialize` plus the
//! window must finish inside the ceiling (10 s by default). Warnings never
//! fail an attempt.
//!
//! The test only proves the absence of an *immediate* error. Web-backed
//! adapters in particular pass as soon as the page mounts quietly, even if
//! the page later turns out not to play the media.
//!
//! ## Failure handling
//!
//! A failed attempt is recorded, reported, destroyed and, when another chain
//! entry remains, followed by the retry delay. Adapter construction failures
//! count as failed attempts. The caller only ever sees one terminal error:
//! `ALL_ADAPTERS_FAILED` (or `UNSUPPORTED_SOURCE` for an empty chain, or
//! `PIPELINE_CANCELLED`).

use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_media::SourceInfo;
use core_runtime::config::PipelineSettings;
use core_runtime::events::{CoreEvent, EventBus, ResolutionEvent};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PlayerConfig;
use crate::error::{ErrorCode, PlayerError};
use crate::factory::{AdapterFactory, FallbackChain};
use crate::listeners::{Listeners, Subscription};
use crate::reporter::ErrorReporter;
use crate::traits::{AdapterKind, PlayerAdapter};

pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(3);
pub const DEFAULT_LIVENESS_CEILING: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Attempting,
    Succeeded,
    Failed,
    Exhausted,
    Cancelled,
}

/// Record of one chain entry tried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAttempt {
    pub adapter_kind: AdapterKind,
    /// 1-based.
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub succeeded: bool,
    pub error: Option<PlayerError>,
    pub duration_ms: u64,
    /// Passed over by the capability check without instantiating an adapter.
    #[serde(default)]
    pub skipped: bool,
}

/// Stage transition delivered to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineProgress {
    pub stage: PipelineStage,
    /// 1-based; `0` before the first attempt.
    pub attempt: u32,
    pub adapter: Option<AdapterKind>,
}

/// Move from one chain entry to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackTransition {
    pub from: AdapterKind,
    pub to: AdapterKind,
}

pub type ProgressCallback = Arc<dyn Fn(&PipelineProgress) + Send + Sync>;
pub type FallbackCallback = Arc<dyn Fn(&FallbackTransition) + Send + Sync>;

/// Live adapter that passed its liveness test.
pub struct ResolvedPlayback {
    pub adapter: Arc<dyn PlayerAdapter>,
    pub chain: FallbackChain,
    pub attempts: Vec<PipelineAttempt>,
}

impl fmt::Debug for ResolvedPlayback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPlayback")
            .field("adapter", &self.adapter.kind())
            .field("chain", &self.chain)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Terminal failure of a resolution.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub error: PlayerError,
    pub chain: FallbackChain,
    pub attempts: Vec<PipelineAttempt>,
}

enum Outcome {
    Live,
    Failed(PlayerError),
    Cancelled,
}

// ============================================================================
// Pipeline
// ============================================================================

/// One resolution's chain traversal. Create a fresh pipeline per `run`;
/// [`cancel`](Self::cancel) is permanent.
pub struct RedundancyPipeline {
    factory: Arc<AdapterFactory>,
    reporter: Option<Arc<ErrorReporter>>,
    event_bus: Option<EventBus>,
    clock: Arc<dyn Clock>,
    liveness_window: Duration,
    liveness_ceiling: Duration,
    max_backoff: Duration,
    cancel: CancellationToken,
    stage: Mutex<PipelineStage>,
    progress: Listeners<PipelineProgress>,
    fallback: Listeners<FallbackTransition>,
}

impl RedundancyPipeline {
    pub fn new(factory: Arc<AdapterFactory>) -> Self {
        Self {
            factory,
            reporter: None,
            event_bus: None,
            clock: Arc::new(SystemClock),
            liveness_window: DEFAULT_LIVENESS_WINDOW,
            liveness_ceiling: DEFAULT_LIVENESS_CEILING,
            max_backoff: DEFAULT_MAX_BACKOFF,
            cancel: CancellationToken::new(),
            stage: Mutex::new(PipelineStage::Idle),
            progress: Listeners::new(),
            fallback: Listeners::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: &PipelineSettings) -> Self {
        self.liveness_window = settings.liveness_window;
        self.liveness_ceiling = settings.liveness_ceiling;
        self.max_backoff = settings.max_backoff;
        self
    }

    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = window;
        self
    }

    pub fn with_liveness_ceiling(mut self, ceiling: Duration) -> Self {
        self.liveness_ceiling = ceiling;
        self
    }

    pub fn on_progress(&self, callback: ProgressCallback) -> Subscription {
        self.progress.subscribe(callback)
    }

    pub fn on_fallback(&self, callback: FallbackCallback) -> Subscription {
        self.fallback.subscribe(callback)
    }

    pub fn stage(&self) -> PipelineStage {
        *self.stage.lock()
    }

    /// Abort the running resolution. Pending timers stop and the attempting
    /// adapter is destroyed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this pipeline; hand it to UI code.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&self, stage: PipelineStage, attempt: u32, adapter: Option<AdapterKind>) {
        *self.stage.lock() = stage;
        self.progress.notify(&PipelineProgress {
            stage,
            attempt,
            adapter,
        });
    }

    fn publish(&self, event: ResolutionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Resolution(event)).ok();
        }
    }

    /// Resolve `source` to a live adapter.
    #[instrument(skip_all, fields(kind = %source.kind, url = redact_url(&source.original_url)))]
    pub async fn run(
        &self,
        source: &SourceInfo,
        config: &PlayerConfig,
    ) -> Result<ResolvedPlayback, PipelineFailure> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(source, self.factory.chain_for(source), Vec::new(), 0));
        }

        let (chain, head) = self.factory.build(source);
        info!(chain = %chain, "Resolving source");
        self.publish(ResolutionEvent::Classified {
            url: redact_url(&source.original_url).to_string(),
            kind: source.kind.as_str().to_string(),
            platform: source.platform_label.clone(),
            chain: chain.names(),
        });

        if chain.is_empty() {
            let error = PlayerError::fatal(
                ErrorCode::UnsupportedSource,
                source
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Unsupported source".to_string()),
            )
            .with_source_url(source.original_url.clone());
            return Err(self.exhausted(source, chain, Vec::new(), error));
        }

        let max_attempts = config.retry.max_attempts(chain.len());
        let mut head = Some(head);
        let mut attempts: Vec<PipelineAttempt> = Vec::with_capacity(max_attempts);

        let kinds: Vec<AdapterKind> = chain.kinds().iter().copied().take(max_attempts).collect();
        for (index, kind) in kinds.into_iter().enumerate() {
            let attempt_number = index as u32 + 1;
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(source, chain, attempts, attempt_number));
            }

            self.transition(PipelineStage::Attempting, attempt_number, Some(kind));
            self.publish(ResolutionEvent::AttemptStarted {
                adapter: kind.to_string(),
                attempt: attempt_number,
            });
            debug!(adapter = %kind, attempt = attempt_number, "Attempt started");

            let started_at = self.clock.now();
            let started = Instant::now();

            if let Some(reason) = self.factory.unsupported_reason(kind, source) {
                head = None;
                info!(adapter = %kind, attempt = attempt_number, "Skipping adapter: {}", reason);
                self.publish(ResolutionEvent::AttemptSkipped {
                    adapter: kind.to_string(),
                    attempt: attempt_number,
                    reason: reason.clone(),
                });
                attempts.push(PipelineAttempt {
                    adapter_kind: kind,
                    attempt_number,
                    started_at,
                    succeeded: false,
                    error: Some(tag(
                        PlayerError::error(ErrorCode::UnsupportedFormat, reason),
                        kind,
                        source,
                    )),
                    duration_ms: 0,
                    skipped: true,
                });
                self.transition(PipelineStage::Failed, attempt_number, Some(kind));
                if let Some(next) = chain.get(index + 1).filter(|_| index + 1 < max_attempts) {
                    self.fallback.notify(&FallbackTransition { from: kind, to: next });
                    self.publish(ResolutionEvent::FallbackTriggered {
                        from: kind.to_string(),
                        to: next.to_string(),
                    });
                }
                continue;
            }

            let created = match head.take() {
                Some(head) => head,
                None => self.factory.create(kind, source),
            };
            let error = match created {
                Ok(adapter) => match self.attempt(adapter.as_ref(), config).await {
                    Outcome::Live => {
                        let duration_ms = started.elapsed().as_millis() as u64;
                        attempts.push(PipelineAttempt {
                            adapter_kind: kind,
                            attempt_number,
                            started_at,
                            succeeded: true,
                            error: None,
                            duration_ms,
                            skipped: false,
                        });
                        self.transition(PipelineStage::Succeeded, attempt_number, Some(kind));
                        self.publish(ResolutionEvent::Succeeded {
                            adapter: kind.to_string(),
                            attempt: attempt_number,
                            duration_ms,
                        });
                        info!(adapter = %kind, attempt = attempt_number, duration_ms, "Source resolved");
                        return Ok(ResolvedPlayback {
                            adapter,
                            chain,
                            attempts,
                        });
                    }
                    Outcome::Cancelled => {
                        adapter.destroy().await;
                        return Err(self.cancelled(source, chain, attempts, attempt_number));
                    }
                    Outcome::Failed(error) => {
                        adapter.destroy().await;
                        error
                    }
                },
                Err(e) => PlayerError::from(e),
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            let error = tag(error, kind, source);
            warn!(
                adapter = %kind,
                attempt = attempt_number,
                code = %error.code,
                "Attempt failed: {}",
                error.message
            );
            self.record_failure(source, &chain, kind, attempt_number, &error);
            self.publish(ResolutionEvent::AttemptFailed {
                adapter: kind.to_string(),
                attempt: attempt_number,
                code: error.code.to_string(),
                message: error.message.clone(),
                duration_ms,
            });
            attempts.push(PipelineAttempt {
                adapter_kind: kind,
                attempt_number,
                started_at,
                succeeded: false,
                error: Some(error),
                duration_ms,
                skipped: false,
            });
            self.transition(PipelineStage::Failed, attempt_number, Some(kind));

            let next = chain.get(index + 1).filter(|_| index + 1 < max_attempts);
            if let Some(next) = next {
                self.fallback.notify(&FallbackTransition { from: kind, to: next });
                self.publish(ResolutionEvent::FallbackTriggered {
                    from: kind.to_string(),
                    to: next.to_string(),
                });

                let delay = config.retry.delay_for(index as u32, self.max_backoff);
                debug!(from = %kind, to = %next, delay_ms = delay.as_millis() as u64, "Falling back");
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return Err(self.cancelled(source, chain, attempts, attempt_number));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        let last = attempts
            .last()
            .and_then(|attempt| attempt.error.as_ref())
            .map(|error| format!("; last error: {error}"))
            .unwrap_or_default();
        let error = PlayerError::fatal(
            ErrorCode::AllAdaptersFailed,
            format!(
                "All {} playback attempts failed (chain: {}){}",
                attempts.len(),
                chain,
                last
            ),
        )
        .with_recoverable(false)
        .with_source_url(source.original_url.clone());

        Err(self.exhausted(source, chain, attempts, error))
    }

    /// Initialize `adapter` and hold it through the liveness window.
    async fn attempt(&self, adapter: &dyn PlayerAdapter, config: &PlayerConfig) -> Outcome {
        let (tx, mut errors) = mpsc::unbounded_channel();
        let subscription = adapter.on_error(Arc::new(move |error: &PlayerError| {
            if error.fails_attempt() {
                tx.send(error.clone()).ok();
            }
        }));

        let ceiling = self.liveness_ceiling;
        let deadline = tokio::time::sleep(ceiling);
        tokio::pin!(deadline);
        let timed_out = || {
            PlayerError::error(
                ErrorCode::LivenessTimeout,
                format!("{} did not become ready within {:?}", adapter.kind(), ceiling),
            )
        };

        let initialized = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(Outcome::Cancelled),
            Some(error) = errors.recv() => Some(Outcome::Failed(error)),
            _ = &mut deadline => Some(Outcome::Failed(timed_out())),
            result = adapter.initialize(config) => match result {
                Ok(()) => None,
                Err(error) => Some(Outcome::Failed(error)),
            },
        };

        let outcome = match initialized {
            Some(outcome) => outcome,
            None => {
                let window = tokio::time::sleep(self.liveness_window);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Outcome::Cancelled,
                    Some(error) = errors.recv() => Outcome::Failed(error),
                    _ = window => Outcome::Live,
                    _ = &mut deadline => Outcome::Failed(timed_out()),
                }
            }
        };

        subscription.unsubscribe();
        outcome
    }

    fn record_failure(
        &self,
        source: &SourceInfo,
        chain: &FallbackChain,
        kind: AdapterKind,
        attempt: u32,
        error: &PlayerError,
    ) {
        let Some(reporter) = &self.reporter else {
            return;
        };
        let mut context = HashMap::new();
        context.insert("adapter".to_string(), kind.to_string());
        context.insert("attempt".to_string(), attempt.to_string());
        context.insert("chain".to_string(), chain.to_string());
        context.insert("source_kind".to_string(), source.kind.to_string());
        reporter.report(error, &source.original_url, context);
    }

    fn exhausted(
        &self,
        source: &SourceInfo,
        chain: FallbackChain,
        attempts: Vec<PipelineAttempt>,
        error: PlayerError,
    ) -> PipelineFailure {
        let attempt_count = attempts.len() as u32;
        warn!(attempts = attempt_count, chain = %chain, code = %error.code, "{}", error.message);
        if let Some(reporter) = &self.reporter {
            let mut context = HashMap::new();
            context.insert("chain".to_string(), chain.to_string());
            context.insert("attempts".to_string(), attempt_count.to_string());
            reporter.report(&error, &source.original_url, context);
        }
        self.transition(PipelineStage::Exhausted, attempt_count, None);
        self.publish(ResolutionEvent::Exhausted {
            attempts: attempt_count,
            chain: chain.names(),
            code: error.code.to_string(),
        });
        PipelineFailure {
            error,
            chain,
            attempts,
        }
    }

    fn cancelled(
        &self,
        source: &SourceInfo,
        chain: FallbackChain,
        attempts: Vec<PipelineAttempt>,
        attempt: u32,
    ) -> PipelineFailure {
        info!(attempt, "Resolution cancelled");
        self.transition(PipelineStage::Cancelled, attempt, None);
        self.publish(ResolutionEvent::Cancelled { attempt });
        PipelineFailure {
            error: PlayerError::fatal(ErrorCode::PipelineCancelled, "Resolution was cancelled")
                .with_source_url(source.original_url.clone()),
            chain,
            attempts,
        }
    }
}

/// Attach adapter and source to errors raised before the adapter could.
fn tag(mut error: PlayerError, kind: AdapterKind, source: &SourceInfo) -> PlayerError {
    if error.platform.is_none() {
        error.platform = Some(kind.to_string());
    }
    if error.source_url.is_none() {
        error.source_url = Some(source.original_url.clone());
    }
    error
}

impl fmt::Debug for RedundancyPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedundancyPipeline")
            .field("stage", &self.stage())
            .field("liveness_window", &self.liveness_window)
            .field("liveness_ceiling", &self.liveness_ceiling)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
