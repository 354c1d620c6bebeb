//! Native backend driver shared by the native, stream and cloud adapters.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{
    BackendErrorKind, BackendEvent, MediaLoadRequest, NativePlayerBackend,
    NativePlayerBackendProvider,
};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::base::{clamp_rate, clamp_volume, fraction_to_percentage, AdapterCore};
use crate::error::{ErrorCode, PlayerError, Severity};
use crate::traits::QualityLevel;

/// Owns one backend instance and the task pumping its events into
/// [`AdapterCore`].
pub(crate) struct NativeEngine {
    core: Arc<AdapterCore>,
    provider: Arc<dyn NativePlayerBackendProvider>,
    backend: RwLock<Option<Arc<dyn NativePlayerBackend>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl NativeEngine {
    pub fn new(core: Arc<AdapterCore>, provider: Arc<dyn NativePlayerBackendProvider>) -> Self {
        Self {
            core,
            provider,
            backend: RwLock::new(None),
            pump: Mutex::new(None),
        }
    }

    pub fn core(&self) -> &Arc<AdapterCore> {
        &self.core
    }

    /// Create a backend and load `request` into it.
    pub async fn load(&self, request: MediaLoadRequest) -> Result<(), PlayerError> {
        let backend: Arc<dyn NativePlayerBackend> = Arc::from(self.provider.create().map_err(|e| {
            PlayerError::fatal(
                ErrorCode::BackendUnavailable,
                format!("Native player backend unavailable: {e}"),
            )
        })?);

        if !backend.supports_protocol(request.protocol) {
            return Err(PlayerError::fatal(
                ErrorCode::UnsupportedFormat,
                format!("Native backend cannot play {:?} media", request.protocol),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.backend.write() = Some(Arc::clone(&backend));
        if let Some(previous) = self.pump.lock().replace(spawn_pump(Arc::clone(&self.core), rx)) {
            previous.abort();
        }

        debug!(adapter = %self.core.kind(), protocol = ?request.protocol, "Loading native media");
        backend.load(request, tx).await.map_err(|e| {
            PlayerError::fatal(ErrorCode::LoadFailed, format!("Native load failed: {e}"))
        })
    }

    fn backend(&self) -> Option<Arc<dyn NativePlayerBackend>> {
        self.backend.read().clone()
    }

    /// Run a backend call; failures go to the error channel.
    async fn run<F, Fut>(&self, operation: &str, call: F) -> bool
    where
        F: FnOnce(Arc<dyn NativePlayerBackend>) -> Fut,
        Fut: Future<Output = BridgeResult<()>>,
    {
        if self.core.is_destroyed() {
            return false;
        }
        let Some(backend) = self.backend() else {
            debug!(adapter = %self.core.kind(), operation, "No backend loaded; ignoring");
            return false;
        };
        match call(backend).await {
            Ok(()) => true,
            Err(e) => {
                self.core.emit_error(PlayerError::error(
                    ErrorCode::PlaybackFailed,
                    format!("{operation} failed: {e}"),
                ));
                false
            }
        }
    }

    pub async fn play(&self) {
        if self.run("play", |b| async move { b.play().await }).await {
            self.core.update(|s| {
                s.is_playing = true;
                s.is_paused = false;
                s.has_ended = false;
            });
        }
    }

    pub async fn pause(&self) {
        if self.run("pause", |b| async move { b.pause().await }).await {
            self.core.update(|s| {
                s.is_playing = false;
                s.is_paused = true;
            });
        }
    }

    pub async fn stop(&self) {
        let stopped = self
            .run("stop", |b| async move {
                b.pause().await?;
                b.seek(Duration::ZERO).await
            })
            .await;
        if stopped {
            self.core.update(|s| {
                s.is_playing = false;
                s.is_paused = true;
                s.has_ended = false;
                s.current_time = Duration::ZERO;
            });
        }
    }

    pub async fn seek(&self, position: Duration) {
        if !self.core.can_seek() {
            debug!(adapter = %self.core.kind(), "Seeking disabled for this source");
            return;
        }
        let target = self.core.clamp_position(position);
        if self.run("seek", |b| async move { b.seek(target).await }).await {
            self.core.update(|s| {
                s.current_time = target;
                s.has_ended = false;
            });
        }
    }

    pub async fn set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        if self.run("set_volume", |b| async move { b.set_volume(volume).await }).await {
            self.core.update(|s| s.volume = volume);
        }
    }

    pub async fn set_muted(&self, muted: bool) {
        if self.run("set_muted", |b| async move { b.set_muted(muted).await }).await {
            self.core.update(|s| s.is_muted = muted);
        }
    }

    pub async fn set_playback_rate(&self, rate: f32) {
        let rate = clamp_rate(rate);
        if self.run("set_playback_rate", |b| async move { b.set_rate(rate).await }).await {
            self.core.update(|s| s.playback_rate = rate);
        }
    }

    /// Pin a variant from the published quality levels, or return to
    /// automatic selection.
    pub async fn set_quality(&self, quality_id: &str) {
        let bandwidth = if quality_id == QualityLevel::AUTO_ID {
            None
        } else {
            match self.core.find_quality(quality_id) {
                Some(level) => level.bandwidth,
                None => {
                    debug!(adapter = %self.core.kind(), quality_id, "Unknown quality level; ignoring");
                    return;
                }
            }
        };
        self.run("set_quality", |b| async move { b.select_variant(bandwidth).await })
            .await;
    }

    /// Tear down. Returns `false` when already destroyed.
    pub async fn destroy(&self) -> bool {
        if !self.core.begin_destroy() {
            return false;
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        let backend = self.backend.write().take();
        if let Some(backend) = backend {
            if let Err(e) = backend.release().await {
                warn!(adapter = %self.core.kind(), error = %e, "Backend release failed");
            }
        }
        self.core.clear_listeners();
        debug!(adapter = %self.core.kind(), "Adapter destroyed");
        true
    }
}

fn spawn_pump(core: Arc<AdapterCore>, mut events: UnboundedReceiver<BackendEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if core.is_destroyed() {
                break;
            }
            apply_backend_event(&core, event);
        }
    })
}

pub(crate) fn apply_backend_event(core: &AdapterCore, event: BackendEvent) {
    match event {
        BackendEvent::Ready { duration } => core.update(|s| {
            if duration.is_some() {
                s.duration = duration;
            }
            s.is_buffering = false;
        }),
        BackendEvent::Playing => core.update(|s| {
            s.is_playing = true;
            s.is_paused = false;
            s.is_buffering = false;
            s.has_ended = false;
        }),
        BackendEvent::Paused => core.update(|s| {
            s.is_playing = false;
            s.is_paused = true;
        }),
        BackendEvent::Buffering(buffering) => core.update(|s| s.is_buffering = buffering),
        BackendEvent::Seeking(seeking) => core.update(|s| s.is_seeking = seeking),
        BackendEvent::Progress {
            position,
            buffered_fraction,
        } => core.update(|s| {
            s.current_time = position;
            s.buffered_percentage = fraction_to_percentage(f64::from(buffered_fraction));
        }),
        BackendEvent::DurationChanged(duration) => core.update(|s| s.duration = Some(duration)),
        BackendEvent::Ended => core.update(|s| {
            s.is_playing = false;
            s.has_ended = true;
        }),
        BackendEvent::Error {
            kind,
            message,
            fatal,
        } => {
            if kind == BackendErrorKind::Aborted {
                core.warn(ErrorCode::PlaybackFailed, message);
                return;
            }
            let code = match kind {
                BackendErrorKind::Network => ErrorCode::NetworkError,
                BackendErrorKind::Decode => ErrorCode::DecodeError,
                BackendErrorKind::UnsupportedFormat => ErrorCode::UnsupportedFormat,
                _ => ErrorCode::PlaybackFailed,
            };
            let severity = if fatal { Severity::Fatal } else { Severity::Error };
            core.emit_error(PlayerError::new(code, message, severity));
        }
    }
}
