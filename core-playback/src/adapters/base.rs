//! Shared adapter bookkeeping: state, listeners, quality levels and the
//! destroyed flag.

use core_media::SourceInfo;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};
use crate::error::{ErrorCode, PlayerError, Severity};
use crate::listeners::{Listeners, Subscription};
use crate::traits::{
    AdapterKind, ErrorCallback, PlaybackState, PlayerCapabilities, QualityLevel, StateCallback,
};

pub(crate) struct AdapterCore {
    kind: AdapterKind,
    source: SourceInfo,
    state: RwLock<PlaybackState>,
    capabilities: RwLock<PlayerCapabilities>,
    quality_levels: RwLock<Vec<QualityLevel>>,
    state_listeners: Listeners<PlaybackState>,
    error_listeners: Listeners<PlayerError>,
    destroyed: AtomicBool,
}

impl AdapterCore {
    pub fn new(kind: AdapterKind, source: SourceInfo) -> Arc<Self> {
        Arc::new(Self {
            kind,
            source,
            state: RwLock::new(PlaybackState::default()),
            capabilities: RwLock::new(PlayerCapabilities::for_kind(kind)),
            quality_levels: RwLock::new(Vec::new()),
            state_listeners: Listeners::new(),
            error_listeners: Listeners::new(),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Flip the destroyed flag. Returns `true` only for the first caller.
    pub fn begin_destroy(&self) -> bool {
        !self.destroyed.swap(true, Ordering::SeqCst)
    }

    pub fn state(&self) -> PlaybackState {
        self.state.read().clone()
    }

    /// Mutate state and notify subscribers outside the lock.
    pub fn update(&self, mutate: impl FnOnce(&mut PlaybackState)) {
        if self.is_destroyed() {
            return;
        }
        let snapshot = {
            let mut state = self.state.write();
            mutate(&mut state);
            state.clone()
        };
        self.state_listeners.notify(&snapshot);
    }

    /// Publish an error. `error`/`fatal` errors are also recorded in state.
    pub fn emit_error(&self, error: PlayerError) {
        if self.is_destroyed() {
            debug!(adapter = %self.kind, code = %error.code, "Dropping error from destroyed adapter");
            return;
        }

        let mut error = error.with_platform(self.kind.as_str());
        if error.source_url.is_none() {
            error.source_url = Some(self.source.original_url.clone());
        }

        match error.severity {
            Severity::Warning => {
                debug!(adapter = %self.kind, code = %error.code, "{}", error.message)
            }
            _ => warn!(
                adapter = %self.kind,
                code = %error.code,
                severity = ?error.severity,
                "{}",
                error.message
            ),
        }

        if error.fails_attempt() {
            let recorded = error.clone();
            self.update(move |state| {
                state.error = Some(recorded);
                state.is_buffering = false;
            });
        }
        self.error_listeners.notify(&error);
    }

    pub fn warn(&self, code: ErrorCode, message: impl Into<String>) {
        self.emit_error(PlayerError::warning(code, message));
    }

    pub fn capabilities(&self) -> PlayerCapabilities {
        self.capabilities.read().clone()
    }

    pub fn disable_seek(&self) {
        self.capabilities.write().supports_seek = false;
    }

    pub fn can_seek(&self) -> bool {
        self.capabilities.read().supports_seek
    }

    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.quality_levels.read().clone()
    }

    pub fn set_quality_levels(&self, levels: Vec<QualityLevel>) {
        *self.quality_levels.write() = levels;
    }

    pub fn find_quality(&self, id: &str) -> Option<QualityLevel> {
        self.quality_levels
            .read()
            .iter()
            .find(|level| level.id == id)
            .cloned()
    }

    pub fn on_state_change(&self, callback: StateCallback) -> Subscription {
        if self.is_destroyed() {
            return Subscription::inert();
        }
        self.state_listeners.subscribe(callback)
    }

    pub fn on_error(&self, callback: ErrorCallback) -> Subscription {
        if self.is_destroyed() {
            return Subscription::inert();
        }
        self.error_listeners.subscribe(callback)
    }

    pub fn clear_listeners(&self) {
        self.state_listeners.clear();
        self.error_listeners.clear();
    }

    /// Clamp a seek target to the known duration.
    pub fn clamp_position(&self, position: Duration) -> Duration {
        match self.state.read().duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

pub(crate) fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return 1.0;
    }
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

/// `0.0..=1.0` fraction to the `0.0..=100.0` percentage kept in state.
pub(crate) fn fraction_to_percentage(fraction: f64) -> f32 {
    (fraction.clamp(0.0, 1.0) * 100.0) as f32
}
