//! # Playback Session
//!
//! Caller-facing handle around the adapter the pipeline settled on. Forwards
//! controls, relays adapter state and errors to the [`EventBus`] as
//! [`PlaybackEvent`]s, and owns teardown.

use core_media::SourceInfo;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{PlayerError, Severity};
use crate::factory::FallbackChain;
use crate::listeners::Subscription;
use crate::pipeline::{PipelineAttempt, ResolvedPlayback};
use crate::traits::{
    AdapterKind, ErrorCallback, PlaybackState, PlayerAdapter, PlayerCapabilities, QualityLevel,
    StateCallback,
};

pub struct PlaybackSession {
    adapter: Arc<dyn PlayerAdapter>,
    source: SourceInfo,
    chain: FallbackChain,
    attempts: Vec<PipelineAttempt>,
    event_bus: Option<EventBus>,
    relays: Vec<Subscription>,
    destroyed: AtomicBool,
}

impl PlaybackSession {
    pub fn new(resolved: ResolvedPlayback, source: SourceInfo, event_bus: Option<EventBus>) -> Self {
        let ResolvedPlayback {
            adapter,
            chain,
            attempts,
        } = resolved;

        let relays = match &event_bus {
            Some(bus) => relay_events(adapter.as_ref(), bus),
            None => Vec::new(),
        };

        info!(adapter = %adapter.kind(), attempts = attempts.len(), "Playback session established");
        Self {
            adapter,
            source,
            chain,
            attempts,
            event_bus,
            relays,
            destroyed: AtomicBool::new(false),
        }
    }

    fn is_live(&self) -> bool {
        !self.destroyed.load(Ordering::SeqCst)
    }

    pub async fn play(&self) {
        if self.is_live() {
            self.adapter.play().await;
        }
    }

    pub async fn pause(&self) {
        if self.is_live() {
            self.adapter.pause().await;
        }
    }

    pub async fn stop(&self) {
        if self.is_live() {
            self.adapter.stop().await;
        }
    }

    pub async fn seek(&self, position: Duration) {
        if self.is_live() {
            self.adapter.seek(position).await;
        }
    }

    pub async fn set_volume(&self, volume: f32) {
        if self.is_live() {
            self.adapter.set_volume(volume).await;
        }
    }

    pub async fn set_muted(&self, muted: bool) {
        if self.is_live() {
            self.adapter.set_muted(muted).await;
        }
    }

    pub async fn set_playback_rate(&self, rate: f32) {
        if self.is_live() {
            self.adapter.set_playback_rate(rate).await;
        }
    }

    pub async fn set_quality(&self, quality_id: &str) {
        if self.is_live() {
            self.adapter.set_quality(quality_id).await;
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.adapter.state()
    }

    pub fn capabilities(&self) -> PlayerCapabilities {
        self.adapter.capabilities()
    }

    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.adapter.quality_levels()
    }

    pub fn adapter_kind(&self) -> AdapterKind {
        self.adapter.kind()
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Every attempt made while resolving, the successful one last.
    pub fn attempts(&self) -> &[PipelineAttempt] {
        &self.attempts
    }

    pub fn on_state_change(&self, callback: StateCallback) -> Subscription {
        self.adapter.on_state_change(callback)
    }

    pub fn on_error(&self, callback: ErrorCallback) -> Subscription {
        self.adapter.on_error(callback)
    }

    pub fn is_destroyed(&self) -> bool {
        !self.is_live()
    }

    /// Release the adapter. Safe to call more than once.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for relay in &self.relays {
            relay.unsubscribe();
        }
        let kind = self.adapter.kind();
        self.adapter.destroy().await;
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Destroyed {
                adapter: kind.to_string(),
            }))
            .ok();
        }
        debug!(adapter = %kind, "Playback session destroyed");
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("adapter", &self.adapter.kind())
            .field("source", &self.source.original_url)
            .field("chain", &self.chain)
            .field("attempts", &self.attempts.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

fn relay_events(adapter: &dyn PlayerAdapter, bus: &EventBus) -> Vec<Subscription> {
    let name = adapter.kind().to_string();

    let state_bus = bus.clone();
    let state_name = name.clone();
    let previous: Mutex<PlaybackState> = Mutex::new(adapter.state());
    let state_relay = adapter.on_state_change(Arc::new(move |state: &PlaybackState| {
        let events = {
            let mut previous = previous.lock();
            let events = diff_events(&state_name, &previous, state);
            *previous = state.clone();
            events
        };
        for event in events {
            state_bus.emit(CoreEvent::Playback(event)).ok();
        }
    }));

    let error_bus = bus.clone();
    let error_relay = adapter.on_error(Arc::new(move |error: &PlayerError| {
        let event = match error.severity {
            Severity::Warning => PlaybackEvent::Warning {
                adapter: name.clone(),
                code: error.code.to_string(),
                message: error.message.clone(),
            },
            _ => PlaybackEvent::Error {
                adapter: name.clone(),
                code: error.code.to_string(),
                message: error.message.clone(),
                recoverable: error.recoverable,
            },
        };
        error_bus.emit(CoreEvent::Playback(event)).ok();
    }));

    vec![state_relay, error_relay]
}

/// Playback events implied by a state transition.
fn diff_events(adapter: &str, before: &PlaybackState, after: &PlaybackState) -> Vec<PlaybackEvent> {
    let adapter = adapter.to_string();
    let mut events = Vec::new();

    if after.is_playing && !before.is_playing {
        events.push(PlaybackEvent::Started {
            adapter: adapter.clone(),
        });
    }
    if after.is_paused && !before.is_paused {
        events.push(PlaybackEvent::Paused {
            adapter: adapter.clone(),
            position_ms: after.current_time.as_millis() as u64,
        });
    }
    if after.is_buffering != before.is_buffering {
        events.push(PlaybackEvent::Buffering {
            adapter: adapter.clone(),
            buffering: after.is_buffering,
        });
    }
    if after.current_time != before.current_time || after.duration != before.duration {
        events.push(PlaybackEvent::PositionChanged {
            adapter: adapter.clone(),
            position_ms: after.current_time.as_millis() as u64,
            duration_ms: after.duration.map(|d| d.as_millis() as u64),
            buffered_percentage: after.buffered_percentage,
        });
    }
    if after.has_ended && !before.has_ended {
        events.push(PlaybackEvent::Ended { adapter });
    }

    events
}
