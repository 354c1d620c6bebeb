//! Web runtime driver shared by the YouTube, social and generic web-view
//! adapters. All traffic goes through the typed [`channel`](crate::channel).

use bridge_traits::playback::{WebPlayerHost, WebPlayerHostProvider, WebPlayerPage};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::base::{clamp_rate, clamp_volume, fraction_to_percentage, AdapterCore};
use crate::channel::{parse_inbound, Inbound, WebCommand, WebMessage, WebPlayerState, CHANNEL_VERSION};
use crate::error::{ErrorCode, PlayerError};

/// Translates a page-reported error into a [`PlayerError`].
pub(crate) type ErrorMapper = fn(code: &str, message: &str, fatal: bool) -> PlayerError;

/// Default mapping for pages without platform-specific codes.
pub(crate) fn generic_error(code: &str, message: &str, fatal: bool) -> PlayerError {
    let message = if message.is_empty() {
        format!("Web player error {code}")
    } else {
        message.to_string()
    };
    if fatal {
        PlayerError::fatal(ErrorCode::PlaybackFailed, message)
    } else {
        PlayerError::error(ErrorCode::PlaybackFailed, message)
    }
}

pub(crate) struct WebEngine {
    core: Arc<AdapterCore>,
    provider: Arc<dyn WebPlayerHostProvider>,
    host: RwLock<Option<Arc<dyn WebPlayerHost>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl WebEngine {
    pub fn new(core: Arc<AdapterCore>, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        Self {
            core,
            provider,
            host: RwLock::new(None),
            pump: Mutex::new(None),
        }
    }

    pub fn core(&self) -> &Arc<AdapterCore> {
        &self.core
    }

    /// Create a host and mount `page` into it.
    pub async fn mount(&self, page: WebPlayerPage, map_error: ErrorMapper) -> Result<(), PlayerError> {
        let host: Arc<dyn WebPlayerHost> = Arc::from(self.provider.create().map_err(|e| {
            PlayerError::fatal(
                ErrorCode::BackendUnavailable,
                format!("Web player host unavailable: {e}"),
            )
        })?);

        let (tx, rx) = mpsc::unbounded_channel();
        *self.host.write() = Some(Arc::clone(&host));
        if let Some(previous) = self
            .pump
            .lock()
            .replace(spawn_pump(Arc::clone(&self.core), rx, map_error))
        {
            previous.abort();
        }

        debug!(adapter = %self.core.kind(), "Mounting web player page");
        host.mount(page, tx).await.map_err(|e| {
            PlayerError::fatal(ErrorCode::LoadFailed, format!("Web player mount failed: {e}"))
        })
    }

    fn host(&self) -> Option<Arc<dyn WebPlayerHost>> {
        self.host.read().clone()
    }

    async fn send(&self, command: WebCommand) -> bool {
        if self.core.is_destroyed() {
            return false;
        }
        let Some(host) = self.host() else {
            debug!(adapter = %self.core.kind(), command = command.name(), "No page mounted; ignoring");
            return false;
        };
        match host.post_message(command.to_json()).await {
            Ok(()) => true,
            Err(e) => {
                self.core.emit_error(PlayerError::error(
                    ErrorCode::PlaybackFailed,
                    format!("{} command failed: {e}", command.name()),
                ));
                false
            }
        }
    }

    pub async fn play(&self) {
        self.send(WebCommand::Play).await;
    }

    pub async fn pause(&self) {
        self.send(WebCommand::Pause).await;
    }

    pub async fn stop(&self) {
        if self.send(WebCommand::Stop).await {
            self.core.update(|s| {
                s.is_playing = false;
                s.is_paused = true;
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
        let seconds = target.as_secs_f64();
        if self.send(WebCommand::Seek { seconds }).await {
            self.core.update(|s| s.current_time = target);
        }
    }

    pub async fn set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        if self.send(WebCommand::SetVolume { volume }).await {
            self.core.update(|s| s.volume = volume);
        }
    }

    pub async fn set_muted(&self, muted: bool) {
        let command = if muted { WebCommand::Mute } else { WebCommand::Unmute };
        if self.send(command).await {
            self.core.update(|s| s.is_muted = muted);
        }
    }

    pub async fn set_playback_rate(&self, rate: f32) {
        let rate = clamp_rate(rate);
        if self.send(WebCommand::SetPlaybackRate { rate }).await {
            self.core.update(|s| s.playback_rate = rate);
        }
    }

    pub async fn set_quality(&self, quality_id: &str) {
        self.send(WebCommand::SetQuality {
            quality: quality_id.to_string(),
        })
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
        let host = self.host.write().take();
        if let Some(host) = host {
            // The page gets a chance to stop media before the host goes away.
            if let Err(e) = host.post_message(WebCommand::Destroy.to_json()).await {
                debug!(adapter = %self.core.kind(), error = %e, "Destroy command not delivered");
            }
            if let Err(e) = host.unmount().await {
                warn!(adapter = %self.core.kind(), error = %e, "Web player unmount failed");
            }
        }
        self.core.clear_listeners();
        debug!(adapter = %self.core.kind(), "Adapter destroyed");
        true
    }
}

fn spawn_pump(
    core: Arc<AdapterCore>,
    mut inbound: UnboundedReceiver<String>,
    map_error: ErrorMapper,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = inbound.recv().await {
            if core.is_destroyed() {
                break;
            }
            match parse_inbound(&text) {
                Inbound::Message(message) => apply_web_message(&core, message, map_error),
                Inbound::Ignored(kind) => {
                    trace!(adapter = %core.kind(), kind = %kind, "Ignoring web player message")
                }
                Inbound::Malformed(reason) => {
                    warn!(adapter = %core.kind(), reason = %reason, "Dropping malformed web player message")
                }
            }
        }
    })
}

pub(crate) fn apply_web_message(core: &AdapterCore, message: WebMessage, map_error: ErrorMapper) {
    match message {
        WebMessage::Ready { version } => {
            if version > CHANNEL_VERSION {
                warn!(
                    adapter = %core.kind(),
                    version,
                    supported = CHANNEL_VERSION,
                    "Web player speaks a newer channel version"
                );
            }
            core.update(|s| s.is_buffering = false);
        }
        WebMessage::StateChange(state) => core.update(|s| match state {
            WebPlayerState::Playing => {
                s.is_playing = true;
                s.is_paused = false;
                s.is_buffering = false;
                s.has_ended = false;
            }
            WebPlayerState::Paused => {
                s.is_playing = false;
                s.is_paused = true;
                s.is_buffering = false;
            }
            WebPlayerState::Buffering => s.is_buffering = true,
            WebPlayerState::Ended => {
                s.is_playing = false;
                s.is_buffering = false;
                s.has_ended = true;
            }
            WebPlayerState::Unstarted | WebPlayerState::Cued => {
                s.is_playing = false;
                s.is_buffering = false;
            }
        }),
        WebMessage::Error {
            code,
            message,
            fatal,
        } => core.emit_error(map_error(&code, &message, fatal)),
        WebMessage::TimeUpdate {
            current_time,
            buffered,
        } => match Duration::try_from_secs_f64(current_time) {
            Ok(position) => core.update(|s| {
                s.current_time = position;
                if let Some(buffered) = buffered {
                    s.buffered_percentage = fraction_to_percentage(buffered);
                }
            }),
            Err(e) => warn!(adapter = %core.kind(), current_time, error = %e, "Dropping timeupdate"),
        },
        WebMessage::DurationChange { duration } => match Duration::try_from_secs_f64(duration) {
            Ok(duration) => core.update(|s| s.duration = Some(duration)),
            Err(e) => warn!(adapter = %core.kind(), duration, error = %e, "Dropping durationchange"),
        },
    }
}
