//! Progressive file playback on the platform media stack.

use async_trait::async_trait;
use bridge_traits::playback::{MediaProtocol, NativePlayerBackendProvider};
use core_media::source::StreamType;
use core_media::{RangeProber, SourceInfo, SourceKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::backend::NativeEngine;
use super::base::AdapterCore;
use crate::config::PlayerConfig;
use crate::error::{ErrorCode, PlayerError};
use crate::listeners::Subscription;
use crate::traits::{
    AdapterKind, ErrorCallback, PlaybackState, PlayerAdapter, PlayerCapabilities, QualityLevel,
    StateCallback,
};

/// Plays a media URL directly through a
/// [`NativePlayerBackend`](bridge_traits::playback::NativePlayerBackend).
///
/// For progressive files the server is asked whether it honours byte ranges
/// first; without them the file still plays, but seeking is disabled and a
/// `RANGE_NOT_SUPPORTED` warning is published.
pub struct NativeAdapter {
    engine: NativeEngine,
    prober: Option<Arc<RangeProber>>,
}

impl NativeAdapter {
    pub fn new(
        source: SourceInfo,
        provider: Arc<dyn NativePlayerBackendProvider>,
        prober: Option<Arc<RangeProber>>,
    ) -> Self {
        let core = AdapterCore::new(AdapterKind::Native, source);
        Self {
            engine: NativeEngine::new(core, provider),
            prober,
        }
    }

    fn protocol(&self) -> MediaProtocol {
        match self.engine.core().source().kind {
            SourceKind::Stream(StreamType::Hls) => MediaProtocol::Hls,
            SourceKind::Stream(StreamType::Dash) => MediaProtocol::Dash,
            _ => MediaProtocol::Progressive,
        }
    }
}

#[async_trait]
impl PlayerAdapter for NativeAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Native
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = "native"))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let core = self.engine.core();
        let url = core.source().playable_url().to_string();
        let protocol = self.protocol();

        if protocol == MediaProtocol::Progressive {
            if let Some(prober) = &self.prober {
                if !prober.test_range_support(&url).await {
                    core.disable_seek();
                    core.warn(
                        ErrorCode::RangeNotSupported,
                        "Server does not support byte ranges; seeking is disabled",
                    );
                } else {
                    debug!("Byte ranges supported");
                }
            }
        }

        self.engine.load(config.load_request(url, protocol)).await
    }

    async fn play(&self) {
        self.engine.play().await
    }

    async fn pause(&self) {
        self.engine.pause().await
    }

    async fn stop(&self) {
        self.engine.stop().await
    }

    async fn seek(&self, position: Duration) {
        self.engine.seek(position).await
    }

    async fn set_volume(&self, volume: f32) {
        self.engine.set_volume(volume).await
    }

    async fn set_muted(&self, muted: bool) {
        self.engine.set_muted(muted).await
    }

    async fn set_playback_rate(&self, rate: f32) {
        self.engine.set_playback_rate(rate).await
    }

    async fn set_quality(&self, quality_id: &str) {
        self.engine.set_quality(quality_id).await
    }

    fn state(&self) -> PlaybackState {
        self.engine.core().state()
    }

    fn quality_levels(&self) -> Vec<QualityLevel> {
        self.engine.core().quality_levels()
    }

    fn on_state_change(&self, callback: StateCallback) -> Subscription {
        self.engine.core().on_state_change(callback)
    }

    fn on_error(&self, callback: ErrorCallback) -> Subscription {
        self.engine.core().on_error(callback)
    }

    async fn destroy(&self) {
        self.engine.destroy().await;
    }
}
