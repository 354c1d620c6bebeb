//! Cloud share links played natively once resolved to a direct download URL.

use async_trait::async_trait;
use bridge_traits::playback::{MediaProtocol, NativePlayerBackendProvider};
use core_media::{SourceInfo, SourceKind};
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

/// Google Drive, Dropbox and OneDrive shares.
///
/// Mega links are end-to-end encrypted and have no direct URL; they fail
/// here so the chain can fall through to the web player.
pub struct CloudAdapter {
    engine: NativeEngine,
}

impl CloudAdapter {
    pub fn new(source: SourceInfo, provider: Arc<dyn NativePlayerBackendProvider>) -> Self {
        Self {
            engine: NativeEngine::new(AdapterCore::new(AdapterKind::Cloud, source), provider),
        }
    }

    fn direct_url(&self) -> Result<String, PlayerError> {
        let source = self.engine.core().source();
        if !matches!(source.kind, SourceKind::CloudDrive(_)) {
            return Err(PlayerError::fatal(
                ErrorCode::UnsupportedSource,
                format!("{} is not a cloud share", source.platform_label),
            ));
        }
        match (&source.resolved_url, &source.video_id) {
            (Some(url), _) => Ok(url.clone()),
            (None, None) => Err(PlayerError::fatal(
                ErrorCode::VideoIdExtractionFailed,
                format!("Could not extract a file id from the {} link", source.platform_label),
            )),
            (None, Some(_)) => Err(PlayerError::fatal(
                ErrorCode::UnsupportedSource,
                format!("{} links cannot be resolved to a direct URL", source.platform_label),
            )),
        }
    }
}

#[async_trait]
impl PlayerAdapter for CloudAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cloud
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = "cloud"))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let url = self.direct_url()?;
        debug!(url = core_runtime::logging::redact_url(&url), "Resolved cloud share");
        self.engine
            .load(config.load_request(url, MediaProtocol::Progressive))
            .await
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
