//! Twitter/X, Instagram and TikTok embeds.

use async_trait::async_trait;
use bridge_traits::playback::{WebPlayerHostProvider, WebPlayerPage};
use core_media::{SourceInfo, SourceKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::base::AdapterCore;
use super::web::{generic_error, WebEngine};
use crate::config::PlayerConfig;
use crate::error::{ErrorCode, PlayerError};
use crate::listeners::Subscription;
use crate::traits::{
    AdapterKind, ErrorCallback, PlaybackState, PlayerAdapter, PlayerCapabilities, QualityLevel,
    StateCallback,
};

pub struct SocialAdapter {
    engine: WebEngine,
}

impl SocialAdapter {
    pub fn new(source: SourceInfo, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        Self {
            engine: WebEngine::new(AdapterCore::new(AdapterKind::Social, source), provider),
        }
    }

    fn embed_page(&self, config: &PlayerConfig) -> Result<WebPlayerPage, PlayerError> {
        let source = self.engine.core().source();
        if !matches!(source.kind, SourceKind::SocialMedia(_)) {
            return Err(PlayerError::fatal(
                ErrorCode::UnsupportedSource,
                format!("{} is not a social media post", source.platform_label),
            ));
        }
        let Some(embed) = source.embed_url.as_deref() else {
            return Err(PlayerError::fatal(
                ErrorCode::VideoIdExtractionFailed,
                format!("Could not extract a {} post id", source.platform_label),
            ));
        };
        let mut page = WebPlayerPage::url(embed);
        page.headers = config.headers.clone();
        Ok(page)
    }
}

#[async_trait]
impl PlayerAdapter for SocialAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Social
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = "social"))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let page = self.embed_page(config)?;
        self.engine.mount(page, generic_error).await
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
