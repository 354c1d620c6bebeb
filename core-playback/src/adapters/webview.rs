//! Generic embedded web player. Last entry of almost every fallback chain.

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

/// Loads the platform embed page (or the raw URL) into the web runtime.
///
/// Success here only means the page mounted without reporting an error; the
/// page may still be unable to play the media.
pub struct WebViewAdapter {
    engine: WebEngine,
}

impl WebViewAdapter {
    pub fn new(source: SourceInfo, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        Self {
            engine: WebEngine::new(AdapterCore::new(AdapterKind::WebView, source), provider),
        }
    }
}

/// Page for `source`: the platform embed URL where one exists, the raw URL
/// otherwise.
pub fn web_page_for(source: &SourceInfo, config: &PlayerConfig) -> Result<WebPlayerPage, PlayerError> {
    let url = match source.kind {
        SourceKind::Unsupported => {
            return Err(PlayerError::fatal(
                ErrorCode::UnsupportedSource,
                source
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Unsupported source".to_string()),
            ))
        }
        // These platforms refuse direct page loads; only the embed player works.
        SourceKind::Vimeo | SourceKind::Twitch | SourceKind::Facebook | SourceKind::Dailymotion => {
            match &source.embed_url {
                Some(embed) => embed.clone(),
                None => {
                    return Err(PlayerError::fatal(
                        ErrorCode::VideoIdExtractionFailed,
                        format!("Could not extract a {} video id", source.platform_label),
                    )
                    .with_recoverable(false))
                }
            }
        }
        SourceKind::Adult(_)
        | SourceKind::YouTube
        | SourceKind::SocialMedia(_)
        | SourceKind::CloudDrive(_) => source
            .embed_url
            .clone()
            .unwrap_or_else(|| source.original_url.clone()),
        SourceKind::Direct | SourceKind::Stream(_) | SourceKind::Unknown => {
            source.playable_url().to_string()
        }
    };

    let mut page = WebPlayerPage::url(url);
    page.headers = config.headers.clone();
    Ok(page)
}

#[async_trait]
impl PlayerAdapter for WebViewAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::WebView
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = "webview"))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let page = web_page_for(self.engine.core().source(), config)?;
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
