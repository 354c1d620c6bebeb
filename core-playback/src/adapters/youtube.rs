//! YouTube playback through the IFrame Player API hosted in the web runtime.

use async_trait::async_trait;
use bridge_traits::playback::{WebPlayerHostProvider, WebPlayerPage};
use core_media::SourceInfo;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::base::AdapterCore;
use super::web::{generic_error, WebEngine};
use crate::channel::CHANNEL_VERSION;
use crate::config::PlayerConfig;
use crate::error::{ErrorCode, PlayerError};
use crate::listeners::Subscription;
use crate::traits::{
    AdapterKind, ErrorCallback, PlaybackState, PlayerAdapter, PlayerCapabilities, QualityLevel,
    StateCallback,
};

/// Origin the IFrame page is loaded against.
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const IFRAME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width, initial-scale=1, maximum-scale=1, user-scalable=no">
<style>html,body{margin:0;padding:0;height:100%;background:#000;overflow:hidden}#player{position:absolute;inset:0;width:100%;height:100%}</style>
</head>
<body>
<div id="player"></div>
<script>
(function () {
  var VERSION = __VERSION__;
  var player = null;
  var timer = null;

  function post(message) {
    var text = JSON.stringify(message);
    if (window.chrome && window.chrome.webview) { window.chrome.webview.postMessage(text); }
    else if (window.webkit && window.webkit.messageHandlers && window.webkit.messageHandlers.player) { window.webkit.messageHandlers.player.postMessage(text); }
    else if (window.PlayerBridge) { window.PlayerBridge.postMessage(text); }
    else if (window.parent !== window) { window.parent.postMessage(text, '*'); }
  }

  function report() {
    if (!player || !player.getCurrentTime) { return; }
    post({ type: 'timeupdate', currentTime: player.getCurrentTime() || 0, buffered: player.getVideoLoadedFraction() || 0 });
  }

  function handle(raw) {
    var message;
    try { message = typeof raw === 'string' ? JSON.parse(raw) : raw; } catch (e) { return; }
    if (!message || !player) { return; }
    var p = Array.isArray(message.parameters) ? message.parameters : [];
    switch (message.command) {
      case 'play': player.playVideo(); break;
      case 'pause': player.pauseVideo(); break;
      case 'stop': player.pauseVideo(); player.seekTo(0, true); break;
      case 'seek': player.seekTo(p[0] || 0, true); break;
      case 'setVolume': player.setVolume(p[0]); break;
      case 'mute': player.mute(); break;
      case 'unmute': player.unMute(); break;
      case 'setPlaybackRate': player.setPlaybackRate(p[0]); break;
      case 'setQuality': player.setPlaybackQuality(p[0]); break;
      case 'destroy': clearInterval(timer); player.destroy(); player = null; break;
    }
  }

  window.handleCommand = handle;
  window.addEventListener('message', function (event) { handle(event.data); });

  window.onYouTubeIframeAPIReady = function () {
    player = new YT.Player('player', {
      videoId: __VIDEO_ID__,
      playerVars: __PLAYER_VARS__,
      events: {
        onReady: function () {
          post({ type: 'ready', version: VERSION });
          post({ type: 'durationchange', duration: player.getDuration() || 0 });
          timer = setInterval(report, 500);
        },
        onStateChange: function (event) {
          post({ type: 'stateChange', state: event.data });
          if (event.data === 1) { post({ type: 'durationchange', duration: player.getDuration() || 0 }); }
        },
        onError: function (event) { post({ type: 'error', code: event.data }); }
      }
    });
  };

  var tag = document.createElement('script');
  tag.src = 'https://www.youtube.com/iframe_api';
  document.head.appendChild(tag);
})();
</script>
</body>
</html>
"#;

/// YouTube IFrame error codes.
fn youtube_error(code: &str, message: &str, fatal: bool) -> PlayerError {
    match code {
        "2" => PlayerError::fatal(
            ErrorCode::InitializationFailed,
            "YouTube rejected the player parameters",
        ),
        "5" => PlayerError::error(
            ErrorCode::PlaybackFailed,
            "YouTube HTML5 player error",
        ),
        "100" => PlayerError::fatal(
            ErrorCode::LoadFailed,
            "Video not found or private",
        ),
        "101" | "150" => PlayerError::fatal(
            ErrorCode::EmbedError,
            "The owner does not allow this video to be embedded",
        )
        .with_recoverable(false),
        _ => generic_error(code, message, fatal),
    }
}

/// Inline IFrame page for `video_id`.
pub fn iframe_page(video_id: &str, config: &PlayerConfig) -> WebPlayerPage {
    let mut player_vars = json!({
        "autoplay": u8::from(config.auto_play),
        "mute": u8::from(config.muted),
        "controls": 1,
        "playsinline": 1,
        "rel": 0,
        "modestbranding": 1,
        "enablejsapi": 1,
        "origin": YOUTUBE_BASE_URL,
    });
    if config.looping {
        // Looping a single video needs it to be its own playlist.
        player_vars["loop"] = json!(1);
        player_vars["playlist"] = json!(video_id);
    }

    let html = IFRAME_TEMPLATE
        .replace("__VERSION__", &CHANNEL_VERSION.to_string())
        .replace("__VIDEO_ID__", &Value::String(video_id.to_string()).to_string())
        .replace("__PLAYER_VARS__", &player_vars.to_string());

    let mut page = WebPlayerPage::html(html, YOUTUBE_BASE_URL);
    page.requires_user_action_for_playback = false;
    page
}

pub struct YouTubeAdapter {
    engine: WebEngine,
}

impl YouTubeAdapter {
    pub fn new(source: SourceInfo, provider: Arc<dyn WebPlayerHostProvider>) -> Self {
        Self {
            engine: WebEngine::new(AdapterCore::new(AdapterKind::YouTube, source), provider),
        }
    }
}

#[async_trait]
impl PlayerAdapter for YouTubeAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::YouTube
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = "youtube"))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let Some(video_id) = self.engine.core().source().video_id.clone() else {
            return Err(PlayerError::fatal(
                ErrorCode::VideoIdExtractionFailed,
                "Could not extract a YouTube video id",
            )
            .with_recoverable(false));
        };
        self.engine
            .mount(iframe_page(&video_id, config), youtube_error)
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

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::playback::WebPageContent;

    #[test]
    fn test_error_codes() {
        let embed = youtube_error("150", "", false);
        assert_eq!(embed.code, ErrorCode::EmbedError);
        assert!(embed.is_fatal());
        assert!(!embed.recoverable);
        assert_eq!(youtube_error("101", "", false).code, ErrorCode::EmbedError);

        let missing = youtube_error("100", "", false);
        assert_eq!(missing.code, ErrorCode::LoadFailed);
        assert!(missing.is_fatal());

        let html5 = youtube_error("5", "", false);
        assert!(!html5.is_fatal());
        assert!(html5.fails_attempt());

        assert_eq!(youtube_error("2", "", false).code, ErrorCode::InitializationFailed);
    }

    #[test]
    fn test_iframe_page() {
        let config = PlayerConfig::default().with_auto_play(true).with_loop(true);
        let page = iframe_page("DzVKgumDkpo", &config);
        let WebPageContent::Html { html, base_url } = &page.content else {
            panic!("expected inline HTML");
        };
        assert_eq!(base_url, YOUTUBE_BASE_URL);
        assert!(html.contains(r#"videoId: "DzVKgumDkpo""#));
        assert!(html.contains(r#""autoplay":1"#));
        assert!(html.contains(r#""playlist":"DzVKgumDkpo""#));
        assert!(!html.contains("__"));
    }
}
