//! HLS and DASH playback: manifest fetch, validation and quality extraction
//! in the core, segment handling in the native backend.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::playback::{MediaProtocol, NativePlayerBackendProvider};
use core_media::SourceInfo;
use m3u8_rs::Playlist;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
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

pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Adaptive stream playback (`hls` or `dash` kind).
pub struct StreamAdapter {
    kind: AdapterKind,
    engine: NativeEngine,
    http: Arc<dyn HttpClient>,
    manifest_timeout: Duration,
}

impl StreamAdapter {
    pub fn hls(
        source: SourceInfo,
        provider: Arc<dyn NativePlayerBackendProvider>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self::new(AdapterKind::Hls, source, provider, http)
    }

    pub fn dash(
        source: SourceInfo,
        provider: Arc<dyn NativePlayerBackendProvider>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self::new(AdapterKind::Dash, source, provider, http)
    }

    fn new(
        kind: AdapterKind,
        source: SourceInfo,
        provider: Arc<dyn NativePlayerBackendProvider>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            kind,
            engine: NativeEngine::new(AdapterCore::new(kind, source), provider),
            http,
            manifest_timeout: DEFAULT_MANIFEST_TIMEOUT,
        }
    }

    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    fn protocol(&self) -> MediaProtocol {
        if self.kind == AdapterKind::Dash {
            MediaProtocol::Dash
        } else {
            MediaProtocol::Hls
        }
    }

    async fn fetch_manifest(&self, url: &str, config: &PlayerConfig) -> Result<String, PlayerError> {
        let request = HttpRequest::get(url)
            .headers(&config.headers)
            .timeout(self.manifest_timeout);

        let response = self
            .http
            .execute_with_retry(request, RetryPolicy::none())
            .await
            .map_err(|e| {
                PlayerError::fatal(ErrorCode::NetworkError, format!("Manifest request failed: {e}"))
            })?;

        if !response.is_success() {
            return Err(PlayerError::fatal(
                ErrorCode::LoadFailed,
                format!("Manifest request returned HTTP {}", response.status),
            ));
        }

        response.text().map_err(|e| {
            PlayerError::fatal(ErrorCode::LoadFailed, format!("Manifest is not text: {e}"))
        })
    }
}

#[async_trait]
impl PlayerAdapter for StreamAdapter {
    fn kind(&self) -> AdapterKind {
        self.kind
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.engine.core().capabilities()
    }

    #[instrument(skip_all, fields(adapter = %self.kind))]
    async fn initialize(&self, config: &PlayerConfig) -> Result<(), PlayerError> {
        let core = self.engine.core();
        let url = core.source().playable_url().to_string();
        let manifest = self.fetch_manifest(&url, config).await?;

        let levels = match self.kind {
            AdapterKind::Dash => {
                if !manifest.contains("<MPD") {
                    return Err(PlayerError::fatal(
                        ErrorCode::UnsupportedFormat,
                        "Response is not a DASH manifest",
                    ));
                }
                parse_dash_representations(&manifest)
            }
            _ => {
                if !manifest.trim_start_matches('\u{feff}').trim_start().starts_with("#EXTM3U") {
                    return Err(PlayerError::fatal(
                        ErrorCode::UnsupportedFormat,
                        "Response is not an HLS playlist",
                    ));
                }
                parse_hls_variants(&manifest)
            }
        };

        debug!(levels = levels.len(), "Manifest validated");
        if !levels.is_empty() {
            let mut published = Vec::with_capacity(levels.len() + 1);
            published.push(QualityLevel::auto());
            published.extend(levels);
            core.set_quality_levels(published);
        }

        self.engine.load(config.load_request(url, self.protocol())).await
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

// ============================================================================
// Manifest Parsing
// ============================================================================

/// Variants of an HLS master playlist, highest bandwidth first. I-frame
/// only variants are skipped; a media playlist has none.
pub fn parse_hls_variants(playlist: &str) -> Vec<QualityLevel> {
    let master = match m3u8_rs::parse_playlist_res(playlist.as_bytes()) {
        Ok(Playlist::MasterPlaylist(master)) => master,
        Ok(Playlist::MediaPlaylist(_)) => return Vec::new(),
        Err(e) => {
            debug!(error = ?e, "Unparseable HLS playlist");
            return Vec::new();
        }
    };

    let mut levels: Vec<QualityLevel> = master
        .variants
        .iter()
        .filter(|variant| !variant.is_i_frame)
        .map(|variant| {
            let (width, height) = match &variant.resolution {
                Some(resolution) => (
                    u32::try_from(resolution.width).ok(),
                    u32::try_from(resolution.height).ok(),
                ),
                None => (None, None),
            };
            QualityLevel {
                id: variant.bandwidth.to_string(),
                label: quality_label(height, variant.bandwidth),
                bandwidth: Some(variant.bandwidth),
                width,
                height,
            }
        })
        .collect();

    sort_and_dedup(&mut levels);
    levels
}

/// Attributes a `Representation` may declare itself or inherit from its
/// `AdaptationSet`.
#[derive(Debug, Clone, Default)]
struct DashAttributes {
    id: Option<String>,
    bandwidth: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    mime_type: Option<String>,
    content_type: Option<String>,
}

impl DashAttributes {
    fn read(tag: &BytesStart<'_>) -> Self {
        let mut attributes = Self::default();
        for attribute in tag.attributes().flatten() {
            let Ok(value) = attribute.unescape_value() else {
                continue;
            };
            match attribute.key.local_name().as_ref() {
                b"id" => attributes.id = Some(value.into_owned()),
                b"bandwidth" => attributes.bandwidth = value.parse().ok(),
                b"width" => attributes.width = value.parse().ok(),
                b"height" => attributes.height = value.parse().ok(),
                b"mimeType" => attributes.mime_type = Some(value.into_owned()),
                b"contentType" => attributes.content_type = Some(value.into_owned()),
                _ => {}
            }
        }
        attributes
    }

    fn inherit(mut self, set: &DashAttributes) -> Self {
        self.width = self.width.or(set.width);
        self.height = self.height.or(set.height);
        self.mime_type = self.mime_type.or_else(|| set.mime_type.clone());
        self.content_type = self.content_type.or_else(|| set.content_type.clone());
        self
    }

    fn is_audio(&self) -> bool {
        self.content_type.as_deref() == Some("audio")
            || self.mime_type.as_deref().is_some_and(|mime| mime.starts_with("audio/"))
    }

    fn into_level(self) -> Option<QualityLevel> {
        if self.is_audio() {
            return None;
        }
        // Representations without a height are not video.
        let height = self.height?;
        let bandwidth = self.bandwidth?;
        Some(QualityLevel {
            id: self.id.unwrap_or_else(|| bandwidth.to_string()),
            label: quality_label(Some(height), bandwidth),
            bandwidth: Some(bandwidth),
            width: self.width,
            height: Some(height),
        })
    }
}

/// Video representations of a DASH MPD, highest bandwidth first.
///
/// Parsing stops at the first XML error; representations read before it are
/// kept.
pub fn parse_dash_representations(mpd: &str) -> Vec<QualityLevel> {
    let mut reader = Reader::from_str(mpd);
    let mut adaptation_set = DashAttributes::default();
    let mut levels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.local_name().as_ref() == b"AdaptationSet" => {
                adaptation_set = DashAttributes::read(&tag);
            }
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"AdaptationSet" => {
                adaptation_set = DashAttributes::default();
            }
            Ok(Event::Start(tag) | Event::Empty(tag))
                if tag.local_name().as_ref() == b"Representation" =>
            {
                let representation = DashAttributes::read(&tag).inherit(&adaptation_set);
                levels.extend(representation.into_level());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(position = reader.buffer_position(), "Stopped reading MPD: {e}");
                break;
            }
        }
    }

    sort_and_dedup(&mut levels);
    levels
}

fn quality_label(height: Option<u32>, bandwidth: u64) -> String {
    match height {
        Some(height) => format!("{height}p"),
        None => format!("{} kbps", bandwidth / 1000),
    }
}

fn sort_and_dedup(levels: &mut Vec<QualityLevel>) {
    levels.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    levels.dedup_by(|a, b| a.id == b.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d401e,mp4a.40.2\"
360p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,CODECS=\"avc1.640028,mp4a.40.2\"
1080p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=64000,CODECS=\"mp4a.40.5\"
audio.m3u8
";

    const MPD: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="v480" bandwidth="1200000" width="854" height="480"/>
      <Representation id="v1080" bandwidth="4800000" width="1920" height="1080"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="a1" bandwidth="128000" audioSamplingRate="48000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[test]
    fn test_hls_variants_sorted_by_bandwidth() {
        let levels = parse_hls_variants(MASTER);
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0].label, "1080p");
        assert_eq!(levels[0].bandwidth, Some(5_000_000));
        assert_eq!(levels[0].width, Some(1920));
        assert_eq!(levels[1].height, Some(720));
        assert_eq!(levels[3].label, "64 kbps");
        assert_eq!(levels[3].height, None);
    }

    #[test]
    fn test_quoted_codecs_do_not_split_attributes() {
        let levels = parse_hls_variants(MASTER);
        assert!(levels.iter().all(|level| level.bandwidth.is_some()));
    }

    #[test]
    fn test_iframe_variants_skipped() {
        let playlist = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
720p.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=90000,RESOLUTION=1280x720,URI=\"iframe.m3u8\"
";
        let levels = parse_hls_variants(playlist);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].label, "720p");
    }

    #[test]
    fn test_media_playlist_has_no_variants() {
        let media = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n";
        assert!(parse_hls_variants(media).is_empty());
    }

    #[test]
    fn test_dash_video_representations() {
        let levels = parse_dash_representations(MPD);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].id, "v1080");
        assert_eq!(levels[0].label, "1080p");
        assert_eq!(levels[1].id, "v480");
        assert_eq!(levels[1].bandwidth, Some(1_200_000));
    }

    #[test]
    fn test_dash_attribute_order_and_quoting_are_free() {
        let mpd = r#"<MPD><Period><AdaptationSet>
  <Representation height='720' bandwidth="2400000"
                  id="v720" width="1280"></Representation>
  <Representation bandwidth = "900000" height="360" id="v360"/>
</AdaptationSet></Period></MPD>"#;
        let levels = parse_dash_representations(mpd);
        let ids: Vec<&str> = levels.iter().map(|level| level.id.as_str()).collect();
        assert_eq!(ids, vec!["v720", "v360"]);
        assert_eq!(levels[0].width, Some(1280));
    }

    #[test]
    fn test_dash_namespaced_tags_and_inherited_size() {
        let mpd = r#"<mpd:MPD xmlns:mpd="urn:mpeg:dash:schema:mpd:2011">
  <mpd:Period>
    <mpd:AdaptationSet contentType="video" width="1920" height="1080">
      <mpd:Representation id="hi" bandwidth="6000000"/>
      <mpd:Representation id="lo" bandwidth="3000000" height="720" width="1280"/>
    </mpd:AdaptationSet>
    <mpd:AdaptationSet contentType="audio">
      <mpd:Representation id="aac" bandwidth="128000" height="0"/>
    </mpd:AdaptationSet>
  </mpd:Period>
</mpd:MPD>"#;
        let levels = parse_dash_representations(mpd);
        assert_eq!(levels.len(), 2);
        assert_eq!((levels[0].id.as_str(), levels[0].height), ("hi", Some(1080)));
        assert_eq!((levels[1].id.as_str(), levels[1].height), ("lo", Some(720)));
    }

    #[test]
    fn test_dash_entities_are_unescaped() {
        let mpd = r#"<MPD><AdaptationSet mimeType="video/mp4">
<Representation id="a&amp;b" bandwidth="1000" height="240"/></AdaptationSet></MPD>"#;
        assert_eq!(parse_dash_representations(mpd)[0].id, "a&b");
    }

    #[test]
    fn test_truncated_mpd_keeps_levels_read_so_far() {
        let mpd = r#"<MPD><AdaptationSet mimeType="video/mp4">
<Representation id="v1" bandwidth="1000" height="240"/>
<Representation id="v2" bandwidth="#;
        let levels = parse_dash_representations(mpd);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].id, "v1");
    }
}
