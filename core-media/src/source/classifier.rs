use tracing::debug;
use url::Url;

use super::platforms::{PlatformEntry, PLATFORM_TABLES};
use super::{EntitlementTier, SourceInfo, SourceKind, StreamType};
use crate::codec::Container;

const LIVE_SCHEMES: [&str; 3] = ["rtmp", "rtmps", "rtsp"];

/// Classify a URL.
///
/// Evaluation order: scheme checks, live-ingest schemes, platform tables
/// (video, social, cloud, adult), manifest/container extension, and finally
/// `Unknown` for any other HTTP(S) URL.
pub fn classify(url: &str) -> SourceInfo {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return SourceInfo::unsupported(trimmed, "URL is empty");
    }

    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(e) => return SourceInfo::unsupported(trimmed, format!("Malformed URL: {}", e)),
    };

    let scheme = parsed.scheme();
    if LIVE_SCHEMES.contains(&scheme) {
        let mut info = SourceInfo::new(trimmed, SourceKind::Stream(StreamType::Rtmp), "Live Stream");
        info.stream_subtype = Some(scheme.to_string());
        return info;
    }
    if scheme != "http" && scheme != "https" {
        return SourceInfo::unsupported(trimmed, format!("Unsupported URL scheme: {}", scheme));
    }

    let Some(host) = parsed.host_str() else {
        return SourceInfo::unsupported(trimmed, "URL has no host");
    };

    if let Some(entry) = PLATFORM_TABLES
        .iter()
        .flat_map(|table| table.iter())
        .find(|entry| entry.matches_host(host))
    {
        let info = from_platform(trimmed, &parsed, entry);
        debug!(kind = %info.kind, platform = %info.platform_label, "Classified platform URL");
        return info;
    }

    from_extension(trimmed, &parsed)
}

fn from_platform(original: &str, url: &Url, entry: &PlatformEntry) -> SourceInfo {
    let mut info = SourceInfo::new(original, entry.kind, entry.label);
    info.video_id = entry.extract_id(url.as_str());

    if let Some(id) = info.video_id.as_deref() {
        info.embed_url = entry.embed.map(|build| build(id, url));
        info.resolved_url = entry.resolver.and_then(|resolve| resolve(id, url));
    } else if let Some(resolve) = entry.resolver {
        // Some cloud links carry everything needed in the path itself
        info.resolved_url = resolve("", url);
    }

    match entry.kind {
        SourceKind::CloudDrive(_) => {
            info.requires_embedded_web_player = info.resolved_url.is_none();
            if let Some(container) = container_of(url) {
                info.stream_subtype = Some(container.extension().to_string());
                info.container = Some(container);
            }
        }
        SourceKind::Adult(_) => {
            info.requires_embedded_web_player = true;
            info.requires_age_gate = true;
            info.requires_entitlement_tier = Some(EntitlementTier::Premium);
        }
        _ => info.requires_embedded_web_player = true,
    }

    info
}

fn from_extension(original: &str, url: &Url) -> SourceInfo {
    let extension = path_extension(url);

    match extension.as_deref() {
        Some("m3u8") | Some("m3u") => {
            let mut info = SourceInfo::new(original, SourceKind::Stream(StreamType::Hls), "HLS Stream");
            info.stream_subtype = Some("m3u8".to_string());
            info
        }
        Some("mpd") => {
            let mut info = SourceInfo::new(original, SourceKind::Stream(StreamType::Dash), "DASH Stream");
            info.stream_subtype = Some("mpd".to_string());
            info
        }
        Some(ext) => match Container::from_extension(ext) {
            Some(container) => {
                let mut info = SourceInfo::new(original, SourceKind::Direct, "Direct");
                info.stream_subtype = Some(container.extension().to_string());
                info.container = Some(container);
                info
            }
            None => unknown(original),
        },
        None => unknown(original),
    }
}

fn unknown(original: &str) -> SourceInfo {
    let mut info = SourceInfo::new(original, SourceKind::Unknown, "Web");
    info.requires_embedded_web_player = true;
    info
}

/// Lowercased extension of the last path segment, ignoring query and fragment.
fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn container_of(url: &Url) -> Option<Container> {
    path_extension(url).and_then(|ext| Container::from_extension(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AdultPlatform, CloudProvider, SocialPlatform};

    #[test]
    fn test_youtube_short_link() {
        let info = classify("https://youtu.be/DzVKgumDkpo");
        assert_eq!(info.kind, SourceKind::YouTube);
        assert_eq!(info.video_id.as_deref(), Some("DzVKgumDkpo"));
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/DzVKgumDkpo")
        );
        assert!(info.requires_embedded_web_player);
    }

    #[test]
    fn test_youtube_host_without_id() {
        let info = classify("https://www.youtube.com/feed/trending");
        assert_eq!(info.kind, SourceKind::YouTube);
        assert!(info.video_id.is_none());
        assert!(info.embed_url.is_none());
    }

    #[test]
    fn test_empty_and_malformed_input() {
        let info = classify("   ");
        assert_eq!(info.kind, SourceKind::Unsupported);
        assert!(info.error_message.is_some());

        let info = classify("not a url");
        assert_eq!(info.kind, SourceKind::Unsupported);
        assert!(info.error_message.unwrap().contains("Malformed"));

        let info = classify("ftp://example.com/video.mp4");
        assert_eq!(info.kind, SourceKind::Unsupported);
    }

    #[test]
    fn test_direct_containers() {
        let info = classify("https://cdn.example.com/movies/video.mkv");
        assert_eq!(info.kind, SourceKind::Direct);
        assert_eq!(info.container, Some(Container::Mkv));
        assert_eq!(info.stream_subtype.as_deref(), Some("mkv"));
        assert!(!info.requires_embedded_web_player);

        let info = classify("https://cdn.example.com/clip.MP4?token=abc#t=10");
        assert_eq!(info.container, Some(Container::Mp4));
    }

    #[test]
    fn test_manifests() {
        let info = classify("https://cdn.example.com/live/master.m3u8?sig=1");
        assert_eq!(info.kind, SourceKind::Stream(StreamType::Hls));
        assert_eq!(info.stream_subtype.as_deref(), Some("m3u8"));

        let info = classify("https://cdn.example.com/vod/manifest.mpd");
        assert_eq!(info.kind, SourceKind::Stream(StreamType::Dash));
    }

    #[test]
    fn test_live_ingest_schemes() {
        let info = classify("rtmp://live.example.com/app/stream");
        assert_eq!(info.kind, SourceKind::Stream(StreamType::Rtmp));
        assert_eq!(info.stream_subtype.as_deref(), Some("rtmp"));

        let info = classify("rtsp://camera.local/feed");
        assert_eq!(info.kind, SourceKind::Stream(StreamType::Rtmp));
    }

    #[test]
    fn test_google_drive_resolves_direct_link() {
        let info = classify("https://drive.google.com/file/d/1AbCdEf_gh-IJ/view?usp=sharing");
        assert_eq!(info.kind, SourceKind::CloudDrive(CloudProvider::GoogleDrive));
        assert_eq!(info.video_id.as_deref(), Some("1AbCdEf_gh-IJ"));
        assert_eq!(
            info.resolved_url.as_deref(),
            Some("https://drive.google.com/uc?export=download&id=1AbCdEf_gh-IJ")
        );
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://drive.google.com/file/d/1AbCdEf_gh-IJ/preview")
        );
        assert!(!info.requires_embedded_web_player);
    }

    #[test]
    fn test_mega_needs_web_player() {
        let info = classify("https://mega.nz/file/AbC123xy#key");
        assert_eq!(info.kind, SourceKind::CloudDrive(CloudProvider::Mega));
        assert!(info.resolved_url.is_none());
        assert!(info.requires_embedded_web_player);
    }

    #[test]
    fn test_adult_sources_are_gated() {
        let info = classify("https://www.pornhub.com/view_video.php?viewkey=ph5f1a2b3c");
        assert_eq!(info.kind, SourceKind::Adult(AdultPlatform::Pornhub));
        assert_eq!(info.video_id.as_deref(), Some("ph5f1a2b3c"));
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://www.pornhub.com/embed/ph5f1a2b3c")
        );
        assert!(info.requires_age_gate);
        assert_eq!(info.requires_entitlement_tier, Some(EntitlementTier::Premium));
        assert!(info.requires_embedded_web_player);
    }

    #[test]
    fn test_social_platforms() {
        let info = classify("https://x.com/someone/status/1234567890");
        assert_eq!(info.kind, SourceKind::SocialMedia(SocialPlatform::Twitter));
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://platform.twitter.com/embed/Tweet.html?id=1234567890")
        );

        let info = classify("https://www.tiktok.com/@user/video/7100000000000000000");
        assert_eq!(info.kind, SourceKind::SocialMedia(SocialPlatform::TikTok));
        assert_eq!(info.video_id.as_deref(), Some("7100000000000000000"));
    }

    #[test]
    fn test_video_platform_embeds() {
        let info = classify("https://vimeo.com/76979871");
        assert_eq!(info.kind, SourceKind::Vimeo);
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://player.vimeo.com/video/76979871")
        );

        let info = classify("https://www.facebook.com/watch/?v=10153231379946729");
        assert_eq!(info.kind, SourceKind::Facebook);
        assert_eq!(info.video_id.as_deref(), Some("10153231379946729"));
        assert!(info
            .embed_url
            .unwrap()
            .starts_with("https://www.facebook.com/plugins/video.php?href=https%3A%2F%2F"));

        let info = classify("https://dai.ly/x8abc12");
        assert_eq!(info.kind, SourceKind::Dailymotion);
        assert_eq!(
            info.embed_url.as_deref(),
            Some("https://www.dailymotion.com/embed/video/x8abc12")
        );
    }

    #[test]
    fn test_platform_tables_win_over_extensions() {
        // Cloud share ending in .mp4 stays a cloud source
        let info = classify("https://www.dropbox.com/s/abc123/movie.mp4?dl=0");
        assert_eq!(info.kind, SourceKind::CloudDrive(CloudProvider::Dropbox));
        assert_eq!(info.container, Some(Container::Mp4));
        assert_eq!(
            info.resolved_url.as_deref(),
            Some("https://www.dropbox.com/s/abc123/movie.mp4?dl=1")
        );
    }

    #[test]
    fn test_unknown_http_url() {
        let info = classify("https://example.com/watch/episode-4");
        assert_eq!(info.kind, SourceKind::Unknown);
        assert!(info.requires_embedded_web_player);
        assert!(info.error_message.is_none());
    }
}
