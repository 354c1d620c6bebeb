//! Ordered platform tables.
//!
//! Each table is evaluated top to bottom and the first host match wins. Id
//! patterns inside an entry are tried in order as well, so more specific
//! shapes come first.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::{AdultPlatform, CloudProvider, SocialPlatform, SourceKind};

type EmbedBuilder = fn(&str, &Url) -> String;
type DirectResolver = fn(&str, &Url) -> Option<String>;

macro_rules! regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).expect("static host pattern"))
    };
}

macro_rules! regex_list {
    ($($pattern:expr),+ $(,)?) => {
        LazyLock::new(|| vec![$(Regex::new($pattern).expect("static id pattern")),+])
    };
}

pub(super) struct PlatformEntry {
    pub kind: SourceKind,
    pub label: &'static str,
    host: &'static LazyLock<Regex>,
    ids: &'static LazyLock<Vec<Regex>>,
    /// Captures that are site sections rather than ids (compared ASCII case-insensitively).
    reserved: &'static [&'static str],
    pub embed: Option<EmbedBuilder>,
    pub resolver: Option<DirectResolver>,
}

impl PlatformEntry {
    pub fn matches_host(&self, host: &str) -> bool {
        self.host.is_match(host)
    }

    /// First capture of the first matching id pattern, skipping reserved words.
    pub fn extract_id(&self, url: &str) -> Option<String> {
        self.ids
            .iter()
            .filter_map(|pattern| pattern.captures(url)?.get(1))
            .map(|m| m.as_str())
            .find(|id| !self.reserved.iter().any(|word| word.eq_ignore_ascii_case(id)))
            .map(str::to_string)
    }
}

// ===== Video platforms =====

const YT_ID: &str = r"([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)";

static YOUTUBE_HOST: LazyLock<Regex> =
    regex!(r"^(?:(?:www|m|music)\.)?youtube(?:-nocookie)?\.com$|^youtu\.be$");
static YOUTUBE_IDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#]*&)?v=",
        r"youtu\.be/",
        r"youtube(?:-nocookie)?\.com/embed/",
        r"youtube\.com/shorts/",
        r"youtube\.com/live/",
        r"youtube\.com/v/",
    ]
    .iter()
    .map(|prefix| Regex::new(&format!("{}{}", prefix, YT_ID)).expect("static id pattern"))
    .collect()
});

static VIMEO_HOST: LazyLock<Regex> = regex!(r"^(?:(?:www|player)\.)?vimeo\.com$");
static VIMEO_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"player\.vimeo\.com/video/(\d+)",
    r"vimeo\.com/(?:[^?#]*/)?(\d+)(?:[/?#]|$)",
];

static TWITCH_HOST: LazyLock<Regex> = regex!(r"^(?:(?:www|m|player)\.)?twitch\.tv$");
static TWITCH_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"twitch\.tv/videos/(\d+)",
    r"[?&]video=v?(\d+)",
    r"[?&]channel=([A-Za-z0-9_]{3,25})",
    r"twitch\.tv/([A-Za-z0-9_]{3,25})(?:[/?#]|$)",
];

/// First path segments of twitch.tv that are not channel names.
const TWITCH_RESERVED: &[&str] = &[
    "directory",
    "videos",
    "settings",
    "p",
    "search",
    "downloads",
    "jobs",
    "turbo",
    "subscriptions",
    "inventory",
    "wallet",
    "friends",
    "messages",
    "login",
    "signup",
];

static FACEBOOK_HOST: LazyLock<Regex> =
    regex!(r"^(?:(?:www|m|web)\.)?facebook\.com$|^fb\.watch$");
static FACEBOOK_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"/videos/(?:[^/?#]+/)?(\d+)",
    r"/reel/(\d+)",
    r"[?&]v=(\d+)",
    r"fb\.watch/([A-Za-z0-9_-]+)",
];

static DAILYMOTION_HOST: LazyLock<Regex> = regex!(r"^(?:www\.)?dailymotion\.com$|^dai\.ly$");
static DAILYMOTION_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"dailymotion\.com/(?:embed/)?video/([A-Za-z0-9]+)",
    r"dai\.ly/([A-Za-z0-9]+)",
];

pub(super) static VIDEO_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        kind: SourceKind::YouTube,
        label: "YouTube",
        host: &YOUTUBE_HOST,
        ids: &YOUTUBE_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.youtube.com/embed/{}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Vimeo,
        label: "Vimeo",
        host: &VIMEO_HOST,
        ids: &VIMEO_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://player.vimeo.com/video/{}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Twitch,
        label: "Twitch",
        host: &TWITCH_HOST,
        ids: &TWITCH_IDS,
        reserved: TWITCH_RESERVED,
        embed: Some(twitch_embed),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Facebook,
        label: "Facebook",
        host: &FACEBOOK_HOST,
        ids: &FACEBOOK_IDS,
        reserved: &[],
        embed: Some(|_, url| {
            format!(
                "https://www.facebook.com/plugins/video.php?href={}&show_text=false",
                encode(url.as_str())
            )
        }),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Dailymotion,
        label: "Dailymotion",
        host: &DAILYMOTION_HOST,
        ids: &DAILYMOTION_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.dailymotion.com/embed/video/{}", id)),
        resolver: None,
    },
];

/// Parent domain sent with Twitch embeds.
const TWITCH_EMBED_PARENT: &str = "localhost";

fn twitch_embed(id: &str, _url: &Url) -> String {
    if id.chars().all(|c| c.is_ascii_digit()) {
        format!(
            "https://player.twitch.tv/?video=v{}&parent={}",
            id, TWITCH_EMBED_PARENT
        )
    } else {
        format!(
            "https://player.twitch.tv/?channel={}&parent={}",
            id, TWITCH_EMBED_PARENT
        )
    }
}

// ===== Social media =====

static TWITTER_HOST: LazyLock<Regex> = regex!(r"^(?:(?:www|mobile)\.)?(?:twitter|x)\.com$");
static TWITTER_IDS: LazyLock<Vec<Regex>> = regex_list![r"/status(?:es)?/(\d+)"];

static INSTAGRAM_HOST: LazyLock<Regex> = regex!(r"^(?:www\.)?instagram\.com$");
static INSTAGRAM_IDS: LazyLock<Vec<Regex>> =
    regex_list![r"instagram\.com/(?:[^/?#]+/)?(?:p|reels?|tv)/([A-Za-z0-9_-]+)"];

static TIKTOK_HOST: LazyLock<Regex> = regex!(r"^(?:(?:www|m|vm|vt)\.)?tiktok\.com$");
static TIKTOK_IDS: LazyLock<Vec<Regex>> = regex_list![r"/video/(\d+)", r"/embed/(?:v2/)?(\d+)"];

pub(super) static SOCIAL_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        kind: SourceKind::SocialMedia(SocialPlatform::Twitter),
        label: "Twitter",
        host: &TWITTER_HOST,
        ids: &TWITTER_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://platform.twitter.com/embed/Tweet.html?id={}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::SocialMedia(SocialPlatform::Instagram),
        label: "Instagram",
        host: &INSTAGRAM_HOST,
        ids: &INSTAGRAM_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.instagram.com/p/{}/embed", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::SocialMedia(SocialPlatform::TikTok),
        label: "TikTok",
        host: &TIKTOK_HOST,
        ids: &TIKTOK_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.tiktok.com/embed/v2/{}", id)),
        resolver: None,
    },
];

// ===== Cloud drives =====

static GOOGLE_DRIVE_HOST: LazyLock<Regex> = regex!(r"^(?:drive|docs)\.google\.com$");
static GOOGLE_DRIVE_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"/file/d/([A-Za-z0-9_-]+)",
    r"[?&]id=([A-Za-z0-9_-]+)",
];

static DROPBOX_HOST: LazyLock<Regex> = regex!(r"^(?:www\.|dl\.)?dropbox(?:usercontent)?\.com$");
static DROPBOX_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"/scl/fi/([A-Za-z0-9]+)",
    r"/(?:s|sh)/([A-Za-z0-9]+)",
];

static ONEDRIVE_HOST: LazyLock<Regex> =
    regex!(r"^(?:onedrive\.live\.com|1drv\.ms)$|\.sharepoint\.com$");
static ONEDRIVE_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"[?&](?:resid|id)=([^&#]+)",
    r"1drv\.ms/(?:[a-z]/)?(?:[a-z]/)?([A-Za-z0-9_!-]+)",
];

static MEGA_HOST: LazyLock<Regex> = regex!(r"^mega\.(?:nz|co\.nz|io)$");
static MEGA_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"mega\.[a-z.]+/(?:file|embed)/([A-Za-z0-9_-]+)",
    r"#!([A-Za-z0-9_-]+)",
];

pub(super) static CLOUD_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        kind: SourceKind::CloudDrive(CloudProvider::GoogleDrive),
        label: "Google Drive",
        host: &GOOGLE_DRIVE_HOST,
        ids: &GOOGLE_DRIVE_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://drive.google.com/file/d/{}/preview", id)),
        resolver: Some(|id, _| {
            Some(format!(
                "https://drive.google.com/uc?export=download&id={}",
                id
            ))
        }),
    },
    PlatformEntry {
        kind: SourceKind::CloudDrive(CloudProvider::Dropbox),
        label: "Dropbox",
        host: &DROPBOX_HOST,
        ids: &DROPBOX_IDS,
        reserved: &[],
        embed: None,
        resolver: Some(dropbox_direct),
    },
    PlatformEntry {
        kind: SourceKind::CloudDrive(CloudProvider::OneDrive),
        label: "OneDrive",
        host: &ONEDRIVE_HOST,
        ids: &ONEDRIVE_IDS,
        reserved: &[],
        embed: None,
        resolver: Some(onedrive_direct),
    },
    PlatformEntry {
        kind: SourceKind::CloudDrive(CloudProvider::Mega),
        label: "Mega",
        host: &MEGA_HOST,
        ids: &MEGA_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://mega.nz/embed/{}", id)),
        resolver: None,
    },
];

/// Force `dl=1`, keeping `rlkey` and friends.
fn dropbox_direct(_id: &str, url: &Url) -> Option<String> {
    let mut direct = url.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "dl" && key != "raw")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    direct.set_fragment(None);
    direct
        .query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("dl", "1");
    Some(direct.to_string())
}

/// `onedrive.live.com/redir|embed?...` becomes `/download?...`. Short links
/// need a server round trip and have no offline resolution.
fn onedrive_direct(_id: &str, url: &Url) -> Option<String> {
    if url.host_str() != Some("onedrive.live.com") {
        return None;
    }
    let path = url.path();
    if !(path.starts_with("/redir") || path.starts_with("/embed") || path.starts_with("/download")) {
        return None;
    }
    let mut direct = url.clone();
    direct.set_path("/download");
    direct.set_fragment(None);
    Some(direct.to_string())
}

// ===== Adult platforms =====

static PORNHUB_HOST: LazyLock<Regex> = regex!(r"(?:^|\.)pornhub\.com$");
static PORNHUB_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"[?&]viewkey=([A-Za-z0-9]+)",
    r"/embed/([A-Za-z0-9]+)",
];

static XVIDEOS_HOST: LazyLock<Regex> = regex!(r"(?:^|\.)xvideos\.com$");
static XVIDEOS_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"/embedframe/([A-Za-z0-9]+)",
    r"/video\.?([A-Za-z0-9]+)(?:[/?#]|$)",
];

static XHAMSTER_HOST: LazyLock<Regex> = regex!(r"(?:^|\.)xhamster\d*\.com$");
static XHAMSTER_IDS: LazyLock<Vec<Regex>> = regex_list![
    r"[?&]video=([A-Za-z0-9]+)",
    r"/videos/(?:[^/?#]*-)?([A-Za-z0-9]+)(?:[/?#]|$)",
];

static REDTUBE_HOST: LazyLock<Regex> = regex!(r"(?:^|\.)redtube\.com$");
static REDTUBE_IDS: LazyLock<Vec<Regex>> =
    regex_list![r"[?&]id=(\d+)", r"redtube\.com/(\d+)(?:[/?#]|$)"];

static YOUPORN_HOST: LazyLock<Regex> = regex!(r"(?:^|\.)youporn\.com$");
static YOUPORN_IDS: LazyLock<Vec<Regex>> = regex_list![r"/(?:watch|embed)/(\d+)"];

pub(super) static ADULT_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        kind: SourceKind::Adult(AdultPlatform::Pornhub),
        label: "Pornhub",
        host: &PORNHUB_HOST,
        ids: &PORNHUB_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.pornhub.com/embed/{}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Adult(AdultPlatform::Xvideos),
        label: "XVideos",
        host: &XVIDEOS_HOST,
        ids: &XVIDEOS_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.xvideos.com/embedframe/{}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Adult(AdultPlatform::Xhamster),
        label: "xHamster",
        host: &XHAMSTER_HOST,
        ids: &XHAMSTER_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://xhamster.com/xembed.php?video={}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Adult(AdultPlatform::Redtube),
        label: "RedTube",
        host: &REDTUBE_HOST,
        ids: &REDTUBE_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://embed.redtube.com/?id={}", id)),
        resolver: None,
    },
    PlatformEntry {
        kind: SourceKind::Adult(AdultPlatform::Youporn),
        label: "YouPorn",
        host: &YOUPORN_HOST,
        ids: &YOUPORN_IDS,
        reserved: &[],
        embed: Some(|id, _| format!("https://www.youporn.com/embed/{}", id)),
        resolver: None,
    },
];

/// All platform tables in evaluation order.
pub(super) static PLATFORM_TABLES: [&[PlatformEntry]; 4] = [
    VIDEO_PLATFORMS,
    SOCIAL_PLATFORMS,
    CLOUD_PLATFORMS,
    ADULT_PLATFORMS,
];

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
