//! Codec, container and protocol identifiers.
//!
//! Hosts, manifests and HTML `codecs=` strings name codecs inconsistently
//! (`avc1.64001f`, `H.264`, `hev1`, `ec-3`, ...). Everything is normalized
//! to these enums before it reaches a capability table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MediaError;

/// Video codecs known to the capability tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
    Vp8,
    Vp9,
    Av1,
}

impl VideoCodec {
    /// Best first. Used to estimate the quality cost of a substitution.
    pub const QUALITY_RANKING: [VideoCodec; 5] = [
        VideoCodec::Av1,
        VideoCodec::Hevc,
        VideoCodec::Vp9,
        VideoCodec::H264,
        VideoCodec::Vp8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
            VideoCodec::Vp8 => "vp8",
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Av1 => "av1",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = normalize(name);
        let family = name.split('.').next().unwrap_or_default();
        match family {
            "h264" | "avc" | "avc1" | "avc3" | "x264" => Some(VideoCodec::H264),
            "h265" | "hevc" | "hvc1" | "hev1" | "x265" => Some(VideoCodec::Hevc),
            "vp8" => Some(VideoCodec::Vp8),
            "vp9" | "vp09" => Some(VideoCodec::Vp9),
            "av1" | "av01" => Some(VideoCodec::Av1),
            _ => None,
        }
    }
}

/// Audio codecs known to the capability tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    Ac3,
    Eac3,
    Dts,
}

impl AudioCodec {
    /// Best first. Codecs missing from the ranking carry no quality estimate.
    pub const QUALITY_RANKING: [AudioCodec; 5] = [
        AudioCodec::Eac3,
        AudioCodec::Ac3,
        AudioCodec::Aac,
        AudioCodec::Opus,
        AudioCodec::Mp3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Opus => "opus",
            AudioCodec::Vorbis => "vorbis",
            AudioCodec::Flac => "flac",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Eac3 => "eac3",
            AudioCodec::Dts => "dts",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = normalize(name);
        // mp4a.40.x is AAC except object type 34 (MP3 in MP4)
        if name == "mp4a.40.34" || name == "mp4a.6b" || name == "mp4a.69" {
            return Some(AudioCodec::Mp3);
        }
        let family = name.split('.').next().unwrap_or_default();
        match family {
            "aac" | "mp4a" | "heaac" => Some(AudioCodec::Aac),
            "mp3" | "mpeg" | "mpga" => Some(AudioCodec::Mp3),
            "opus" => Some(AudioCodec::Opus),
            "vorbis" => Some(AudioCodec::Vorbis),
            "flac" => Some(AudioCodec::Flac),
            "ac3" | "ac-3" => Some(AudioCodec::Ac3),
            "eac3" | "e-ac3" | "ec3" | "ec-3" => Some(AudioCodec::Eac3),
            "dts" | "dtsc" | "dtse" | "dtsh" => Some(AudioCodec::Dts),
            _ => None,
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .to_ascii_lowercase()
        .replace("h.26", "h26")
}

/// Either kind of codec; the unit of capability lookups and probe caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Codec {
    Video(VideoCodec),
    Audio(AudioCodec),
}

impl Codec {
    /// Normalized name, e.g. `"av1"`, `"eac3"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Video(codec) => codec.as_str(),
            Codec::Audio(codec) => codec.as_str(),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Codec::Video(_))
    }
}

impl From<VideoCodec> for Codec {
    fn from(codec: VideoCodec) -> Self {
        Codec::Video(codec)
    }
}

impl From<AudioCodec> for Codec {
    fn from(codec: AudioCodec) -> Self {
        Codec::Audio(codec)
    }
}

impl FromStr for Codec {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoCodec::parse(s)
            .map(Codec::Video)
            .or_else(|| AudioCodec::parse(s).map(Codec::Audio))
            .ok_or_else(|| MediaError::UnknownCodec(s.to_string()))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File containers recognized by extension sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    M4v,
    Webm,
    Ogg,
    Ogv,
    Mov,
    Mkv,
    Avi,
    Wmv,
    Flv,
    #[serde(rename = "3gp")]
    ThreeGp,
    Ts,
}

impl Container {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Container::Mp4),
            "m4v" => Some(Container::M4v),
            "webm" => Some(Container::Webm),
            "ogg" => Some(Container::Ogg),
            "ogv" => Some(Container::Ogv),
            "mov" => Some(Container::Mov),
            "mkv" => Some(Container::Mkv),
            "avi" => Some(Container::Avi),
            "wmv" => Some(Container::Wmv),
            "flv" => Some(Container::Flv),
            "3gp" => Some(Container::ThreeGp),
            "ts" => Some(Container::Ts),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::M4v => "m4v",
            Container::Webm => "webm",
            Container::Ogg => "ogg",
            Container::Ogv => "ogv",
            Container::Mov => "mov",
            Container::Mkv => "mkv",
            Container::Avi => "avi",
            Container::Wmv => "wmv",
            Container::Flv => "flv",
            Container::ThreeGp => "3gp",
            Container::Ts => "ts",
        }
    }

    /// Containers every mainstream native player opens progressively.
    pub fn is_web_native(&self) -> bool {
        matches!(
            self,
            Container::Mp4 | Container::M4v | Container::Webm | Container::Ogg | Container::Ogv
        )
    }

    /// Containers that need server-side remuxing/transcoding to play anywhere.
    pub fn needs_transcode(&self) -> bool {
        matches!(
            self,
            Container::Mkv | Container::Avi | Container::Wmv | Container::Flv | Container::Mov
        )
    }
}

impl FromStr for Container {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Container::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| MediaError::UnknownContainer(s.to_string()))
    }
}

/// Delivery protocols a runtime may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Progressive,
    Hls,
    Dash,
    Rtmp,
}
