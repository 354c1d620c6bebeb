//! # Concrete Player Adapters
//!
//! | Adapter | Kind(s) | Runtime |
//! |---------|---------|---------|
//! | [`NativeAdapter`] | `native` | native backend |
//! | [`StreamAdapter`] | `hls`, `dash` | native backend, manifest parsed in core |
//! | [`CloudAdapter`] | `cloud` | native backend, share link resolved |
//! | [`YouTubeAdapter`] | `youtube` | web host, IFrame API page |
//! | [`SocialAdapter`] | `social` | web host, platform embed |
//! | [`WebViewAdapter`] | `webview` | web host, embed or raw URL |
//!
//! Native-backed adapters share one engine that pumps
//! [`BackendEvent`](bridge_traits::playback::BackendEvent)s into state;
//! web-backed adapters share one that speaks the typed
//! [`channel`](crate::channel).

mod backend;
mod base;
mod cloud;
mod native;
mod social;
mod stream;
mod web;
mod webview;
mod youtube;

pub use cloud::CloudAdapter;
pub use native::NativeAdapter;
pub use social::SocialAdapter;
pub use stream::{parse_dash_representations, parse_hls_variants, StreamAdapter};
pub use webview::{web_page_for, WebViewAdapter};
pub use youtube::{iframe_page, YouTubeAdapter, YOUTUBE_BASE_URL};
