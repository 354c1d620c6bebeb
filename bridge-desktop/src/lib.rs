//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest`
//! - `PlatformInfo` derived from the compilation target
//!
//! Player backends and web hosts are not provided here; desktop shells inject
//! their own (GStreamer, webview2, WKWebView, ...).
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopPlatform, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .platform(Arc::new(DesktopPlatform::new()))
//!     .native_backend(Arc::new(MyGstreamerProvider::default()))
//!     .build()?;
//! ```

mod http;
mod platform;

pub use http::ReqwestHttpClient;
pub use platform::DesktopPlatform;
