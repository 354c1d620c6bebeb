//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback resolution core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but cannot provide itself.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - `HEAD` range probes, manifest fetches, report upload
//!
//! ### Runtime Description
//! - [`PlatformInfo`](platform::PlatformInfo) - Runtime family and hardware decoders
//! - [`CodecProbe`](platform::CodecProbe) - Optional synthetic decode-capability query
//!
//! ### Playback Runtimes
//! - [`NativePlayerBackend`](playback::NativePlayerBackend) - Opaque platform media player
//! - [`WebPlayerHost`](playback::WebPlayerHost) - Embedded web runtime with a text message channel
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HTTP + platform info |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//! | Web      | TBD                 | 📋 Planned |
//!
//! Player backends are always host-provided; there is no desktop default.
//!
//! ## Fail-Fast Strategy
//!
//! `core_runtime::config::CoreConfigBuilder::build` rejects a configuration
//! with no playback runtime, or with no HTTP client or platform when the
//! `desktop-shims` defaults are off, naming the missing bridge
//! (`core_runtime::Error::MissingBridge`).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod error;
pub mod http;
pub mod platform;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use platform::{CodecProbe, DecoderSupport, PlatformFamily, PlatformInfo};
pub use playback::{
    BackendErrorKind, BackendEvent, MediaLoadRequest, MediaProtocol, NativePlayerBackend,
    NativePlayerBackendProvider, WebPageContent, WebPlayerHost, WebPlayerHostProvider,
    WebPlayerPage,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
