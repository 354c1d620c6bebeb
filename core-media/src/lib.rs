//! # Core Media Module
//!
//! Everything that can be decided about a source before a player is touched.
//!
//! ## Overview
//!
//! - [`source`] - URL classification into a [`SourceInfo`](source::SourceInfo)
//! - [`capabilities`] - Per-runtime codec/container/protocol tables and memoized codec probes
//! - [`codec_switch`] - Fallback strategies for unplayable codecs
//! - [`range_probe`] - Cached HTTP byte-range support checks
//!
//! Classification is pure. Capability detection and range probing own their
//! caches; create them once per service and call `reset()` to invalidate.

pub mod capabilities;
pub mod codec;
pub mod codec_switch;
pub mod error;
pub mod range_probe;
pub mod source;

pub use capabilities::{CapabilityDetector, CodecTestResult, FormatCapabilities};
pub use codec::{AudioCodec, Codec, Container, StreamProtocol, VideoCodec};
pub use codec_switch::{CodecSwitchDecision, CodecSwitcher, FallbackStrategy, TranscodingPreferences};
pub use error::{MediaError, Result};
pub use range_probe::{RangeProber, RemoteFileInfo};
pub use source::{classify, SourceInfo, SourceKind};
