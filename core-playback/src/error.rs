//! # Playback Error Types
//!
//! Two layers:
//!
//! - [`PlaybackError`]: Rust-side failures (factory, configuration, report
//!   submission) propagated with `?`.
//! - [`PlayerError`]: the user-facing error record carried through adapter
//!   error channels, the attempt log and the error reporter.

use bridge_traits::error::BridgeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::traits::AdapterKind;

/// Errors returned by playback components.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// No adapter of this kind can be built (no implementation, or its
    /// backend provider was not injected).
    #[error("Adapter unavailable: {0}")]
    AdapterUnavailable(AdapterKind),

    /// The source classified as unsupported; the fallback chain is empty.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// The runtime cannot deliver the source through this adapter.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    #[error("Error report submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Stable, wire-visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedSource,
    VideoIdExtractionFailed,
    InvalidConfig,
    AdapterUnavailable,
    BackendUnavailable,
    InitializationFailed,
    LoadFailed,
    NetworkError,
    DecodeError,
    UnsupportedFormat,
    PlaybackFailed,
    RangeNotSupported,
    LivenessTimeout,
    EmbedError,
    PipelineCancelled,
    AllAdaptersFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedSource => "UNSUPPORTED_SOURCE",
            ErrorCode::VideoIdExtractionFailed => "VIDEO_ID_EXTRACTION_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::AdapterUnavailable => "ADAPTER_UNAVAILABLE",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::InitializationFailed => "INITIALIZATION_FAILED",
            ErrorCode::LoadFailed => "LOAD_FAILED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::DecodeError => "DECODE_ERROR",
            ErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCode::PlaybackFailed => "PLAYBACK_FAILED",
            ErrorCode::RangeNotSupported => "RANGE_NOT_SUPPORTED",
            ErrorCode::LivenessTimeout => "LIVENESS_TIMEOUT",
            ErrorCode::EmbedError => "EMBED_ERROR",
            ErrorCode::PipelineCancelled => "PIPELINE_CANCELLED",
            ErrorCode::AllAdaptersFailed => "ALL_ADAPTERS_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Non-blocking; never fails an attempt.
    Warning,
    /// Attempt-local.
    Error,
    /// Attempt-terminal; session-terminal once the chain is exhausted.
    Fatal,
}

/// User-facing playback error.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct PlayerError {
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
    pub source_url: Option<String>,
    /// Adapter or platform that raised the error (`"native"`, `"youtube"`, ...).
    pub platform: Option<String>,
}

impl PlayerError {
    /// Fatal errors default to non-recoverable, everything else to recoverable.
    pub fn new(code: ErrorCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            recoverable: severity != Severity::Fatal,
            timestamp: Utc::now(),
            source_url: None,
            platform: None,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Warning)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Error)
    }

    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Fatal)
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// `error` or `fatal`: fails an attempt inside the liveness window.
    pub fn fails_attempt(&self) -> bool {
        self.severity >= Severity::Error
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl From<PlaybackError> for PlayerError {
    fn from(error: PlaybackError) -> Self {
        let code = match &error {
            PlaybackError::AdapterUnavailable(_) => ErrorCode::AdapterUnavailable,
            PlaybackError::UnsupportedSource(_) => ErrorCode::UnsupportedSource,
            PlaybackError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            PlaybackError::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            PlaybackError::Bridge(BridgeError::Timeout(_)) => ErrorCode::NetworkError,
            PlaybackError::Bridge(BridgeError::NotAvailable(_)) => ErrorCode::BackendUnavailable,
            _ => ErrorCode::InitializationFailed,
        };
        PlayerError::fatal(code, error.to_string())
    }
}
