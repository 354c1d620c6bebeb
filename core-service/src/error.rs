use core_media::SourceInfo;
use core_playback::{FallbackChain, PipelineAttempt, PlayerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Terminal outcome of a failed [`resolve`](crate::CoreService::resolve).
///
/// `error` is the only error the caller needs to surface; `attempts` keeps
/// the per-adapter history for diagnostics.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct ResolveError {
    pub error: PlayerError,
    pub source_info: SourceInfo,
    pub chain: FallbackChain,
    pub attempts: Vec<PipelineAttempt>,
}
