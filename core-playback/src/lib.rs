//! # Playback Resolution
//!
//! Turns a classified [`SourceInfo`](core_media::SourceInfo) into a live
//! player session.
//!
//! ## Overview
//!
//! - [`traits`]: the uniform [`PlayerAdapter`] contract
//! - [`adapters`]: native, stream, cloud, YouTube, social and webview adapters
//! - [`factory`]: source to fallback chain mapping and adapter construction
//! - [`pipeline`]: chain traversal with liveness testing and backoff
//! - [`reporter`]: bounded diagnostic error log
//! - [`session`]: caller-facing handle over the surviving adapter
//!
//! Host runtimes (native media backend, embedded web page host) are injected
//! through `bridge_traits::playback`; nothing here talks to a platform API
//! directly.

pub mod adapters;
pub mod channel;
pub mod config;
pub mod error;
pub mod factory;
pub mod listeners;
pub mod pipeline;
pub mod reporter;
pub mod session;
pub mod traits;

pub use config::{PlayerConfig, PreloadHint, RetryPolicy};
pub use error::{ErrorCode, PlaybackError, PlayerError, Result, Severity};
pub use factory::{fallback_chain, AdapterFactory, FallbackChain};
pub use listeners::Subscription;
pub use pipeline::{
    FallbackTransition, PipelineAttempt, PipelineFailure, PipelineProgress, PipelineStage,
    RedundancyPipeline, ResolvedPlayback,
};
pub use reporter::{ErrorReport, ErrorReporter, HttpReportSubmitter, ReportExport, ReportSubmitter};
pub use session::PlaybackSession;
pub use traits::{
    AdapterKind, PlaybackState, PlayerAdapter, PlayerCapabilities, QualityLevel,
};
