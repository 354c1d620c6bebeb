//! Runtime plumbing shared by the playback crates: host configuration
//! ([`config::CoreConfig`]), `tracing` setup with URL redaction
//! ([`logging`]) and the broadcast [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
