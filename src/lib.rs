//! Workspace façade crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-media`, `core-playback`). Host
//! applications can depend on `playback-workspace` and enable the documented
//! features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "media")]
pub use core_media as media;

#[cfg(feature = "playback")]
pub use core_playback as playback;
