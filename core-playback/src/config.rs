//! # Player Configuration
//!
//! Per-resolution playback intent supplied by the caller.

use bridge_traits::playback::{MediaLoadRequest, MediaProtocol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{PlaybackError, Result};

pub const MIN_PLAYBACK_RATE: f32 = 0.25;
pub const MAX_PLAYBACK_RATE: f32 = 4.0;

/// How much to fetch before playback is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadHint {
    None,
    #[default]
    Metadata,
    Auto,
}

/// Chain traversal policy.
///
/// Every chain entry is tried; the policy shapes the wait between entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed attempts after which the exponential delay stops doubling.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the next chain entry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Double the delay after every failed attempt.
    #[serde(default)]
    pub exponential_backoff: bool,

    /// Optional hard cap on attempts, below the chain length.
    #[serde(default)]
    pub attempt_limit: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            exponential_backoff: false,
            attempt_limit: None,
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt with zero-based index `failed_index`.
    pub fn delay_for(&self, failed_index: u32, max_backoff: Duration) -> Duration {
        if !self.exponential_backoff {
            return self.retry_delay.min(max_backoff);
        }
        let factor = 2u32
            .checked_pow(failed_index.min(self.max_retries))
            .unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(max_backoff)
            .min(max_backoff)
    }

    /// Attempts for a chain of `chain_len` entries: the whole chain unless
    /// an `attempt_limit` is set. A limit of zero still allows one attempt.
    pub fn max_attempts(&self, chain_len: usize) -> usize {
        match self.attempt_limit {
            Some(limit) => chain_len.min(limit.max(1) as usize),
            None => chain_len,
        }
    }
}

/// Caller's playback intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub url: String,
    pub auto_play: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub muted: bool,
    /// `0.0..=1.0`
    pub volume: f32,
    /// `0.25..=4.0`
    pub playback_rate: f32,
    pub preload: PreloadHint,
    /// Extra request headers for manifests, probes and native loads.
    pub headers: HashMap<String, String>,
    pub retry: RetryPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auto_play: false,
            looping: false,
            muted: false,
            volume: 1.0,
            playback_rate: 1.0,
            preload: PreloadHint::default(),
            headers: HashMap::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PlayerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_playback_rate(mut self, rate: f32) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn with_preload(mut self, preload: PreloadHint) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidConfig(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            )));
        }

        if !(MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&self.playback_rate) {
            return Err(PlaybackError::InvalidConfig(format!(
                "playback_rate must be between {} and {}, got {}",
                MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE, self.playback_rate
            )));
        }

        Ok(())
    }

    /// Native backend request for `url` with this config's intent.
    pub fn load_request(&self, url: impl Into<String>, protocol: MediaProtocol) -> MediaLoadRequest {
        let mut request = MediaLoadRequest::new(url, protocol);
        request.headers = self.headers.clone();
        request.autoplay = self.auto_play;
        request.looping = self.looping;
        request.muted = self.muted;
        request.volume = self.volume.clamp(0.0, 1.0);
        request.playback_rate = self.playback_rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        request.metadata_only = !self.auto_play && self.preload != PreloadHint::Auto;
        request
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_secs(2));
        assert!(!config.retry.exponential_backoff);
        assert_eq!(config.preload, PreloadHint::Metadata);
    }

    #[test]
    fn test_validation_ranges() {
        assert!(PlayerConfig::default().with_volume(1.5).validate().is_err());
        assert!(PlayerConfig::default().with_volume(-0.1).validate().is_err());
        assert!(PlayerConfig::default().with_playback_rate(0.1).validate().is_err());
        assert!(PlayerConfig::default().with_playback_rate(4.5).validate().is_err());
        assert!(PlayerConfig::default().with_playback_rate(0.25).validate().is_ok());

        let zero_delay = PlayerConfig::default().with_retry(RetryPolicy {
            max_retries: 1,
            retry_delay: Duration::ZERO,
            exponential_backoff: true,
            attempt_limit: None,
        });
        assert!(zero_delay.validate().is_ok());
    }

    #[test]
    fn test_backoff_is_capped() {
        let cap = Duration::from_secs(30);
        let linear = RetryPolicy::default();
        assert_eq!(linear.delay_for(0, cap), Duration::from_secs(2));
        assert_eq!(linear.delay_for(5, cap), Duration::from_secs(2));

        let exponential = RetryPolicy {
            exponential_backoff: true,
            ..RetryPolicy::default()
        };
        assert_eq!(exponential.delay_for(0, cap), Duration::from_secs(2));
        assert_eq!(exponential.delay_for(2, cap), Duration::from_secs(8));
        // Doubling stops after max_retries (3): 2s * 2^3.
        assert_eq!(exponential.delay_for(10, cap), Duration::from_secs(16));
        assert_eq!(exponential.delay_for(40, cap), Duration::from_secs(16));

        let unbounded = RetryPolicy {
            max_retries: 64,
            exponential_backoff: true,
            ..RetryPolicy::default()
        };
        assert_eq!(unbounded.delay_for(10, cap), cap);
        assert_eq!(unbounded.delay_for(40, cap), cap);

        let flat = RetryPolicy {
            max_retries: 0,
            exponential_backoff: true,
            ..RetryPolicy::default()
        };
        assert_eq!(flat.delay_for(4, cap), Duration::from_secs(2));
    }

    #[test]
    fn test_max_attempts_walks_whole_chain_by_default() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.max_attempts(2), 2);
        assert_eq!(retry.max_attempts(9), 9);

        let no_retries = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(no_retries.max_attempts(3), 3);

        let limited = RetryPolicy {
            attempt_limit: Some(1),
            ..RetryPolicy::default()
        };
        assert_eq!(limited.max_attempts(3), 1);
        let zero = RetryPolicy {
            attempt_limit: Some(0),
            ..RetryPolicy::default()
        };
        assert_eq!(zero.max_attempts(3), 1);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"url":"https://a/b.mp4","loop":true,"preload":"auto"}"#).unwrap();
        assert!(config.looping);
        assert_eq!(config.preload, PreloadHint::Auto);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_load_request() {
        let request = PlayerConfig::new("https://a/b.mp4")
            .with_auto_play(true)
            .with_header("Referer", "https://a/")
            .load_request("https://a/b.mp4", MediaProtocol::Progressive);
        assert!(request.autoplay);
        assert!(!request.metadata_only);
        assert_eq!(request.headers.get("Referer").map(String::as_str), Some("https://a/"));
    }
}
