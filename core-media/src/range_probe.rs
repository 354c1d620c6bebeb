//! # Range Probing
//!
//! Checks whether a remote file honours HTTP byte-range requests, which
//! native players need to seek in progressive downloads.
//!
//! Results are cached per resource (scheme, host, port and path; query and
//! fragment are ignored so signed URLs share an entry) in a bounded LRU.
//! Concurrent probes for the same resource share one `HEAD` request.

use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_RANGE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RANGE_CACHE_CAPACITY: usize = 256;

/// Metadata from a `HEAD` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileInfo {
    pub url: String,
    /// `None` when the request itself failed.
    pub status: Option<u16>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub supports_range: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteFileInfo {
    fn unreachable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            content_length: None,
            content_type: None,
            supports_range: false,
            last_modified: None,
        }
    }
}

pub struct RangeProber {
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
    cache: Mutex<LruCache<String, Arc<OnceCell<bool>>>>,
}

impl RangeProber {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            http_client,
            timeout,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Whether `url` supports byte ranges. Any failure answers `false`.
    pub async fn test_range_support(&self, url: &str) -> bool {
        let key = cache_key(url);
        let cell = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.get_or_insert(key, || Arc::new(OnceCell::new())))
        };

        *cell
            .get_or_init(|| async {
                match self.head(url).await {
                    Some(info) => info.supports_range,
                    None => false,
                }
            })
            .await
    }

    /// Fetch `HEAD` metadata. Never cached.
    pub async fn fetch_file_info(&self, url: &str) -> RemoteFileInfo {
        self.head(url)
            .await
            .unwrap_or_else(|| RemoteFileInfo::unreachable(url))
    }

    async fn head(&self, url: &str) -> Option<RemoteFileInfo> {
        let request = HttpRequest::head(url).timeout(self.timeout);
        let response = match self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %cache_key(url), error = %e, "HEAD probe failed");
                return None;
            }
        };

        let accepts_bytes = response
            .header("accept-ranges")
            .map(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")))
            .unwrap_or(false);
        let supports_range = response.status == 206 || (response.is_success() && accepts_bytes);

        let info = RemoteFileInfo {
            url: url.to_string(),
            status: Some(response.status),
            content_length: response
                .header("content-length")
                .and_then(|v| v.trim().parse().ok()),
            content_type: response.header("content-type").map(str::to_string),
            supports_range,
            last_modified: response
                .header("last-modified")
                .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        };

        debug!(
            url = %cache_key(url),
            status = response.status,
            supports_range,
            "HEAD probe completed"
        );
        Some(info)
    }

    /// Number of cached resources.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn reset(&self) {
        self.cache.lock().clear();
    }
}

/// Scheme, host, port and path. Falls back to cutting at `?`/`#` for
/// strings the URL parser rejects.
fn cache_key(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => {
            let mut key = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default());
            if let Some(port) = parsed.port() {
                key.push_str(&format!(":{}", port));
            }
            key.push_str(parsed.path());
            key
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
