//! # Error Reporter
//!
//! Bounded in-memory log of playback errors for diagnostics, with optional
//! best-effort forwarding to a [`ReportSubmitter`].
//!
//! Reports are kept in insertion order; once `capacity` is reached the oldest
//! report is evicted. Submission runs on a spawned task and never blocks or
//! fails the caller.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PlaybackError, PlayerError, Result};

pub const DEFAULT_REPORT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// `report_<unix millis>_<random>`
    pub id: String,
    pub error: PlayerError,
    /// Source URL without query string or fragment.
    pub url: String,
    pub context: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Serializable snapshot returned by [`ErrorReporter::export_reports`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportExport {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub reports: Vec<ErrorReport>,
}

/// Destination for error reports (analytics endpoint, crash reporter, ...).
#[async_trait]
pub trait ReportSubmitter: Send + Sync {
    async fn submit(&self, report: ErrorReport) -> Result<()>;
}

pub struct ErrorReporter {
    reports: Mutex<VecDeque<ErrorReport>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
    submitter: Option<Arc<dyn ReportSubmitter>>,
}

impl ErrorReporter {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            reports: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            clock,
            submitter: None,
        }
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn ReportSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `error` and return the report id.
    pub fn report(&self, error: &PlayerError, url: &str, context: HashMap<String, String>) -> String {
        let now = self.clock.now();
        let random = Uuid::new_v4().simple().to_string();
        let report = ErrorReport {
            id: format!("report_{}_{}", now.timestamp_millis(), &random[..9]),
            error: error.clone(),
            url: redact_url(url).to_string(),
            context,
            created_at: now,
        };
        let id = report.id.clone();

        {
            let mut reports = self.reports.lock();
            if reports.len() >= self.capacity {
                reports.pop_front();
            }
            reports.push_back(report.clone());
        }
        debug!(report_id = %id, code = %error.code, "Error reported");

        if let Some(submitter) = &self.submitter {
            self.submit(Arc::clone(submitter), report);
        }
        id
    }

    fn submit(&self, submitter: Arc<dyn ReportSubmitter>, report: ErrorReport) {
        let Ok(handle) = Handle::try_current() else {
            debug!(report_id = %report.id, "No async runtime; skipping report submission");
            return;
        };
        handle.spawn(async move {
            let id = report.id.clone();
            if let Err(e) = submitter.submit(report).await {
                warn!(report_id = %id, error = %e, "Error report submission failed");
            }
        });
    }

    pub fn get_report_by_id(&self, id: &str) -> Option<ErrorReport> {
        self.reports
            .lock()
            .iter()
            .find(|report| report.id == id)
            .cloned()
    }

    pub fn export_reports(&self) -> ReportExport {
        let reports: Vec<ErrorReport> = self.reports.lock().iter().cloned().collect();
        ReportExport {
            generated_at: self.clock.now(),
            count: reports.len(),
            reports,
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_reports())?)
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("submitter", &self.submitter.is_some())
            .finish()
    }
}

// ============================================================================
// HTTP Submitter
// ============================================================================

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts each report as JSON to a fixed endpoint.
pub struct HttpReportSubmitter {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
}

impl HttpReportSubmitter {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ReportSubmitter for HttpReportSubmitter {
    async fn submit(&self, report: ErrorReport) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, &self.endpoint)
            .json(&report)?
            .timeout(SUBMIT_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if !response.is_success() {
            return Err(PlaybackError::SubmissionFailed(format!(
                "endpoint returned HTTP {}",
                response.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use bridge_traits::time::ManualClock;
    use chrono::TimeZone;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        Submitter {}

        #[async_trait]
        impl ReportSubmitter for Submitter {
            async fn submit(&self, report: ErrorReport) -> Result<()>;
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
    }

    fn error() -> PlayerError {
        PlayerError::error(ErrorCode::NetworkError, "connection reset")
    }

    #[test]
    fn test_report_id_format_and_redaction() {
        let reporter = ErrorReporter::new(10, clock());
        let id = reporter.report(&error(), "https://cdn.example.com/a.mp4?token=secret", HashMap::new());

        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "report");
        assert_eq!(parts[1], "1714564800000");
        assert_eq!(parts[2].len(), 9);

        let report = reporter.get_report_by_id(&id).unwrap();
        assert_eq!(report.url, "https://cdn.example.com/a.mp4");
        assert!(reporter.get_report_by_id("report_0_missing").is_none());
    }

    #[test]
    fn test_fifo_eviction() {
        let clock = clock();
        let reporter = ErrorReporter::new(3, clock.clone());
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(reporter.report(&error(), "https://a/b.mp4", HashMap::new()));
            clock.advance_millis(1);
        }

        assert_eq!(reporter.len(), 3);
        assert!(reporter.get_report_by_id(&ids[0]).is_none());
        assert!(reporter.get_report_by_id(&ids[1]).is_none());
        let export = reporter.export_reports();
        assert_eq!(export.count, 3);
        assert_eq!(export.reports[0].id, ids[2]);
        assert_eq!(export.reports[2].id, ids[4]);

        reporter.clear();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_export_json() {
        let reporter = ErrorReporter::new(5, clock());
        let mut context = HashMap::new();
        context.insert("adapter".to_string(), "native".to_string());
        reporter.report(&error(), "https://a/b.mp4", context);

        let json: serde_json::Value = serde_json::from_str(&reporter.export_json().unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["reports"][0]["error"]["code"], "NETWORK_ERROR");
        assert_eq!(json["reports"][0]["context"]["adapter"], "native");
    }

    #[test]
    fn test_report_without_runtime_does_not_panic() {
        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().never();
        let reporter = ErrorReporter::new(5, clock()).with_submitter(Arc::new(submitter));
        reporter.report(&error(), "https://a/b.mp4", HashMap::new());
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_submission_is_fire_and_forget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let done_tx = Mutex::new(Some(done_tx));

        let mut submitter = MockSubmitter::new();
        submitter.expect_submit().times(1).returning(move |report| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(tx) = done_tx.lock().take() {
                let _ = tx.send(report.id);
            }
            Err(PlaybackError::SubmissionFailed("offline".to_string()))
        });

        let reporter = ErrorReporter::new(5, clock()).with_submitter(Arc::new(submitter));
        let id = reporter.report(&error(), "https://a/b.mp4", HashMap::new());

        assert_eq!(done_rx.await.unwrap(), id);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reporter.len(), 1);
    }
}
