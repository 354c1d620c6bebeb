//! # Logging
//!
//! `tracing` setup for hosts embedding the playback core.
//!
//! Media URLs are the main leak risk in this crate's logs: signed CDN links
//! and cloud-drive shares carry access tokens in their query strings. Call
//! sites log URLs through [`redact_url`]; events forwarded to a host
//! [`LoggerSink`] are additionally scrubbed field by field.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format("json".parse::<LogFormat>()?)
//!         .with_level(LogLevel::Debug),
//! )?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Crates whose events follow [`LoggingConfig::level`]; everything else logs at `warn`.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_media",
    "core_playback",
    "core_service",
    "bridge_desktop",
];

const SECRET_MARKERS: &[&str] = &[
    "token",
    "password",
    "secret",
    "api_key",
    "authorization",
    "bearer",
    "cookie",
    "signature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(Error::invalid(
                "logging.format",
                format!("expected pretty, json or compact, got `{other}`"),
            )),
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Scrub URL and credential fields before they reach the sink.
    pub redact_pii: bool,
    /// Replaces the generated directives entirely (`EnvFilter` syntax).
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit (pretty) or attach span context (json).
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink = SinkLayer {
        sink: config.logger_sink.clone(),
        redact: config.redact_pii,
    };

    let output = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);
    let output = match config.format {
        LogFormat::Pretty => output
            .pretty()
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => output
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => output.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(sink)
        .with(output)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = level_directive(config.level);
            std::iter::once("warn".to_string())
                .chain(WORKSPACE_TARGETS.iter().map(|target| format!("{target}={level}")))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::invalid("logging.filter", format!("`{directives}`: {e}")))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn sink_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

// ============================================================================
// Host sink forwarding
// ============================================================================

struct SinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact: bool,
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let metadata = event.metadata();
        let level = sink_level(*metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector {
            redact: self.redact,
            ..FieldCollector::default()
        };
        event.record(&mut fields);

        let message = fields.message.take().unwrap_or_else(|| metadata.name().to_string());
        let mut entry = fields
            .pairs
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (key, value)| {
                entry.with_field(key, value)
            });
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {err}");
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {err}");
                }
            }
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    redact: bool,
    message: Option<String>,
    pairs: Vec<(&'static str, String)>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        let name = field.name();
        if name == "message" {
            self.message = Some(value);
            return;
        }
        let value = if !self.redact {
            value
        } else if name.to_ascii_lowercase().contains("url") {
            redact_url(&value).to_string()
        } else {
            redact_if_sensitive(name, &value)
        };
        self.pairs.push((name, value));
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

// ============================================================================
// Redaction helpers
// ============================================================================

/// `[REDACTED]` when the field name looks like a credential, else `value`.
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase();
    if SECRET_MARKERS.iter().any(|marker| name.contains(marker)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// `url` without its query string and fragment.
///
/// ```ignore
/// info!(url = %redact_url(&source_url), "Probing byte ranges");
/// ```
pub fn redact_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
