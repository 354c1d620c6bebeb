//! Errors raised while assembling the runtime: configuration checks and
//! logging setup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A setting is out of range or inconsistent with another one.
    #[error("Invalid setting `{setting}`: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    /// A host bridge the core cannot run without was not injected.
    #[error("Missing host bridge {bridge}: {hint}")]
    MissingBridge { bridge: &'static str, hint: String },

    /// The tracing subscriber or its filter could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    pub(crate) fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidSetting {
            setting,
            reason: reason.into(),
        }
    }

    /// Name of the offending setting or bridge, when there is one.
    pub fn subject(&self) -> Option<&'static str> {
        match self {
            Error::InvalidSetting { setting, .. } => Some(setting),
            Error::MissingBridge { bridge, .. } => Some(bridge),
            Error::Logging(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
