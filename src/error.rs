//! Error types for each pipeline boundary.
//!
//! Only [`ConfigError`] is fatal. Every other error is logged where it
//! happens and turned into a "no match" or "not delivered" outcome by the
//! pipeline.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Required configuration is missing or malformed. Aborts the run before any
/// network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid recipient address {address:?}: {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("invalid sender address {address:?}: {reason}")]
    InvalidSender { address: String, reason: String },

    #[error("invalid category id {0:?} (expected an integer)")]
    InvalidCategory(String),

    #[error("{0} must list at least one category")]
    NoCategories(&'static str),

    #[error("search window must cover at least one day")]
    EmptyWindow,

    #[error("search window of {days} days exceeds the maximum of {max}")]
    WindowTooLarge { days: u32, max: u32 },

    #[error("invalid base URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A single HTTP request failed: transport error, timeout or non-success
/// status.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = source.status() {
            FetchError::Status {
                url: url.to_string(),
                status,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// A portal search for one probe failed. The probe is skipped.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Fetching or persisting an artifact failed. The candidate is abandoned.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Composing or transmitting the notification failed. Never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid attachment content type {0:?}")]
    ContentType(String),

    #[error("failed to build message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("invalid envelope: {0}")]
    Envelope(String),

    #[error("SMTP session failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_variable() {
        let err = ConfigError::Missing("GMAIL_USER");
        assert!(err.to_string().contains("GMAIL_USER"));
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status {
            url: "https://esaj.tjce.jus.br/cdje/search.do".to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("esaj.tjce.jus.br"));
    }

    #[test]
    fn test_portal_error_is_transparent_over_fetch() {
        let err: PortalError = FetchError::Timeout {
            url: "https://example.com".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "request to https://example.com timed out");
    }
}
