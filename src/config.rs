//! Run configuration: credentials, recipients and per-source settings.
//!
//! Secrets and recipient lists come from the environment (through the CLI,
//! see [`crate::cli`]). Everything else has a built-in default that an
//! optional YAML settings file can override:
//!
//! ```yaml
//! gazette:
//!   lookback_days: 15
//!   download_dir: ./doalece
//! smtp:
//!   host: smtp.example.org
//! ```
//!
//! [`Config`] is built once at startup and validated eagerly, so a missing
//! value aborts the run before any request is made.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use lettre::Address;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::ConfigError;
use crate::models::Category;

/// Longest search window a run accepts, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 366;

/// Where a portal lives and how its documents are stored and cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub base_url: String,
    pub search_path: String,
    pub lookback_days: u32,
    pub download_dir: PathBuf,
    pub file_prefix: String,
    /// Text from the first occurrence of this string onward is dropped.
    pub end_sentinel: Option<String>,
    /// Text up to and including the line holding this string is dropped.
    pub header_end_marker: Option<String>,
}

impl SourceSettings {
    fn gazette() -> Self {
        Self {
            base_url: "https://doalece.al.ce.gov.br".to_string(),
            search_path: "/api/publico/ultimas-edicoes".to_string(),
            lookback_days: 30,
            download_dir: PathBuf::from("diarios_oficiais_alece"),
            file_prefix: "DOALECE".to_string(),
            end_sentinel: Some("Este documento foi assinado digitalmente".to_string()),
            header_end_marker: Some("DIÁRIO OFICIAL DA ASSEMBLEIA LEGISLATIVA".to_string()),
        }
    }

    fn court_diary() -> Self {
        Self {
            base_url: "https://esaj.tjce.jus.br".to_string(),
            search_path: "/cdje/search.do".to_string(),
            lookback_days: 7,
            download_dir: PathBuf::from("diarios_justica_ce"),
            file_prefix: "DJE_TJCE".to_string(),
            end_sentinel: None,
            header_end_marker: None,
        }
    }

    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    pub fn search_url(&self) -> Result<Url, ConfigError> {
        self.base()?
            .join(&self.search_path)
            .map_err(|source| ConfigError::InvalidUrl {
                url: format!("{}{}", self.base_url, self.search_path),
                source,
            })
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutSettings {
    pub search_secs: u64,
    pub document_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            search_secs: 20,
            document_secs: 60,
        }
    }
}

impl TimeoutSettings {
    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn document(&self) -> Duration {
        Duration::from_secs(self.document_secs)
    }
}

/// Non-secret settings, optionally loaded from YAML.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gazette: SourceSettings,
    pub court_diary: SourceSettings,
    pub smtp: SmtpSettings,
    pub timeouts: TimeoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gazette: SourceSettings::gazette(),
            court_diary: SourceSettings::court_diary(),
            smtp: SmtpSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No settings file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Parse YAML on top of the defaults. Each source section is merged
    /// field by field, since the two sources have different defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Overrides {
            gazette: Option<PartialSource>,
            court_diary: Option<PartialSource>,
            smtp: Option<SmtpSettings>,
            timeouts: Option<TimeoutSettings>,
        }

        let overrides: Overrides = if raw.trim().is_empty() {
            Overrides::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        let mut settings = Settings::default();
        if let Some(partial) = overrides.gazette {
            partial.apply(&mut settings.gazette);
        }
        if let Some(partial) = overrides.court_diary {
            partial.apply(&mut settings.court_diary);
        }
        if let Some(smtp) = overrides.smtp {
            settings.smtp = smtp;
        }
        if let Some(timeouts) = overrides.timeouts {
            settings.timeouts = timeouts;
        }
        Ok(settings)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PartialSource {
    base_url: Option<String>,
    search_path: Option<String>,
    lookback_days: Option<u32>,
    download_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    end_sentinel: Option<String>,
    header_end_marker: Option<String>,
}

impl PartialSource {
    fn apply(self, target: &mut SourceSettings) {
        if let Some(v) = self.base_url {
            target.base_url = v;
        }
        if let Some(v) = self.search_path {
            target.search_path = v;
        }
        if let Some(v) = self.lookback_days {
            target.lookback_days = v;
        }
        if let Some(v) = self.download_dir {
            target.download_dir = v;
        }
        if let Some(v) = self.file_prefix {
            target.file_prefix = v;
        }
        if self.end_sentinel.is_some() {
            target.end_sentinel = self.end_sentinel.filter(|s| !s.is_empty());
        }
        if self.header_end_marker.is_some() {
            target.header_end_marker = self.header_end_marker.filter(|s| !s.is_empty());
        }
    }
}

/// Submission account used to send notifications.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one run needs, validated up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub sender: Address,
    pub recipients: Vec<Address>,
    /// Court diary cadernos in priority order; empty for the gazette.
    pub categories: Vec<Category>,
    pub run_date: NaiveDate,
    pub settings: Settings,
}

/// Raw values as read from the environment / command line.
#[derive(Debug, Default, Clone)]
pub struct RawConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub recipients: Option<String>,
    pub categories: Option<String>,
}

impl Config {
    /// Validate raw values. `needs_categories` is set for the court diary.
    pub fn build(
        raw: RawConfig,
        needs_categories: bool,
        run_date: NaiveDate,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let user = required(raw.user, "GMAIL_USER")?;
        let password = required(raw.password, "GMAIL_PASSWORD")?;
        let recipients_raw = required(raw.recipients, "DESTINATARIOS")?;

        let sender: Address = user.trim().parse().map_err(|e: lettre::address::AddressError| {
            ConfigError::InvalidSender {
                address: user.clone(),
                reason: e.to_string(),
            }
        })?;
        let recipients = parse_recipients(&recipients_raw)?;

        let categories = if needs_categories {
            let raw_categories = required(raw.categories, "TJCE_CADERNOS")?;
            let categories = parse_categories(&raw_categories)?;
            if categories.is_empty() {
                return Err(ConfigError::NoCategories("TJCE_CADERNOS"));
            }
            categories
        } else {
            Vec::new()
        };

        let source = if needs_categories {
            &settings.court_diary
        } else {
            &settings.gazette
        };
        if source.lookback_days == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if source.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::WindowTooLarge {
                days: source.lookback_days,
                max: MAX_LOOKBACK_DAYS,
            });
        }
        source.search_url()?;

        Ok(Self {
            credentials: Credentials { user, password },
            sender,
            recipients,
            categories,
            run_date,
            settings,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Split a comma-separated recipient list. Blank entries are ignored; an
/// all-blank list yields no recipients, which the sender treats as a no-op.
pub fn parse_recipients(raw: &str) -> Result<Vec<Address>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Address>()
                .map_err(|e| ConfigError::InvalidRecipient {
                    address: s.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Split a comma-separated list of caderno ids, keeping their order.
pub fn parse_categories(raw: &str) -> Result<Vec<Category>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(Category::from_id)
                .map_err(|_| ConfigError::InvalidCategory(s.to_string()))
        })
        .collect()
}
