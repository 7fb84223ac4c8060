//! Data models shared by the portal clients and the pipeline.
//!
//! - [`Probe`] and [`SearchWindow`]: the candidates a run may examine
//! - [`PublicationRecord`]: an actionable edition returned by a portal
//! - [`DownloadedArtifact`], [`ExtractedText`], [`NotificationRequest`]:
//!   what the pipeline produces once a record is found

use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use lettre::Address;
use url::Url;

/// A section (caderno) of the court's electronic diary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

impl Category {
    /// Build a category from its numeric id, naming it after the court's
    /// caderno table. Unknown ids are named `Caderno_<id>`.
    pub fn from_id(id: u32) -> Self {
        let name = match id {
            1 => "Administrativo".to_string(),
            2 => "Judicial 1ª Instância".to_string(),
            3 => "Judicial 2ª Instância".to_string(),
            4 => "Editais 1ª Instância".to_string(),
            5 => "Editais 2ª Instância".to_string(),
            other => format!("Caderno_{other}"),
        };
        Self { id, name }
    }
}

/// One (date, category) pair to ask a portal about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub date: NaiveDate,
    pub category: Option<Category>,
}

/// The bounded set of candidates examined in a single run.
///
/// Dates run from `anchor` backwards, `lookback_days` of them including the
/// anchor itself. When `categories` is non-empty every date is probed once
/// per category, in the order given.
#[derive(Debug, Clone)]
pub struct SearchWindow {
    pub anchor: NaiveDate,
    pub lookback_days: u32,
    pub categories: Vec<Category>,
}

impl SearchWindow {
    pub fn new(anchor: NaiveDate, lookback_days: u32, categories: Vec<Category>) -> Self {
        Self {
            anchor,
            lookback_days,
            categories,
        }
    }

    /// Candidate dates, most recent first. Ends early if the window would
    /// run past the earliest representable date.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.lookback_days).map_while(move |offset| self.anchor.checked_sub_days(Days::new(u64::from(offset))))
    }

    /// Every probe in the order the pipeline must examine them.
    pub fn probes(&self) -> impl Iterator<Item = Probe> + '_ {
        self.dates().flat_map(move |date| {
            let categories: Vec<Option<Category>> = if self.categories.is_empty() {
                vec![None]
            } else {
                self.categories.iter().cloned().map(Some).collect()
            };
            categories.into_iter().map(move |category| Probe { date, category })
        })
    }
}

/// A document a record points to, with the extension used for the local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub url: Url,
    pub extension: &'static str,
}

impl RemoteArtifact {
    /// MIME type announced for the attachment. Portals only publish PDF and
    /// ODT documents.
    pub fn media_type(&self) -> &'static str {
        match self.extension {
            "pdf" => "application/pdf",
            "odt" => "application/vnd.oasis.opendocument.text",
            _ => "application/octet-stream",
        }
    }
}

/// An edition that a portal reported with every required document present.
///
/// The first artifact is the primary document, the one text is extracted
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub date: NaiveDate,
    /// Edition number for the gazette, caderno name for the court diary.
    pub label: String,
    pub artifacts: Vec<RemoteArtifact>,
    pub category: Option<Category>,
}

impl PublicationRecord {
    pub fn primary(&self) -> Option<&RemoteArtifact> {
        self.artifacts.first()
    }

    /// Date as printed in subjects and mail bodies, `dd/mm/yyyy`.
    pub fn display_date(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// A document saved under the source's download directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub local_path: PathBuf,
    pub file_name: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    Extracted,
    Empty,
    Failed,
}

/// Text pulled from the primary document, or a placeholder. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub status: ExtractionStatus,
}

/// A fully composed notification, ready for the transport.
///
/// `hidden_recipients` is handed to the transport as the envelope only and is
/// never written to a visible header.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub hidden_recipients: Vec<Address>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<DownloadedArtifact>,
}
