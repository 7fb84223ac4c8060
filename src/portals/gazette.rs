//! DOALECE gazette client.
//!
//! The portal exposes a JSON search endpoint taking a single `filtros`
//! parameter with a date range. Each probe asks for a one-day range:
//!
//! ```text
//! GET /api/publico/ultimas-edicoes?filtros={"data_de":"2024-04-28","data_ate":"2024-04-28"}
//! ```
//!
//! Only the first entry of `data` is considered. An edition is actionable
//! when it links both the PDF and the ODT document.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::SourceSettings;
use crate::error::{ConfigError, PortalError};
use crate::http::{read_text, send_checked};
use crate::models::{Probe, PublicationRecord, RemoteArtifact};
use crate::portals::PortalClient;
use crate::utils::truncate_for_log;

#[derive(Debug, Serialize)]
struct DateRange {
    data_de: String,
    data_ate: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<GazetteEntry>,
}

#[derive(Debug, Deserialize)]
struct GazetteEntry {
    data_publicacao: Option<String>,
    numero_identificacao: Option<String>,
    caminho_documento_pdf: Option<String>,
    caminho_documento_odt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GazetteClient {
    http: Client,
    base_url: Url,
    search_url: Url,
    timeout: Duration,
}

impl GazetteClient {
    pub fn new(http: Client, settings: &SourceSettings, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            base_url: settings.base()?,
            search_url: settings.search_url()?,
            timeout,
        })
    }

    fn filter_for(date: NaiveDate) -> String {
        let day = date.format("%Y-%m-%d").to_string();
        let range = DateRange {
            data_de: day.clone(),
            data_ate: day,
        };
        // Serializing two plain strings cannot fail.
        serde_json::to_string(&range).unwrap_or_default()
    }

    fn resolve(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url.join(path).map_err(|e| PortalError::Parse {
            url: self.search_url.to_string(),
            reason: format!("bad document path {path:?}: {e}"),
        })
    }

    fn record_from(&self, entry: GazetteEntry, probe: &Probe) -> Result<Option<PublicationRecord>, PortalError> {
        let pdf = entry.caminho_documento_pdf.filter(|p| !p.trim().is_empty());
        let odt = entry.caminho_documento_odt.filter(|p| !p.trim().is_empty());
        let (Some(pdf), Some(odt)) = (pdf, odt) else {
            info!(date = %probe.date, "Edition found without both PDF and ODT; skipping");
            return Ok(None);
        };

        let date = entry
            .data_publicacao
            .as_deref()
            .and_then(|raw| raw.split(' ').next())
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .unwrap_or_else(|| {
                debug!(date = %probe.date, "Publication date missing or unreadable; using probe date");
                probe.date
            });

        Ok(Some(PublicationRecord {
            date,
            label: entry.numero_identificacao.unwrap_or_default(),
            artifacts: vec![
                RemoteArtifact {
                    url: self.resolve(&pdf)?,
                    extension: "pdf",
                },
                RemoteArtifact {
                    url: self.resolve(&odt)?,
                    extension: "odt",
                },
            ],
            category: None,
        }))
    }
}

impl PortalClient for GazetteClient {
    fn name(&self) -> &'static str {
        "doalece"
    }

    #[instrument(level = "info", skip_all, fields(date = %probe.date))]
    async fn search(&self, probe: &Probe) -> Result<Option<PublicationRecord>, PortalError> {
        let url = self.search_url.as_str();
        let request = self
            .http
            .get(self.search_url.clone())
            .query(&[("filtros", Self::filter_for(probe.date))])
            .timeout(self.timeout);
        let response = send_checked(request, url).await?;
        let body = read_text(response, url).await?;

        let response: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, body = %truncate_for_log(&body, 300), "Gazette search returned invalid JSON");
            PortalError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let total = response.data.len();
        let Some(first) = response.data.into_iter().next() else {
            debug!("No gazette edition for this date");
            return Ok(None);
        };
        if total > 1 {
            debug!(total, "Several editions returned; using the first");
        }

        let record = self.record_from(first, probe)?;
        if let Some(record) = &record {
            info!(date = %record.date, edition = %record.label, "Gazette edition found");
        }
        Ok(record)
    }
}
