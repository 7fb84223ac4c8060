//! DJE-TJCE court diary client.
//!
//! The e-SAJ diary search page is queried once per date and caderno:
//!
//! ```text
//! GET /cdje/search.do?dados.dtDiario=28/04/2024&cdCaderno=2
//! ```
//!
//! When an edition exists the page lists it inside `ul.list-unstyled`, with
//! a link to `download.do`. The first such link is the document.

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::SourceSettings;
use crate::error::{ConfigError, PortalError};
use crate::http::{read_text, send_checked};
use crate::models::{Probe, PublicationRecord, RemoteArtifact};
use crate::portals::PortalClient;

static DOWNLOAD_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"ul.list-unstyled a[href*="download.do"]"#).unwrap());

#[derive(Debug, Clone)]
pub struct CourtDiaryClient {
    http: Client,
    base_url: Url,
    search_url: Url,
    timeout: Duration,
}

impl CourtDiaryClient {
    pub fn new(http: Client, settings: &SourceSettings, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            base_url: settings.base()?,
            search_url: settings.search_url()?,
            timeout,
        })
    }

    /// Find the download link in a search result page, resolved against the
    /// portal base URL.
    fn find_download_link(&self, html: &str) -> Result<Option<Url>, PortalError> {
        let document = Html::parse_document(html);
        let Some(anchor) = document.select(&DOWNLOAD_LINK).next() else {
            return Ok(None);
        };
        let Some(href) = anchor.value().attr("href") else {
            return Ok(None);
        };
        self.base_url
            .join(href.trim())
            .map(Some)
            .map_err(|e| PortalError::Parse {
                url: self.search_url.to_string(),
                reason: format!("bad download link {href:?}: {e}"),
            })
    }
}

impl PortalClient for CourtDiaryClient {
    fn name(&self) -> &'static str {
        "dje-tjce"
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(date = %probe.date, caderno = ?probe.category.as_ref().map(|c| c.id))
    )]
    async fn search(&self, probe: &Probe) -> Result<Option<PublicationRecord>, PortalError> {
        let Some(category) = &probe.category else {
            warn!("Court diary probe without a caderno; nothing to search");
            return Ok(None);
        };

        let url = self.search_url.as_str();
        let request = self
            .http
            .get(self.search_url.clone())
            .query(&[
                ("dados.dtDiario", probe.date.format("%d/%m/%Y").to_string()),
                ("cdCaderno", category.id.to_string()),
            ])
            .timeout(self.timeout);
        let response = send_checked(request, url).await?;
        let html = read_text(response, url).await?;

        let Some(link) = self.find_download_link(&html)? else {
            debug!(caderno = %category.name, "No diary listed");
            return Ok(None);
        };

        info!(caderno = %category.name, link = %link, "Court diary found");
        Ok(Some(PublicationRecord {
            date: probe.date,
            label: category.name.clone(),
            artifacts: vec![RemoteArtifact {
                url: link,
                extension: "pdf",
            }],
            category: Some(category.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::FetchError;
    use crate::models::Category;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CourtDiaryClient {
        client_at(&server.uri())
    }

    fn client_at(base_url: &str) -> CourtDiaryClient {
        let mut settings = Settings::default().court_diary;
        settings.base_url = base_url.to_string();
        CourtDiaryClient::new(crate::http::client().unwrap(), &settings, Duration::from_secs(5)).unwrap()
    }

    fn probe(category: u32) -> Probe {
        Probe {
            date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
            category: Some(Category::from_id(category)),
        }
    }

    fn listing_html(href: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<body>
  <div class="header"><a href="/cdje/download.do?nuDiario=0&cdCaderno=0">banner</a></div>
  <ul class="list-unstyled">
    <li><span>Caderno 2 - Judiciário</span></li>
    <li><a href="{href}" title="Baixar">Download</a></li>
    <li><a href="/cdje/download.do?nuDiario=3290&cdCaderno=2&pagina=2">Página 2</a></li>
  </ul>
</body>
</html>"#
        )
    }

    #[tokio::test]
    async fn test_listing_link_becomes_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cdje/search.do"))
            .and(query_param("dados.dtDiario", "28/04/2024"))
            .and(query_param("cdCaderno", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_html("/cdje/download.do?nuDiario=3290&cdCaderno=2")),
            )
            .mount(&server)
            .await;

        let record = client_for(&server).search(&probe(2)).await.unwrap().expect("record");
        assert_eq!(record.label, "Judicial 1ª Instância");
        assert_eq!(record.category.as_ref().unwrap().id, 2);
        assert_eq!(record.artifacts.len(), 1);
        assert_eq!(
            record.artifacts[0].url.as_str(),
            format!("{}/cdje/download.do?nuDiario=3290&cdCaderno=2", server.uri())
        );
    }

    #[tokio::test]
    async fn test_listing_without_link_is_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <a href="/cdje/download.do?nuDiario=1">outside the listing</a>
                    <ul class="list-unstyled"><li>Nenhum diário encontrado</li></ul>
                </body></html>"#,
            ))
            .mount(&server)
            .await;

        let result = client_for(&server).search(&probe(1)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).search(&probe(1)).await.unwrap_err();
        assert!(matches!(err, PortalError::Fetch(FetchError::Status { .. })));
    }

    #[tokio::test]
    async fn test_probe_without_category_is_not_sent() {
        let server = MockServer::start().await;
        let probe = Probe {
            date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
            category: None,
        };
        let result = client_for(&server).search(&probe).await.unwrap();
        assert!(result.is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_absolute_links_are_kept() {
        let settings = Settings::default().court_diary;
        let client =
            CourtDiaryClient::new(crate::http::client().unwrap(), &settings, Duration::from_secs(5)).unwrap();
        let link = client
            .find_download_link(&listing_html(
                "https://esaj.tjce.jus.br/cdje/download.do?nuDiario=10&cdCaderno=3",
            ))
            .unwrap()
            .unwrap();
        assert_eq!(
            link.as_str(),
            "https://esaj.tjce.jus.br/cdje/download.do?nuDiario=10&cdCaderno=3"
        );
    }

    #[tokio::test]
    async fn test_dropped_body_is_fetch_error() {
        let base = crate::http::testing::truncated_body_server().await;
        let err = client_at(&base).search(&probe(2)).await.unwrap_err();
        assert!(matches!(err, PortalError::Fetch(FetchError::Transport { .. })));
    }
}
