//! Artifact downloads.
//!
//! Each document of a matched record is fetched in full and written under
//! the source's download directory with a deterministic name, see
//! [`crate::utils::artifact_file_name`]. Files are kept after the run.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::error::{DownloadError, FetchError};
use crate::http::send_checked;
use crate::models::{DownloadedArtifact, PublicationRecord, RemoteArtifact};
use crate::utils::artifact_file_name;

#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    dir: PathBuf,
    file_prefix: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(http: Client, dir: impl Into<PathBuf>, file_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            dir: dir.into(),
            file_prefix: file_prefix.into(),
            timeout,
        }
    }

    /// Fetch the raw bytes behind `url`.
    #[instrument(level = "info", skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let request = self.http.get(url.clone()).timeout(self.timeout);
        let response = send_checked(request, url.as_str()).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;
        Ok(bytes.to_vec())
    }

    /// Download every artifact of `record`, in order. Stops at the first
    /// failure; files already written are left in place.
    pub async fn download_all(&self, record: &PublicationRecord) -> Result<Vec<DownloadedArtifact>, DownloadError> {
        let mut saved = Vec::with_capacity(record.artifacts.len());
        for artifact in &record.artifacts {
            let file_name = artifact_file_name(&self.file_prefix, record.date, &record.label, artifact.extension);
            saved.push(self.save(artifact, file_name).await?);
        }
        Ok(saved)
    }

    async fn save(&self, artifact: &RemoteArtifact, file_name: String) -> Result<DownloadedArtifact, DownloadError> {
        let bytes = self.fetch(&artifact.url).await?;
        let local_path = self.dir.join(&file_name);
        fs::write(&local_path, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: local_path.clone(),
                source,
            })?;
        info!(path = %local_path.display(), bytes = bytes.len(), "Saved document");

        Ok(DownloadedArtifact {
            local_path,
            file_name,
            media_type: artifact.media_type().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(server: &MockServer, paths: &[(&str, &'static str)]) -> PublicationRecord {
        PublicationRecord {
            date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
            label: "Nº 75/2024".to_string(),
            artifacts: paths
                .iter()
                .map(|(p, ext)| RemoteArtifact {
                    url: Url::parse(&format!("{}{}", server.uri(), p)).unwrap(),
                    extension: *ext,
                })
                .collect(),
            category: None,
        }
    }

    #[tokio::test]
    async fn test_download_all_writes_named_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/75.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 fake".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/75.odt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK odt".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(
            crate::http::client().unwrap(),
            tmp.path(),
            "DOALECE",
            Duration::from_secs(5),
        );
        let saved = downloader
            .download_all(&record(&server, &[("/docs/75.pdf", "pdf"), ("/docs/75.odt", "odt")]))
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].file_name, "DOALECE_2024-04-28_Nº_75-2024.pdf");
        assert_eq!(saved[0].media_type, "application/pdf");
        assert_eq!(saved[1].file_name, "DOALECE_2024-04-28_Nº_75-2024.odt");
        assert_eq!(saved[1].media_type, "application/vnd.oasis.opendocument.text");
        assert_eq!(std::fs::read(&saved[0].local_path).unwrap(), b"%PDF-1.4 fake");
        assert_eq!(std::fs::read(&saved[1].local_path).unwrap(), b"PK odt");
    }

    #[tokio::test]
    async fn test_failed_fetch_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(
            crate::http::client().unwrap(),
            tmp.path(),
            "DJE_TJCE",
            Duration::from_secs(5),
        );
        let err = downloader
            .download_all(&record(&server, &[("/docs/missing.pdf", "pdf")]))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Fetch(FetchError::Status { .. })));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(
            crate::http::client().unwrap(),
            tmp.path().join("not-created"),
            "DJE_TJCE",
            Duration::from_secs(5),
        );
        let err = downloader
            .download_all(&record(&server, &[("/docs/1.pdf", "pdf")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Io { .. }));
    }
}
