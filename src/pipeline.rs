//! The search → download → extract → notify pipeline.
//!
//! One generic pipeline serves both sources. It walks the [`SearchWindow`]
//! strictly in order (newest date first, cadernos in priority order) and
//! stops at the first candidate whose documents could all be downloaded.
//! Requests are awaited one at a time, so a later probe is never issued
//! before an earlier one has been ruled out.
//!
//! ```text
//! SEARCHING ──match──▶ FOUND      (one notification attempt, then stop)
//!     │
//!     └──window done──▶ EXHAUSTED (nothing downloaded, nothing sent)
//! ```

use lettre::Address;
use tracing::{error, info, instrument, warn};

use crate::download::Downloader;
use crate::error::DeliveryError;
use crate::extract::{self, Cleanup, FAILURE_PLACEHOLDER};
use crate::models::{
    DownloadedArtifact, ExtractedText, ExtractionStatus, NotificationRequest, PublicationRecord,
    SearchWindow,
};
use crate::notify::{DeliveryOutcome, MailTransport, NoticeTemplate, Notifier};
use crate::portals::PortalClient;

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Found {
        record: PublicationRecord,
        artifacts: Vec<DownloadedArtifact>,
        extraction: ExtractionStatus,
        delivery: Result<DeliveryOutcome, DeliveryError>,
    },
    Exhausted {
        probes: usize,
    },
}

/// Everything the pipeline needs for one source.
pub struct Pipeline<'a, P, T> {
    pub portal: &'a P,
    pub downloader: &'a Downloader,
    pub notifier: &'a Notifier<T>,
    pub template: &'a NoticeTemplate,
    pub cleanup: &'a Cleanup,
    pub recipients: &'a [Address],
}

impl<P, T> Pipeline<'_, P, T>
where
    P: PortalClient,
    T: MailTransport,
{
    #[instrument(
        level = "info",
        skip_all,
        fields(source = self.portal.name(), anchor = %window.anchor, days = window.lookback_days)
    )]
    pub async fn run(&self, window: &SearchWindow) -> RunOutcome {
        let mut examined = 0usize;

        for probe in window.probes() {
            examined += 1;
            let caderno = probe.category.as_ref().map(|c| c.name.as_str()).unwrap_or("-");
            info!(date = %probe.date, caderno, "Searching");

            let record = match self.portal.search(&probe).await {
                Ok(Some(record)) if record.primary().is_some() => record,
                Ok(_) => continue,
                Err(e) => {
                    warn!(date = %probe.date, caderno, error = %e, "Search failed; skipping candidate");
                    continue;
                }
            };

            let artifacts = match self.downloader.download_all(&record).await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    error!(
                        date = %record.date,
                        label = %record.label,
                        error = %e,
                        "Download failed; skipping candidate"
                    );
                    continue;
                }
            };

            return self.deliver(record, artifacts).await;
        }

        info!(probes = examined, "No edition found in the search window");
        RunOutcome::Exhausted { probes: examined }
    }

    async fn deliver(&self, record: PublicationRecord, artifacts: Vec<DownloadedArtifact>) -> RunOutcome {
        let extracted = match artifacts.first() {
            Some(primary) => extract::extract(&primary.local_path, self.cleanup),
            None => ExtractedText {
                text: FAILURE_PLACEHOLDER.to_string(),
                status: ExtractionStatus::Failed,
            },
        };

        let request = NotificationRequest {
            hidden_recipients: self.recipients.to_vec(),
            subject: self.template.subject(&record),
            body: self.template.body(&record, &extracted),
            attachments: artifacts,
        };
        let delivery = self.notifier.send(&request).await;

        RunOutcome::Found {
            record,
            artifacts: request.attachments,
            extraction: extracted.status,
            delivery,
        }
    }
}
