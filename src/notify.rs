//! Notification composition and delivery.
//!
//! # Architecture
//!
//! - [`NoticeTemplate`]: per-source wording for subject and body
//! - [`Notifier`]: builds the multipart message and hands it to a transport
//! - [`MailTransport`]: the submission seam; [`SmtpSubmission`] is the real
//!   one, tests plug in a recorder
//!
//! # Hidden recipients
//!
//! The message carries `From` and `Subject` only. Recipients travel in the
//! SMTP envelope passed to [`MailTransport::submit`], so no reader sees the
//! distribution list.

use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::DeliveryError;
use crate::models::{ExtractedText, ExtractionStatus, NotificationRequest, PublicationRecord};

const RULE_WIDTH: usize = 84;

/// Wording used for one source's notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeTemplate {
    pub sender_name: &'static str,
    pub subject_tag: &'static str,
    pub publication: &'static str,
    pub attachment_phrase: &'static str,
    pub preview_heading: &'static str,
    pub signature: &'static str,
}

impl NoticeTemplate {
    pub fn gazette() -> Self {
        Self {
            sender_name: "Robô DOALECE",
            subject_tag: "📜🔵 DOALECE",
            publication: "Diário Oficial da Assembleia Legislativa do Estado do Ceará",
            attachment_phrase: "os arquivos PDF e ODT",
            preview_heading: "📰 CONTEÚDO DO DIÁRIO OFICIAL: 📰",
            signature: "🤖 Robô extraoficial de notificações do DOALECE 📜",
        }
    }

    pub fn court_diary() -> Self {
        Self {
            sender_name: "Robô DJE-TJCE",
            subject_tag: "⚖️🔵 DJE-TJCE",
            publication: "Diário da Justiça Eletrônico do Ceará",
            attachment_phrase: "o arquivo PDF",
            preview_heading: "📰 CONTEÚDO DO DIÁRIO DE JUSTIÇA: 📰",
            signature: "🤖 Robô extraoficial de notificações do DJE-TJCE ⚖️",
        }
    }

    pub fn subject(&self, record: &PublicationRecord) -> String {
        format!("{} de {} ({}) 📅", self.subject_tag, record.display_date(), record.label)
    }

    /// Plain-text body: greeting, preview between rule lines, sign-off.
    ///
    /// The preview heading is only added when real text was extracted.
    pub fn body(&self, record: &PublicationRecord, extracted: &ExtractedText) -> String {
        let preview = match extracted.status {
            ExtractionStatus::Extracted => format!("{}\n\n{}", self.preview_heading, extracted.text),
            ExtractionStatus::Empty | ExtractionStatus::Failed => extracted.text.clone(),
        };
        let rule = "=".repeat(RULE_WIDTH);
        format!(
            "🤖 Olá,\n\n\
             Segue em anexo {} do {} de {} ({}).\n\n\
             Abaixo, o conteúdo extraído do documento para consulta rápida.\n\n\
             {rule}\n\n{preview}\n\n{rule}\n\n\
             Atenciosamente,\n\n{}",
            self.attachment_phrase,
            self.publication,
            record.display_date(),
            record.label,
            self.signature,
        )
    }
}

/// Something that can submit a finished message to a set of envelope
/// recipients.
pub trait MailTransport {
    async fn submit(&self, envelope: &Envelope, message: &[u8]) -> Result<(), DeliveryError>;
}

/// Authenticated SMTP submission: opportunistic STARTTLS, then PLAIN or
/// LOGIN authentication. A new session is opened for every submission and
/// closed afterwards.
#[derive(Debug, Clone)]
pub struct SmtpSubmission {
    host: String,
    port: u16,
    credentials: Credentials,
}

impl SmtpSubmission {
    pub fn new(host: impl Into<String>, port: u16, user: &str, password: &str) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: Credentials::new(user.to_string(), password.to_string()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.settings.smtp.host.clone(),
            config.settings.smtp.port,
            &config.credentials.user,
            &config.credentials.password,
        )
    }
}

impl MailTransport for SmtpSubmission {
    #[instrument(level = "info", skip_all, fields(host = %self.host, port = self.port))]
    async fn submit(&self, envelope: &Envelope, message: &[u8]) -> Result<(), DeliveryError> {
        let tls = TlsParameters::new(self.host.clone())?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.clone())
            .port(self.port)
            .tls(Tls::Opportunistic(tls))
            .credentials(self.credentials.clone())
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .build();
        transport.send_raw(envelope, message).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { recipients: usize },
    /// No recipients configured; no session was opened.
    Skipped,
}

/// Composes notifications and sends them through a [`MailTransport`].
#[derive(Debug)]
pub struct Notifier<T> {
    transport: T,
    from: Mailbox,
}

impl<T: MailTransport> Notifier<T> {
    pub fn new(transport: T, sender: Address, sender_name: &str) -> Self {
        Self {
            transport,
            from: Mailbox::new(Some(sender_name.to_string()), sender),
        }
    }

    /// Build the envelope and the message. Visible headers never name a
    /// recipient.
    pub async fn compose(&self, request: &NotificationRequest) -> Result<(Envelope, Message), DeliveryError> {
        let envelope = Envelope::new(Some(self.from.email.clone()), request.hidden_recipients.clone())
            .map_err(|e| DeliveryError::Envelope(e.to_string()))?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(request.body.clone()));
        for artifact in &request.attachments {
            let content = fs::read(&artifact.local_path)
                .await
                .map_err(|source| DeliveryError::Attachment {
                    path: artifact.local_path.clone(),
                    source,
                })?;
            let content_type = ContentType::parse(&artifact.media_type)
                .map_err(|_| DeliveryError::ContentType(artifact.media_type.clone()))?;
            parts = parts.singlepart(Attachment::new(artifact.file_name.clone()).body(content, content_type));
        }

        let message = Message::builder()
            .from(self.from.clone())
            .subject(request.subject.clone())
            .envelope(envelope.clone())
            .multipart(parts)?;
        Ok((envelope, message))
    }

    /// Compose and deliver `request` once. Failures are logged and returned;
    /// nothing is retried.
    #[instrument(level = "info", skip_all, fields(subject = %request.subject))]
    pub async fn send(&self, request: &NotificationRequest) -> Result<DeliveryOutcome, DeliveryError> {
        if request.hidden_recipients.is_empty() {
            warn!("Recipient list is empty; not sending");
            return Ok(DeliveryOutcome::Skipped);
        }
        info!(
            recipients = request.hidden_recipients.len(),
            attachments = request.attachments.len(),
            "Sending notification"
        );

        let result = async {
            let (envelope, message) = self.compose(request).await?;
            self.transport.submit(&envelope, &message.formatted()).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Notification sent");
                Ok(DeliveryOutcome::Delivered {
                    recipients: request.hidden_recipients.len(),
                })
            }
            Err(e) => {
                error!(error = %e, "Notification failed");
                Err(e)
            }
        }
    }
}
