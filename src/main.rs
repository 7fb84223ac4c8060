//! # diario_watch
//!
//! Finds the most recent edition of one of two Ceará official publications,
//! downloads it, and mails the documents with a text preview.
//!
//! ## Sources
//!
//! - `gazette`: Diário Oficial da Assembleia Legislativa (DOALECE), PDF + ODT
//! - `court-diary`: Diário da Justiça Eletrônico (DJE-TJCE), one PDF per
//!   caderno, searched in the configured priority order
//!
//! ## Usage
//!
//! ```sh
//! GMAIL_USER=robo@example.com GMAIL_PASSWORD=... DESTINATARIOS=a@x.com,b@y.com \
//!     diario_watch gazette
//! ```
//!
//! ## Architecture
//!
//! Each run is stateless and sequential:
//! 1. **Configuration**: environment + optional YAML, validated before any I/O
//! 2. **Search**: newest date first (and caderno priority within a date)
//! 3. **Download**: every document of the first complete edition
//! 4. **Extract**: cleaned text of the primary PDF
//! 5. **Notify**: one message, recipients in the SMTP envelope only

use std::error::Error;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use clap::Parser;
use itertools::Itertools;
use reqwest::Client;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod download;
mod error;
mod extract;
mod http;
mod models;
mod notify;
mod pipeline;
mod portals;
mod utils;

use cli::{Cli, Source};
use config::{Config, Settings, SourceSettings};
use download::Downloader;
use error::ConfigError;
use extract::Cleanup;
use models::SearchWindow;
use notify::{DeliveryOutcome, NoticeTemplate, Notifier, SmtpSubmission};
use pipeline::{Pipeline, RunOutcome};
use portals::{CourtDiaryClient, GazetteClient, PortalClient};
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("diario_watch starting up");

    let args = Cli::parse();
    let run_date = args.run_date.unwrap_or_else(|| Local::now().date_naive());

    let config = match load_config(&args, run_date) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error; aborting before any network activity");
            return Err(e.into());
        }
    };
    info!(
        %run_date,
        recipients = config.recipients.len(),
        cadernos = %config.categories.iter().map(|c| c.id).join(","),
        "Configuration loaded"
    );

    let http = http::client()?;
    let timeouts = &config.settings.timeouts;
    let outcome = match &args.source {
        Source::Gazette => {
            let source = &config.settings.gazette;
            let portal = GazetteClient::new(http.clone(), source, timeouts.search())?;
            run_source(&config, http, &portal, source, NoticeTemplate::gazette()).await?
        }
        Source::CourtDiary { .. } => {
            let source = &config.settings.court_diary;
            let portal = CourtDiaryClient::new(http.clone(), source, timeouts.search())?;
            run_source(&config, http, &portal, source, NoticeTemplate::court_diary()).await?
        }
    };
    report(&outcome);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Build the run configuration from the CLI, the environment and the
/// optional settings file.
fn load_config(args: &Cli, run_date: NaiveDate) -> Result<Config, ConfigError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(days) = args.lookback_days {
        match args.source {
            Source::Gazette => settings.gazette.lookback_days = days,
            Source::CourtDiary { .. } => settings.court_diary.lookback_days = days,
        }
    }
    Config::build(args.raw_config(), args.source.needs_categories(), run_date, settings)
}

#[instrument(level = "info", skip_all, fields(source = portal.name()))]
async fn run_source<P: PortalClient>(
    config: &Config,
    http: Client,
    portal: &P,
    source: &SourceSettings,
    template: NoticeTemplate,
) -> Result<RunOutcome, Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(&source.download_dir).await {
        error!(
            path = %source.download_dir.display(),
            error = %e,
            "Download directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let downloader = Downloader::new(
        http,
        &source.download_dir,
        &source.file_prefix,
        config.settings.timeouts.document(),
    );
    let notifier = Notifier::new(
        SmtpSubmission::from_config(config),
        config.sender.clone(),
        template.sender_name,
    );
    let cleanup = Cleanup::from(source);
    let window = SearchWindow::new(config.run_date, source.lookback_days, config.categories.clone());

    let pipeline = Pipeline {
        portal,
        downloader: &downloader,
        notifier: &notifier,
        template: &template,
        cleanup: &cleanup,
        recipients: &config.recipients,
    };
    Ok(pipeline.run(&window).await)
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Found {
            record,
            artifacts,
            extraction,
            delivery,
        } => {
            let files = artifacts.iter().map(|a| a.file_name.as_str()).join(", ");
            match delivery {
                Ok(DeliveryOutcome::Delivered { recipients }) => info!(
                    date = %record.date,
                    label = %record.label,
                    %files,
                    ?extraction,
                    recipients,
                    "Edition found and notification sent"
                ),
                Ok(DeliveryOutcome::Skipped) => warn!(
                    date = %record.date,
                    label = %record.label,
                    %files,
                    "Edition found but no recipients are configured"
                ),
                Err(e) => error!(
                    date = %record.date,
                    label = %record.label,
                    %files,
                    error = %e,
                    "Edition found but the notification could not be delivered"
                ),
            }
        }
        RunOutcome::Exhausted { probes } => {
            info!(probes, "Search finished; no edition found in the window")
        }
    }
}
