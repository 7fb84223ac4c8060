//! Command-line interface definitions.
//!
//! Secrets and recipient lists are normally supplied through the
//! environment, which is how the scheduler injects them; the matching flags
//! exist for local runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::RawConfig;

/// Find the latest edition of a Ceará official publication and mail it.
///
/// # Examples
///
/// ```sh
/// # Latest DOALECE edition in the last 30 days
/// diario_watch gazette
///
/// # Court diary, cadernos 2 then 1, backfilling from a given day
/// TJCE_CADERNOS=2,1 diario_watch court-diary --run-date 2024-05-10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub source: Source,

    /// Optional path to a YAML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Most recent date to search (YYYY-MM-DD); defaults to today
    #[arg(long, global = true)]
    pub run_date: Option<NaiveDate>,

    /// Number of days to search, including the run date
    #[arg(long, global = true)]
    pub lookback_days: Option<u32>,

    /// Sender account for the submission server
    #[arg(long, env = "GMAIL_USER", global = true)]
    pub gmail_user: Option<String>,

    /// Password for the sender account
    #[arg(long, env = "GMAIL_PASSWORD", hide_env_values = true, global = true)]
    pub gmail_password: Option<String>,

    /// Comma-separated recipient addresses (never shown in message headers)
    #[arg(long, env = "DESTINATARIOS", hide_env_values = true, global = true)]
    pub recipients: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Diário Oficial da Assembleia Legislativa do Ceará (PDF + ODT)
    Gazette,

    /// Diário da Justiça Eletrônico do TJCE (one PDF per caderno)
    CourtDiary {
        /// Comma-separated caderno ids in priority order
        #[arg(long, env = "TJCE_CADERNOS")]
        cadernos: Option<String>,
    },
}

impl Source {
    pub fn needs_categories(&self) -> bool {
        matches!(self, Source::CourtDiary { .. })
    }
}

impl Cli {
    pub fn raw_config(&self) -> RawConfig {
        let categories = match &self.source {
            Source::CourtDiary { cadernos } => cadernos.clone(),
            Source::Gazette => None,
        };
        RawConfig {
            user: self.gmail_user.clone(),
            password: self.gmail_password.clone(),
            recipients: self.recipients.clone(),
            categories,
        }
    }
}
