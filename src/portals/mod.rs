//! Portal clients that look up a publication for a single probe.
//!
//! Both sources answer the same question ("is there an edition for this
//! date, and this caderno?") through very different surfaces:
//!
//! | Source | Module | Method | Required documents |
//! |--------|--------|--------|--------------------|
//! | DOALECE gazette | [`gazette`] | JSON search API | PDF + ODT |
//! | DJE-TJCE court diary | [`court_diary`] | HTML listing scrape | one PDF |
//!
//! A client only returns a record when every required document link is
//! present. Anything less is logged and reported as no match.

use crate::error::PortalError;
use crate::models::{Probe, PublicationRecord};

pub mod court_diary;
pub mod gazette;

pub use court_diary::CourtDiaryClient;
pub use gazette::GazetteClient;

/// A searchable publication source.
pub trait PortalClient {
    /// Short source name used in logs.
    fn name(&self) -> &'static str;

    /// Ask the portal about one probe.
    ///
    /// `Ok(None)` means the portal answered but has no complete edition for
    /// the probe.
    async fn search(&self, probe: &Probe) -> Result<Option<PublicationRecord>, PortalError>;
}
