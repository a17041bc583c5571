pub mod extract;
pub mod search;

use chrono::{DateTime, Utc};
use scraper::Html;

use crate::error::ScrapeError;
use crate::ledger::Observation;
use extract::Markers;

/// Page tree → one observation per ranking row.
pub fn observe_page(page: &Html, now: DateTime<Utc>, markers: &Markers) -> Result<Vec<Observation>, ScrapeError> {
    extract::extract_all(page.root_element(), now, markers)
}
