use chrono::{DateTime, Utc};
use scraper::ElementRef;
use serde::Deserialize;

use super::search::search;
use crate::error::ScrapeError;
use crate::ledger::Observation;

/// Attribute values marking the landmarks of a ranking page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Attribute key every marker is matched on.
    pub attribute: String,
    /// One ranking row.
    pub entry: String,
    /// Anchor holding the entity name.
    pub name: String,
    /// Element wrapping the numeric score.
    pub score: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            attribute: "class".into(),
            entry: "ranking-list".into(),
            name: "hoverinfo_trigger".into(),
            score: "js-top-ranking-score-col di-ib al".into(),
        }
    }
}

/// Ranking rows in document order.
pub fn list_entries<'a>(page: ElementRef<'a>, markers: &Markers) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    search(page, &markers.attribute, &markers.entry)
        .map_err(|_| ScrapeError::StructureChanged(format!("no ranking entries ({})", markers.entry)))
}

/// First text child of the first name anchor, verbatim.
pub fn extract_name(entry: ElementRef, markers: &Markers) -> Result<String, ScrapeError> {
    let anchor = first_match(entry, &markers.attribute, &markers.name, "name anchor")?;
    anchor
        .children()
        .next()
        .and_then(|n| n.value().as_text())
        .map(|t| String::from(&**t))
        .ok_or_else(|| ScrapeError::StructureChanged(format!("name anchor ({}) has no text", markers.name)))
}

/// Text nested under the first score marker, parsed as a finite decimal.
pub fn extract_score(entry: ElementRef, markers: &Markers) -> Result<f64, ScrapeError> {
    let cell = first_match(entry, &markers.attribute, &markers.score, "score")?;
    let raw: String = cell.text().collect();
    let text = raw.trim();
    let score = text
        .parse::<f64>()
        .map_err(|e| ScrapeError::MalformedData(format!("score {text:?}: {e}")))?;
    // NaN and infinities parse but cannot be stored as JSON numbers.
    if !score.is_finite() {
        return Err(ScrapeError::MalformedData(format!("score {text:?} is not a finite number")));
    }
    Ok(score)
}

/// One observation per ranking row, all stamped with `now`.
pub fn extract_all(page: ElementRef, now: DateTime<Utc>, markers: &Markers) -> Result<Vec<Observation>, ScrapeError> {
    list_entries(page, markers)?
        .into_iter()
        .map(|entry| {
            Ok::<_, ScrapeError>(Observation {
                name: extract_name(entry, markers)?,
                score: extract_score(entry, markers)?,
                timestamp: now,
            })
        })
        .collect()
}

fn first_match<'a>(
    entry: ElementRef<'a>,
    key: &str,
    value: &str,
    what: &str,
) -> Result<ElementRef<'a>, ScrapeError> {
    search(entry, key, value)
        .ok()
        .and_then(|found| found.into_iter().next())
        .ok_or_else(|| ScrapeError::StructureChanged(format!("{what} ({value}) missing from entry")))
}
