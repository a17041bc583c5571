use super::{EntitySeries, Ledger};

/// Orders series by their last-inserted point, earliest first.
///
/// The key is insertion order, not the numerically largest instant. Ties keep
/// ledger order (the sort is stable). A series with no points sorts first.
pub fn sort_by_recency(ledger: Ledger) -> Vec<EntitySeries> {
    let mut series = ledger.series;
    series.sort_by_key(|s| s.points.last_seen());
    series
}
