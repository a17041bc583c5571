use chrono::{DateTime, Utc};

use crate::ledger::{EntitySeries, Ledger};

/// One row of the overview table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub name: String,
    pub points: usize,
    pub first_score: f64,
    pub latest_score: f64,
    pub change: f64,
    pub last_seen: DateTime<Utc>,
}

/// Oldest first point and newest last point across the ledger.
pub fn span(ledger: &Ledger) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for series in &ledger.series {
        let instants = series.points.instants();
        let (Some(&first), Some(&last)) = (instants.first(), instants.last()) else {
            continue;
        };
        bounds = Some(match bounds {
            None => (first, last),
            Some((lo, hi)) => (lo.min(first), hi.max(last)),
        });
    }
    bounds
}

pub fn summarize(series: &EntitySeries) -> Option<SeriesSummary> {
    let scores = series.points.scores();
    let (&first_score, &latest_score) = (scores.first()?, scores.last()?);
    Some(SeriesSummary {
        name: series.name.clone(),
        points: scores.len(),
        first_score,
        latest_score,
        change: latest_score - first_score,
        last_seen: series.points.last_seen()?,
    })
}

/// Summaries for every series, most recently seen first.
pub fn overview(ledger: &Ledger, limit: usize) -> Vec<SeriesSummary> {
    let mut rows: Vec<_> = ledger.series.iter().filter_map(summarize).collect();
    rows.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::merge::merge;
    use crate::ledger::{Observation, RetentionPolicy};
    use chrono::TimeZone;

    fn obs(name: &str, score: f64, day: u32) -> Observation {
        Observation {
            name: name.into(),
            score,
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn sample() -> Ledger {
        merge(
            Ledger::new(),
            &[obs("A", 9.0, 2), obs("B", 8.0, 1), obs("A", 9.5, 5), obs("C", 7.0, 3)],
            RetentionPolicy::History,
        )
    }

    #[test]
    fn span_covers_all_series() {
        let (lo, hi) = span(&sample()).unwrap();
        assert_eq!(lo, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(hi, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert!(span(&Ledger::new()).is_none());
    }

    #[test]
    fn summary_tracks_change() {
        let ledger = sample();
        let a = summarize(ledger.get("A").unwrap()).unwrap();
        assert_eq!(a.points, 2);
        assert_eq!((a.first_score, a.latest_score), (9.0, 9.5));
        assert_eq!(a.change, 0.5);
    }

    #[test]
    fn overview_latest_first_and_limited() {
        let rows = overview(&sample(), 2);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
