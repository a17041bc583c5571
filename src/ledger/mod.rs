pub mod merge;
pub mod recency;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How many points an entity keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Every scrape appends a timestamped point.
    #[default]
    History,
    /// One point per calendar day (UTC), last write wins.
    Snapshot,
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::History => f.write_str("history"),
            Self::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// One freshly scraped reading. Never persisted directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "date", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

/// Day-to-score mapping kept in insertion order.
///
/// Serialized as a JSON object; document order survives a round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyScores(Vec<(NaiveDate, f64)>);

impl DailyScores {
    /// Writes the day's score as the newest entry, dropping any earlier write for that day.
    pub fn upsert(&mut self, day: NaiveDate, score: f64) {
        self.0.retain(|(d, _)| *d != day);
        self.0.push((day, score));
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.0.iter().copied()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for DailyScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, score) in &self.0 {
            map.serialize_entry(&day.format("%Y-%m-%d").to_string(), score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DailyScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DaysVisitor;

        impl<'de> Visitor<'de> for DaysVisitor {
            type Value = DailyScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of YYYY-MM-DD days to scores")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut days = DailyScores::default();
                while let Some((key, score)) = access.next_entry::<String, f64>()? {
                    let day = NaiveDate::parse_from_str(&key, "%Y-%m-%d")
                        .map_err(|e| serde::de::Error::custom(format!("bad day {key:?}: {e}")))?;
                    days.upsert(day, score);
                }
                Ok(days)
            }
        }

        deserializer.deserialize_map(DaysVisitor)
    }
}

/// An entity's points under one retention policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointSet {
    #[serde(rename = "points")]
    History(Vec<Point>),
    #[serde(rename = "days")]
    Snapshot(DailyScores),
}

impl PointSet {
    /// A set holding exactly one observation.
    pub fn first(policy: RetentionPolicy, obs: &Observation) -> Self {
        let mut set = match policy {
            RetentionPolicy::History => Self::History(Vec::with_capacity(1)),
            RetentionPolicy::Snapshot => Self::Snapshot(DailyScores::default()),
        };
        set.insert(obs);
        set
    }

    /// Applies the set's own insertion rule: append, or upsert by day.
    pub fn insert(&mut self, obs: &Observation) {
        match self {
            Self::History(points) => points.push(Point {
                timestamp: obs.timestamp,
                score: obs.score,
            }),
            Self::Snapshot(days) => days.upsert(obs.timestamp.date_naive(), obs.score),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        match self {
            Self::History(_) => RetentionPolicy::History,
            Self::Snapshot(_) => RetentionPolicy::Snapshot,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::History(points) => points.len(),
            Self::Snapshot(days) => days.len(),
        }
    }

    /// Scores in insertion order.
    pub fn scores(&self) -> Vec<f64> {
        match self {
            Self::History(points) => points.iter().map(|p| p.score).collect(),
            Self::Snapshot(days) => days.iter().map(|(_, s)| s).collect(),
        }
    }

    /// Instant of every point in insertion order; snapshot days map to midnight UTC.
    pub fn instants(&self) -> Vec<DateTime<Utc>> {
        match self {
            Self::History(points) => points.iter().map(|p| p.timestamp).collect(),
            Self::Snapshot(days) => days.iter().map(|(d, _)| day_start(d)).collect(),
        }
    }

    /// Instant of the last-inserted point.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::History(points) => points.last().map(|p| p.timestamp),
            Self::Snapshot(days) => days.last().map(|(d, _)| day_start(d)),
        }
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub name: String,
    #[serde(flatten)]
    pub points: PointSet,
}

/// Every entity ever observed. Names are unique; order is re-derived before saving.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    pub series: Vec<EntitySeries>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&EntitySeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn total_points(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}
