use std::collections::HashMap;

use tracing::debug;

use super::{EntitySeries, Ledger, Observation, PointSet, RetentionPolicy};

/// Counts of what a merge touched, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub created: usize,
    pub updated: usize,
}

/// Folds `observations` into `ledger`, in order.
///
/// Existing series get the policy's insertion rule applied; unknown names get a
/// new series holding just that point. Nothing is ever removed.
pub fn merge(ledger: Ledger, observations: &[Observation], policy: RetentionPolicy) -> Ledger {
    merge_with_stats(ledger, observations, policy).0
}

/// [`merge`], also reporting how many observations created or extended a series.
pub fn merge_with_stats(
    ledger: Ledger,
    observations: &[Observation],
    policy: RetentionPolicy,
) -> (Ledger, MergeStats) {
    let mut series = ledger.series;
    let mut index: HashMap<String, usize> = series
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect();
    let mut stats = MergeStats::default();

    for obs in observations {
        match index.get(&obs.name).copied() {
            Some(i) => {
                series[i].points.insert(obs);
                stats.updated += 1;
            }
            None => {
                index.insert(obs.name.clone(), series.len());
                series.push(EntitySeries {
                    name: obs.name.clone(),
                    points: PointSet::first(policy, obs),
                });
                stats.created += 1;
            }
        }
    }

    debug!(created = stats.created, updated = stats.updated, "merged observations");
    (Ledger { series }, stats)
}
