use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::Html;
use tracing::info;

use crate::config::Settings;
use crate::error::ScrapeError;
use crate::fetch;
use crate::ledger::merge::{merge_with_stats, MergeStats};
use crate::ledger::recency::sort_by_recency;
use crate::ledger::{Ledger, RetentionPolicy};
use crate::parser::{self, extract::Markers};
use crate::store;

/// What one cycle did.
pub struct CycleReport {
    pub ledger: Ledger,
    pub observed: usize,
    pub merge: MergeStats,
    pub saved: bool,
}

/// Extract, merge and order. No I/O; the returned ledger is ready to persist.
pub fn update_ledger(
    page: &Html,
    ledger: Ledger,
    now: DateTime<Utc>,
    policy: RetentionPolicy,
    markers: &Markers,
) -> Result<(Ledger, usize, MergeStats), ScrapeError> {
    let observations = parser::observe_page(page, now, markers)?;
    info!("Extracted {} ranking entries", observations.len());

    let (merged, stats) = merge_with_stats(ledger, &observations, policy);
    let ordered = Ledger {
        series: sort_by_recency(merged),
    };
    Ok((ordered, observations.len(), stats))
}

/// One scrape-merge-persist cycle. Any failure aborts before the ledger file is touched.
pub async fn run_cycle(settings: &Settings, dry_run: bool) -> Result<CycleReport> {
    let ledger = store::load(&settings.ledger_path, settings.policy).context("Failed to load ledger")?;

    let page = fetch::fetch_page(settings)
        .await
        .with_context(|| format!("Failed to fetch {}", settings.url))?;

    let (ledger, observed, merge) = update_ledger(&page, ledger, Utc::now(), settings.policy, &settings.markers)
        .context("Failed to read ranking page")?;
    info!(
        "Merged under {} policy: {} new, {} updated, {} series total",
        settings.policy,
        merge.created,
        merge.updated,
        ledger.len()
    );

    if dry_run {
        info!("Dry run, not writing {}", settings.ledger_path.display());
    } else {
        store::save(&settings.ledger_path, &ledger).context("Failed to save ledger")?;
    }

    Ok(CycleReport {
        ledger,
        observed,
        merge,
        saved: !dry_run,
    })
}
