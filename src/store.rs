use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::ledger::{Ledger, RetentionPolicy};

/// Reads the ledger at `path`. A missing or blank file is an empty ledger.
///
/// Every stored series must already use `policy`'s shape; mixed files are refused.
pub fn load(path: &Path, policy: RetentionPolicy) -> Result<Ledger, ScrapeError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("No ledger at {}, starting empty", path.display());
            return Ok(Ledger::new());
        }
        Err(e) => return Err(ScrapeError::persistence(path, e)),
    };

    if raw.trim().is_empty() {
        warn!("Ledger {} is empty, starting fresh", path.display());
        return Ok(Ledger::new());
    }

    let ledger: Ledger = serde_json::from_str(&raw).map_err(|e| ScrapeError::persistence(path, e))?;

    let mut seen = HashSet::with_capacity(ledger.len());
    for series in &ledger.series {
        if !seen.insert(series.name.as_str()) {
            return Err(ScrapeError::persistence(
                path,
                format!("duplicate entity {:?}", series.name),
            ));
        }
        let stored = series.points.policy();
        if stored != policy {
            return Err(ScrapeError::persistence(
                path,
                format!("{:?} is stored as {stored} but the run uses {policy}", series.name),
            ));
        }
    }

    info!("Loaded {} series ({} points) from {}", ledger.len(), ledger.total_points(), path.display());
    Ok(ledger)
}

/// Writes the ledger as indented JSON, replacing the file only once fully written.
pub fn save(path: &Path, ledger: &Ledger) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ScrapeError::persistence(path, e))?;
        }
    }

    let json = serde_json::to_string_pretty(ledger).map_err(|e| ScrapeError::persistence(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, json).map_err(|e| ScrapeError::persistence(path, e))?;
    fs::rename(&tmp, path).map_err(|e| ScrapeError::persistence(path, e))?;

    info!("Saved {} series to {}", ledger.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::merge::merge;
    use crate::ledger::Observation;
    use chrono::{TimeZone, Utc};

    fn sample(policy: RetentionPolicy) -> Ledger {
        let when = Utc.with_ymd_and_hms(2024, 7, 14, 10, 0, 0).unwrap();
        let batch = [
            Observation { name: "Alpha".into(), score: 9.1, timestamp: when },
            Observation { name: "Beta".into(), score: 8.7, timestamp: when },
        ];
        merge(Ledger::new(), &batch, policy)
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load(&dir.path().join("nope.json"), RetentionPolicy::History).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "  \n").unwrap();
        assert!(load(&path, RetentionPolicy::Snapshot).unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/scores.json");
        for policy in [RetentionPolicy::History, RetentionPolicy::Snapshot] {
            let ledger = sample(policy);
            save(&path, &ledger).unwrap();
            assert_eq!(load(&path, policy).unwrap(), ledger);
        }
        assert!(!dir.path().join("data/scores.json.tmp").exists());
    }

    #[test]
    fn reads_legacy_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(
            &path,
            r#"[
  {
    "name": "Steins;Gate",
    "points": [
      { "date": 1718000000000, "score": 9.07 },
      { "date": 1718086400000, "score": 9.08 }
    ]
  }
]"#,
        )
        .unwrap();
        let ledger = load(&path, RetentionPolicy::History).unwrap();
        assert_eq!(ledger.get("Steins;Gate").unwrap().points.scores(), vec![9.07, 9.08]);
    }

    #[test]
    fn policy_mismatch_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        save(&path, &sample(RetentionPolicy::Snapshot)).unwrap();
        let err = load(&path, RetentionPolicy::History).unwrap_err();
        assert!(matches!(err, ScrapeError::Persistence { ref reason, .. } if reason.contains("snapshot")));
    }

    #[test]
    fn duplicate_names_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(
            &path,
            r#"[{"name": "A", "points": []}, {"name": "A", "points": []}]"#,
        )
        .unwrap();
        assert!(load(&path, RetentionPolicy::History).is_err());
    }

    #[test]
    fn garbage_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path, RetentionPolicy::History), Err(ScrapeError::Persistence { .. })));
    }
}
