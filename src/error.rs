use std::path::{Path, PathBuf};

/// Failures a scrape-merge-persist cycle can hit.
///
/// Every variant aborts the run before anything is written; only some
/// `Transport` failures are worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Attribute search found no matching element. Callers decide severity.
    #[error("no element with {key}=\"{value}\"")]
    NotFound { key: String, value: String },

    /// A required page landmark is missing: the page layout changed.
    #[error("page structure changed: {0}")]
    StructureChanged(String),

    /// A landmark was found but its content did not parse.
    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger persistence failed for {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },
}

impl ScrapeError {
    pub fn persistence(path: &Path, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Connection failures, timeouts, 5xx and 429 are worth another attempt;
    /// other HTTP statuses (404, 403, ...) will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().map_or(true, |s| {
                s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
            }),
            _ => false,
        }
    }
}
