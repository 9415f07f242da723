//! Replay of page dumps written by a previous run's debug directory.

use std::path::Path;

use tracing::{debug, warn};
use url::Url;

use eventfeed_shared::{EventFeedError, Period, Result};

use crate::engine::PeriodPage;

/// Dump file name for a period: `page_YYYY_MM_01.html`.
pub fn snapshot_file_name(period: Period) -> String {
    format!("page_{}.html", period.first_day().format("%Y_%m_%d"))
}

/// Load one page per period from `dir`.
///
/// A missing or unreadable file yields a failed page for that period, just
/// like a failed fetch. Only a missing directory is an error.
pub fn load_snapshot_dir(
    dir: &Path,
    periods: &[Period],
    url_for: impl Fn(Period) -> Result<Url>,
) -> Result<Vec<PeriodPage>> {
    if !dir.is_dir() {
        return Err(EventFeedError::validation(format!(
            "snapshot directory {} does not exist",
            dir.display()
        )));
    }

    periods
        .iter()
        .map(|&period| {
            let url = url_for(period)?;
            let path = dir.join(snapshot_file_name(period));
            let page = match std::fs::read_to_string(&path) {
                Ok(body) => {
                    debug!(path = %path.display(), "snapshot loaded");
                    PeriodPage::from_body(period, url, body)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "snapshot unavailable");
                    PeriodPage::failed(period, url, format!("{}: {e}", path.display()))
                }
            };
            Ok(page)
        })
        .collect()
}
