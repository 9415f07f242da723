//! Concurrent, polite period fetcher.
//!
//! Every period page is requested independently under a concurrency cap and
//! a per-request delay. Results always come back in period order regardless
//! of completion order, and a failed period never aborts the others.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use eventfeed_shared::{EventFeedError, FetchConfig, Period, Result};

use crate::replay::snapshot_file_name;
use crate::request::period_url;

// ---------------------------------------------------------------------------
// PeriodPage
// ---------------------------------------------------------------------------

/// What happened when a period page was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page body, plus its SHA-256 hash (logged to tell identical
    /// period pages apart).
    Fetched { body: String, content_hash: String },
    /// Network error, non-success status, or unreadable snapshot.
    Failed(String),
}

/// One period's page, fetched or not.
#[derive(Debug, Clone)]
pub struct PeriodPage {
    pub period: Period,
    /// The URL the page was (or would have been) requested from.
    pub url: Url,
    pub outcome: FetchOutcome,
}

impl PeriodPage {
    /// Wrap a body that was obtained some other way (a snapshot file).
    pub fn from_body(period: Period, url: Url, body: String) -> Self {
        let content_hash = compute_hash(&body);
        Self {
            period,
            url,
            outcome: FetchOutcome::Fetched { body, content_hash },
        }
    }

    pub fn failed(period: Period, url: Url, error: impl Into<String>) -> Self {
        Self {
            period,
            url,
            outcome: FetchOutcome::Failed(error.into()),
        }
    }

    /// The page body, if the fetch succeeded.
    pub fn body(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Fetched { body, .. } => Some(body),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// SHA-256 of the body, if the fetch succeeded.
    pub fn content_hash(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Fetched { content_hash, .. } => Some(content_hash),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Failed(e) => Some(e),
            FetchOutcome::Fetched { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP fetch driver for period pages.
pub struct Fetcher {
    config: FetchConfig,
    base_url: Url,
    client: Client,
}

impl Fetcher {
    /// Create a fetcher; fails on an unparsable base URL or client setup error.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            EventFeedError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EventFeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The request URL for one period.
    pub fn url_for(&self, period: Period) -> Result<Url> {
        period_url(&self.base_url, &self.config.facets, period)
    }

    /// Fetch every period. The returned pages are in the same order as
    /// `periods`, one per period.
    #[instrument(skip_all, fields(periods = periods.len(), concurrency = self.config.concurrency))]
    pub async fn fetch_periods(&self, periods: &[Period]) -> Vec<PeriodPage> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let delay = self.config.delay_ms;
        let mut handles = Vec::with_capacity(periods.len());

        info!(delay_ms = delay, "fetching period pages");

        for &period in periods {
            let url = match self.url_for(period) {
                Ok(url) => url,
                Err(e) => {
                    handles.push(Err(PeriodPage::failed(period, self.base_url.clone(), e.to_string())));
                    continue;
                }
            };

            let client = self.client.clone();
            let sem = semaphore.clone();

            handles.push(Ok(tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return PeriodPage::failed(period, url, "fetch cancelled");
                };

                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                match fetch_page(&client, &url).await {
                    Ok(body) => {
                        let page = PeriodPage::from_body(period, url, body);
                        debug!(
                            %period,
                            hash = page.content_hash().unwrap_or_default(),
                            "period page fetched"
                        );
                        page
                    }
                    Err(e) => {
                        warn!(%period, error = %e, "period fetch failed");
                        PeriodPage::failed(period, url, e.to_string())
                    }
                }
            })));
        }

        // Awaiting in spawn order keeps the output in period order.
        let mut pages = Vec::with_capacity(handles.len());
        for (handle, &period) in handles.into_iter().zip(periods) {
            let page = match handle {
                Err(page) => page,
                Ok(join) => match join.await {
                    Ok(page) => page,
                    Err(e) => PeriodPage::failed(period, self.base_url.clone(), format!("task failed: {e}")),
                },
            };
            pages.push(page);
        }

        if let Some(dir) = &self.config.debug_dir {
            dump_pages(dir, &pages).await;
        }

        let failed = pages.iter().filter(|p| p.error().is_some()).count();
        info!(fetched = pages.len() - failed, failed, "period fetch completed");
        pages
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching period page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| EventFeedError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EventFeedError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| EventFeedError::Network(format!("{url}: body read failed: {e}")))
}

/// Write every fetched body to `<dir>/page_YYYY_MM_01.html`.
///
/// Dump failures are logged and otherwise ignored.
async fn dump_pages(dir: &Path, pages: &[PeriodPage]) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "cannot create debug dir");
        return;
    }

    for page in pages {
        let Some(body) = page.body() else { continue };
        let path = dir.join(snapshot_file_name(page.period));
        match tokio::fs::write(&path, body).await {
            Ok(()) => debug!(path = %path.display(), "page dumped"),
            Err(e) => warn!(path = %path.display(), error = %e, "page dump failed"),
        }
    }
}

/// Compute SHA-256 hash of content.
pub(crate) fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
