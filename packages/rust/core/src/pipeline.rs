//! End-to-end run: period pages → candidates → fields → timestamps →
//! event set → feed and summary.
//!
//! Pages may be fetched concurrently, but processing here is sequential and
//! in period order. Each period builds its own [`EventSet`], which is then
//! merged into the run's set with first-seen-wins, so the result does not
//! depend on fetch completion order. Per-candidate and per-period failures
//! are logged and counted, never returned as errors.

use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use eventfeed_extract::{CandidateLocator, PageSnapshot, extract_fields};
use eventfeed_fetcher::{Fetcher, PeriodPage};
use eventfeed_shared::{CanonicalEvent, Period, RawEventFields, Result};

use crate::assembler::{FeedSettings, apply_unknown_dates, build_feed, build_summary};
use crate::events::{EventSet, canonicalize, identity_key};
use crate::normalize::TemporalNormalizer;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one period.
#[derive(Debug, Clone, Default)]
pub struct PeriodReport {
    pub period: Option<Period>,
    pub url: String,
    /// Name of the strategy that produced candidates, if any did.
    pub strategy: Option<&'static str>,
    pub candidates: usize,
    /// Candidates dropped for lacking a title.
    pub dropped: usize,
    /// Distinct events found on this page.
    pub events: usize,
    /// Fetch error, when the page never arrived.
    pub error: Option<String>,
}

/// One period's events plus its report.
#[derive(Debug, Clone)]
pub struct PeriodOutcome {
    pub report: PeriodReport,
    pub events: EventSet,
}

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub periods: usize,
    pub fetched: usize,
    /// Fetched pages on which no strategy found anything.
    pub empty: usize,
    pub failed: usize,
    pub candidates: usize,
    pub dropped: usize,
    /// Distinct events after deduplication, before the unknown-date policy.
    pub events: usize,
    pub unknown_dates: usize,
    /// Events removed by the unknown-date policy.
    pub excluded: usize,
    /// Events written to the feed.
    pub published: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct FeedArtifacts {
    pub feed_xml: String,
    pub summary_html: String,
    /// Published events, in feed order.
    pub events: Vec<CanonicalEvent>,
    pub reports: Vec<PeriodReport>,
    pub summary: RunSummary,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each period has been processed.
    fn period_processed(&self, report: &PeriodReport, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn period_processed(&self, _report: &PeriodReport, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// EventPipeline
// ---------------------------------------------------------------------------

/// Per-page processing: locate, extract, normalize, key.
pub struct EventPipeline {
    locator: CandidateLocator,
    normalizer: TemporalNormalizer,
    site_name: String,
}

impl EventPipeline {
    pub fn new(normalizer: TemporalNormalizer, site_name: impl Into<String>) -> Self {
        Self {
            locator: CandidateLocator::new(),
            normalizer,
            site_name: site_name.into(),
        }
    }

    /// Replace the default strategy chain.
    pub fn with_locator(mut self, locator: CandidateLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Turn one parsed page into a per-period event set.
    #[instrument(skip_all, fields(%period, url = %snapshot.url))]
    pub fn process_snapshot(&self, period: Period, snapshot: &PageSnapshot) -> PeriodOutcome {
        let located = self.locator.locate(snapshot);
        let fields: Vec<RawEventFields> = located
            .candidates
            .iter()
            .filter_map(|c| extract_fields(c, &snapshot.url))
            .collect();
        let dropped = located.candidates.len() - fields.len();

        let mut events = EventSet::new();
        for f in &fields {
            let timestamp = self.normalizer.normalize(&f.date_text, &f.time_text);
            let key = identity_key(f, &snapshot.url, &timestamp);
            if !events.insert(canonicalize(f, timestamp, key, &self.site_name)) {
                debug!(title = %f.title, "duplicate candidate on page");
            }
        }

        match located.strategy {
            Some(strategy) => info!(
                strategy,
                candidates = located.candidates.len(),
                dropped,
                events = events.len(),
                "period processed"
            ),
            None => info!("no strategy matched, empty period"),
        }

        PeriodOutcome {
            report: PeriodReport {
                period: Some(period),
                url: snapshot.url.to_string(),
                strategy: located.strategy,
                candidates: located.candidates.len(),
                dropped,
                events: events.len(),
                error: None,
            },
            events,
        }
    }

    /// Process a fetched page; a failed fetch is an empty period.
    pub fn process_page(&self, page: &PeriodPage) -> PeriodOutcome {
        match page.body() {
            Some(body) => {
                debug!(
                    period = %page.period,
                    hash = page.content_hash().unwrap_or_default(),
                    "processing page"
                );
                let snapshot = PageSnapshot::parse(body, page.url.clone());
                self.process_snapshot(page.period, &snapshot)
            }
            None => {
                let error = page.error().unwrap_or("no body").to_string();
                warn!(period = %page.period, url = %page.url, %error, "period skipped");
                PeriodOutcome {
                    report: PeriodReport {
                        period: Some(page.period),
                        url: page.url.to_string(),
                        error: Some(error),
                        ..Default::default()
                    },
                    events: EventSet::new(),
                }
            }
        }
    }

    /// Process pages in the given order and merge their events.
    pub fn collect(
        &self,
        pages: &[PeriodPage],
        progress: &dyn ProgressReporter,
    ) -> (EventSet, Vec<PeriodReport>) {
        let mut merged = EventSet::new();
        let mut reports = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            let outcome = self.process_page(page);
            let added = merged.merge(outcome.events);
            debug!(period = %page.period, added, total = merged.len(), "events accumulated");
            progress.period_processed(&outcome.report, i + 1, pages.len());
            reports.push(outcome.report);
        }

        (merged, reports)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Build the feed and summary from pages that are already in hand.
///
/// `pages` must be in period order; `now` is both the normalizer's fallback
/// time and the feed's build time.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn assemble_pages(
    pages: &[PeriodPage],
    settings: &FeedSettings,
    now: NaiveDateTime,
    progress: &dyn ProgressReporter,
) -> Result<FeedArtifacts> {
    let start = Instant::now();
    let pipeline = EventPipeline::new(TemporalNormalizer::new(now), settings.site_name.as_str());

    progress.phase("Extracting events");
    let (set, reports) = pipeline.collect(pages, progress);

    let sorted = set.into_sorted();
    let event_count = sorted.len();
    let unknown_dates = sorted.iter().filter(|e| !e.timestamp.is_known()).count();
    let events = apply_unknown_dates(sorted, settings.unknown_dates);

    progress.phase("Assembling feed");
    let feed_xml = build_feed(&events, settings, now)?;
    let summary_html = build_summary(&events, settings, now);

    let summary = RunSummary {
        periods: reports.len(),
        fetched: reports.iter().filter(|r| r.error.is_none()).count(),
        empty: reports
            .iter()
            .filter(|r| r.error.is_none() && r.strategy.is_none())
            .count(),
        failed: reports.iter().filter(|r| r.error.is_some()).count(),
        candidates: reports.iter().map(|r| r.candidates).sum(),
        dropped: reports.iter().map(|r| r.dropped).sum(),
        events: event_count,
        unknown_dates,
        excluded: event_count - events.len(),
        published: events.len(),
    };

    info!(
        events = summary.events,
        unknown_dates = summary.unknown_dates,
        failed = summary.failed,
        duration_ms = start.elapsed().as_millis(),
        "run assembled"
    );
    progress.done(&summary);

    Ok(FeedArtifacts {
        feed_xml,
        summary_html,
        events,
        reports,
        summary,
    })
}

/// Fetch every period, then assemble.
#[instrument(skip_all, fields(periods = periods.len()))]
pub async fn run(
    fetcher: &Fetcher,
    periods: &[Period],
    settings: &FeedSettings,
    now: NaiveDateTime,
    progress: &dyn ProgressReporter,
) -> Result<FeedArtifacts> {
    progress.phase("Fetching period pages");
    let pages = fetcher.fetch_periods(periods).await;
    assemble_pages(&pages, settings, now, progress)
}
