//! Candidate location and field extraction over rendered calendar pages.
//!
//! This crate provides:
//! - [`PageSnapshot`]: one parsed page plus the URL it was served from
//! - [`strategies`]: the ordered chain of heuristics that locate event candidates
//! - [`CandidateLocator`]: runs the chain, first non-empty strategy wins
//! - [`extract_fields`]: pulls title/date/time/location/link text out of a candidate

pub mod dates;
pub mod fields;
pub mod strategies;

use scraper::Html;
use url::Url;

pub use fields::extract_fields;
pub use strategies::{
    CandidateLocator, CandidateShape, ClassTokenStrategy, DateHeaderStrategy, KeywordStrategy,
    Located, LocatorStrategy, RawCandidate, StructuredRowStrategy,
};

/// A parsed page for one period, as handed over by the fetch driver.
pub struct PageSnapshot {
    /// The parsed document tree.
    pub html: Html,
    /// URL the page was requested from; relative links resolve against it.
    pub url: Url,
}

impl PageSnapshot {
    /// Parse a full HTML document.
    pub fn parse(body: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(body),
            url,
        }
    }
}
