//! Candidate locator strategies and the ordered chain that runs them.
//!
//! Markup on the source calendar is unknown and changes between runs, so
//! each strategy is one heuristic over the whole page. Strategies are tried
//! in priority order and the first one that returns anything wins; results
//! are never merged across strategies, so one event is never counted twice
//! through two different heuristics.

mod class_token;
mod date_header;
mod keyword;
mod structured_row;

use std::collections::HashSet;

use scraper::ElementRef;
use scraper::node::Element;
use tracing::debug;

use crate::PageSnapshot;
use crate::dates::{collapse_whitespace, looks_like_date_heading};

pub use class_token::ClassTokenStrategy;
pub use date_header::DateHeaderStrategy;
pub use keyword::KeywordStrategy;
pub use structured_row::StructuredRowStrategy;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// How a candidate's sub-fields are laid out.
#[derive(Debug, Clone)]
pub enum CandidateShape<'a> {
    /// Tabular row: positional cells are (when, title, location, ...).
    Row { cells: Vec<ElementRef<'a>> },
    /// A container (card, list item, section sibling) with free layout.
    Block,
    /// A bare text node match; the text is the only structure available.
    Text { text: String },
}

/// A page fragment that might describe one event.
///
/// Borrows from the snapshot, so it lives only as long as one period's
/// processing.
#[derive(Debug, Clone)]
pub struct RawCandidate<'a> {
    /// The matched element.
    pub element: ElementRef<'a>,
    /// Layout used by the field extractor.
    pub shape: CandidateShape<'a>,
    /// Raw date text found in the surrounding context (section heading,
    /// table caption, neighbouring text).
    pub date_hint: Option<String>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One heuristic for locating candidates in a page.
pub trait LocatorStrategy: Send + Sync {
    /// Return every candidate this heuristic finds, in document order.
    fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Vec<RawCandidate<'a>>;

    /// Short stable name for tracing.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Outcome of running the chain over one page.
#[derive(Debug)]
pub struct Located<'a> {
    /// Name of the strategy that produced the candidates, if any did.
    pub strategy: Option<&'static str>,
    pub candidates: Vec<RawCandidate<'a>>,
}

/// Holds strategies in priority order.
pub struct CandidateLocator {
    strategies: Vec<Box<dyn LocatorStrategy>>,
}

impl CandidateLocator {
    /// The built-in chain: structured rows, class tokens, date headers,
    /// keyword fallback.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(StructuredRowStrategy),
                Box::new(ClassTokenStrategy),
                Box::new(DateHeaderStrategy),
                Box::new(KeywordStrategy),
            ],
        }
    }

    /// A chain with a caller-chosen order.
    pub fn with_strategies(strategies: Vec<Box<dyn LocatorStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run strategies in order, stopping at the first non-empty result.
    /// An empty result is an empty period, not an error.
    pub fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Located<'a> {
        for strategy in &self.strategies {
            let candidates = strategy.locate(snapshot);
            debug!(
                strategy = strategy.name(),
                count = candidates.len(),
                "strategy attempted"
            );
            if !candidates.is_empty() {
                return Located {
                    strategy: Some(strategy.name()),
                    candidates,
                };
            }
        }

        Located {
            strategy: None,
            candidates: Vec::new(),
        }
    }
}

impl Default for CandidateLocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by strategies and the field extractor
// ---------------------------------------------------------------------------

/// Tags whose text never describes an event.
pub(crate) const SKIP_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "html", "head", "body", "title", "noscript", "svg",
    "template",
];

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// `true` if any class name of `el` contains `token` (case-insensitive).
pub(crate) fn class_contains(el: &Element, token: &str) -> bool {
    el.attr("class")
        .map(|c| c.to_ascii_lowercase().contains(token))
        .unwrap_or(false)
}

/// `h1`–`h6`.
pub(crate) fn is_heading_tag(el: &Element) -> bool {
    matches!(el.name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Element children of `el`.
pub(crate) fn child_elements<'a>(el: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Keep only matches that contain no other match.
pub(crate) fn innermost<'a>(matches: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    let ids: HashSet<_> = matches.iter().map(|el| el.id()).collect();
    matches
        .into_iter()
        .filter(|el| !el.descendants().skip(1).any(|d| ids.contains(&d.id())))
        .collect()
}

/// Longest heading text that still counts as a date label.
const MAX_DATE_LABEL_LEN: usize = 80;

/// Is `el` a short label whose text reads as a date?
fn is_date_label(el: &ElementRef<'_>) -> Option<String> {
    let value = el.value();
    // A grouping row spans the table; event rows have a cell per field.
    let group_row = value.name() == "tr" && child_elements(el).count() < 3;
    let label_like = is_heading_tag(value)
        || group_row
        || matches!(value.name(), "caption" | "th" | "dt" | "legend")
        || class_contains(value, "date")
        || class_contains(value, "header");
    if !label_like {
        return None;
    }
    let text = element_text(el);
    if text.chars().count() <= MAX_DATE_LABEL_LEN && looks_like_date_heading(&text) {
        Some(text)
    } else {
        None
    }
}

/// Ancestor levels searched for a governing date label.
const MAX_CONTEXT_DEPTH: usize = 6;

/// Nearest date label governing `el`: a preceding sibling of `el` or of
/// one of its ancestors, or an ancestor table's caption.
pub(crate) fn section_date_hint(el: &ElementRef<'_>) -> Option<String> {
    let mut current = *el;
    for _ in 0..MAX_CONTEXT_DEPTH {
        for sibling in current.prev_siblings().filter_map(ElementRef::wrap) {
            if let Some(label) = is_date_label(&sibling) {
                return Some(label);
            }
        }
        let parent = current.parent().and_then(ElementRef::wrap)?;
        if parent.value().name() == "table" {
            if let Some(caption) = child_elements(&parent)
                .find(|c| c.value().name() == "caption")
                .and_then(|c| is_date_label(&c))
            {
                return Some(caption);
            }
        }
        current = parent;
    }
    None
}
