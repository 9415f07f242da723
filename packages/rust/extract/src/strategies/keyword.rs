//! Full-text keyword fallback: short text blocks naming a competition next
//! to a recognizable date.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{CandidateShape, LocatorStrategy, RawCandidate, SKIP_TAGS, element_text, innermost};
use crate::PageSnapshot;
use crate::dates::find_date;

/// Bounds on the text of a matching element, in characters.
const MIN_TEXT_CHARS: usize = 10;
const MAX_TEXT_CHARS: usize = 200;

/// Parent text longer than this is a page region, not the event's context.
const MAX_CONTEXT_CHARS: usize = 300;

static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:tournament|championships?|open|cup|grand prix|challenge|masters|nationals|worlds|invitational|classic)\b",
    )
    .expect("valid regex")
});

static ANY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("valid selector"));

/// Last-resort scan over every element's text.
pub struct KeywordStrategy;

impl LocatorStrategy for KeywordStrategy {
    fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Vec<RawCandidate<'a>> {
        let matches: Vec<(ElementRef<'a>, String, String)> = snapshot
            .html
            .select(&ANY_SEL)
            .filter(|el| !SKIP_TAGS.contains(&el.value().name()))
            .filter_map(|el| {
                let text = element_text(&el);
                let len = text.chars().count();
                if !(MIN_TEXT_CHARS..=MAX_TEXT_CHARS).contains(&len) || !KEYWORD_RE.is_match(&text)
                {
                    return None;
                }
                let date = nearby_date(&el, &text)?;
                Some((el, text, date))
            })
            .collect();

        let kept = innermost(matches.iter().map(|(el, _, _)| *el).collect());

        matches
            .into_iter()
            .filter(|(el, _, _)| kept.contains(el))
            .map(|(el, text, date)| RawCandidate {
                element: el,
                date_hint: Some(date),
                shape: CandidateShape::Text { text },
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// A date in the element's own text, its previous sibling, or a short parent.
fn nearby_date(el: &ElementRef<'_>, text: &str) -> Option<String> {
    if let Some(date) = find_date(text) {
        return Some(date.to_string());
    }

    let previous = el.prev_siblings().find_map(ElementRef::wrap);
    if let Some(date) = previous.and_then(|p| find_date(&element_text(&p)).map(str::to_string)) {
        return Some(date);
    }

    let parent = el.parent().and_then(ElementRef::wrap)?;
    let parent_text = element_text(&parent);
    if parent_text.chars().count() > MAX_CONTEXT_CHARS {
        return None;
    }
    find_date(&parent_text).map(str::to_string)
}
