//! Class-token strategy: containers named like `event-card`, `event-row`, etc.

use std::sync::LazyLock;

use scraper::Selector;
use scraper::node::Element;

use super::{CandidateShape, LocatorStrategy, RawCandidate, element_text, innermost, section_date_hint};
use crate::PageSnapshot;

/// Layout words that mark a repeating container.
const STRUCTURAL_TOKENS: &[&str] = &["row", "card", "item", "container"];

/// Class names carrying one of these describe a field, not a container.
const FIELD_TOKENS: &[&str] = &[
    "title", "name", "date", "time", "location", "venue", "link", "image", "img", "header",
];

static CLASSED_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class]").expect("valid selector"));

/// Matches elements whose classes combine "event" with a structural token.
pub struct ClassTokenStrategy;

impl LocatorStrategy for ClassTokenStrategy {
    fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Vec<RawCandidate<'a>> {
        let matches = snapshot
            .html
            .select(&CLASSED_SEL)
            .filter(|el| is_event_container(el.value()))
            .filter(|el| !element_text(el).is_empty())
            .collect();

        innermost(matches)
            .into_iter()
            .map(|el| RawCandidate {
                element: el,
                date_hint: section_date_hint(&el),
                shape: CandidateShape::Block,
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "class-token"
    }
}

fn is_event_container(el: &Element) -> bool {
    let container_classes: Vec<String> = el
        .classes()
        .map(str::to_ascii_lowercase)
        .filter(|c| !FIELD_TOKENS.iter().any(|t| c.contains(t)))
        .collect();

    let has_event = container_classes.iter().any(|c| c.contains("event"));
    let has_structure = container_classes
        .iter()
        .any(|c| STRUCTURAL_TOKENS.iter().any(|t| c.contains(t)));
    has_event && has_structure
}
