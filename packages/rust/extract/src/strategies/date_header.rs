//! Date-header sectioning: a date heading owns every sibling after it, up
//! to the next heading.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::{CandidateShape, LocatorStrategy, RawCandidate, class_contains, element_text, is_heading_tag};
use crate::PageSnapshot;
use crate::dates::looks_like_date_heading;

/// Longer "headers" are page chrome, not date labels.
const MAX_HEADING_CHARS: usize = 80;

/// Siblings with this little text are spacers or icons.
const MIN_SIBLING_CHARS: usize = 6;

static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h2, h3, h4, [class*="date"], [class*="header"]"#).expect("valid selector")
});

/// Treats siblings following a date-like heading as that date's events.
pub struct DateHeaderStrategy;

impl LocatorStrategy for DateHeaderStrategy {
    fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Vec<RawCandidate<'a>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for heading in snapshot.html.select(&HEADING_SEL) {
            let heading_text = element_text(&heading);
            if heading_text.chars().count() > MAX_HEADING_CHARS
                || !looks_like_date_heading(&heading_text)
            {
                continue;
            }

            for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
                if ends_section(&sibling) {
                    break;
                }
                if element_text(&sibling).chars().count() < MIN_SIBLING_CHARS {
                    continue;
                }
                if seen.insert(sibling.id()) {
                    candidates.push(RawCandidate {
                        element: sibling,
                        date_hint: Some(heading_text.clone()),
                        shape: CandidateShape::Block,
                    });
                }
            }
        }

        candidates
    }

    fn name(&self) -> &'static str {
        "date-header"
    }
}

/// Another heading, or a date label, closes the current section.
fn ends_section(el: &ElementRef<'_>) -> bool {
    is_heading_tag(el.value()) || class_contains(el.value(), "date")
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn snapshot(body: &str) -> PageSnapshot {
        PageSnapshot::parse(body, Url::parse("https://example.com/events").unwrap())
    }

    #[test]
    fn siblings_stop_at_next_heading() {
        let snap = snapshot(
            r#"<div>
                <h3>May 3, 2025</h3>
                <p>Reno Open at the Grand Sierra</p>
                <p>Boise Cup at Idaho Center</p>
                <h3>About us</h3>
                <p>We run tournaments.</p>
            </div>"#,
        );
        let found = DateHeaderStrategy.locate(&snap);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.date_hint.as_deref() == Some("May 3, 2025")));
    }

    #[test]
    fn non_date_headings_are_ignored() {
        let snap = snapshot("<h2>Upcoming</h2><p>Reno Open at the Grand Sierra</p>");
        assert!(DateHeaderStrategy.locate(&snap).is_empty());
    }

    #[test]
    fn tiny_siblings_are_skipped() {
        let snap = snapshot("<h2>June 14</h2><hr><span>•</span><p>Houston Summer Classic</p>");
        let found = DateHeaderStrategy.locate(&snap);
        assert_eq!(found.len(), 1);
        assert_eq!(element_text(&found[0].element), "Houston Summer Classic");
    }
}
