//! Field extractor: one candidate in, one [`RawEventFields`] out.
//!
//! For every field an element carrying a semantic marker (a class, id,
//! `itemprop` or `data-field` containing "title", "date", "time",
//! "location") wins over positional guesses.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::trace;
use url::Url;

use eventfeed_shared::{LinkSource, RawEventFields};

use crate::dates::{collapse_whitespace, find_date, find_time, strip_date, strip_time, time_tail};
use crate::strategies::{CandidateShape, RawCandidate, element_text};

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));

static DATETIME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").expect("valid selector"));

/// Attributes inspected for semantic markers.
const MARKER_ATTRS: &[&str] = &["class", "id", "itemprop", "data-field"];

/// Extract raw fields from a candidate.
///
/// Returns `None` when no non-empty title can be found; such candidates are
/// dropped, not reported as errors.
pub fn extract_fields(candidate: &RawCandidate<'_>, page_url: &Url) -> Option<RawEventFields> {
    let el = &candidate.element;
    let hint = candidate.date_hint.as_deref();

    let draft = match &candidate.shape {
        CandidateShape::Row { cells } => row_fields(el, cells, hint),
        CandidateShape::Block => block_fields(el, hint),
        CandidateShape::Text { text } => text_fields(text, hint),
    };

    if draft.title.is_empty() {
        trace!(element = el.value().name(), "candidate without title dropped");
        return None;
    }

    let (link, link_source) = match resolve_link(el, draft.title_el.as_ref(), page_url) {
        Some(url) => (url, LinkSource::Anchor),
        None => (page_url.to_string(), LinkSource::PageFallback),
    };

    Some(RawEventFields {
        title: draft.title,
        date_text: draft.date_text,
        time_text: draft.time_text,
        location: draft.location,
        link,
        link_source,
    })
}

/// Fields gathered before link resolution.
struct Draft<'a> {
    title: String,
    title_el: Option<ElementRef<'a>>,
    date_text: String,
    time_text: String,
    location: String,
}

// ---------------------------------------------------------------------------
// Per-shape extraction
// ---------------------------------------------------------------------------

fn row_fields<'a>(row: &ElementRef<'a>, cells: &[ElementRef<'a>], hint: Option<&str>) -> Draft<'a> {
    let title_el = marked(row, "title").or_else(|| cells.get(1).copied());
    let when = cells.first().map(element_text).unwrap_or_default();

    let (dt_date, dt_time) = datetime_attr(row);
    let date_text = dt_date
        .or_else(|| marked(row, "date").map(|d| date_in(&element_text(&d))))
        .or_else(|| find_date(&when).map(str::to_string))
        .or_else(|| hint.map(date_in))
        .unwrap_or_default();

    let time_text = dt_time
        .or_else(|| marked(row, "time").and_then(|t| time_in(&element_text(&t))))
        .or_else(|| time_in(&when))
        .unwrap_or_default();

    let location = marked(row, "location")
        .or_else(|| marked(row, "venue"))
        .or_else(|| cells.get(2).copied())
        .map(|l| element_text(&l))
        .unwrap_or_default();

    Draft {
        title: title_el.map(|t| element_text(&t)).unwrap_or_default(),
        title_el,
        date_text,
        time_text,
        location,
    }
}

fn block_fields<'a>(block: &ElementRef<'a>, hint: Option<&str>) -> Draft<'a> {
    let title_el = marked(block, "title")
        .or_else(|| block.select(&HEADING_SEL).next())
        .or_else(|| block.select(&ANCHOR_SEL).find(|a| !element_text(a).is_empty()));
    let title = match title_el {
        Some(t) => element_text(&t),
        None => first_text(block),
    };

    let text = element_text(block);
    let (dt_date, dt_time) = datetime_attr(block);
    let date_marker = marked(block, "date").map(|d| element_text(&d));

    let date_text = dt_date
        .or_else(|| date_marker.as_deref().map(date_in))
        .or_else(|| find_date(&text).map(str::to_string))
        .or_else(|| hint.map(date_in))
        .unwrap_or_default();

    let time_text = dt_time
        .or_else(|| marked(block, "time").and_then(|t| time_in(&element_text(&t))))
        .or_else(|| date_marker.as_deref().and_then(time_in))
        .or_else(|| find_time(&text).map(str::to_string))
        .unwrap_or_default();

    let location = marked(block, "location")
        .or_else(|| marked(block, "venue"))
        .map(|l| element_text(&l))
        .unwrap_or_default();

    Draft {
        title,
        title_el,
        date_text,
        time_text,
        location,
    }
}

fn text_fields<'a>(text: &str, hint: Option<&str>) -> Draft<'a> {
    Draft {
        title: strip_time(&strip_date(text)),
        title_el: None,
        date_text: find_date(text)
            .map(str::to_string)
            .or_else(|| hint.map(date_in))
            .unwrap_or_default(),
        time_text: find_time(text).map(str::to_string).unwrap_or_default(),
        location: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First descendant whose marker attributes mention `marker` and that has text.
fn marked<'a>(el: &ElementRef<'a>, marker: &str) -> Option<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|d| {
            let value = d.value();
            MARKER_ATTRS.iter().any(|attr| {
                value
                    .attr(attr)
                    .is_some_and(|v| v.to_ascii_lowercase().contains(marker))
            }) && !element_text(d).is_empty()
        })
}

/// Date and time halves of a `<time datetime="YYYY-MM-DDTHH:MM">` descendant.
fn datetime_attr(el: &ElementRef<'_>) -> (Option<String>, Option<String>) {
    let Some(raw) = el
        .select(&DATETIME_SEL)
        .next()
        .and_then(|t| t.value().attr("datetime"))
    else {
        return (None, None);
    };

    let raw = raw.trim();
    let (date, time) = match raw.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (raw, None),
    };
    let date = find_date(date).map(str::to_string);
    let time = time.and_then(|t| t.get(..5)).filter(|t| find_time(t).is_some());
    (date, time.map(str::to_string))
}

/// The date substring of `text`, or the whole text when none is found.
fn date_in(text: &str) -> String {
    find_date(text)
        .map(str::to_string)
        .unwrap_or_else(|| collapse_whitespace(text))
}

/// `text` from its first time onward ("8:30 AM CDT" out of a longer cell).
fn time_in(text: &str) -> Option<String> {
    time_tail(text).map(collapse_whitespace)
}

/// First non-empty text node under `el`.
fn first_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Anchor inside the title element, then anywhere in the candidate, then
/// the candidate itself; resolved against the page URL.
fn resolve_link<'a>(
    el: &ElementRef<'a>,
    title_el: Option<&ElementRef<'a>>,
    page_url: &Url,
) -> Option<String> {
    let own = (el.value().name() == "a").then_some(*el);
    let anchors = title_el
        .into_iter()
        .flat_map(|t| t.select(&ANCHOR_SEL))
        .chain(title_el.and_then(|t| (t.value().name() == "a").then_some(*t)))
        .chain(el.select(&ANCHOR_SEL))
        .chain(own);

    anchors
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| {
            !(href.is_empty()
                || href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:"))
        })
        .find_map(|href| {
            let mut resolved = page_url.join(href).ok()?;
            resolved.set_fragment(None);
            Some(resolved.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageSnapshot;
    use crate::strategies::{ClassTokenStrategy, KeywordStrategy, LocatorStrategy, StructuredRowStrategy};

    fn snapshot(body: &str) -> PageSnapshot {
        PageSnapshot::parse(
            body,
            Url::parse("https://example.com/events?date=2025-05-01").unwrap(),
        )
    }

    #[test]
    fn marked_title_beats_positional_cell() {
        let snap = snapshot(
            r#"<table><tr>
                <td>9:00 AM</td>
                <td><span class="badge">Gi Division</span></td>
                <td>Reno, NV</td>
                <td class="event-title">Reno Open</td>
            </tr></table>"#,
        );
        let candidates = StructuredRowStrategy.locate(&snap);
        let fields = extract_fields(&candidates[0], &snap.url).unwrap();
        assert_eq!(fields.title, "Reno Open");
        assert_eq!(fields.time_text, "9:00 AM");
    }

    #[test]
    fn relative_links_resolve_against_page() {
        let snap = snapshot(
            r#"<div class="event-item"><h4><a href="reno-open#top">Reno Open</a></h4></div>"#,
        );
        let candidates = ClassTokenStrategy.locate(&snap);
        let fields = extract_fields(&candidates[0], &snap.url).unwrap();
        assert_eq!(fields.link, "https://example.com/reno-open");
        assert_eq!(fields.link_source, LinkSource::Anchor);
    }

    #[test]
    fn script_and_anchor_only_links_fall_back_to_page() {
        let snap = snapshot(
            r##"<div class="event-item"><h4>Reno Open</h4>
                <a href="#details">Details</a><a href="javascript:void(0)">Share</a></div>"##,
        );
        let candidates = ClassTokenStrategy.locate(&snap);
        let fields = extract_fields(&candidates[0], &snap.url).unwrap();
        assert_eq!(fields.link, "https://example.com/events?date=2025-05-01");
        assert_eq!(fields.link_source, LinkSource::PageFallback);
    }

    #[test]
    fn blank_title_drops_candidate() {
        let snap = snapshot(
            r#"<table><tr><td>9:00</td><td>     </td><td>Reno</td></tr></table>"#,
        );
        let row = snap.html.select(&Selector::parse("tr").unwrap()).next().unwrap();
        let cells: Vec<_> = row
            .children()
            .filter_map(ElementRef::wrap)
            .collect();
        let candidate = RawCandidate {
            element: row,
            shape: CandidateShape::Row { cells },
            date_hint: None,
        };
        assert!(extract_fields(&candidate, &snap.url).is_none());
    }

    #[test]
    fn date_marker_with_time_feeds_both_fields() {
        let snap = snapshot(
            r#"<div class="event-card"><h3>Boise Cup</h3>
                <p class="event-date">May 10, 2025 at 1:30 PM</p></div>"#,
        );
        let candidates = ClassTokenStrategy.locate(&snap);
        let fields = extract_fields(&candidates[0], &snap.url).unwrap();
        assert_eq!(fields.date_text, "May 10, 2025");
        assert_eq!(fields.time_text, "1:30 PM");
    }

    #[test]
    fn keyword_anchor_is_its_own_link() {
        let snap = snapshot(
            "<ul><li><a href='/e/boise'>Boise Invitational</a> - May 10, 2025</li></ul>",
        );
        let candidates = KeywordStrategy.locate(&snap);
        let fields = extract_fields(&candidates[0], &snap.url).unwrap();
        assert_eq!(fields.title, "Boise Invitational");
        assert_eq!(fields.date_text, "May 10, 2025");
        assert_eq!(fields.link, "https://example.com/e/boise");
    }
}
