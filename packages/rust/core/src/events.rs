//! Canonical events: identity keys, generated descriptions, and the
//! deduplicating accumulator.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use url::Url;

use eventfeed_shared::{CanonicalEvent, EventTimestamp, LinkSource, RawEventFields};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Deduplication key for one extracted event.
///
/// Keys depend only on the event itself, never on what else is on its page,
/// so the same event scraped from different periods converges. An anchor
/// link is combined with the title slug, since one link (a registration
/// page, say) often serves several events. A page-URL fallback drops the
/// query string and adds the title slug plus, when known, the event date;
/// recurring events that share a title stay apart.
pub fn identity_key(fields: &RawEventFields, page_url: &Url, timestamp: &EventTimestamp) -> String {
    let slug = title_slug(&fields.title);
    match fields.link_source {
        LinkSource::Anchor => format!("{}#{slug}", fields.link),
        LinkSource::PageFallback => {
            let mut base = page_url.clone();
            base.set_query(None);
            base.set_fragment(None);
            if timestamp.is_known() {
                format!("{base}#{slug}@{}", timestamp.value.format("%Y-%m-%d"))
            } else {
                format!("{base}#{slug}")
            }
        }
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// The slug, or `t` plus a short SHA-256 prefix for titles with no ASCII
/// alphanumerics at all.
fn title_slug(title: &str) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }
    let digest = Sha256::digest(title.trim().as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("t{hex}")
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// HTML summary of an event's fields. Absent fields are left out.
pub fn describe(fields: &RawEventFields, site_name: &str) -> String {
    let title = html_escape::encode_text(&fields.title);
    let mut html = format!("<p><strong>{title}</strong></p>");

    for (label, value) in [
        ("Date", &fields.date_text),
        ("Time", &fields.time_text),
        ("Location", &fields.location),
    ] {
        if !value.is_empty() {
            html.push_str(&format!("<p>{label}: {}</p>", html_escape::encode_text(value)));
        }
    }

    html.push_str(&format!(
        "<p>View on {}: <a href=\"{}\">{title}</a></p>",
        html_escape::encode_text(site_name),
        html_escape::encode_double_quoted_attribute(&fields.link),
    ));
    html
}

/// Build the canonical record for one candidate.
pub fn canonicalize(
    fields: &RawEventFields,
    timestamp: EventTimestamp,
    identity_key: String,
    site_name: &str,
) -> CanonicalEvent {
    CanonicalEvent {
        identity_key,
        title: fields.title.clone(),
        link: fields.link.clone(),
        description: describe(fields, site_name),
        timestamp,
    }
}

// ---------------------------------------------------------------------------
// EventSet
// ---------------------------------------------------------------------------

/// Events keyed by identity; the first record inserted for a key is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSet {
    events: BTreeMap<String, CanonicalEvent>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether it was new.
    pub fn insert(&mut self, event: CanonicalEvent) -> bool {
        if self.events.contains_key(&event.identity_key) {
            return false;
        }
        self.events.insert(event.identity_key.clone(), event);
        true
    }

    /// Fold a later period's set into this one. Existing keys win, so
    /// merging must follow period order.
    pub fn merge(&mut self, later: EventSet) -> usize {
        let mut added = 0;
        for event in later.events.into_values() {
            if self.insert(event) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, identity_key: &str) -> Option<&CanonicalEvent> {
        self.events.get(identity_key)
    }

    /// Ordered by timestamp, then title, then identity key.
    pub fn into_sorted(self) -> Vec<CanonicalEvent> {
        let mut events: Vec<_> = self.events.into_values().collect();
        events.sort_by(|a, b| {
            a.timestamp
                .value
                .cmp(&b.timestamp.value)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.identity_key.cmp(&b.identity_key))
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/events?date=2025-03-01&facets=%7B%7D").unwrap()
    }

    fn fields(title: &str, link: &str, source: LinkSource) -> RawEventFields {
        RawEventFields {
            title: title.into(),
            link: link.into(),
            link_source: source,
            ..Default::default()
        }
    }

    fn event(key: &str, title: &str, day: u32) -> CanonicalEvent {
        let value = NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        CanonicalEvent {
            identity_key: key.into(),
            title: title.into(),
            link: format!("https://example.com/{key}"),
            description: String::new(),
            timestamp: EventTimestamp::parsed(value),
        }
    }

    fn on(day: u32) -> EventTimestamp {
        EventTimestamp::parsed(
            NaiveDate::from_ymd_opt(2025, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn unknown() -> EventTimestamp {
        EventTimestamp::fallback(on(1).value)
    }

    #[test]
    fn anchor_key_is_link_plus_title() {
        let f = fields("Reno Open", "https://example.com/e/reno", LinkSource::Anchor);
        assert_eq!(
            identity_key(&f, &page(), &on(5)),
            "https://example.com/e/reno#reno-open"
        );
    }

    #[test]
    fn anchor_key_ignores_date_and_page() {
        let f = fields("Boise Cup", "https://example.com/register", LinkSource::Anchor);
        let other_period = Url::parse("https://example.com/events?date=2025-04-01").unwrap();
        assert_eq!(
            identity_key(&f, &page(), &on(6)),
            identity_key(&f, &other_period, &unknown())
        );
    }

    #[test]
    fn fallback_key_is_stable_across_periods() {
        let f = fields("Reno Open!", "ignored", LinkSource::PageFallback);
        let other_period = Url::parse("https://example.com/events?date=2025-04-01").unwrap();
        let a = identity_key(&f, &page(), &on(22));
        let b = identity_key(&f, &other_period, &on(22));
        assert_eq!(a, "https://example.com/events#reno-open@2025-03-22");
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_key_separates_recurring_titles() {
        let f = fields("Monthly Kids Cup", "ignored", LinkSource::PageFallback);
        assert_ne!(identity_key(&f, &page(), &on(8)), identity_key(&f, &page(), &on(29)));
    }

    #[test]
    fn fallback_key_without_date_has_no_suffix() {
        let f = fields("Mystery Open", "ignored", LinkSource::PageFallback);
        assert_eq!(
            identity_key(&f, &page(), &unknown()),
            "https://example.com/events#mystery-open"
        );
    }

    #[test]
    fn non_latin_titles_get_distinct_slugs() {
        let a = fields("柔術オープン", "ignored", LinkSource::PageFallback);
        let b = fields("Открытый турнир", "ignored", LinkSource::PageFallback);
        let key_a = identity_key(&a, &page(), &unknown());
        let key_b = identity_key(&b, &page(), &unknown());

        assert_ne!(key_a, key_b);
        assert!(!key_a.ends_with('#'));
        assert_eq!(key_a, identity_key(&a, &page(), &unknown()));
        let slug = key_a.rsplit('#').next().unwrap();
        assert_eq!(slug.len(), 13);
        assert!(slug.starts_with('t'));
    }

    #[test]
    fn description_escapes_and_skips_empty_fields() {
        let f = RawEventFields {
            title: "Kids <Cup> & Open".into(),
            date_text: "March 19, 2025".into(),
            location: "Orlando, FL".into(),
            link: "https://example.com/e?a=1&b=\"2\"".into(),
            link_source: LinkSource::Anchor,
            ..Default::default()
        };
        let html = describe(&f, "FloGrappling");
        assert!(html.starts_with("<p><strong>Kids &lt;Cup&gt; &amp; Open</strong></p>"));
        assert!(html.contains("<p>Date: March 19, 2025</p>"));
        assert!(!html.contains("Time:"));
        assert!(html.contains("<p>Location: Orlando, FL</p>"));
        assert!(html.contains("View on FloGrappling: <a href=\"https://example.com/e?a=1&amp;b=&quot;2&quot;\">"));
        assert_eq!(html, describe(&f, "FloGrappling"));
    }

    #[test]
    fn first_seen_wins() {
        let mut set = EventSet::new();
        assert!(set.insert(event("a", "First", 3)));
        assert!(!set.insert(event("a", "Second", 1)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().title, "First");
    }

    #[test]
    fn merge_keeps_earlier_period() {
        let mut march = EventSet::new();
        march.insert(event("a", "From March", 3));
        let mut april = EventSet::new();
        april.insert(event("a", "From April", 4));
        april.insert(event("b", "Only April", 4));

        assert_eq!(march.merge(april), 1);
        assert_eq!(march.get("a").unwrap().title, "From March");
        assert_eq!(march.len(), 2);
    }

    #[test]
    fn sorted_by_time_then_title() {
        let mut set = EventSet::new();
        set.insert(event("z", "Zeta", 5));
        set.insert(event("y", "Beta", 2));
        set.insert(event("x", "Alpha", 5));
        let titles: Vec<_> = set.into_sorted().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Beta", "Alpha", "Zeta"]);
    }
}
