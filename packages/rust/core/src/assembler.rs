//! Feed and summary assembly.
//!
//! Turns the ordered canonical events into an RSS 2.0 document and a short
//! HTML listing of the next upcoming events. Neither output is ever empty:
//! an event-less run produces a feed holding one sentinel item and a
//! summary carrying a "no events" notice.

use chrono::{FixedOffset, NaiveDateTime, NaiveTime, Utc};
use rss::{Channel, Guid, Item};
use tracing::{debug, instrument};

use eventfeed_shared::{AppConfig, CanonicalEvent, EventFeedError, Result, UnknownDatePolicy};

/// Title suffix for events whose date fell back to the processing time.
pub const UNCONFIRMED_SUFFIX: &str = "(date unconfirmed)";

const SENTINEL_TITLE: &str = "No events found";
const SENTINEL_DESCRIPTION: &str = "No events were found in the scrape. This could be due to website changes or no events being scheduled.";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the assembler needs from the configuration.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub title: String,
    pub description: String,
    /// Channel link and sentinel link.
    pub base_url: String,
    pub site_name: String,
    /// File name of the feed, linked from the summary page.
    pub feed_file: String,
    pub summary_limit: usize,
    /// The single zone naive timestamps are interpreted in.
    pub offset: FixedOffset,
    pub unknown_dates: UnknownDatePolicy,
}

impl FeedSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.feed.utc_offset_minutes * 60).ok_or_else(|| {
            EventFeedError::config(format!(
                "feed.utc_offset_minutes {} is out of range",
                config.feed.utc_offset_minutes
            ))
        })?;

        Ok(Self {
            title: config.feed.title.clone(),
            description: config.feed.description.clone(),
            base_url: config.source.base_url.clone(),
            site_name: config.source.site_name.clone(),
            feed_file: config.output.feed_file.clone(),
            summary_limit: config.feed.summary_limit,
            offset,
            unknown_dates: config.feed.unknown_dates,
        })
    }

    /// Current wall-clock time in the configured zone.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    fn rfc2822(&self, value: NaiveDateTime) -> String {
        match value.and_local_timezone(self.offset).single() {
            Some(dt) => dt.to_rfc2822(),
            None => value.and_utc().to_rfc2822(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unknown dates
// ---------------------------------------------------------------------------

/// Apply the unknown-date policy to an ordered event list.
pub fn apply_unknown_dates(
    events: Vec<CanonicalEvent>,
    policy: UnknownDatePolicy,
) -> Vec<CanonicalEvent> {
    match policy {
        UnknownDatePolicy::Include => events,
        UnknownDatePolicy::Exclude => events
            .into_iter()
            .filter(|e| e.timestamp.is_known())
            .collect(),
        UnknownDatePolicy::Flag => events
            .into_iter()
            .map(|mut e| {
                if !e.timestamp.is_known() {
                    e.title = format!("{} {UNCONFIRMED_SUFFIX}", e.title);
                }
                e
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Serialize events into an RSS 2.0 document.
#[instrument(skip_all, fields(events = events.len()))]
pub fn build_feed(
    events: &[CanonicalEvent],
    settings: &FeedSettings,
    now: NaiveDateTime,
) -> Result<String> {
    let items = if events.is_empty() {
        debug!("no events, emitting sentinel item");
        vec![sentinel_item(settings, now)]
    } else {
        events.iter().map(|e| event_item(e, settings)).collect()
    };

    let mut channel = Channel::default();
    channel.set_title(settings.title.as_str());
    channel.set_link(settings.base_url.as_str());
    channel.set_description(settings.description.as_str());
    channel.set_last_build_date(settings.rfc2822(now));
    channel.set_items(items);

    let bytes = channel
        .write_to(Vec::new())
        .map_err(|e| EventFeedError::Feed(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EventFeedError::Feed(e.to_string()))
}

fn event_item(event: &CanonicalEvent, settings: &FeedSettings) -> Item {
    let mut guid = Guid::default();
    guid.set_value(event.identity_key.as_str());
    guid.set_permalink(false);

    let mut item = Item::default();
    item.set_title(event.title.clone());
    item.set_link(event.link.clone());
    item.set_description(event.description.clone());
    item.set_guid(guid);
    item.set_pub_date(settings.rfc2822(event.timestamp.value));
    item
}

/// The single item of an event-less feed; its guid changes daily.
pub fn sentinel_item(settings: &FeedSettings, now: NaiveDateTime) -> Item {
    let mut guid = Guid::default();
    guid.set_value(format!("{}#no-events-{}", settings.base_url, now.format("%Y%m%d")));
    guid.set_permalink(false);

    let mut item = Item::default();
    item.set_title(SENTINEL_TITLE.to_string());
    item.set_link(settings.base_url.clone());
    item.set_description(SENTINEL_DESCRIPTION.to_string());
    item.set_guid(guid);
    item.set_pub_date(settings.rfc2822(now));
    item
}

// ---------------------------------------------------------------------------
// Summary page
// ---------------------------------------------------------------------------

/// Events from the start of `now`'s day onward, at most `limit` of them.
pub fn upcoming(events: &[CanonicalEvent], now: NaiveDateTime, limit: usize) -> &[CanonicalEvent] {
    let day_start = now.date().and_time(NaiveTime::MIN);
    let first = events.partition_point(|e| e.timestamp.value < day_start);
    let rest = &events[first..];
    &rest[..rest.len().min(limit)]
}

/// Render the HTML summary page.
pub fn build_summary(events: &[CanonicalEvent], settings: &FeedSettings, now: NaiveDateTime) -> String {
    let title = html_escape::encode_text(&settings.title);
    let listed = upcoming(events, now, settings.summary_limit);

    let body = if events.is_empty() {
        "<p class=\"notice\">No events found in the latest scrape.</p>\n".to_string()
    } else if listed.is_empty() {
        "<p class=\"notice\">No upcoming events.</p>\n".to_string()
    } else {
        let mut list = String::from("<ul class=\"events\">\n");
        for event in listed {
            list.push_str(&format!(
                "<li>\n<h2>{}</h2>\n<p class=\"when\">{}</p>\n{}\n</li>\n",
                html_escape::encode_text(&event.title),
                event.timestamp.value.format("%a, %b %-d, %Y %-I:%M %p"),
                event.description,
            ));
        }
        list.push_str("</ul>\n");
        list
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<p><a href=\"{feed}\">Subscribe to the RSS feed</a></p>\n{body}<p class=\"updated\">Last updated: {updated}</p>\n</body>\n</html>\n",
        feed = html_escape::encode_double_quoted_attribute(&settings.feed_file),
        updated = settings.rfc2822(now),
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use eventfeed_shared::EventTimestamp;

    use super::*;

    fn settings() -> FeedSettings {
        FeedSettings::from_config(&AppConfig::default()).unwrap()
    }

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(title: &str, ts: EventTimestamp) -> CanonicalEvent {
        CanonicalEvent {
            identity_key: format!("https://example.com/{title}"),
            title: title.into(),
            link: format!("https://example.com/{title}"),
            description: format!("<p><strong>{title}</strong></p>"),
            timestamp: ts,
        }
    }

    #[test]
    fn empty_feed_has_one_dated_sentinel() {
        let now = at(6, 1, 12);
        let xml = build_feed(&[], &settings(), now).unwrap();
        let channel = Channel::read_from(xml.as_bytes()).unwrap();

        assert_eq!(channel.items().len(), 1);
        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("No events found"));
        assert_eq!(
            item.guid().unwrap().value(),
            "https://www.flograppling.com/events#no-events-20250601"
        );
        assert!(channel.last_build_date().is_some());
    }

    #[test]
    fn sentinel_guid_differs_across_days() {
        let a = sentinel_item(&settings(), at(6, 1, 23));
        let b = sentinel_item(&settings(), at(6, 2, 0));
        assert_ne!(a.guid().unwrap().value(), b.guid().unwrap().value());
    }

    #[test]
    fn items_follow_event_order() {
        let events = vec![
            event("alpha", EventTimestamp::parsed(at(3, 19, 8))),
            event("beta", EventTimestamp::parsed(at(4, 12, 9))),
        ];
        let xml = build_feed(&events, &settings(), at(6, 1, 0)).unwrap();
        let channel = Channel::read_from(xml.as_bytes()).unwrap();

        let titles: Vec<_> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, vec!["alpha", "beta"]);
        let first = &channel.items()[0];
        assert_eq!(first.guid().unwrap().value(), "https://example.com/alpha");
        assert_eq!(first.pub_date(), Some("Wed, 19 Mar 2025 08:00:00 +0000"));
        assert_eq!(first.description(), Some("<p><strong>alpha</strong></p>"));
    }

    #[test]
    fn offset_is_rendered_in_dates() {
        let mut s = settings();
        s.offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let xml = build_feed(&[event("a", EventTimestamp::parsed(at(3, 19, 8)))], &s, at(6, 1, 0)).unwrap();
        assert!(xml.contains("Wed, 19 Mar 2025 08:00:00 -0500"));
    }

    #[test]
    fn unknown_date_policies() {
        let events = vec![
            event("known", EventTimestamp::parsed(at(3, 19, 8))),
            event("guess", EventTimestamp::fallback(at(6, 1, 12))),
        ];

        assert_eq!(apply_unknown_dates(events.clone(), UnknownDatePolicy::Include), events);

        let excluded = apply_unknown_dates(events.clone(), UnknownDatePolicy::Exclude);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].title, "known");

        let flagged = apply_unknown_dates(events, UnknownDatePolicy::Flag);
        assert_eq!(flagged[0].title, "known");
        assert_eq!(flagged[1].title, "guess (date unconfirmed)");
    }

    #[test]
    fn summary_lists_upcoming_within_limit() {
        let mut s = settings();
        s.summary_limit = 2;
        let events = vec![
            event("past", EventTimestamp::parsed(at(5, 31, 10))),
            event("earlier-today", EventTimestamp::parsed(at(6, 1, 7))),
            event("next", EventTimestamp::parsed(at(6, 8, 9))),
            event("later", EventTimestamp::parsed(at(7, 1, 9))),
        ];
        let html = build_summary(&events, &s, at(6, 1, 12));

        assert!(!html.contains("<h2>past</h2>"));
        assert!(html.contains("<h2>earlier-today</h2>"));
        assert!(html.contains("<h2>next</h2>"));
        assert!(!html.contains("<h2>later</h2>"));
        assert!(html.contains("Sun, Jun 8, 2025 9:00 AM"));
        assert!(html.contains("href=\"events.xml\""));
    }

    #[test]
    fn summary_notices() {
        let s = settings();
        let empty = build_summary(&[], &s, at(6, 1, 12));
        assert!(empty.contains("No events found in the latest scrape."));

        let past = [event("past", EventTimestamp::parsed(at(1, 5, 10)))];
        let stale = build_summary(&past, &s, at(6, 1, 12));
        assert!(stale.contains("No upcoming events."));
        assert!(!stale.contains("<li>"));
    }
}
