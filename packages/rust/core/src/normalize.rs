//! Temporal normalizer: raw date text + raw time text into one timestamp.
//!
//! Date parsing tries a fixed list of formats and takes the first full
//! match. When nothing matches, the timestamp falls back to the processing
//! time and is tagged [`DateSource::Fallback`] so later stages can tell.
//! Time text only ever adjusts the time of day; malformed time text is
//! ignored. Timestamps are naive: every consumer shares one implicit zone.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::trace;

use eventfeed_extract::dates::{collapse_whitespace, find_date};
use eventfeed_shared::{DateSource, EventTimestamp};

/// Accepted date layouts, in priority order. Commas are removed before matching.
const DATE_FORMATS: &[&str] = &[
    "%B %d %Y", // March 19 2025
    "%b %d %Y", // Mar 19 2025
    "%Y-%m-%d", // 2025-03-19
    "%m/%d/%Y", // 3/19/2025
    "%d %B %Y", // 19 March 2025
    "%d %b %Y", // 19 Mar 2025
];

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

static SEPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsept\b").expect("valid regex"));

/// Normalizes against a fixed processing time, so the same inputs always
/// give the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct TemporalNormalizer {
    now: NaiveDateTime,
}

impl TemporalNormalizer {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// The processing time used for fallbacks.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Combine date and time text into one timestamp.
    pub fn normalize(&self, date_text: &str, time_text: &str) -> EventTimestamp {
        let (base, source) = match parse_date(date_text) {
            Some(date) => (date.and_time(NaiveTime::MIN), DateSource::Parsed),
            None => {
                trace!(date_text, "date not recognized, using processing time");
                (self.now, DateSource::Fallback)
            }
        };

        EventTimestamp {
            value: apply_time(base, time_text),
            source,
        }
    }
}

/// Parse date text with the first matching format, or `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let cleaned = clean_date_text(text);
    if cleaned.is_empty() {
        return None;
    }

    parse_with_formats(&cleaned).or_else(|| {
        // "Saturday, April 5, 2025" style labels carry a date inside them.
        let inner = find_date(text)?;
        parse_with_formats(&clean_date_text(inner))
    })
}

fn parse_with_formats(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Drop ordinals, commas and abbreviation dots; spell "Sept" the way chrono expects.
fn clean_date_text(text: &str) -> String {
    let text = ORDINAL_RE.replace_all(text, "$1");
    let text = SEPT_RE.replace_all(&text, "Sep");
    let text: String = text
        .chars()
        .map(|c| if c == ',' || c == '.' { ' ' } else { c })
        .collect();
    collapse_whitespace(&text)
}

/// Set the time of day on `base` from `H:MM [AM|PM]` text.
///
/// Leaves `base` untouched when the text is empty or malformed.
pub fn apply_time(base: NaiveDateTime, time_text: &str) -> NaiveDateTime {
    match parse_time(time_text) {
        Some(time) => base.date().and_time(time),
        None => base,
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let mut parts = text.split_whitespace();
    let clock = parts.next()?;
    let (hour, minute) = clock.split_once(':')?;
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;

    let meridiem = parts
        .next()
        .map(|m| m.replace('.', "").to_ascii_lowercase());
    match meridiem.as_deref() {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TemporalNormalizer {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        TemporalNormalizer::new(now)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn morning_and_evening_times() {
        let n = normalizer();
        let am = n.normalize("March 19, 2025", "8:30 AM");
        assert_eq!(am.value, at(2025, 3, 19, 8, 30));
        assert!(am.is_known());
        assert_eq!(n.normalize("March 19, 2025", "8:30 PM").value, at(2025, 3, 19, 20, 30));
    }

    #[test]
    fn noon_and_midnight() {
        let n = normalizer();
        assert_eq!(n.normalize("2025-03-19", "12:15 PM").value, at(2025, 3, 19, 12, 15));
        assert_eq!(n.normalize("2025-03-19", "12:15 AM").value, at(2025, 3, 19, 0, 15));
        assert_eq!(n.normalize("2025-03-19", "18:00").value, at(2025, 3, 19, 18, 0));
        assert_eq!(n.normalize("2025-03-19", "9:00 p.m.").value, at(2025, 3, 19, 21, 0));
    }

    #[test]
    fn every_listed_format_parses() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        for text in [
            "March 9, 2025",
            "Mar 9, 2025",
            "Mar. 9 2025",
            "2025-03-09",
            "3/9/2025",
            "03/09/2025",
            "9 March 2025",
            "9th Mar 2025",
            "Sunday, March 9th, 2025",
        ] {
            assert_eq!(parse_date(text), Some(expected), "{text}");
        }
        assert_eq!(parse_date("Sept 9, 2025"), NaiveDate::from_ymd_opt(2025, 9, 9));
    }

    #[test]
    fn unparsable_date_falls_back_to_processing_time() {
        let n = normalizer();
        let ts = n.normalize("sometime soon", "");
        assert_eq!(ts.value, n.now());
        assert_eq!(ts.source, DateSource::Fallback);

        let empty = n.normalize("", "");
        assert_eq!(empty.source, DateSource::Fallback);
    }

    #[test]
    fn fallback_date_still_takes_a_time() {
        let ts = normalizer().normalize("TBA", "10:00 AM");
        assert_eq!(ts.value, at(2025, 6, 1, 10, 0));
        assert!(!ts.is_known());
    }

    #[test]
    fn malformed_time_leaves_time_of_day_alone() {
        let n = normalizer();
        for time in ["8:30PM", "noon", "25:00", "7:75 AM", "TBD", ":30"] {
            assert_eq!(n.normalize("March 19, 2025", time).value, at(2025, 3, 19, 0, 0), "{time}");
        }
    }

    #[test]
    fn time_with_zone_suffix() {
        let ts = normalizer().normalize("March 19, 2025", "8:30 AM CDT");
        assert_eq!(ts.value, at(2025, 3, 19, 8, 30));
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let n = normalizer();
        for (date, time) in [("March 19, 2025", "8:30 PM"), ("nope", "7:00"), ("", "")] {
            assert_eq!(n.normalize(date, time), n.normalize(date, time));
        }
    }
}
