//! Core domain types for EventFeed.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EventFeedError, Result};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// One calendar month, used as the query unit against the source calendar.
///
/// Stored as the first day of the month, so ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(NaiveDate);

impl Period {
    /// Build a period from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| EventFeedError::validation(format!("invalid period {year}-{month}")))
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        // Day 1 exists for every month of a valid date.
        Self(date - chrono::Days::new(u64::from(date.day0())))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// The following month, rolling December into January of the next year.
    pub fn succ(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    /// Shift by a signed number of months.
    pub fn offset(&self, months: i32) -> Option<Self> {
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.0.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Self)
    }

    /// Query-parameter form: `YYYY-MM-01`.
    pub fn query_date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

// ---------------------------------------------------------------------------
// RawEventFields
// ---------------------------------------------------------------------------

/// Where a candidate's link came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    /// An anchor inside the candidate, resolved against the page URL.
    Anchor,
    /// No anchor found; the page's own URL stands in.
    #[default]
    PageFallback,
}

/// Unvalidated text pulled out of one candidate.
///
/// Empty strings mean "absent"; only `title` is required downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventFields {
    pub title: String,
    pub date_text: String,
    pub time_text: String,
    pub location: String,
    /// Absolute URL, never empty once produced by the field extractor.
    pub link: String,
    pub link_source: LinkSource,
}

// ---------------------------------------------------------------------------
// EventTimestamp
// ---------------------------------------------------------------------------

/// Whether a timestamp's date came from the page or from the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Parsed,
    /// Date text was empty or unparsable; the processing time was substituted.
    Fallback,
}

/// A naive local timestamp tagged with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimestamp {
    pub value: NaiveDateTime,
    pub source: DateSource,
}

impl EventTimestamp {
    pub fn parsed(value: NaiveDateTime) -> Self {
        Self {
            value,
            source: DateSource::Parsed,
        }
    }

    pub fn fallback(value: NaiveDateTime) -> Self {
        Self {
            value,
            source: DateSource::Fallback,
        }
    }

    /// `true` when the date was read from the page.
    pub fn is_known(&self) -> bool {
        self.source == DateSource::Parsed
    }
}

// ---------------------------------------------------------------------------
// CanonicalEvent
// ---------------------------------------------------------------------------

/// A validated, normalized event ready for deduplication and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Deduplication key, stable across periods for the same event.
    pub identity_key: String,
    pub title: String,
    pub link: String,
    /// Generated HTML summary of the event's fields.
    pub description: String,
    pub timestamp: EventTimestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_bad_month() {
        assert!(Period::new(2025, 0).is_err());
        assert!(Period::new(2025, 13).is_err());
        assert!(Period::new(2025, 12).is_ok());
    }

    #[test]
    fn period_succ_rolls_year() {
        let dec = Period::new(2024, 12).unwrap();
        let jan = dec.succ().unwrap();
        assert_eq!((jan.year(), jan.month()), (2025, 1));
        assert!(dec < jan);
    }

    #[test]
    fn period_containing_clamps_to_month_start() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let period = Period::containing(date);
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(period.query_date(), "2024-02-01");
        assert_eq!(period.to_string(), "2024-02");
    }

    #[test]
    fn period_offset_both_directions() {
        let p = Period::new(2025, 3).unwrap();
        assert_eq!(p.offset(-12).unwrap(), Period::new(2024, 3).unwrap());
        assert_eq!(p.offset(11).unwrap(), Period::new(2026, 2).unwrap());
    }

    #[test]
    fn raw_fields_serialize_snake_case() {
        let fields = RawEventFields {
            title: "Spring Open".into(),
            link: "https://example.com/events".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&fields).expect("serialize");
        assert!(json.contains("\"date_text\":\"\""));
        assert!(json.contains("\"link_source\":\"page_fallback\""));
    }
}
