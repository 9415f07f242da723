//! Date and time substring detection over free page text.
//!
//! These helpers only *find* date-looking text; turning it into a timestamp
//! is the normalizer's job.

use std::sync::LazyLock;

use regex::Regex;

/// Month names and abbreviations, matched as whole words.
const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b{MONTH}\b")).expect("valid regex"));

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid regex"));

/// A complete date: month-name day year, day month-name year, ISO, or m/d/y.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)\b{MONTH}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b|\b\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTH}\.?,?\s+\d{{4}}\b|\b\d{{4}}-\d{{1,2}}-\d{{1,2}}\b|\b\d{{1,2}}/\d{{1,2}}/\d{{4}}\b"
    );
    Regex::new(&pattern).expect("valid regex")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*[ap]\.?m\b\.?)?").expect("valid regex")
});

/// Heading-style test: at least one digit and a recognized month word.
pub fn looks_like_date_heading(text: &str) -> bool {
    DIGIT_RE.is_match(text) && MONTH_RE.is_match(text)
}

/// The leftmost complete date substring in `text`.
pub fn find_date(text: &str) -> Option<&str> {
    DATE_RE.find(text).map(|m| m.as_str())
}

/// The leftmost `H:MM` time (with an optional meridiem) in `text`.
pub fn find_time(text: &str) -> Option<&str> {
    TIME_RE.find(text).map(|m| m.as_str())
}

/// `text` from the start of its first time to the end.
pub fn time_tail(text: &str) -> Option<&str> {
    TIME_RE.find(text).map(|m| text[m.start()..].trim_end())
}

/// `text` with its first date substring cut out and separators tidied.
pub fn strip_date(text: &str) -> String {
    match DATE_RE.find(text) {
        Some(m) => {
            let joined = format!("{} {}", &text[..m.start()], &text[m.end()..]);
            trim_separators(&collapse_whitespace(&joined))
        }
        None => trim_separators(text),
    }
}

/// `text` with its first time substring cut out and separators tidied.
pub fn strip_time(text: &str) -> String {
    match TIME_RE.find(text) {
        Some(m) => {
            let joined = format!("{} {}", &text[..m.start()], &text[m.end()..]);
            trim_separators(&collapse_whitespace(&joined))
        }
        None => trim_separators(text),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_separators(text: &str) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '|' | '@' | '·' | '–' | '—' | ':'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_heading_needs_digit_and_month() {
        assert!(looks_like_date_heading("Wednesday, March 19"));
        assert!(looks_like_date_heading("19 Sept 2025"));
        assert!(!looks_like_date_heading("March Madness"));
        assert!(!looks_like_date_heading("Round 2 results"));
        // "mar" inside another word is not a month
        assert!(!looks_like_date_heading("Marathon 5k"));
    }

    #[test]
    fn find_date_formats() {
        assert_eq!(find_date("Pan Championship - March 19, 2025"), Some("March 19, 2025"));
        assert_eq!(find_date("on Mar 19 2025 at noon"), Some("Mar 19 2025"));
        assert_eq!(find_date("start 2025-03-19"), Some("2025-03-19"));
        assert_eq!(find_date("(3/19/2025)"), Some("3/19/2025"));
        assert_eq!(find_date("19th March 2025"), Some("19th March 2025"));
        assert_eq!(find_date("March 19"), None);
    }

    #[test]
    fn find_time_keeps_meridiem() {
        assert_eq!(find_time("8:30 AM CDT"), Some("8:30 AM"));
        assert_eq!(find_time("doors 18:00"), Some("18:00"));
        assert_eq!(find_time("no time here"), None);
        assert_eq!(time_tail("Mar 19, 2025 8:30 AM CDT"), Some("8:30 AM CDT"));
    }

    #[test]
    fn strip_helpers_tidy_separators() {
        assert_eq!(strip_date("Pan Championship - March 19, 2025"), "Pan Championship");
        assert_eq!(strip_date("Mar 19, 2025 8:30 AM CDT"), "8:30 AM CDT");
        assert_eq!(strip_time("Kids Open @ 9:00 AM"), "Kids Open");
    }
}
