//! Structured-row strategy: table rows and ARIA rows with a cell per field.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::{
    CandidateShape, LocatorStrategy, RawCandidate, child_elements, element_text,
    section_date_hint,
};
use crate::PageSnapshot;

/// Column labels used by header rows.
const HEADER_TOKENS: &[&str] = &[
    "EVENT", "EVENTS", "NAME", "TITLE", "LOCATION", "VENUE", "WHERE", "TIME", "DATE", "WHEN",
];

/// Shortest title cell accepted as an event name.
const MIN_TITLE_CHARS: usize = 4;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"tr, [role="row"]"#).expect("valid selector"));

static ARIA_CELL_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[role="cell"], [role="gridcell"]"#).expect("valid selector")
});

/// Matches rows carrying at least three sub-fields (when, title, location).
pub struct StructuredRowStrategy;

impl LocatorStrategy for StructuredRowStrategy {
    fn locate<'a>(&self, snapshot: &'a PageSnapshot) -> Vec<RawCandidate<'a>> {
        snapshot
            .html
            .select(&ROW_SEL)
            .filter_map(|row| {
                let cells = row_cells(&row);
                if cells.len() < 3 || is_header_row(&cells) {
                    return None;
                }
                if element_text(&cells[1]).chars().count() < MIN_TITLE_CHARS {
                    return None;
                }
                Some(RawCandidate {
                    element: row,
                    date_hint: section_date_hint(&row),
                    shape: CandidateShape::Row { cells },
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "structured-row"
    }
}

/// Data cells of a row: direct `td` children for tables, ARIA cells (or
/// plain children) for row-like containers.
fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    if row.value().name() == "tr" {
        return child_elements(row)
            .filter(|c| c.value().name() == "td")
            .collect();
    }
    let aria: Vec<_> = row.select(&ARIA_CELL_SEL).collect();
    if aria.is_empty() {
        child_elements(row).collect()
    } else {
        aria
    }
}

/// Two or more cells that are exactly column labels mark a header row.
fn is_header_row(cells: &[ElementRef<'_>]) -> bool {
    cells
        .iter()
        .filter(|c| {
            let text = element_text(c).to_ascii_uppercase();
            HEADER_TOKENS.contains(&text.as_str())
        })
        .count()
        >= 2
}
