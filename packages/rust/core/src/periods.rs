//! Period enumeration: which calendar months a run queries.
//!
//! A run covers 14 months: the current one, the 11 before it and the 2
//! after it. The window ends two months ahead so upcoming events are
//! always queried; the back window gives up the month exactly a year ago.

use chrono::NaiveDate;

use eventfeed_shared::Period;

/// Months queried before the current one.
pub const MONTHS_BACK: i32 = 11;
/// Months queried after the current one.
pub const MONTHS_FORWARD: i32 = 2;

/// Months from `MONTHS_BACK` before `today` through `MONTHS_FORWARD` after
/// it, inclusive, in increasing order.
pub fn enumerate_periods(today: NaiveDate) -> Vec<Period> {
    let current = Period::containing(today);
    let (Some(start), Some(end)) = (current.offset(-MONTHS_BACK), current.offset(MONTHS_FORWARD))
    else {
        // Only reachable at the edges of chrono's calendar.
        return vec![current];
    };

    std::iter::successors(Some(start), |p| p.succ().filter(|next| *next <= end)).collect()
}
