//! Per-period request URLs.

use std::collections::BTreeMap;

use url::Url;

use eventfeed_shared::{EventFeedError, Period, Result};

/// Build `base?date=YYYY-MM-01&facets=<json>` for one period.
///
/// Facets are serialized as a JSON object and form-encoded; an empty facet
/// map omits the parameter.
pub fn period_url(base: &Url, facets: &BTreeMap<String, String>, period: Period) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("date", &period.query_date());
        if !facets.is_empty() {
            let json = serde_json::to_string(facets)
                .map_err(|e| EventFeedError::parse(format!("facets: {e}")))?;
            query.append_pair("facets", &json);
        }
    }
    Ok(url)
}
