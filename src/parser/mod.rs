pub mod extract;
pub mod fields;
pub mod markup;

use tracing::debug;

use crate::models::{Ascent, Peak, SearchResult};

/// Parse a peak.aspx page. `None` when the page has no usable name.
pub fn parse_peak_detail(html: &str, pid: &str) -> Option<Peak> {
    extract::peak::extract(html, pid)
        .map_err(|missing| debug!(pid, %missing, "peak page rejected"))
        .ok()
}

/// Parse a search.aspx results page. Pages without a results table give an
/// empty list.
pub fn parse_search_results(html: &str) -> Vec<SearchResult> {
    extract::search::extract(html)
}

/// Parse a peak's ascent list. `None` when no ascent table is present.
pub fn parse_peak_ascents(html: &str, pid: &str) -> Option<Vec<Ascent>> {
    extract::ascents::extract(html, pid)
}

/// Parse an ascent.aspx page.
pub fn parse_ascent_detail(html: &str, aid: &str) -> Option<Ascent> {
    extract::ascent::extract(html, aid)
        .map_err(|missing| debug!(aid, %missing, "ascent page rejected"))
        .ok()
}

/// Most recent first. Partial dates sort by the first day they denote and
/// undated ascents go last; ties keep their page order.
pub fn sort_by_date(ascents: &mut [Ascent]) {
    ascents.sort_by(|a, b| a.date.cmp_recent_first(&b.date));
}

/// The `n` most recent ascents, whatever order the page listed them in.
pub fn most_recent(mut ascents: Vec<Ascent>, n: usize) -> Vec<Ascent> {
    sort_by_date(&mut ascents);
    ascents.truncate(n);
    ascents
}
