use std::collections::HashSet;

use tracing::{debug, warn};

use super::{locate_table, non_empty, Columns};
use crate::models::SearchResult;
use crate::parser::fields::{self, UnitPair};
use crate::parser::markup::{self, Row};

/// Column positions of the results table. Defaults follow the usual
/// Type / Name / Location / Range / Elevation layout.
#[derive(Debug, Clone, Copy)]
struct Layout {
    name: usize,
    location: Option<usize>,
    range: Option<usize>,
    elevation: Option<usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            name: 1,
            location: Some(2),
            range: Some(3),
            elevation: Some(4),
        }
    }
}

impl Layout {
    fn from_header(row: &Row) -> Self {
        let cols = Columns::from_row(row);
        let Some(name) = cols.find(|h| h == "name" || h.contains("peak")) else {
            return Layout::default();
        };
        Layout {
            name,
            location: cols.find(|h| h.contains("location") || h.contains("state")),
            range: cols.find(|h| h.contains("range")),
            elevation: cols.find(|h| h.contains("elev")),
        }
    }
}

pub fn extract(html: &str) -> Vec<SearchResult> {
    let Some(heading) = markup::headings(html)
        .into_iter()
        .find(|h| h.text.to_lowercase().contains("search results"))
    else {
        debug!("no search results heading");
        return Vec::new();
    };

    let Some(table) = locate_table(html, heading.end, |t| t.has_class("gray")) else {
        debug!(heading = %heading.text, "no table after search results heading");
        return Vec::new();
    };

    let rows = markup::rows(table.inner);
    let layout = rows
        .iter()
        .find(|r| r.is_header())
        .map(Layout::from_header)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut results: Vec<SearchResult> = Vec::new();
    for row in rows.iter().filter(|r| !r.is_header()) {
        let Some(result) = parse_row(row, layout) else { continue };
        if seen.insert(result.pid.clone()) {
            results.push(result);
        }
    }

    if results.is_empty() && rows.len() > 1 {
        warn!(rows = rows.len(), "search table had rows but no peak links");
    }
    results
}

fn parse_row(row: &Row, layout: Layout) -> Option<SearchResult> {
    let name_cell = row.cells.get(layout.name)?;
    let link = name_cell
        .links()
        .into_iter()
        .find(|l| l.href.to_lowercase().contains("peak.aspx"))?;
    let pid = fields::query_id(&link.href, "pid")?;
    let name = non_empty(link.text.clone()).or_else(|| non_empty(name_cell.text()))?;

    let text_at = |idx: Option<usize>| idx.and_then(|i| row.cells.get(i)).map(|c| c.text());
    let elevation = text_at(layout.elevation).unwrap_or_default();
    let (mut elevation_ft, elevation_m) = fields::paired_int(&elevation, UnitPair::Length);
    if elevation_ft.is_none() && elevation_m.is_none() {
        // the results table lists bare feet
        elevation_ft = fields::parse_int(&elevation);
    }

    Some(SearchResult {
        pid,
        name,
        url: link.href,
        location: text_at(layout.location).and_then(non_empty),
        range: text_at(layout.range).and_then(non_empty),
        elevation_ft,
        elevation_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rainier_search_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/search_rainier.html").unwrap();
        let results = extract(&html);
        assert_eq!(results.len(), 3);

        let first = &results[0];
        assert_eq!(first.pid, "2296");
        assert_eq!(first.name, "Mount Rainier");
        assert_eq!(first.url, "peak.aspx?pid=2296");
        assert_eq!(first.location.as_deref(), Some("USA-WA"));
        assert_eq!(first.range.as_deref(), Some("Cascade Range"));
        assert_eq!(first.elevation_ft, Some(14411));
        assert_eq!(first.elevation_m, None);
        assert_eq!(first.absolute_url(), "https://www.peakbagger.com/peak.aspx?pid=2296");

        assert_eq!(results[2].pid, "-41");
        assert_eq!(results[2].range, None);
    }

    #[test]
    fn reordered_columns_follow_headers() {
        let html = r#"<h2>Peak Search Results</h2>
            <table class="gray">
              <tr><th>Elevation</th><th>Name</th><th>Location</th></tr>
              <tr><td>4,392 m</td><td><a href="peak.aspx?pid=9">Nine</a></td><td>Somewhere</td></tr>
            </table>"#;
        let results = extract(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].elevation_m, Some(4392));
        assert_eq!(results[0].elevation_ft, None);
        assert_eq!(results[0].location.as_deref(), Some("Somewhere"));
        assert_eq!(results[0].range, None);
    }

    #[test]
    fn rows_without_peak_links_are_skipped() {
        let html = r#"<h1>Search Results</h1><table>
            <tr><td>Peak</td><td>No link here</td></tr>
            <tr><td>Peak</td><td><a href="peak.aspx?id=x">Broken</a></td></tr>
            <tr><td>Peak</td><td><a href="peak.aspx?pid=5">Five</a></td></tr>
            <tr><td>Peak</td><td><a href="peak.aspx?pid=5">Five again</a></td></tr>
            </table>"#;
        let results = extract(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Five");
    }

    #[test]
    fn repeated_pids_keep_first_position() {
        let rows: String = ["5", "6", "5", "7", "6"]
            .iter()
            .map(|pid| format!(r#"<tr><td>Peak</td><td><a href="peak.aspx?pid={pid}">P{pid}</a></td></tr>"#))
            .collect();
        let html = format!("<h2>Search Results</h2><table>{rows}</table>");
        let pids: Vec<_> = extract(&html).into_iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec!["5", "6", "7"]);
    }

    #[test]
    fn no_heading_means_no_results() {
        assert!(extract("<table class=gray><tr><td><a href='peak.aspx?pid=1'>x</a></td></tr></table>").is_empty());
        assert!(extract("").is_empty());
    }
}
