use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{find_table_by_headers, non_empty, Columns, Missing};
use crate::models::{Peak, PeakListEntry, Route};
use crate::parser::fields::{self, UnitPair};
use crate::parser::markup::{self, Element};

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+total").unwrap());
static VIEWABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+viewable").unwrap());

const KNOWN_COUNTRIES: &[&str] = &["United States", "Canada", "Mexico"];

/// Peak page rows we understand, keyed by normalized label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeakField {
    Elevation,
    Prominence,
    Isolation,
    Coordinates,
    Country,
    State,
    County,
    Ascents,
}

impl PeakField {
    fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "elevation" => PeakField::Elevation,
            "prominence" | "clean prominence" => PeakField::Prominence,
            "true isolation" | "isolation" => PeakField::Isolation,
            "latitude/longitude (wgs84)" | "latitude/longitude" | "coordinates" => PeakField::Coordinates,
            "country" => PeakField::Country,
            "state/province" | "state" | "province" => PeakField::State,
            "county/second level region" | "county" | "second level region" => PeakField::County,
            "ascent info" | "ascents" => PeakField::Ascents,
            _ => return None,
        })
    }

    fn apply(self, peak: &mut Peak, value: &str) {
        match self {
            PeakField::Elevation => {
                let (ft, m) = fields::paired_int(value, UnitPair::Length);
                peak.elevation_ft = peak.elevation_ft.or(ft);
                peak.elevation_m = peak.elevation_m.or(m);
            }
            PeakField::Prominence => {
                let (ft, m) = fields::paired_int(value, UnitPair::Length);
                peak.prominence_ft = peak.prominence_ft.or(ft);
                peak.prominence_m = peak.prominence_m.or(m);
            }
            PeakField::Isolation => {
                let (mi, km) = fields::paired_float(value, UnitPair::Distance);
                peak.isolation_mi = peak.isolation_mi.or(mi);
                peak.isolation_km = peak.isolation_km.or(km);
            }
            PeakField::Coordinates => {
                if peak.latitude.is_none() {
                    if let Some((lat, lon)) = fields::parse_coordinates(value) {
                        peak.latitude = Some(lat);
                        peak.longitude = Some(lon);
                    }
                }
            }
            PeakField::Country => {
                peak.country = peak.country.take().or_else(|| non_empty(value.to_string()));
            }
            PeakField::State => {
                peak.state = peak.state.take().or_else(|| non_empty(value.to_string()));
            }
            PeakField::County => {
                peak.county = peak.county.take().or_else(|| non_empty(value.to_string()));
            }
            PeakField::Ascents => {
                let count = |re: &Regex| {
                    re.captures(value)
                        .and_then(|c| fields::parse_int(&c[1]))
                        .and_then(|n| u32::try_from(n).ok())
                };
                peak.total_ascents = peak.total_ascents.or_else(|| count(&TOTAL_RE));
                peak.viewable_ascents = peak.viewable_ascents.or_else(|| count(&VIEWABLE_RE));
            }
        }
    }
}

pub fn extract(html: &str, pid: &str) -> Result<Peak, Missing> {
    let Some(h1) = markup::first_heading(html, 1) else {
        return Err(Missing(vec!["name"]));
    };

    let (name, state) = match h1.text.rsplit_once(", ") {
        Some((name, state)) => (name.trim().to_string(), non_empty(state.to_string())),
        None => (h1.text.trim().to_string(), None),
    };
    let mut missing = Vec::new();
    if pid.trim().is_empty() {
        missing.push("pid");
    }
    if name.is_empty() {
        missing.push("name");
    }
    if !missing.is_empty() {
        return Err(Missing(missing));
    }

    let mut peak = Peak::new(pid.trim(), name);
    peak.state = state;

    if let Some(h2) = markup::headings(html)
        .into_iter()
        .find(|h| h.level == 2 && h.text.to_lowercase().starts_with("elevation"))
    {
        PeakField::Elevation.apply(&mut peak, &h2.text);
    }

    for table in data_tables(html, h1.end) {
        for row in markup::rows(table.inner) {
            let Some(lv) = fields::label_value(&row) else { continue };
            match PeakField::from_label(&lv.label) {
                Some(field) => field.apply(&mut peak, &lv.value),
                None => debug!(label = %lv.label, "ignoring peak row"),
            }
        }
    }

    if peak.country.is_none() {
        let page = markup::text(html);
        peak.country = KNOWN_COUNTRIES
            .iter()
            .find(|c| page.contains(*c))
            .map(|c| c.to_string());
    }

    peak.routes = routes(html);
    peak.peak_lists = peak_lists(html);
    Ok(peak)
}

/// Every `gray` table on the page, or the first table after the heading
/// when none carry the class.
fn data_tables(html: &str, after_heading: usize) -> Vec<Element<'_>> {
    let tables = markup::tables(html);
    let gray: Vec<_> = tables.iter().filter(|t| t.has_class("gray")).copied().collect();
    if !gray.is_empty() {
        return gray;
    }
    tables
        .into_iter()
        .find(|t| t.start >= after_heading)
        .into_iter()
        .collect()
}

fn routes(html: &str) -> Vec<Route> {
    let is_route_table = |c: &Columns| {
        c.find(|h| h.starts_with("route")).is_some() && c.find(|h| h.contains("trailhead")).is_some()
    };
    let Some(table) = find_table_by_headers(html, is_route_table) else {
        return Vec::new();
    };
    let cols = &table.columns;
    let name_col = cols.find(|h| h.starts_with("route"));
    let th_col = cols.find(|h| h.contains("trailhead") && !h.contains("elev"));
    let th_elev_col = cols.find(|h| (h.contains("trailhead") || h.starts_with("th")) && h.contains("elev"));
    let gain_col = cols.find(|h| h.contains("gain"));
    let dist_col = cols.find(|h| h.contains("distance") || h == "mi");

    table
        .body()
        .iter()
        .filter_map(|row| {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.cells.get(i)).map(|c| c.text());
            let name = non_empty(cell(name_col)?)?;
            Some(Route {
                name,
                trailhead: cell(th_col).and_then(non_empty),
                trailhead_elevation_ft: cell(th_elev_col).and_then(|t| feet(&t)),
                vertical_gain_ft: cell(gain_col).and_then(|t| feet(&t)),
                distance_mi: cell(dist_col).and_then(|t| {
                    fields::paired_float(&t, UnitPair::Distance)
                        .0
                        .or_else(|| fields::parse_float(&t))
                }),
            })
        })
        .collect()
}

fn feet(text: &str) -> Option<i32> {
    fields::paired_int(text, UnitPair::Length)
        .0
        .or_else(|| fields::parse_int(text))
}

fn peak_lists(html: &str) -> Vec<PeakListEntry> {
    let is_list_table = |c: &Columns| {
        c.find(|h| h.contains("list")).is_some() && c.find(|h| h.contains("rank")).is_some()
    };
    let Some(table) = find_table_by_headers(html, is_list_table) else {
        return Vec::new();
    };
    let Some(name_col) = table.columns.find(|h| h.contains("list")) else {
        return Vec::new();
    };
    let rank_col = table.columns.find(|h| h.contains("rank"));

    table
        .body()
        .iter()
        .filter_map(|row| {
            let cell = row.cells.get(name_col)?;
            let link = cell
                .links()
                .into_iter()
                .find(|l| l.href.to_lowercase().contains("list.aspx"));
            let list_name = link
                .as_ref()
                .and_then(|l| non_empty(l.text.clone()))
                .or_else(|| non_empty(cell.text()))?;
            Some(PeakListEntry {
                list_name,
                rank: rank_col
                    .and_then(|i| row.cells.get(i))
                    .and_then(|c| fields::leading_int(&c.text()))
                    .and_then(|r| u32::try_from(r).ok()),
                list_id: link.and_then(|l| fields::query_id(&l.href, "lid")),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/peak_rainier.html").unwrap()
    }

    #[test]
    fn rainier_fixture() {
        let peak = extract(&fixture(), "2296").unwrap();
        assert_eq!(peak.name, "Mount Rainier");
        assert_eq!(peak.state.as_deref(), Some("Washington"));
        assert_eq!(peak.elevation_ft, Some(14411));
        assert_eq!(peak.elevation_m, Some(4392));
        assert_eq!(peak.prominence_ft, Some(13211));
        assert_eq!(peak.prominence_m, Some(4027));
        assert_eq!(peak.isolation_mi, Some(731.09));
        assert_eq!(peak.isolation_km, Some(1176.59));
        assert_eq!(peak.latitude, Some(46.8528));
        assert_eq!(peak.longitude, Some(-121.7604));
        assert_eq!(peak.county.as_deref(), Some("Pierce"));
        assert_eq!(peak.country.as_deref(), Some("United States"));
        assert_eq!(peak.total_ascents, Some(11823));
        assert_eq!(peak.viewable_ascents, Some(6104));
    }

    #[test]
    fn rainier_routes_and_lists() {
        let peak = extract(&fixture(), "2296").unwrap();
        assert_eq!(peak.routes.len(), 2);
        let dc = &peak.routes[0];
        assert_eq!(dc.name, "Disappointment Cleaver");
        assert_eq!(dc.trailhead.as_deref(), Some("Paradise"));
        assert_eq!(dc.trailhead_elevation_ft, Some(5420));
        assert_eq!(dc.vertical_gain_ft, Some(9000));
        assert_eq!(dc.distance_mi, Some(8.2));
        assert_eq!(peak.routes[1].distance_mi, None);

        assert_eq!(peak.peak_lists.len(), 3);
        let first = &peak.peak_lists[0];
        assert_eq!(first.list_name, "Washington Top 100 Peaks");
        assert_eq!(first.rank, Some(1));
        assert_eq!(first.list_id.as_deref(), Some("5003"));
        assert_eq!(peak.peak_lists[2].rank, Some(21));
    }

    #[test]
    fn missing_prominence_row_leaves_rest_intact() {
        let html = fixture();
        let start = html.find("<tr><td>Prominence").unwrap();
        let end = start + html[start..].find("</tr>").unwrap() + "</tr>".len();
        let trimmed = format!("{}{}", &html[..start], &html[end..]);

        let peak = extract(&trimmed, "2296").unwrap();
        assert_eq!(peak.prominence_ft, None);
        assert_eq!(peak.prominence_m, None);
        assert_eq!(peak.elevation_ft, Some(14411));
        assert_eq!(peak.isolation_mi, Some(731.09));
        assert_eq!(peak.county.as_deref(), Some("Pierce"));
        assert_eq!(peak.routes.len(), 2);
    }

    #[test]
    fn heading_only_page() {
        let html = "<html><body><h1>Test Peak, WA</h1><h2>Elevation: 10,000 feet, 3048 meters</h2></body></html>";
        let peak = extract(html, "123").unwrap();
        assert_eq!(peak.pid, "123");
        assert_eq!(peak.name, "Test Peak");
        assert_eq!(peak.state.as_deref(), Some("WA"));
        assert_eq!((peak.elevation_ft, peak.elevation_m), (Some(10000), Some(3048)));
        assert!(peak.routes.is_empty());
    }

    #[test]
    fn unparseable_elevation_is_absent() {
        let html = "<h1>Test Peak, WA</h1><h2>Elevation: invalid feet, meters</h2>";
        let peak = extract(html, "123").unwrap();
        assert_eq!(peak.elevation_ft, None);
        assert_eq!(peak.elevation_m, None);
    }

    #[test]
    fn feet_without_meters_is_not_converted() {
        let html = "<h1>Lone Peak</h1><table class=gray><tr><td>Elevation:</td><td>9,000 ft</td></tr></table>";
        let peak = extract(html, "-7").unwrap();
        assert_eq!(peak.pid, "-7");
        assert_eq!(peak.state, None);
        assert_eq!(peak.elevation_ft, Some(9000));
        assert_eq!(peak.elevation_m, None);
    }

    #[test]
    fn country_rows_and_fallback() {
        let html = "<h1>Test Peak, BC</h1><table class=\"gray\"><tr><td>Country:</td><td>Canada</td></tr></table>";
        assert_eq!(extract(html, "1").unwrap().country.as_deref(), Some("Canada"));

        let html = "<h1>Test Peak, Chihuahua</h1><p>Somewhere in Mexico</p>";
        assert_eq!(extract(html, "1").unwrap().country.as_deref(), Some("Mexico"));
    }

    #[test]
    fn no_heading_is_missing_name() {
        assert_eq!(
            extract("<p>Some content</p>", "1").unwrap_err(),
            Missing(vec!["name"])
        );
        assert!(extract("", "1").is_err());
    }
}
