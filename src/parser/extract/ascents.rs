use tracing::debug;

use super::{find_table_by_headers, non_empty, Columns};
use crate::models::{Ascent, Climber};
use crate::parser::fields;
use crate::parser::markup::{Cell, Row};

/// Where each known column sits in this page's ascent table. Layouts range
/// from 8 to 14 columns, so nothing beyond climber and date is assumed.
#[derive(Debug, Clone, Copy)]
struct AscentColumns {
    climber: usize,
    date: usize,
    kind: Option<usize>,
    gps: Option<usize>,
    words: Option<usize>,
    route: Option<usize>,
}

impl AscentColumns {
    fn map(cols: &Columns) -> Option<Self> {
        let climber = cols.find(|h| h.starts_with("climber"))?;
        let date = cols.find(|h| h.contains("date"))?;
        if climber == date {
            return None;
        }
        Some(AscentColumns {
            climber,
            date,
            kind: cols.find(|h| h == "type"),
            gps: cols.find(|h| h == "gps" || h == "gpx"),
            words: cols.find(|h| h.contains("words")),
            route: cols.find(|h| h == "route"),
        })
    }
}

/// `None` when the page has no ascent table at all; an empty list when the
/// table exists but no row carries both a climber and an ascent link.
pub fn extract(html: &str, pid: &str) -> Option<Vec<Ascent>> {
    let Some(table) = find_table_by_headers(html, |c| AscentColumns::map(c).is_some()) else {
        debug!(pid, "no ascent table");
        return None;
    };
    let layout = AscentColumns::map(&table.columns)?;
    let peak_id = non_empty(pid.to_string());

    let mut ascents = Vec::new();
    for (i, row) in table.body().iter().enumerate() {
        match parse_row(row, layout) {
            Some(mut ascent) => {
                ascent.peak.id = peak_id.clone();
                ascents.push(ascent);
            }
            None if row.cells.len() > 1 => debug!(row = i, "skipping ascent row"),
            None => {}
        }
    }
    debug!(pid, count = ascents.len(), "parsed ascent list");
    Some(ascents)
}

fn parse_row(row: &Row, layout: AscentColumns) -> Option<Ascent> {
    let climber_cell = row.cells.get(layout.climber)?;
    let climber_link = climber_cell
        .links()
        .into_iter()
        .find(|l| fields::query_id(&l.href, "cid").is_some())?;
    let climber = Climber {
        name: non_empty(climber_link.text.clone())?,
        id: fields::query_id(&climber_link.href, "cid"),
    };

    let date_cell = row.cells.get(layout.date)?;
    let (ascent_id, date_text) = date_cell
        .links()
        .into_iter()
        .find_map(|l| fields::query_id(&l.href, "aid").map(|id| (id, l.text)))?;

    let mut ascent = Ascent::new(ascent_id, climber, fields::parse_date(&date_text));
    let cell = |idx: Option<usize>| idx.and_then(|i| row.cells.get(i));

    ascent.ascent_type = cell(layout.kind).and_then(|c| non_empty(c.text()));
    ascent.route = cell(layout.route).and_then(|c| non_empty(c.text()));
    ascent.has_gpx = cell(layout.gps).is_some_and(marks_present);

    let words = cell(layout.words)
        .and_then(|c| fields::leading_int(&c.text()))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n > 0);
    ascent.trip_report.words = words;
    ascent.has_trip_report = words.is_some();

    Some(ascent)
}

/// GPS cells hold an icon or a short marker when a track was uploaded.
fn marks_present(cell: &Cell) -> bool {
    cell.has_image() || !cell.text().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AscentDate;
    use chrono::NaiveDate;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/ascents_rainier.html").unwrap()
    }

    #[test]
    fn fourteen_column_fixture() {
        let ascents = extract(&fixture(), "2296").unwrap();
        assert_eq!(ascents.len(), 4);

        let first = &ascents[0];
        assert_eq!(first.ascent_id, "1000003");
        assert_eq!(first.climber.name, "Dana Whitaker");
        assert_eq!(first.climber.id.as_deref(), Some("501"));
        assert_eq!(
            first.date,
            AscentDate::Full(NaiveDate::from_ymd_opt(2023, 7, 15).unwrap())
        );
        assert_eq!(first.ascent_type.as_deref(), Some("Successful Summit Attained"));
        assert_eq!(first.route.as_deref(), Some("Disappointment Cleaver"));
        assert!(first.has_gpx);
        assert!(first.has_trip_report);
        assert_eq!(first.trip_report.words, Some(412));
        assert_eq!(first.peak.id.as_deref(), Some("2296"));
        assert!(first.gpx.is_empty());
        assert_eq!(first.trip_report.text, None);

        let old = &ascents[3];
        assert_eq!(old.date, AscentDate::Year(1951));
        assert!(!old.has_gpx);
        assert!(!old.has_trip_report);
        assert_eq!(old.route, None);
    }

    #[test]
    fn nested_icon_tables_do_not_shift_columns() {
        let ascents = extract(&fixture(), "2296").unwrap();
        // second row has a nested table in the route icons column
        let second = &ascents[1];
        assert_eq!(second.ascent_id, "1000002");
        assert_eq!(second.route.as_deref(), Some("Emmons Glacier"));
        assert_eq!(second.trip_report.words, None);
        assert!(!second.has_trip_report);
    }

    #[test]
    fn eight_column_layout_without_gps() {
        let html = r#"<table class="gray">
            <tr><th>Climber</th><th>Ascent Date</th><th>Type</th><th>TR-Words</th><th>Route</th><th>Gain-Ft</th><th>Route Icons</th><th>Gear Icons</th></tr>
            <tr><td><a href="climber.aspx?cid=7">Ana</a></td><td><a href="ascent.aspx?aid=70">2010-06</a></td>
                <td>Attempt</td><td>55</td><td>West Buttress</td><td>13,000</td><td></td><td></td></tr>
            </table>"#;
        let ascents = extract(html, "271").unwrap();
        assert_eq!(ascents.len(), 1);
        let a = &ascents[0];
        assert_eq!(a.date, AscentDate::YearMonth { year: 2010, month: 6 });
        assert_eq!(a.ascent_type.as_deref(), Some("Attempt"));
        assert_eq!(a.route.as_deref(), Some("West Buttress"));
        assert!(!a.has_gpx);
        assert_eq!(a.trip_report.words, Some(55));
    }

    #[test]
    fn header_after_spacer_row() {
        let html = r#"<table>
            <tr><td>&nbsp;</td></tr>
            <tr><th>Climber</th><th>Ascent Date</th></tr>
            <tr><td><a href="climber.aspx?cid=456">John Doe</a></td><td><a href="ascent.aspx?aid=123">2024-01-01</a></td></tr>
            </table>"#;
        let ascents = extract(html, "1").unwrap();
        assert_eq!(ascents.len(), 1);
        assert_eq!(ascents[0].ascent_id, "123");
        assert_eq!(ascents[0].climber.id.as_deref(), Some("456"));
    }

    #[test]
    fn rows_missing_links_are_dropped() {
        let rows = [
            r#"<td>No Link Here</td><td><a href="ascent.aspx?aid=123">2024-01-01</a></td>"#,
            r#"<td><a href="climber.aspx?cid=456">John Doe</a></td><td>No Link</td>"#,
            r#"<td><a href="climber.aspx?cid=456">John Doe</a></td><td><a href="ascent.aspx?id=invalid">2024-01-01</a></td>"#,
        ];
        for row in rows {
            let html = format!(
                "<table><tr><td>&nbsp;</td></tr><tr><th>Climber</th><th>Ascent Date</th></tr><tr>{row}</tr></table>"
            );
            assert_eq!(extract(&html, "1"), Some(vec![]), "{row}");
        }
    }

    #[test]
    fn no_table_is_none() {
        assert_eq!(extract("<html><body><p>No ascents</p></body></html>", "1"), None);
        let unrelated = "<table><tr><th>Name</th><th>Elevation</th></tr></table>";
        assert_eq!(extract(unrelated, "1"), None);
    }
}
