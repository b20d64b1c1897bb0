use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{non_empty, Missing};
use crate::models::{Ascent, AscentDate, Climber, TripReport};
use crate::parser::fields::{self, LabeledRow, UnitPair};
use crate::parser::markup::{self, Element, Heading};

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Ascent of (.+?)(?: on (.+))?$").unwrap());
static TRIP_REPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(h[1-6]|b|strong)\b[^>]*>\s*Trip\s+Report\b[^<]*</(?:h[1-6]|b|strong)\s*>").unwrap()
});
static EXTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)External\s+(?:Trip\s+Report|Link)\s*:?\s*(?:</[a-z]+\s*>\s*)*(?:<a\b[^>]*?href\s*=\s*["']?([^"'\s>]+)[^>]*>.*?</a\s*>|(https?://[^\s<"']+))"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AscentField {
    Date,
    Kind,
    Peak,
    Location,
    Elevation,
    Route,
    Gain,
    Distance,
    Duration,
    Gpx,
}

impl AscentField {
    fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "date" | "ascent date" => AscentField::Date,
            "ascent type" | "type" => AscentField::Kind,
            "peak" => AscentField::Peak,
            "location" => AscentField::Location,
            "elevation" => AscentField::Elevation,
            "route" | "route name" => AscentField::Route,
            "elevation gain" | "gain" | "total elevation gain" => AscentField::Gain,
            "distance" | "total distance" => AscentField::Distance,
            "duration" | "total time" => AscentField::Duration,
            "gpx" | "gps track" | "gpx file" => AscentField::Gpx,
            _ => return None,
        })
    }
}

/// Fields collected so far. Only [`Draft::finish`] turns it into an
/// [`Ascent`], and only when the required ones are present.
#[derive(Debug, Default)]
struct Draft {
    climber: Option<Climber>,
    peak_name: Option<String>,
    title_date: AscentDate,
    row_date: AscentDate,
    record: Ascent,
}

impl Draft {
    fn apply(&mut self, field: AscentField, row: &LabeledRow) {
        let value = row.value.as_str();
        let record = &mut self.record;
        match field {
            AscentField::Date => {
                if !self.row_date.is_known() {
                    self.row_date = fields::parse_date(value);
                }
            }
            AscentField::Kind => record.ascent_type = non_empty(value.to_string()),
            AscentField::Peak => {
                let link = row
                    .cell
                    .links()
                    .into_iter()
                    .find(|l| fields::query_id(&l.href, "pid").is_some());
                if let Some(link) = &link {
                    record.peak.id = fields::query_id(&link.href, "pid");
                }
                let name = link.and_then(|l| non_empty(l.text)).or_else(|| non_empty(value.to_string()));
                self.peak_name = self.peak_name.take().or(name);
            }
            AscentField::Location => record.peak.location = non_empty(value.to_string()),
            AscentField::Elevation => {
                let (ft, m) = fields::paired_int(value, UnitPair::Length);
                record.peak.elevation_ft = ft;
                record.peak.elevation_m = m;
            }
            AscentField::Route => record.route = non_empty(value.to_string()),
            AscentField::Gain => {
                record.gpx.elevation_gain_ft = fields::paired_int(value, UnitPair::Length)
                    .0
                    .or_else(|| fields::parse_int(value));
            }
            AscentField::Distance => {
                record.gpx.distance_mi = fields::paired_float(value, UnitPair::Distance)
                    .0
                    .or_else(|| fields::parse_float(value));
            }
            AscentField::Duration => record.gpx.duration_hours = fields::parse_duration_hours(value),
            AscentField::Gpx => {
                if row.cell.links().iter().any(|l| is_track_href(&l.href)) || affirms_track(value) {
                    record.has_gpx = true;
                }
            }
        }
    }

    fn finish(self, aid: &str) -> Result<Ascent, Missing> {
        let mut missing = Vec::new();
        if aid.trim().is_empty() {
            missing.push("ascent_id");
        }
        if self.climber.is_none() {
            missing.push("climber");
        }
        if self.peak_name.is_none() {
            missing.push("peak");
        }
        let (Some(climber), Some(peak_name)) = (self.climber, self.peak_name) else {
            return Err(Missing(missing));
        };
        if !missing.is_empty() {
            return Err(Missing(missing));
        }

        let date = if self.row_date.is_known() {
            self.row_date
        } else {
            self.title_date
        };
        let mut ascent = self.record;
        ascent.ascent_id = aid.trim().to_string();
        ascent.climber = climber;
        ascent.date = date;
        ascent.peak.name = Some(peak_name);
        Ok(ascent)
    }
}

pub fn extract(html: &str, aid: &str) -> Result<Ascent, Missing> {
    let mut draft = Draft::default();

    let h1 = markup::first_heading(html, 1);
    if let Some(h1) = &h1 {
        if let Some(c) = TITLE_RE.captures(&h1.text) {
            draft.peak_name = non_empty(c[1].to_string());
            draft.title_date = c.get(2).map_or(AscentDate::Unknown, |d| fields::parse_date(d.as_str()));
        }
        draft.record.peak.id = markup::links(&html[h1.start..h1.end])
            .iter()
            .find_map(|l| fields::query_id(&l.href, "pid"));
    }
    draft.climber = climber(html);

    let from = h1.as_ref().map_or(0, |h| h.end);
    let Some(table) = detail_table(html, from) else {
        debug!(aid, "no ascent detail table");
        return Err(Missing(vec!["details"]));
    };

    for row in markup::rows(table.inner) {
        let Some(lv) = fields::label_value(&row) else { continue };
        if let Some(field) = AscentField::from_label(&lv.label) {
            draft.apply(field, &lv);
        }
    }

    if markup::links(table.inner).iter().any(|l| is_track_href(&l.href)) {
        draft.record.has_gpx = true;
    }
    draft.record.trip_report = trip_report(html, &table);
    draft.record.has_trip_report =
        draft.record.trip_report.text.is_some() || draft.record.trip_report.url.is_some();

    draft.finish(aid)
}

/// Track downloads: `GPXFile.aspx?aid=..` or a direct `.gpx` file.
fn is_track_href(href: &str) -> bool {
    let href = href.to_lowercase();
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".gpx") || path.contains("gpxfile")
}

/// Row text that reports a track rather than its absence.
fn affirms_track(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    let first = v.split(|c: char| !c.is_alphanumeric()).next().unwrap_or_default();
    !(v.is_empty() || matches!(first, "no" | "none" | "n") || v == "n/a")
}

/// The `Climber:` sub-heading's profile link.
fn climber(html: &str) -> Option<Climber> {
    markup::headings(html)
        .into_iter()
        .filter(|h| h.text.to_lowercase().starts_with("climber"))
        .find_map(|h| {
            let link = markup::links(&html[h.start..h.end])
                .into_iter()
                .find(|l| l.href.to_lowercase().contains("climber.aspx"))?;
            Some(Climber {
                name: non_empty(link.text)?,
                id: fields::query_id(&link.href, "cid"),
            })
        })
}

/// The left-hand details table; older pages lose the width/align markers
/// or the class, so fall back step by step.
fn detail_table(html: &str, from: usize) -> Option<Element<'_>> {
    let candidates: Vec<Element> = markup::tables(html)
        .into_iter()
        .filter(|t| t.start >= from)
        .collect();
    let left_column = |t: &Element| {
        t.has_class("gray")
            && t.attr("width").as_deref() == Some("49%")
            && t.attr("align").is_some_and(|a| a.eq_ignore_ascii_case("left"))
    };
    candidates
        .iter()
        .find(|t| left_column(t))
        .or_else(|| candidates.iter().find(|t| t.has_class("gray")))
        .or_else(|| candidates.first())
        .copied()
}

fn trip_report(html: &str, table: &Element) -> TripReport {
    let in_cell = markup::rows(table.inner)
        .into_iter()
        .flat_map(|r| r.cells)
        .find_map(|c| report_region(c.inner, true));
    let Some(region) = in_cell.or_else(|| report_region(html, false)) else {
        return TripReport::default();
    };

    let (url, body) = match EXTERNAL_LINK_RE.captures(region) {
        Some(c) => {
            let url = c.get(1).or_else(|| c.get(2)).map(|m| markup::decode_entities(m.as_str()));
            let whole = c.get(0).map_or(0..0, |m| m.range());
            (url, format!("{}{}", &region[..whole.start], &region[whole.end..]))
        }
        None => (None, region.to_string()),
    };

    let text = non_empty(markup::paragraphs(&body).join("\n\n"));
    TripReport {
        words: text.as_deref().map(fields::word_count),
        text,
        url,
    }
}

/// Markup after a "Trip Report" marker, up to the next heading of the same
/// level. A bold marker runs to the end of its cell, or to the next heading
/// when searching the whole page.
fn report_region(html: &str, within_cell: bool) -> Option<&str> {
    let caps = TRIP_REPORT_RE.captures(html)?;
    let marker = caps.get(0)?;
    let rest = &html[marker.end()..];
    let level = caps[1]
        .strip_prefix(['h', 'H'])
        .and_then(|l| l.parse::<u8>().ok());

    let stop = |h: &Heading| match level {
        Some(level) => h.level <= level,
        None => !within_cell,
    };
    let end = markup::headings(rest)
        .into_iter()
        .find(|h| stop(h))
        .map_or(rest.len(), |h| h.start);
    Some(&rest[..end])
}
