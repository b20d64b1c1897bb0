//! Single-value extractors. Each one returns `None` (or
//! [`AscentDate::Unknown`]) instead of failing; callers decide whether a
//! missing value matters.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::markup::{Cell, Row};
use crate::models::AscentDate;

const NUM: &str = r"(-?\d[\d,]*(?:\.\d+)?)";

static INT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d[\d,]*").unwrap());
static FEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*(?:(?:ft|feet|foot)\b|')")).unwrap());
static METERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*(?:m|meters?|metres?)\b")).unwrap());
static MILES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*(?:mi|miles?)\b")).unwrap());
static KM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*(?:km|kilomet(?:er|re)s?)\b")).unwrap());

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static YEAR_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap());

static QUERY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&](\w+)=(-?\d+)\b").unwrap());
static DEC_DEG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)\s*\(\s*Dec\s*Deg\s*\)").unwrap()
});
static LAT_LON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").unwrap());

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}):(\d{1,2})(?::(\d{1,2}))?$").unwrap());
static DURATION_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(days?|d|hours?|hrs?|h|minutes?|mins?)\b").unwrap()
});

/// Integer with optional thousands separators: `"5,341"` gives `5341`.
pub fn parse_int(text: &str) -> Option<i32> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First integer anywhere in the text: `"Rank #12"` gives `12`.
pub fn leading_int(text: &str) -> Option<i32> {
    INT_TOKEN_RE.find(text).and_then(|m| parse_int(m.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPair {
    /// feet / meters
    Length,
    /// miles / kilometers
    Distance,
}

impl UnitPair {
    fn patterns(self) -> (&'static Regex, &'static Regex) {
        match self {
            UnitPair::Length => (&FEET_RE, &METERS_RE),
            UnitPair::Distance => (&MILES_RE, &KM_RE),
        }
    }
}

/// Numbers tagged with each unit of the pair, found independently so a
/// broken half never hides the other one. Works for `"A ft / B m"`,
/// `"A ft, B m"` and `"A feet, B meters"` alike.
pub fn paired_tokens(text: &str, units: UnitPair) -> (Option<&str>, Option<&str>) {
    let (primary, secondary) = units.patterns();
    let first = primary.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());
    let second = secondary.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());
    (first, second)
}

pub fn paired_int(text: &str, units: UnitPair) -> (Option<i32>, Option<i32>) {
    let (a, b) = paired_tokens(text, units);
    (a.and_then(round_int), b.and_then(round_int))
}

pub fn paired_float(text: &str, units: UnitPair) -> (Option<f64>, Option<f64>) {
    let (a, b) = paired_tokens(text, units);
    (a.and_then(parse_float), b.and_then(parse_float))
}

fn round_int(token: &str) -> Option<i32> {
    parse_int(token).or_else(|| parse_float(token).map(|f| f.round() as i32))
}

/// Full date, year-and-month, year alone, or unknown.
pub fn parse_date(text: &str) -> AscentDate {
    let t = text.trim();
    if let Some(c) = ISO_DATE_RE.captures(t) {
        let date = match (c[1].parse(), c[2].parse(), c[3].parse()) {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        };
        return date.map_or(AscentDate::Unknown, AscentDate::Full);
    }
    if let Some(c) = YEAR_MONTH_RE.captures(t) {
        return match (c[1].parse(), c[2].parse::<u32>()) {
            (Ok(year), Ok(month)) if (1..=12).contains(&month) => AscentDate::YearMonth { year, month },
            _ => AscentDate::Unknown,
        };
    }
    if YEAR_RE.is_match(t) {
        return t.parse().map_or(AscentDate::Unknown, AscentDate::Year);
    }
    ["%B %d, %Y", "%b %d, %Y", "%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
        .map_or(AscentDate::Unknown, AscentDate::Full)
}

/// A "label" cell followed by a "value" cell.
#[derive(Debug, Clone)]
pub struct LabeledRow<'a> {
    pub label: String,
    pub value: String,
    pub cell: Cell<'a>,
}

/// Lowercased, colon-stripped, whitespace-collapsed label.
pub fn normalize_label(raw: &str) -> String {
    super::markup::collapse_ws(raw)
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

/// Label/value view of a row with at least two cells. The value is the
/// visible text of the second cell however deeply its markup nests.
pub fn label_value<'a>(row: &Row<'a>) -> Option<LabeledRow<'a>> {
    let [label, value, ..] = row.cells.as_slice() else {
        return None;
    };
    let label = normalize_label(&label.text());
    if label.is_empty() {
        return None;
    }
    Some(LabeledRow {
        label,
        value: value.text(),
        cell: *value,
    })
}

/// Decimal-degree coordinates, preferring the `(Dec Deg)` form.
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let caps = DEC_DEG_RE.captures(text).or_else(|| LAT_LON_RE.captures(text))?;
    let lat: f64 = caps[1].parse().ok()?;
    let lon: f64 = caps[2].parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some((lat, lon))
}

/// Hours from `"4:30"`, `"4.5 hours"`, `"4 Hours 30 Minutes"` or
/// `"2 days 3 hours"`.
pub fn parse_duration_hours(text: &str) -> Option<f64> {
    let t = text.trim();
    if let Some(c) = CLOCK_RE.captures(t) {
        let hours: f64 = c[1].parse().ok()?;
        let minutes: f64 = c[2].parse().ok()?;
        let seconds: f64 = c.get(3).map_or(Ok(0.0), |s| s.as_str().parse()).ok()?;
        return Some(hours + minutes / 60.0 + seconds / 3600.0);
    }

    let mut total = 0.0;
    let mut matched = false;
    for c in DURATION_PART_RE.captures_iter(t) {
        let Ok(value) = c[1].parse::<f64>() else { continue };
        let unit = c[2].to_ascii_lowercase();
        total += match unit.chars().next() {
            Some('d') => value * 24.0,
            Some('h') => value,
            _ => value / 60.0,
        };
        matched = true;
    }
    matched.then_some(total)
}

/// Numeric query parameter such as `pid` in `peak.aspx?pid=-12`.
pub fn query_id(href: &str, key: &str) -> Option<String> {
    QUERY_PARAM_RE
        .captures_iter(href)
        .find(|c| c[1].eq_ignore_ascii_case(key))
        .map(|c| c[2].to_string())
}

pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
