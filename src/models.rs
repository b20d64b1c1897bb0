//! Records produced by the page parsers, and their canonical JSON shape.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://www.peakbagger.com";

/// Ascent dates on the site are often only partially known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AscentDate {
    Full(NaiveDate),
    YearMonth { year: i32, month: u32 },
    Year(i32),
    #[default]
    Unknown,
}

impl AscentDate {
    /// The calendar date used for ordering and window checks. Partial dates
    /// resolve to the first day they could denote.
    pub fn resolved(&self) -> Option<NaiveDate> {
        match *self {
            AscentDate::Full(d) => Some(d),
            AscentDate::YearMonth { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            AscentDate::Year(year) => NaiveDate::from_ymd_opt(year, 1, 1),
            AscentDate::Unknown => None,
        }
    }

    /// Month of year (1-12) when the source recorded one.
    pub fn month(&self) -> Option<u32> {
        match *self {
            AscentDate::Full(d) => Some(d.month()),
            AscentDate::YearMonth { month, .. } => Some(month),
            AscentDate::Year(_) | AscentDate::Unknown => None,
        }
    }

    pub fn full(&self) -> Option<NaiveDate> {
        match *self {
            AscentDate::Full(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AscentDate::Unknown)
    }

    /// Most recent first; unknown dates after every known one.
    pub fn cmp_recent_first(&self, other: &Self) -> Ordering {
        match (self.resolved(), other.resolved()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for AscentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AscentDate::Full(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            AscentDate::YearMonth { year, month } => write!(f, "{year:04}-{month:02}"),
            AscentDate::Year(year) => write!(f, "{year:04}"),
            AscentDate::Unknown => Ok(()),
        }
    }
}

impl Serialize for AscentDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_known() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_none()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub name: String,
    pub trailhead: Option<String>,
    pub trailhead_elevation_ft: Option<i32>,
    pub vertical_gain_ft: Option<i32>,
    pub distance_mi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakListEntry {
    pub list_name: String,
    pub rank: Option<u32>,
    pub list_id: Option<String>,
}

impl PeakListEntry {
    pub fn url(&self) -> Option<String> {
        self.list_id
            .as_ref()
            .map(|id| format!("{BASE_URL}/list.aspx?lid={id}"))
    }
}

/// A summit as described by its peak.aspx page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peak {
    pub pid: String,
    pub name: String,
    pub state: Option<String>,
    pub elevation_ft: Option<i32>,
    pub elevation_m: Option<i32>,
    pub prominence_ft: Option<i32>,
    pub prominence_m: Option<i32>,
    pub isolation_mi: Option<f64>,
    pub isolation_km: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub county: Option<String>,
    pub country: Option<String>,
    pub routes: Vec<Route>,
    pub peak_lists: Vec<PeakListEntry>,
    pub total_ascents: Option<u32>,
    pub viewable_ascents: Option<u32>,
}

impl Peak {
    pub fn new(pid: impl Into<String>, name: impl Into<String>) -> Self {
        Peak {
            pid: pid.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn url(&self) -> String {
        format!("{BASE_URL}/peak.aspx?pid={}", self.pid)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "pid": self.pid,
            "name": self.name,
            "state": self.state,
            "elevation": { "feet": self.elevation_ft, "meters": self.elevation_m },
            "prominence": { "feet": self.prominence_ft, "meters": self.prominence_m },
            "isolation": { "miles": self.isolation_mi, "kilometers": self.isolation_km },
            "location": {
                "latitude": self.latitude,
                "longitude": self.longitude,
                "county": self.county,
                "country": self.country,
            },
            "routes": self.routes,
            "peak_lists": self.peak_lists.iter().map(|l| json!({
                "list_name": l.list_name,
                "rank": l.rank,
                "list_id": l.list_id,
                "url": l.url(),
            })).collect::<Vec<_>>(),
            "ascents": { "total": self.total_ascents, "viewable": self.viewable_ascents },
            "url": self.url(),
        })
    }
}

/// One row of a name search. Never upgraded in place; fetch the peak page
/// for a full [`Peak`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub pid: String,
    pub name: String,
    pub url: String,
    pub location: Option<String>,
    pub range: Option<String>,
    pub elevation_ft: Option<i32>,
    pub elevation_m: Option<i32>,
}

impl SearchResult {
    pub fn absolute_url(&self) -> String {
        if self.url.starts_with("http") {
            self.url.clone()
        } else {
            format!("{BASE_URL}/{}", self.url.trim_start_matches('/'))
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "pid": self.pid,
            "name": self.name,
            "location": self.location,
            "range": self.range,
            "elevation": { "feet": self.elevation_ft, "meters": self.elevation_m },
            "url": self.absolute_url(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Climber {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PeakRef {
    pub name: Option<String>,
    pub id: Option<String>,
    pub location: Option<String>,
    pub elevation_ft: Option<i32>,
    pub elevation_m: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GpxMetrics {
    pub elevation_gain_ft: Option<i32>,
    pub distance_mi: Option<f64>,
    pub duration_hours: Option<f64>,
}

impl GpxMetrics {
    pub fn is_empty(&self) -> bool {
        self.elevation_gain_ft.is_none() && self.distance_mi.is_none() && self.duration_hours.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TripReport {
    pub text: Option<String>,
    pub url: Option<String>,
    pub words: Option<u32>,
}

/// One climb. List pages fill only the identity, date, route and flags;
/// detail pages may fill the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ascent {
    pub ascent_id: String,
    pub climber: Climber,
    pub date: AscentDate,
    pub ascent_type: Option<String>,
    pub peak: PeakRef,
    pub route: Option<String>,
    pub gpx: GpxMetrics,
    pub trip_report: TripReport,
    pub has_gpx: bool,
    pub has_trip_report: bool,
}

impl Ascent {
    pub fn new(ascent_id: impl Into<String>, climber: Climber, date: AscentDate) -> Self {
        Ascent {
            ascent_id: ascent_id.into(),
            climber,
            date,
            ..Default::default()
        }
    }

    pub fn url(&self) -> String {
        format!("{BASE_URL}/climber/ascent.aspx?aid={}", self.ascent_id)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "ascent_id": self.ascent_id,
            "climber": self.climber,
            "date": self.date,
            "type": self.ascent_type,
            "peak": self.peak,
            "route": self.route,
            "gpx": self.gpx,
            "trip_report": self.trip_report,
            "has_gpx": self.has_gpx,
            "has_trip_report": self.has_trip_report,
            "url": self.url(),
        })
    }
}
