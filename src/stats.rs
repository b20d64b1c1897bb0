//! Ascent statistics: trailing-window counts, a seasonal window around a
//! reference day, and a month-of-year histogram.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{DateFilterError, PeriodError};
use crate::models::Ascent;

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)([dmy])$").unwrap());

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A span counted back from a reference date, in calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", content = "amount", rename_all = "lowercase")]
pub enum Period {
    Days(u32),
    Months(u32),
    Years(u32),
}

impl Period {
    /// The first day of the span ending at `date`.
    pub fn start_from(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Days(n) => date.checked_sub_days(Days::new(u64::from(n))),
            Period::Months(n) => date.checked_sub_months(Months::new(n)),
            Period::Years(n) => date.checked_sub_months(Months::new(n.checked_mul(12)?)),
        }
    }

    /// Human label such as "Last 3 months" or "Last year".
    pub fn label(self) -> String {
        let (n, unit) = match self {
            Period::Days(n) => (n, "day"),
            Period::Months(n) => (n, "month"),
            Period::Years(n) => (n, "year"),
        };
        if n == 1 {
            format!("Last {unit}")
        } else {
            format!("Last {n} {unit}s")
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Months(n) => write!(f, "{n}m"),
            Period::Years(n) => write!(f, "{n}y"),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_period(s)
    }
}

/// Parse shorthand like `"3m"`, `"1y"` or `"10d"`. Case and surrounding
/// whitespace are ignored.
pub fn parse_period(input: &str) -> Result<Period, PeriodError> {
    let period = input.trim().to_lowercase();
    if period.is_empty() {
        return Err(PeriodError::Empty);
    }
    let caps = PERIOD_RE
        .captures(&period)
        .ok_or_else(|| PeriodError::Invalid(period.clone()))?;
    let n: u32 = caps[1].parse().map_err(|_| PeriodError::Invalid(period.clone()))?;
    Ok(match &caps[2] {
        "d" => Period::Days(n),
        "m" => Period::Months(n),
        _ => Period::Years(n),
    })
}

/// How the seasonal window treats the year of each ascent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeasonalScope {
    /// Month and day only: every year's ascents near the reference day.
    #[default]
    AllYears,
    /// Real distance from the reference date.
    ReferenceYear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsOptions {
    pub reference_date: NaiveDate,
    pub seasonal_window_days: u32,
    pub seasonal_scope: SeasonalScope,
    pub windows: Vec<Period>,
}

pub const DEFAULT_SEASONAL_WINDOW_DAYS: u32 = 14;

impl StatsOptions {
    pub fn new(reference_date: NaiveDate) -> Self {
        StatsOptions {
            reference_date,
            seasonal_window_days: DEFAULT_SEASONAL_WINDOW_DAYS,
            seasonal_scope: SeasonalScope::default(),
            windows: vec![Period::Months(3), Period::Years(1), Period::Years(5)],
        }
    }
}

impl Default for StatsOptions {
    fn default() -> Self {
        StatsOptions::new(chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowCount {
    pub label: String,
    pub period: Period,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AscentStatistics {
    pub total_ascents: usize,
    pub ascents_with_gpx: usize,
    pub ascents_with_trip_reports: usize,
    pub gpx_percent: Option<f64>,
    pub trip_report_percent: Option<f64>,
    pub reference_date: NaiveDate,
    pub seasonal_window_days: u32,
    pub seasonal_scope: SeasonalScope,
    pub trailing: Vec<WindowCount>,
    pub seasonal_count: usize,
    /// Seasonal matches bucketed by month, January first.
    pub seasonal_by_month: [u32; 12],
    /// All ascents with a known month, January first.
    pub monthly: [u32; 12],
}

impl AscentStatistics {
    pub fn to_json(&self) -> Value {
        let by_month = |counts: &[u32; 12]| {
            MONTH_NAMES
                .iter()
                .zip(counts)
                .map(|(month, count)| json!({ "month": month, "count": count }))
                .collect::<Vec<_>>()
        };
        json!({
            "total_ascents": self.total_ascents,
            "ascents_with_gpx": self.ascents_with_gpx,
            "ascents_with_trip_reports": self.ascents_with_trip_reports,
            "gpx_percent": self.gpx_percent,
            "trip_report_percent": self.trip_report_percent,
            "reference_date": self.reference_date.format("%Y-%m-%d").to_string(),
            "trailing": self.trailing.iter().map(|w| json!({
                "label": w.label,
                "period": w.period.to_string(),
                "count": w.count,
            })).collect::<Vec<_>>(),
            "seasonal": {
                "window_days": self.seasonal_window_days,
                "scope": self.seasonal_scope,
                "count": self.seasonal_count,
                "by_month": by_month(&self.seasonal_by_month),
            },
            "monthly_distribution": by_month(&self.monthly),
        })
    }
}

pub fn calculate(ascents: &[Ascent], opts: &StatsOptions) -> AscentStatistics {
    let total = ascents.len();
    let with_gpx = ascents.iter().filter(|a| a.has_gpx).count();
    let with_tr = ascents.iter().filter(|a| a.has_trip_report).count();

    let reference = opts.reference_date;
    let trailing = opts
        .windows
        .iter()
        .map(|&period| {
            let count = match period.start_from(reference) {
                Some(start) => ascents
                    .iter()
                    .filter_map(|a| a.date.resolved())
                    .filter(|d| (start..=reference).contains(d))
                    .count(),
                None => 0,
            };
            WindowCount {
                label: period.label(),
                period,
                count,
            }
        })
        .collect();

    let mut monthly = [0u32; 12];
    for month in ascents.iter().filter_map(|a| a.date.month()) {
        match (month as usize).checked_sub(1).and_then(|i| monthly.get_mut(i)) {
            Some(slot) => *slot += 1,
            None => warn!(month, "ascent month out of range"),
        }
    }

    let mut seasonal_by_month = [0u32; 12];
    let mut seasonal_count = 0;
    for date in ascents.iter().filter_map(|a| a.date.full()) {
        let distance = match opts.seasonal_scope {
            SeasonalScope::AllYears => day_of_year_distance(date, reference),
            SeasonalScope::ReferenceYear => Some((date - reference).num_days().unsigned_abs()),
        };
        if distance.is_some_and(|d| d <= u64::from(opts.seasonal_window_days)) {
            seasonal_count += 1;
            seasonal_by_month[date.month0() as usize] += 1;
        }
    }

    AscentStatistics {
        total_ascents: total,
        ascents_with_gpx: with_gpx,
        ascents_with_trip_reports: with_tr,
        gpx_percent: percent(with_gpx, total),
        trip_report_percent: percent(with_tr, total),
        reference_date: reference,
        seasonal_window_days: opts.seasonal_window_days,
        seasonal_scope: opts.seasonal_scope,
        trailing,
        seasonal_count,
        seasonal_by_month,
        monthly,
    }
}

/// Days between the month/day of `date` and `reference`, ignoring years.
/// The ascent's month/day is tried in the reference year and both
/// neighbours so windows wrap around New Year.
fn day_of_year_distance(date: NaiveDate, reference: NaiveDate) -> Option<u64> {
    (reference.year() - 1..=reference.year() + 1)
        .filter_map(|year| {
            NaiveDate::from_ymd_opt(year, date.month(), date.day())
                .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), date.day() - 1))
        })
        .map(|d| (d - reference).num_days().unsigned_abs())
        .min()
}

fn percent(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64 * 100.0)
    }
}

/// Ascents dated within `[after, before]`, both ends inclusive. Ascents
/// without a usable date are dropped.
pub fn filter_by_date_range(
    ascents: &[Ascent],
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> Vec<Ascent> {
    ascents
        .iter()
        .filter(|a| {
            a.date.resolved().is_some_and(|d| {
                after.map_or(true, |lo| d >= lo) && before.map_or(true, |hi| d <= hi)
            })
        })
        .cloned()
        .collect()
}

/// Date bounds from `--after`/`--before` or a relative `--within` period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateFilter {
    pub fn from_args(
        after: Option<&str>,
        before: Option<&str>,
        within: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, DateFilterError> {
        if let Some(within) = within {
            if after.is_some() || before.is_some() {
                return Err(DateFilterError::Conflicting);
            }
            let period = parse_period(within)?;
            return Ok(DateFilter {
                after: period.start_from(today),
                before: None,
            });
        }

        let filter = DateFilter {
            after: after.map(parse_bound).transpose()?,
            before: before.map(parse_bound).transpose()?,
        };
        if let (Some(after), Some(before)) = (filter.after, filter.before) {
            if after > before {
                return Err(DateFilterError::EmptyRange {
                    after: after.to_string(),
                    before: before.to_string(),
                });
            }
        }
        Ok(filter)
    }

    pub fn is_active(&self) -> bool {
        self.after.is_some() || self.before.is_some()
    }

    pub fn apply(&self, ascents: &[Ascent]) -> Vec<Ascent> {
        if self.is_active() {
            filter_by_date_range(ascents, self.after, self.before)
        } else {
            ascents.to_vec()
        }
    }
}

pub fn parse_bound(text: &str) -> Result<NaiveDate, DateFilterError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| DateFilterError::InvalidDate(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AscentDate, Climber};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ascent(id: &str, date: AscentDate) -> Ascent {
        Ascent::new(id, Climber::default(), date)
    }

    fn dated(dates: &[AscentDate]) -> Vec<Ascent> {
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| ascent(&i.to_string(), *d))
            .collect()
    }

    fn scenario() -> Vec<Ascent> {
        dated(&[
            AscentDate::Year(1951),
            AscentDate::Full(ymd(2020, 7, 10)),
            AscentDate::Full(ymd(2020, 7, 15)),
            AscentDate::Full(ymd(2019, 1, 1)),
        ])
    }

    fn trailing(stats: &AscentStatistics, period: Period) -> usize {
        stats
            .trailing
            .iter()
            .find(|w| w.period == period)
            .map(|w| w.count)
            .unwrap()
    }

    #[test]
    fn end_to_end_scenario() {
        let opts = StatsOptions::new(ymd(2020, 7, 20));
        let stats = calculate(&scenario(), &opts);

        assert_eq!(stats.total_ascents, 4);
        assert_eq!(stats.seasonal_count, 2);
        assert_eq!(stats.seasonal_by_month[6], 2);
        assert_eq!(trailing(&stats, Period::Years(1)), 2);
        assert_eq!(trailing(&stats, Period::Months(3)), 2);
        assert_eq!(trailing(&stats, Period::Years(5)), 3);
        assert_eq!(stats.monthly[6], 2);
        assert_eq!(stats.monthly[0], 1);
        assert_eq!(stats.monthly.iter().sum::<u32>(), 3);
    }

    #[test]
    fn end_to_end_reference_year_scope() {
        let mut opts = StatsOptions::new(ymd(2020, 7, 20));
        opts.seasonal_scope = SeasonalScope::ReferenceYear;
        assert_eq!(calculate(&scenario(), &opts).seasonal_count, 2);
    }

    #[test]
    fn scopes_differ_across_years() {
        let ascents = dated(&[
            AscentDate::Full(ymd(2015, 7, 18)),
            AscentDate::Full(ymd(2020, 7, 22)),
        ]);
        let mut opts = StatsOptions::new(ymd(2020, 7, 20));
        assert_eq!(calculate(&ascents, &opts).seasonal_count, 2);
        opts.seasonal_scope = SeasonalScope::ReferenceYear;
        assert_eq!(calculate(&ascents, &opts).seasonal_count, 1);
    }

    #[test]
    fn seasonal_window_wraps_new_year() {
        let ascents = dated(&[
            AscentDate::Full(ymd(2015, 1, 2)),
            AscentDate::Full(ymd(2018, 12, 20)),
        ]);
        let mut opts = StatsOptions::new(ymd(2020, 12, 30));
        opts.seasonal_window_days = 5;
        let stats = calculate(&ascents, &opts);
        assert_eq!(stats.seasonal_count, 1);
        assert_eq!(stats.seasonal_by_month[0], 1);
        assert_eq!(stats.seasonal_by_month[11], 0);

        let ascents = dated(&[AscentDate::Full(ymd(2021, 1, 2)), AscentDate::Full(ymd(2020, 12, 20))]);
        opts.seasonal_scope = SeasonalScope::ReferenceYear;
        assert_eq!(calculate(&ascents, &opts).seasonal_count, 1);
    }

    #[test]
    fn leap_day_ascent_in_non_leap_reference_year() {
        let ascents = dated(&[AscentDate::Full(ymd(2016, 2, 29))]);
        let mut opts = StatsOptions::new(ymd(2021, 3, 1));
        opts.seasonal_window_days = 1;
        assert_eq!(calculate(&ascents, &opts).seasonal_count, 1);
    }

    #[test]
    fn partial_dates_in_histogram_and_windows() {
        let ascents = dated(&[
            AscentDate::YearMonth { year: 2020, month: 3 },
            AscentDate::Year(2020),
            AscentDate::Unknown,
        ]);
        let opts = StatsOptions::new(ymd(2020, 7, 20));
        let stats = calculate(&ascents, &opts);
        assert_eq!(stats.monthly[2], 1);
        assert_eq!(stats.monthly.iter().sum::<u32>(), 1);
        assert_eq!(stats.seasonal_count, 0);
        // year-only resolves to Jan 1, outside three months
        assert_eq!(trailing(&stats, Period::Months(3)), 0);
        assert_eq!(trailing(&stats, Period::Years(1)), 2);
    }

    #[test]
    fn out_of_range_months_are_not_counted() {
        let ascents = dated(&[
            AscentDate::YearMonth { year: 2020, month: 13 },
            AscentDate::YearMonth { year: 2020, month: 0 },
            AscentDate::YearMonth { year: 2020, month: 12 },
        ]);
        let stats = calculate(&ascents, &StatsOptions::new(ymd(2020, 7, 20)));
        assert_eq!(stats.total_ascents, 3);
        assert_eq!(stats.monthly.iter().sum::<u32>(), 1);
        assert_eq!(stats.monthly[11], 1);
    }

    #[test]
    fn flags_and_percentages() {
        let mut ascents = scenario();
        ascents[0].has_gpx = true;
        ascents[1].has_gpx = true;
        ascents[1].has_trip_report = true;
        let stats = calculate(&ascents, &StatsOptions::new(ymd(2020, 7, 20)));
        assert_eq!(stats.ascents_with_gpx, 2);
        assert_eq!(stats.ascents_with_trip_reports, 1);
        assert_eq!(stats.gpx_percent, Some(50.0));
        assert_eq!(stats.trip_report_percent, Some(25.0));
    }

    #[test]
    fn empty_input_is_zeroed() {
        let stats = calculate(&[], &StatsOptions::new(ymd(2020, 7, 20)));
        assert_eq!(stats.total_ascents, 0);
        assert_eq!(stats.gpx_percent, None);
        assert_eq!(stats.trip_report_percent, None);
        assert!(stats.trailing.iter().all(|w| w.count == 0));
        assert_eq!(stats.monthly, [0; 12]);

        let v = stats.to_json();
        assert!(v["gpx_percent"].is_null());
        assert_eq!(v["monthly_distribution"][0]["month"], "January");
        assert_eq!(v["seasonal"]["scope"], "all-years");
    }

    #[test]
    fn periods() {
        assert_eq!(parse_period("3m"), Ok(Period::Months(3)));
        assert_eq!(parse_period(" 1Y "), Ok(Period::Years(1)));
        assert_eq!(parse_period("10d"), Ok(Period::Days(10)));
        assert_eq!(parse_period(""), Err(PeriodError::Empty));
        assert_eq!(parse_period("   "), Err(PeriodError::Empty));
        assert!(matches!(parse_period("3w"), Err(PeriodError::Invalid(_))));
        assert!(matches!(parse_period("m3"), Err(PeriodError::Invalid(_))));
        assert!(matches!(parse_period("-1d"), Err(PeriodError::Invalid(_))));
        assert_eq!(Period::Months(3).to_string(), "3m");
        assert_eq!(Period::Years(1).label(), "Last year");
        assert_eq!(Period::Years(5).label(), "Last 5 years");
    }

    #[test]
    fn calendar_month_arithmetic() {
        assert_eq!(Period::Months(1).start_from(ymd(2024, 3, 31)), Some(ymd(2024, 2, 29)));
        assert_eq!(Period::Years(1).start_from(ymd(2024, 2, 29)), Some(ymd(2023, 2, 28)));
        assert_eq!(Period::Days(10).start_from(ymd(2024, 1, 5)), Some(ymd(2023, 12, 26)));
    }

    #[test]
    fn date_range_is_inclusive_and_drops_undated() {
        let ascents = dated(&[
            AscentDate::Full(ymd(2024, 1, 1)),
            AscentDate::Full(ymd(2024, 6, 15)),
            AscentDate::Full(ymd(2024, 12, 31)),
            AscentDate::Year(2023),
            AscentDate::Unknown,
        ]);
        let kept = filter_by_date_range(&ascents, Some(ymd(2024, 1, 1)), Some(ymd(2024, 6, 15)));
        assert_eq!(kept.len(), 2);
        assert_eq!(filter_by_date_range(&ascents, None, Some(ymd(2023, 12, 31))).len(), 1);
        assert_eq!(filter_by_date_range(&ascents, None, None).len(), 4);
    }

    #[test]
    fn date_filter_from_args() {
        let today = ymd(2024, 6, 15);
        let f = DateFilter::from_args(None, None, Some("3m"), today).unwrap();
        assert_eq!(f.after, Some(ymd(2024, 3, 15)));
        assert_eq!(f.before, None);

        let f = DateFilter::from_args(Some("2024-01-01"), Some("2024-02-01"), None, today).unwrap();
        assert!(f.is_active());
        assert!(!DateFilter::default().is_active());

        assert_eq!(
            DateFilter::from_args(Some("2024-01-01"), None, Some("1y"), today),
            Err(DateFilterError::Conflicting)
        );
        assert!(matches!(
            DateFilter::from_args(Some("01/02/2024"), None, None, today),
            Err(DateFilterError::InvalidDate(_))
        ));
        assert!(matches!(
            DateFilter::from_args(Some("2024-03-01"), Some("2024-02-01"), None, today),
            Err(DateFilterError::EmptyRange { .. })
        ));
        assert_eq!(
            DateFilter::from_args(None, None, Some("soon"), today),
            Err(DateFilterError::Period(PeriodError::Invalid("soon".into())))
        );
    }
}
