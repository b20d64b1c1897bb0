//! Plain-text renderings for the terminal. JSON goes through each record's
//! `to_json()` and [`json`].

use serde_json::Value;

use crate::models::{Ascent, Peak, SearchResult};
use crate::stats::{AscentStatistics, MONTH_NAMES};

const MAX_PEAK_LISTS: usize = 10;

pub fn json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn search_results(results: &[SearchResult]) -> String {
    let mut lines = vec![
        format!(
            "{:>8} | {:<32} | {:<16} | {:<24} | {:>8}",
            "PID", "Name", "Location", "Range", "Elev ft"
        ),
        "-".repeat(100),
    ];
    for r in results {
        lines.push(format!(
            "{:>8} | {:<32} | {:<16} | {:<24} | {:>8}",
            r.pid,
            truncate(&r.name, 32),
            truncate(r.location.as_deref().unwrap_or("-"), 16),
            truncate(r.range.as_deref().unwrap_or("-"), 24),
            r.elevation_ft.map(thousands).unwrap_or_else(|| "-".into()),
        ));
    }
    lines.push(format!(
        "\n{} peak(s). Use 'peakbagger peak show <PID>' for details.",
        results.len()
    ));
    lines.join("\n")
}

pub fn peak_detail(peak: &Peak) -> String {
    let title = match &peak.state {
        Some(state) => format!("{}, {}", peak.name, state),
        None => peak.name.clone(),
    };
    let mut lines = vec![title, format!("Peak ID: {}", peak.pid), String::new()];

    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("  {label:<14}{value}"));
        }
    };
    field("Elevation", pair(peak.elevation_ft.map(thousands), peak.elevation_m.map(thousands), "ft", "m"));
    field(
        "Prominence",
        pair(peak.prominence_ft.map(thousands), peak.prominence_m.map(thousands), "ft", "m"),
    );
    field(
        "Isolation",
        pair(
            peak.isolation_mi.map(|v| v.to_string()),
            peak.isolation_km.map(|v| v.to_string()),
            "mi",
            "km",
        ),
    );
    field(
        "Coordinates",
        peak.latitude
            .zip(peak.longitude)
            .map(|(lat, lon)| format!("{lat}, {lon}")),
    );
    field("County", peak.county.clone());
    field("Country", peak.country.clone());
    field(
        "Ascents",
        match (peak.total_ascents, peak.viewable_ascents) {
            (Some(t), Some(v)) => Some(format!("{t} total, {v} viewable")),
            (Some(t), None) => Some(format!("{t} total")),
            (None, Some(v)) => Some(format!("{v} viewable")),
            (None, None) => None,
        },
    );
    field("URL", Some(peak.url()));

    if !peak.routes.is_empty() {
        lines.push(format!("\nRoutes ({})", peak.routes.len()));
        for (i, route) in peak.routes.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, route.name));
            let mut details = Vec::new();
            if let Some(th) = &route.trailhead {
                match route.trailhead_elevation_ft {
                    Some(ft) => details.push(format!("Trailhead: {th} ({} ft)", thousands(ft))),
                    None => details.push(format!("Trailhead: {th}")),
                }
            }
            if let Some(gain) = route.vertical_gain_ft {
                details.push(format!("Gain: {} ft", thousands(gain)));
            }
            if let Some(mi) = route.distance_mi {
                details.push(format!("Distance: {mi} mi"));
            }
            if !details.is_empty() {
                lines.push(format!("     {}", details.join(", ")));
            }
        }
    }

    if !peak.peak_lists.is_empty() {
        lines.push(format!("\nPeak Lists ({} total)", peak.peak_lists.len()));
        for list in peak.peak_lists.iter().take(MAX_PEAK_LISTS) {
            match list.rank {
                Some(rank) => lines.push(format!("  - {} (Rank #{rank})", list.list_name)),
                None => lines.push(format!("  - {}", list.list_name)),
            }
        }
        if peak.peak_lists.len() > MAX_PEAK_LISTS {
            lines.push(format!("  ... and {} more", peak.peak_lists.len() - MAX_PEAK_LISTS));
        }
    }
    lines.join("\n")
}

pub fn ascents_table(ascents: &[Ascent]) -> String {
    let mut lines = vec![
        format!(
            "{:>9} | {:<10} | {:<24} | {:<28} | {:<3} | {:>5}",
            "Ascent", "Date", "Climber", "Route", "GPX", "TR"
        ),
        "-".repeat(94),
    ];
    for a in ascents {
        let date = a.date.to_string();
        lines.push(format!(
            "{:>9} | {:<10} | {:<24} | {:<28} | {:<3} | {:>5}",
            a.ascent_id,
            if date.is_empty() { "-" } else { date.as_str() },
            truncate(&a.climber.name, 24),
            truncate(a.route.as_deref().unwrap_or("-"), 28),
            if a.has_gpx { "yes" } else { "" },
            a.trip_report
                .words
                .map(|w| w.to_string())
                .unwrap_or_else(|| if a.has_trip_report { "yes".into() } else { String::new() }),
        ));
    }
    lines.join("\n")
}

pub fn ascent_detail(ascent: &Ascent) -> String {
    let peak = ascent.peak.name.as_deref().unwrap_or("Unknown peak");
    let mut lines = vec![
        format!("Ascent of {peak}"),
        format!("Ascent ID: {}", ascent.ascent_id),
        String::new(),
    ];
    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("  {label:<14}{value}"));
        }
    };
    field("Climber", Some(ascent.climber.name.clone()));
    field("Date", Some(ascent.date.to_string()).filter(|d| !d.is_empty()));
    field("Type", ascent.ascent_type.clone());
    field("Location", ascent.peak.location.clone());
    field(
        "Elevation",
        pair(
            ascent.peak.elevation_ft.map(thousands),
            ascent.peak.elevation_m.map(thousands),
            "ft",
            "m",
        ),
    );
    field("Route", ascent.route.clone());
    field("Gain", ascent.gpx.elevation_gain_ft.map(|ft| format!("{} ft", thousands(ft))));
    field("Distance", ascent.gpx.distance_mi.map(|mi| format!("{mi} mi")));
    field("Duration", ascent.gpx.duration_hours.map(|h| format!("{h:.1} hours")));
    field("GPX", ascent.has_gpx.then(|| "yes".to_string()));
    field("External", ascent.trip_report.url.clone());
    field("URL", Some(ascent.url()));

    if let Some(text) = &ascent.trip_report.text {
        let words = ascent.trip_report.words.unwrap_or_default();
        lines.push(format!("\nTrip Report ({words} words)\n"));
        lines.push(text.clone());
    }
    lines.join("\n")
}

pub fn statistics(stats: &AscentStatistics) -> String {
    let pct = |p: Option<f64>| p.map(|p| format!(" ({p:.1}%)")).unwrap_or_default();
    let mut lines = vec![
        "Ascent Statistics".to_string(),
        format!("  Total ascents:      {}", stats.total_ascents),
        format!(
            "  With GPX tracks:    {}{}",
            stats.ascents_with_gpx,
            pct(stats.gpx_percent)
        ),
        format!(
            "  With trip reports:  {}{}",
            stats.ascents_with_trip_reports,
            pct(stats.trip_report_percent)
        ),
        format!("\nTrailing windows (as of {})", stats.reference_date),
    ];
    for w in &stats.trailing {
        lines.push(format!("  {:<20}{}", format!("{}:", w.label), w.count));
    }

    lines.push(format!(
        "\nSeasonal window ({} ± {} days): {} ascent(s)",
        stats.reference_date.format("%B %-d"),
        stats.seasonal_window_days,
        stats.seasonal_count
    ));
    for (month, count) in MONTH_NAMES.iter().zip(stats.seasonal_by_month) {
        if count > 0 {
            lines.push(format!("  {month:<10} {count}"));
        }
    }

    lines.push("\nMonthly distribution".to_string());
    let peak_month = stats.monthly.iter().copied().max().unwrap_or(0);
    for (month, count) in MONTH_NAMES.iter().zip(stats.monthly) {
        lines.push(format!("  {month:<10} {count:>5} {}", bar(count, peak_month)));
    }
    lines.join("\n")
}

fn bar(count: u32, max: u32) -> String {
    const WIDTH: u32 = 40;
    if max == 0 {
        return String::new();
    }
    "#".repeat((count * WIDTH).div_ceil(max) as usize)
}

fn pair(a: Option<String>, b: Option<String>, unit_a: &str, unit_b: &str) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a} {unit_a} ({b} {unit_b})")),
        (Some(a), None) => Some(format!("{a} {unit_a}")),
        (None, Some(b)) => Some(format!("{b} {unit_b}")),
        (None, None) => None,
    }
}

/// `14411` becomes `"14,411"`.
pub fn thousands(n: i32) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
