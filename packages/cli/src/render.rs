//! Plain-text rendering of recipe results.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crime_dashboard_analytics_models::{
    AggregateResult, CategoryCount, GeoSample, MonthCount, YearCategoryCount, YearCount,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Printed in place of a table when a view has no rows.
pub const NO_DATA: &str = "No data returned for this view.";

fn rule(width: usize) -> String {
    "-".repeat(width)
}

/// Crimes per year.
#[must_use]
pub fn yearly(result: &AggregateResult<YearCount>) -> String {
    if result.is_empty() {
        return format!("{NO_DATA}\n");
    }

    let mut out = String::new();
    writeln!(out, "{:<6} {:>12}", "YEAR", "COUNT").unwrap();
    writeln!(out, "{}", rule(19)).unwrap();
    for row in &result.rows {
        writeln!(out, "{:<6} {:>12}", row.year, row.count).unwrap();
    }
    out
}

/// Crimes per month of one year.
#[must_use]
pub fn monthly(year: i32, result: &AggregateResult<MonthCount>) -> String {
    if result.is_empty() {
        return format!("{NO_DATA}\n");
    }

    let mut out = String::new();
    writeln!(out, "Crimes by month, {year}").unwrap();
    writeln!(out, "{:<6} {:>12}", "MONTH", "COUNT").unwrap();
    writeln!(out, "{}", rule(19)).unwrap();
    for row in &result.rows {
        let label = usize::try_from(row.month)
            .ok()
            .and_then(|m| MONTHS.get(m.wrapping_sub(1)))
            .copied()
            .unwrap_or("?");
        writeln!(out, "{label:<6} {:>12}", row.count).unwrap();
    }
    let total: u64 = result.rows.iter().map(|r| r.count).sum();
    writeln!(out, "{}", rule(19)).unwrap();
    writeln!(out, "{:<6} {total:>12}", "TOTAL").unwrap();
    out
}

/// Leading categories of one year.
#[must_use]
pub fn top_categories(year: i32, result: &AggregateResult<CategoryCount>) -> String {
    if result.is_empty() {
        return format!("{NO_DATA}\n");
    }

    let width = result
        .rows
        .iter()
        .map(|r| r.category.len())
        .max()
        .unwrap_or(0)
        .max("CATEGORY".len());

    let mut out = String::new();
    writeln!(out, "Top {} categories, {year}", result.rows.len()).unwrap();
    writeln!(out, "{:<4} {:<width$} {:>10}", "#", "CATEGORY", "COUNT").unwrap();
    writeln!(out, "{}", rule(width + 16)).unwrap();
    for (rank, row) in result.rows.iter().enumerate() {
        writeln!(
            out,
            "{:<4} {:<width$} {:>10}",
            rank + 1,
            row.category,
            row.count
        )
        .unwrap();
    }
    out
}

/// Year-by-category counts as a grid. Pairs the endpoint did not return are
/// shown as zero.
#[must_use]
pub fn trend(result: &AggregateResult<YearCategoryCount>) -> String {
    if result.is_empty() {
        return format!("{NO_DATA}\n");
    }

    let mut categories: Vec<&str> = Vec::new();
    for row in &result.rows {
        if !categories.contains(&row.category.as_str()) {
            categories.push(&row.category);
        }
    }
    let years: BTreeSet<i32> = result.rows.iter().map(|r| r.year).collect();
    let counts: BTreeMap<(i32, &str), u64> = result
        .rows
        .iter()
        .map(|r| ((r.year, r.category.as_str()), r.count))
        .collect();

    let widths: Vec<usize> = categories.iter().map(|c| c.len().max(8)).collect();

    let mut out = String::new();
    write!(out, "{:<6}", "YEAR").unwrap();
    for (category, width) in categories.iter().zip(&widths) {
        write!(out, " {category:>width$}").unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "{}", rule(6 + widths.iter().map(|w| w + 1).sum::<usize>())).unwrap();

    for year in years {
        write!(out, "{year:<6}").unwrap();
        for (category, width) in categories.iter().zip(&widths) {
            let count = counts.get(&(year, *category)).copied().unwrap_or(0);
            write!(out, " {count:>width$}").unwrap();
        }
        writeln!(out).unwrap();
    }
    out
}

/// Cleaning summary plus the first `max_points` sampled records.
#[must_use]
pub fn geo_sample(year: i32, sample: &GeoSample, max_points: usize) -> String {
    let report = &sample.report;
    let mut out = String::new();
    writeln!(
        out,
        "Map sample, {year}: {} of {} fetched rows kept",
        sample.records.len(),
        report.input_rows
    )
    .unwrap();
    writeln!(
        out,
        "  dropped: {} bad timestamp, {} bad coordinates, {} out of bounds, {} duplicate",
        report.dropped_unparsable_timestamp,
        report.dropped_invalid_coordinates,
        report.dropped_out_of_bounds,
        report.dropped_duplicates
    )
    .unwrap();

    if sample.is_empty() {
        writeln!(out, "{NO_DATA}").unwrap();
        return out;
    }

    writeln!(out).unwrap();
    writeln!(
        out,
        "{:<19} {:<3} {:<30} {:>10} {:>11}",
        "OCCURRED", "DAY", "CATEGORY", "LAT", "LON"
    )
    .unwrap();
    writeln!(out, "{}", rule(77)).unwrap();
    for record in sample.records.iter().take(max_points) {
        let Some(point) = record.location else {
            continue;
        };
        let day = usize::try_from(record.day_of_week)
            .ok()
            .and_then(|d| DAYS.get(d))
            .copied()
            .unwrap_or("?");
        writeln!(
            out,
            "{:<19} {day:<3} {:<30} {:>10.5} {:>11.5}",
            record.occurred_at.format("%Y-%m-%d %H:%M:%S"),
            record.category.as_deref().unwrap_or("(none)"),
            point.latitude,
            point.longitude
        )
        .unwrap();
    }
    if sample.records.len() > max_points {
        writeln!(out, "... {} more", sample.records.len() - max_points).unwrap();
    }
    out
}

/// The request URLs behind a view, one per line.
#[must_use]
pub fn request_urls(urls: &[String]) -> String {
    let mut out = String::from("Request URLs:\n");
    for url in urls {
        writeln!(out, "  {url}").unwrap();
    }
    out
}
