#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Validation and normalization of raw incident tables.
//!
//! [`clean`] runs five steps over a [`RawTable`]:
//!
//! 1. parse the `date` column, dropping rows that fail;
//! 2. derive year, month, hour, and day of week;
//! 3. if `primary_type` is present, trim and uppercase it, marking blank and
//!    sentinel values absent;
//! 4. if both coordinate columns are present, drop rows whose coordinates do
//!    not parse or fall outside the [`BoundingBox`];
//! 5. if `id` is present, drop later rows repeating an earlier identifier.
//!
//! Malformed rows are never an error. They are counted in the
//! [`CleaningReport`] and excluded.

pub mod bounds;
pub mod parsing;

use std::collections::{BTreeSet, HashSet};

use crime_dashboard_source_models::{CleanRecord, Coordinates, KnownColumn, RawTable};
use serde::{Deserialize, Serialize};

pub use bounds::BoundingBox;
pub use parsing::{
    CalendarFields, normalize_category, parse_coordinate, parse_count, parse_timestamp,
};

/// Layout timestamps are written in by [`CleanedTable::to_raw`].
const RAW_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Whether duplicate identifiers were removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deduplication {
    /// The table had an `id` column and duplicates were removed.
    #[default]
    Applied,
    /// The table had no `id` column, so duplicates could not be detected.
    SkippedNoIdentifier,
}

/// Per-reason counts of rows excluded by [`clean`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    /// Rows in the input table.
    pub input_rows: usize,
    /// Rows kept.
    pub output_rows: usize,
    /// Rows dropped because the timestamp was missing or unparsable.
    pub dropped_unparsable_timestamp: usize,
    /// Rows dropped because a coordinate was missing or non-numeric.
    pub dropped_invalid_coordinates: usize,
    /// Rows dropped because the point fell outside the bounding box.
    pub dropped_out_of_bounds: usize,
    /// Rows dropped as repeats of an earlier identifier.
    pub dropped_duplicates: usize,
    /// Kept rows whose category was blank or a null sentinel.
    pub absent_categories: usize,
    /// Whether deduplication ran.
    pub deduplication: Deduplication,
}

impl CleaningReport {
    /// Total rows excluded for any reason.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped_unparsable_timestamp
            + self.dropped_invalid_coordinates
            + self.dropped_out_of_bounds
            + self.dropped_duplicates
    }
}

/// Output of [`clean`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    /// Surviving records, in input order.
    pub records: Vec<CleanRecord>,
    /// Known columns the source table carried.
    pub columns: BTreeSet<KnownColumn>,
    /// What was dropped and why.
    pub report: CleaningReport,
}

impl CleanedTable {
    /// Renders the records back into a [`RawTable`] carrying the same known
    /// columns as the source (limited to those [`clean`] interprets).
    ///
    /// Cleaning the result again yields the same records.
    #[must_use]
    pub fn to_raw(&self) -> RawTable {
        let columns: Vec<KnownColumn> = [
            KnownColumn::Id,
            KnownColumn::Date,
            KnownColumn::PrimaryType,
            KnownColumn::Latitude,
            KnownColumn::Longitude,
        ]
        .into_iter()
        .filter(|c| *c == KnownColumn::Date || self.columns.contains(c))
        .collect();

        let headers = columns.iter().map(|c| c.as_ref().to_owned()).collect();
        let rows = self
            .records
            .iter()
            .map(|record| columns.iter().map(|c| render_cell(record, *c)).collect())
            .collect();

        RawTable::new(headers, rows)
    }
}

fn render_cell(record: &CleanRecord, column: KnownColumn) -> String {
    match column {
        KnownColumn::Id => record.id.clone().unwrap_or_default(),
        KnownColumn::Date => record.occurred_at.format(RAW_TIMESTAMP_FORMAT).to_string(),
        KnownColumn::PrimaryType => record.category.clone().unwrap_or_default(),
        KnownColumn::Latitude => record
            .location
            .map(|p| p.latitude.to_string())
            .unwrap_or_default(),
        KnownColumn::Longitude => record
            .location
            .map(|p| p.longitude.to_string())
            .unwrap_or_default(),
        KnownColumn::Count | KnownColumn::Year => String::new(),
    }
}

/// Validates and normalizes every row of `table`.
///
/// Pure and deterministic: the same input always yields the same output.
#[must_use]
pub fn clean(table: &RawTable, bounds: &BoundingBox) -> CleanedTable {
    let has_category = table.has(KnownColumn::PrimaryType);
    let has_coordinates = table.has_coordinates();
    let has_id = table.has(KnownColumn::Id);

    let mut report = CleaningReport {
        input_rows: table.len(),
        ..CleaningReport::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        let Some(occurred_at) = row.get(KnownColumn::Date).and_then(parse_timestamp) else {
            report.dropped_unparsable_timestamp += 1;
            continue;
        };
        let calendar = CalendarFields::from_timestamp(&occurred_at);

        let category = if has_category {
            let category = row.get(KnownColumn::PrimaryType).and_then(normalize_category);
            if category.is_none() {
                report.absent_categories += 1;
            }
            category
        } else {
            None
        };

        let location = if has_coordinates {
            let latitude = row.get(KnownColumn::Latitude).and_then(parse_coordinate);
            let longitude = row.get(KnownColumn::Longitude).and_then(parse_coordinate);
            let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
                report.dropped_invalid_coordinates += 1;
                continue;
            };
            let point = Coordinates {
                latitude,
                longitude,
            };
            if !bounds.contains(&point) {
                report.dropped_out_of_bounds += 1;
                continue;
            }
            Some(point)
        } else {
            None
        };

        let id = if has_id {
            row.get(KnownColumn::Id)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
        } else {
            None
        };

        records.push(CleanRecord {
            id,
            occurred_at,
            year: calendar.year,
            month: calendar.month,
            hour: calendar.hour,
            day_of_week: calendar.day_of_week,
            category,
            location,
        });
    }

    if has_id {
        report.dropped_duplicates = dedup_by_id(&mut records);
    } else {
        report.deduplication = Deduplication::SkippedNoIdentifier;
        if !table.is_empty() {
            log::warn!(
                "Table has no '{}' column; duplicate incidents cannot be removed",
                KnownColumn::Id
            );
        }
    }

    report.output_rows = records.len();
    log_report(&report);

    CleanedTable {
        records,
        columns: table.columns(),
        report,
    }
}

/// Removes records whose identifier repeats an earlier record's, keeping the
/// first occurrence. Records without an identifier are always kept.
///
/// Returns the number of records removed.
pub fn dedup_by_id(records: &mut Vec<CleanRecord>) -> usize {
    let before = records.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    records.retain(|record| record.id.as_ref().is_none_or(|id| seen.insert(id.clone())));
    before - records.len()
}

fn log_report(report: &CleaningReport) {
    if report.dropped() > 0 {
        log::warn!(
            "Cleaned {} -> {} rows (timestamp: {}, coordinates: {}, out of bounds: {}, duplicates: {})",
            report.input_rows,
            report.output_rows,
            report.dropped_unparsable_timestamp,
            report.dropped_invalid_coordinates,
            report.dropped_out_of_bounds,
            report.dropped_duplicates,
        );
    } else {
        log::debug!(
            "Cleaned {} rows, none dropped ({} without category)",
            report.input_rows,
            report.absent_categories
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| (*h).to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
    }

    fn full_headers() -> [&'static str; 5] {
        ["id", "date", "primary_type", "latitude", "longitude"]
    }

    #[test]
    fn end_to_end_duplicate_scenario() {
        let table = raw(
            &full_headers(),
            &[
                &["1", "2021-06-15T10:00:00", " theft ", "41.9", "-87.6"],
                &["1", "2021-07-01T00:00:00", "BATTERY", "41.8", "-87.7"],
            ],
        );

        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 1);

        let record = &cleaned.records[0];
        assert_eq!(record.id.as_deref(), Some("1"));
        assert_eq!(record.category.as_deref(), Some("THEFT"));
        assert_eq!(record.month, 6);
        assert_eq!(record.hour, 10);
        assert_eq!(record.year, 2021);
        assert_eq!(
            record.location,
            Some(Coordinates {
                latitude: 41.9,
                longitude: -87.6
            })
        );
        assert_eq!(cleaned.report.dropped_duplicates, 1);
        assert_eq!(cleaned.report.deduplication, Deduplication::Applied);
    }

    #[test]
    fn drops_unparsable_timestamps() {
        let table = raw(
            &["date", "primary_type"],
            &[
                &["2021-06-15T10:00:00", "THEFT"],
                &["garbage", "THEFT"],
                &["", "THEFT"],
                &[],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.report.dropped_unparsable_timestamp, 3);
        assert_eq!(cleaned.report.output_rows, 1);
    }

    #[test]
    fn sentinel_categories_become_absent_not_dropped() {
        let table = raw(
            &["date", "primary_type"],
            &[
                &["2021-06-15T10:00:00", ""],
                &["2021-06-15T11:00:00", "none"],
                &["2021-06-15T12:00:00", "NaN"],
                &["2021-06-15T13:00:00", "assault"],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 4);
        assert_eq!(cleaned.report.absent_categories, 3);
        let categories: Vec<Option<&str>> = cleaned
            .records
            .iter()
            .map(|r| r.category.as_deref())
            .collect();
        assert_eq!(categories, vec![None, None, None, Some("ASSAULT")]);
    }

    #[test]
    fn coordinates_are_filtered_not_clamped() {
        let table = raw(
            &full_headers(),
            &[
                &["1", "2021-06-15T10:00:00", "THEFT", "41.9", "-87.6"],
                &["2", "2021-06-15T10:00:00", "THEFT", "36.6", "-91.7"],
                &["3", "2021-06-15T10:00:00", "THEFT", "", "-87.6"],
                &["4", "2021-06-15T10:00:00", "THEFT", "abc", "-87.6"],
                &["5", "2021-06-15T10:00:00", "THEFT", "42.2", "-87.0"],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        let ids: Vec<&str> = cleaned
            .records
            .iter()
            .filter_map(|r| r.id.as_deref())
            .collect();
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(cleaned.report.dropped_out_of_bounds, 1);
        assert_eq!(cleaned.report.dropped_invalid_coordinates, 2);

        for record in &cleaned.records {
            let point = record.location.unwrap();
            assert!((41.0..=42.2).contains(&point.latitude));
            assert!((-88.5..=-87.0).contains(&point.longitude));
        }
    }

    #[test]
    fn single_coordinate_column_disables_geo_filter() {
        let table = raw(
            &["date", "latitude"],
            &[&["2021-06-15T10:00:00", "10.0"]],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].location, None);
    }

    #[test]
    fn missing_identifier_column_skips_dedup() {
        let table = raw(
            &["date", "primary_type"],
            &[
                &["2021-06-15T10:00:00", "THEFT"],
                &["2021-06-15T10:00:00", "THEFT"],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 2);
        assert_eq!(
            cleaned.report.deduplication,
            Deduplication::SkippedNoIdentifier
        );
        assert_eq!(cleaned.records[0].id, None);
    }

    #[test]
    fn blank_identifiers_are_not_deduplicated() {
        let table = raw(
            &["id", "date"],
            &[
                &["", "2021-06-15T10:00:00"],
                &["", "2021-06-16T10:00:00"],
                &["7", "2021-06-17T10:00:00"],
                &["7", "2021-06-18T10:00:00"],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 3);
        assert_eq!(cleaned.report.dropped_duplicates, 1);
        assert_eq!(cleaned.records[2].occurred_at.to_string(), "2021-06-17 10:00:00");
    }

    #[test]
    fn dedup_runs_after_row_filters() {
        // The first occurrence of id 9 is dropped for its timestamp, so the
        // second one survives.
        let table = raw(
            &["id", "date"],
            &[&["9", "bad"], &["9", "2021-06-18T10:00:00"]],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.report.dropped_duplicates, 0);
        assert_eq!(cleaned.report.dropped_unparsable_timestamp, 1);
    }

    #[test]
    fn preserves_input_order() {
        let table = raw(
            &["id", "date"],
            &[
                &["3", "2023-01-01T00:00:00"],
                &["1", "2021-01-01T00:00:00"],
                &["2", "2022-01-01T00:00:00"],
            ],
        );
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        let years: Vec<i32> = cleaned.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2021, 2022]);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let table = raw(
            &full_headers(),
            &[
                &["1", "2021-06-15T10:00:00.123", " theft ", "41.9", "-87.6"],
                &["1", "2021-06-15T10:00:00", "THEFT", "41.9", "-87.6"],
                &["2", "06/16/2021 01:15:00 PM", "", "41.75", "-87.65"],
                &["3", "bad", "THEFT", "41.9", "-87.6"],
                &["4", "2021-06-17T00:00:00", "nan", "50.0", "-87.6"],
                &["5", "2021-06-18T23:59:59", "robbery", "41.88123456789", "-87.62987654321"],
            ],
        );

        let once = clean(&table, &BoundingBox::CHICAGO);
        let twice = clean(&once.to_raw(), &BoundingBox::CHICAGO);

        assert_eq!(once.records, twice.records);
        assert_eq!(twice.report.dropped(), 0);
    }

    #[test]
    fn to_raw_keeps_source_columns() {
        let table = raw(&["date", "primary_type"], &[&["2021-06-15T10:00:00", "x"]]);
        let rendered = clean(&table, &BoundingBox::CHICAGO).to_raw();
        assert_eq!(rendered.headers(), ["date", "primary_type"]);
        assert!(!rendered.has(KnownColumn::Id));
    }

    #[test]
    fn empty_table_is_valid() {
        let table = raw(&full_headers(), &[]);
        let cleaned = clean(&table, &BoundingBox::CHICAGO);
        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.report, CleaningReport::default());
    }
}
