#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw tabular fetch results and the validated incident record format.
//!
//! A [`RawTable`] is what comes back from the remote query endpoint: a header
//! row plus untyped string cells. It is tagged with the set of
//! [`KnownColumn`]s it carries so downstream code can branch on column
//! presence once instead of probing column names at every step.
//!
//! [`CleanRecord`] is the output of the cleaning pipeline: every record has a
//! parsed timestamp and, when the source table carried coordinates, a
//! location inside the configured bounding box.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A column of the incident dataset that the pipeline knows how to interpret.
///
/// The string form is the exact wire name used both in query clauses and in
/// the CSV header row returned by the endpoint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KnownColumn {
    /// Unique incident identifier, used for deduplication.
    Id,
    /// Incident timestamp.
    Date,
    /// Primary offense category (e.g. `"THEFT"`).
    PrimaryType,
    /// WGS84 latitude.
    Latitude,
    /// WGS84 longitude.
    Longitude,
    /// The `count(*)` alias selected by aggregate queries.
    #[serde(rename = "cnt")]
    #[strum(serialize = "cnt")]
    Count,
    /// The year-extraction alias selected by the trend query.
    Year,
}

impl KnownColumn {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Id,
            Self::Date,
            Self::PrimaryType,
            Self::Latitude,
            Self::Longitude,
            Self::Count,
            Self::Year,
        ]
    }

    /// Resolves a header cell to a known column, if it is one.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        header.trim().parse().ok()
    }
}

/// Untyped result of a remote tabular fetch.
///
/// Cells are kept as strings exactly as received (after trimming). Missing
/// trailing cells in short rows read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    known: BTreeMap<KnownColumn, usize>,
}

impl RawTable {
    /// Creates a table from a header row and data rows, recording which
    /// [`KnownColumn`]s are present.
    ///
    /// When a header appears more than once, the first occurrence wins.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut known = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(column) = KnownColumn::from_header(header) {
                known.entry(column).or_insert(idx);
            }
        }

        Self {
            headers,
            rows,
            known,
        }
    }

    /// Header row as received.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the given column is present in the header row.
    #[must_use]
    pub fn has(&self, column: KnownColumn) -> bool {
        self.known.contains_key(&column)
    }

    /// Whether both coordinate columns are present.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.has(KnownColumn::Latitude) && self.has(KnownColumn::Longitude)
    }

    /// The set of known columns this table carries.
    #[must_use]
    pub fn columns(&self) -> BTreeSet<KnownColumn> {
        self.known.keys().copied().collect()
    }

    /// Iterates the data rows in input order.
    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(|cells| RawRow { table: self, cells })
    }

    /// The first data row, if any. Scalar aggregate responses carry exactly one.
    #[must_use]
    pub fn first_row(&self) -> Option<RawRow<'_>> {
        self.rows.first().map(|cells| RawRow { table: self, cells })
    }
}

/// A borrowed view of one row of a [`RawTable`].
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    table: &'a RawTable,
    cells: &'a [String],
}

impl<'a> RawRow<'a> {
    /// The cell for a known column, or `None` if the column or the cell is
    /// missing.
    #[must_use]
    pub fn get(&self, column: KnownColumn) -> Option<&'a str> {
        let idx = *self.table.known.get(&column)?;
        self.cells.get(idx).map(String::as_str)
    }

    /// The cell for an arbitrary header name.
    #[must_use]
    pub fn get_named(&self, header: &str) -> Option<&'a str> {
        let idx = self.table.headers.iter().position(|h| h == header)?;
        self.cells.get(idx).map(String::as_str)
    }
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A validated, normalized incident row.
///
/// Produced only by the cleaning pipeline. `location` is `Some` exactly when
/// the source table carried both coordinate columns; in that case it lies
/// inside the bounding box the pipeline was configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanRecord {
    /// Source identifier, when the table had an `id` column.
    pub id: Option<String>,
    /// When the incident occurred (dataset-local wall-clock time).
    pub occurred_at: NaiveDateTime,
    /// Calendar year of `occurred_at`.
    pub year: i32,
    /// Month of `occurred_at`, 1-12.
    pub month: u32,
    /// Hour of `occurred_at`, 0-23.
    pub hour: u32,
    /// Day of week of `occurred_at`, 0 = Monday through 6 = Sunday.
    pub day_of_week: u32,
    /// Uppercased, trimmed category. `None` when blank or a null sentinel.
    pub category: Option<String>,
    /// Incident location, when the table had coordinates.
    pub location: Option<Coordinates>,
}
