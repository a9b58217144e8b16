#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types returned by the dashboard recipes.
//!
//! Every result carries the verbatim request URLs that produced it, so a
//! view can be reproduced against the endpoint without the dashboard.

use crime_dashboard_cleaning::CleaningReport;
use crime_dashboard_source_models::CleanRecord;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// A named dashboard view.
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
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Recipe {
    /// One scalar count per supported year.
    YearlyTotals,
    /// Twelve scalar counts for one year.
    MonthlyTotals,
    /// The most frequent categories of one year.
    TopCategories,
    /// Per-year counts of the leading categories over a range of years.
    CategoryTrend,
    /// Cleaned point-level records for one year.
    GeoSample,
}

impl Recipe {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::YearlyTotals,
            Self::MonthlyTotals,
            Self::TopCategories,
            Self::CategoryTrend,
            Self::GeoSample,
        ]
    }
}

/// Incident count for one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCount {
    /// Calendar year.
    pub year: i32,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for one month of a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCount {
    /// Month, 1-12.
    pub month: u32,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category name as returned by the endpoint.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
}

/// Incident count for one (year, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCategoryCount {
    /// Calendar year.
    pub year: i32,
    /// Category name as returned by the endpoint.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
}

/// A reduced table plus the requests that produced it.
///
/// An empty `rows` is a valid outcome (nothing matched), distinct from a
/// fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult<T> {
    /// Result rows in the recipe's documented order.
    pub rows: Vec<T>,
    /// Request URLs issued, in issue order.
    pub request_urls: Vec<String>,
}

impl<T> AggregateResult<T> {
    /// Whether no rows matched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Cleaned point-level records for the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSample {
    /// Records with coordinates, most recent first.
    pub records: Vec<CleanRecord>,
    /// What cleaning dropped from the fetched rows.
    pub report: CleaningReport,
    /// The request URL issued.
    pub request_url: String,
}

impl GeoSample {
    /// Whether no records survived.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
