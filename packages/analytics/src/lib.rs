#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation recipes behind the dashboard views.
//!
//! Each recipe on [`recipes::Dashboard`] validates its parameters, builds
//! one or more `SoQL` queries, consults its [`cache::ResultCache`], fetches on
//! a miss, and reduces the response to a typed result that carries the
//! verbatim request URLs.

pub mod cache;
pub mod config;
pub mod recipes;

#[cfg(test)]
mod test_support;

use crime_dashboard_soql::BuildError;
use crime_dashboard_source::FetchError;
use thiserror::Error;

pub use cache::{CacheStats, ResultCache};
pub use config::{ConfigError, DashboardConfig};
pub use recipes::Dashboard;

/// Errors a recipe can return.
///
/// Build and fetch errors are passed through unchanged so callers can tell
/// a rejected parameter from a failed request.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// A parameter was rejected before any request was made.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The remote request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The dashboard could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
