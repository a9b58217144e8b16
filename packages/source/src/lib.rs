#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote fetcher for the incident dataset.
//!
//! A [`TableSource`] turns a [`QuerySpec`] into a request URL and returns
//! the response as an untyped [`RawTable`]. [`socrata::SocrataSource`] is the
//! HTTP implementation; tests substitute in-memory sources.
//!
//! Each fetch is a single best-effort attempt unless the endpoint is
//! configured with an explicit [`retry::RetryPolicy`].

pub mod csv_table;
pub mod retry;
pub mod socrata;

use async_trait::async_trait;
use crime_dashboard_soql::QuerySpec;
use crime_dashboard_source_models::RawTable;

pub use retry::RetryPolicy;
pub use socrata::{EndpointConfig, SocrataSource};

/// Errors that can occur while fetching from the remote endpoint.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// The request URL.
        url: String,
    },

    /// CSV decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The payload was not a usable table.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The configured base endpoint is not a valid URL.
    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// A remote tabular query endpoint.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// The exact URL [`fetch_table`](Self::fetch_table) requests for `query`.
    fn request_url(&self, query: &QuerySpec) -> String;

    /// Issues one request for `query` and parses the tabular response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network failure, a non-success status, or
    /// an unparsable payload.
    async fn fetch_table(&self, query: &QuerySpec) -> Result<RawTable, FetchError>;
}
