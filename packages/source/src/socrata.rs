//! Socrata SODA endpoint client.
//!
//! Serializes each [`QuerySpec`] clause (`$select`, `$where`, `$group`,
//! `$order`, `$limit`) as a URL-encoded query parameter on the dataset's
//! `.csv` resource URL and decodes the CSV response.

use std::time::Duration;

use async_trait::async_trait;
use crime_dashboard_soql::QuerySpec;
use crime_dashboard_source_models::RawTable;
use serde::Deserialize;

use crate::csv_table::parse_csv;
use crate::retry::{RetryPolicy, get_text};
use crate::{FetchError, TableSource};

/// Header Socrata reads an application token from.
const APP_TOKEN_HEADER: &str = "x-app-token";

/// Connection settings for a Socrata dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Dataset resource URL (e.g.,
    /// `"https://data.cityofchicago.org/resource/ijzp-q8t2.csv"`).
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional application token for higher rate limits.
    #[serde(default)]
    pub app_token: Option<String>,
    /// Retry behaviour. Defaults to a single attempt.
    #[serde(default)]
    pub retry: RetryPolicy,
}

const fn default_timeout_secs() -> u64 {
    120
}

impl EndpointConfig {
    /// Creates a config for `base_url` with default timeout, no token, and no
    /// retries.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            timeout_secs: default_timeout_secs(),
            app_token: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// [`TableSource`] backed by a Socrata dataset.
#[derive(Debug, Clone)]
pub struct SocrataSource {
    client: reqwest::Client,
    base_url: reqwest::Url,
    retry: RetryPolicy,
}

impl SocrataSource {
    /// Creates a source for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the base URL or app token is
    /// malformed, or [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EndpointConfig) -> Result<Self, FetchError> {
        let base_url = parse_endpoint(&config.base_url)?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.app_token {
            let value = reqwest::header::HeaderValue::from_str(token).map_err(|e| {
                FetchError::InvalidEndpoint {
                    url: config.base_url.clone(),
                    message: format!("invalid app token: {e}"),
                }
            })?;
            headers.insert(APP_TOKEN_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry,
        })
    }

    /// The dataset resource URL requests are issued against.
    #[must_use]
    pub const fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }
}

/// Parses and validates an endpoint URL.
///
/// # Errors
///
/// Returns [`FetchError::InvalidEndpoint`] if `url` is not an absolute
/// http(s) URL.
pub fn parse_endpoint(url: &str) -> Result<reqwest::Url, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidEndpoint {
        url: url.to_owned(),
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidEndpoint {
            url: url.to_owned(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(parsed)
}

/// Appends the clauses of `query` to `base` as URL-encoded parameters.
#[must_use]
pub fn build_request_url(base: &reqwest::Url, query: &QuerySpec) -> reqwest::Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        for (clause, value) in query.clauses() {
            pairs.append_pair(clause.as_ref(), &value);
        }
    }
    url
}

#[async_trait]
impl TableSource for SocrataSource {
    fn request_url(&self, query: &QuerySpec) -> String {
        build_request_url(&self.base_url, query).to_string()
    }

    async fn fetch_table(&self, query: &QuerySpec) -> Result<RawTable, FetchError> {
        let url = self.request_url(query);
        log::info!("Fetching {url}");

        let body = get_text(&self.client, &url, &self.retry).await?;
        let table = parse_csv(&body)?;

        log::debug!("Received {} rows ({} bytes)", table.len(), body.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use crime_dashboard_soql::shapes;

    use super::*;

    const CHICAGO: &str = "https://data.cityofchicago.org/resource/ijzp-q8t2.csv";

    #[test]
    fn encodes_clauses_as_query_parameters() {
        let base = parse_endpoint(CHICAGO).unwrap();
        let url = build_request_url(&base, &shapes::top_categories(2023, 10).unwrap());

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "$select".to_string(),
                    "primary_type, count(*) as cnt".to_string()
                ),
                (
                    "$where".to_string(),
                    "date >= '2023-01-01T00:00:00' AND date < '2024-01-01T00:00:00'".to_string()
                ),
                ("$group".to_string(), "primary_type".to_string()),
                ("$order".to_string(), "cnt desc".to_string()),
                ("$limit".to_string(), "10".to_string()),
            ]
        );
        assert!(url.as_str().starts_with(CHICAGO));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn request_url_is_stable() {
        let source = SocrataSource::new(&EndpointConfig::new(CHICAGO)).unwrap();
        let query = shapes::yearly_count(2020).unwrap();
        assert_eq!(source.request_url(&query), source.request_url(&query));
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(FetchError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            parse_endpoint("ftp://example.com/data.csv"),
            Err(FetchError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn rejects_bad_app_token() {
        let mut config = EndpointConfig::new(CHICAGO);
        config.app_token = Some("bad\ntoken".to_string());
        assert!(matches!(
            SocrataSource::new(&config),
            Err(FetchError::InvalidEndpoint { .. })
        ));
    }
}
