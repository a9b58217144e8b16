//! The five dashboard recipes.
//!
//! Every recipe follows the same sequence: validate parameters, build the
//! query specs, consult the recipe's cache, fetch on a miss, and reduce the
//! response. Requests within one recipe run one after another.

use std::sync::Arc;

use crime_dashboard_analytics_models::{
    AggregateResult, CategoryCount, GeoSample, MonthCount, Recipe, YearCategoryCount, YearCount,
};
use crime_dashboard_cleaning::{clean, parse_count};
use crime_dashboard_soql::{BuildError, QuerySpec, YearRange, shapes};
use crime_dashboard_source::{FetchError, SocrataSource, TableSource};
use crime_dashboard_source_models::{KnownColumn, RawRow, RawTable};

use crate::RecipeError;
use crate::cache::{CacheStats, ResultCache};
use crate::config::{DashboardConfig, ParameterRange};

/// One cache per recipe, keyed by that recipe's parameters.
#[derive(Debug)]
pub struct RecipeCaches {
    yearly: ResultCache<YearRange, AggregateResult<YearCount>>,
    monthly: ResultCache<i32, AggregateResult<MonthCount>>,
    top_categories: ResultCache<(i32, u32), AggregateResult<CategoryCount>>,
    trend: ResultCache<(YearRange, u32), AggregateResult<YearCategoryCount>>,
    geo: ResultCache<(i32, u32), GeoSample>,
}

impl Default for RecipeCaches {
    fn default() -> Self {
        Self {
            yearly: ResultCache::new(Recipe::YearlyTotals.into()),
            monthly: ResultCache::new(Recipe::MonthlyTotals.into()),
            top_categories: ResultCache::new(Recipe::TopCategories.into()),
            trend: ResultCache::new(Recipe::CategoryTrend.into()),
            geo: ResultCache::new(Recipe::GeoSample.into()),
        }
    }
}

impl RecipeCaches {
    /// Counters for one recipe's cache.
    #[must_use]
    pub fn stats(&self, recipe: Recipe) -> CacheStats {
        match recipe {
            Recipe::YearlyTotals => self.yearly.stats(),
            Recipe::MonthlyTotals => self.monthly.stats(),
            Recipe::TopCategories => self.top_categories.stats(),
            Recipe::CategoryTrend => self.trend.stats(),
            Recipe::GeoSample => self.geo.stats(),
        }
    }

    /// Drops every stored result.
    pub fn clear(&self) {
        self.yearly.clear();
        self.monthly.clear();
        self.top_categories.clear();
        self.trend.clear();
        self.geo.clear();
    }
}

/// Entry point for the dashboard views.
///
/// Owns its caches, so results are shared for as long as the `Dashboard`
/// lives and discarded with it.
pub struct Dashboard {
    source: Arc<dyn TableSource>,
    config: DashboardConfig,
    years: YearRange,
    caches: RecipeCaches,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("years", &self.years)
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Creates a dashboard reading from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Config`] if `config` fails validation.
    pub fn new(source: Arc<dyn TableSource>, config: DashboardConfig) -> Result<Self, RecipeError> {
        config.validate()?;
        let years = config.year_range()?;

        Ok(Self {
            source,
            config,
            years,
            caches: RecipeCaches::default(),
        })
    }

    /// Creates a dashboard reading from the configured Socrata endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn connect(config: DashboardConfig) -> Result<Self, RecipeError> {
        let source = SocrataSource::new(&config.endpoint)?;
        Self::new(Arc::new(source), config)
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Supported years.
    #[must_use]
    pub const fn years(&self) -> YearRange {
        self.years
    }

    /// Per-recipe cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> Vec<(Recipe, CacheStats)> {
        Recipe::all()
            .iter()
            .map(|recipe| (*recipe, self.caches.stats(*recipe)))
            .collect()
    }

    /// Drops every cached result.
    pub fn clear_cache(&self) {
        self.caches.clear();
    }

    /// Incident count for every supported year, ordered by year.
    ///
    /// Years whose count cannot be read are left out.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError`] if a query cannot be built or a request fails.
    pub async fn yearly_totals(&self) -> Result<Arc<AggregateResult<YearCount>>, RecipeError> {
        let years = self.years;

        self.caches
            .yearly
            .get_or_compute(years, || async move {
                let mut result = AggregateResult {
                    rows: Vec::new(),
                    request_urls: Vec::new(),
                };

                for year in years.years() {
                    let query = shapes::yearly_count(year)?;
                    let table = self.fetch(&query, &mut result.request_urls).await?;
                    match scalar_count(&table) {
                        Some(count) => result.rows.push(YearCount { year, count }),
                        None => log::warn!("No usable count for {year}; leaving it out"),
                    }
                }

                Ok::<_, RecipeError>(result)
            })
            .await
    }

    /// Incident count for each month of `year`, ordered by month.
    ///
    /// Months whose count cannot be read are left out.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutOfRange`] if `year` is unsupported, or
    /// [`RecipeError::Fetch`] if a request fails.
    pub async fn monthly_totals(
        &self,
        year: i32,
    ) -> Result<Arc<AggregateResult<MonthCount>>, RecipeError> {
        self.check_year("year", year)?;

        self.caches
            .monthly
            .get_or_compute(year, || async move {
                let mut result = AggregateResult {
                    rows: Vec::with_capacity(12),
                    request_urls: Vec::with_capacity(12),
                };

                for month in 1..=12 {
                    let query = shapes::monthly_count(year, month)?;
                    let table = self.fetch(&query, &mut result.request_urls).await?;
                    match scalar_count(&table) {
                        Some(count) => result.rows.push(MonthCount { month, count }),
                        None => log::warn!("No usable count for {year}-{month:02}; leaving it out"),
                    }
                }

                Ok::<_, RecipeError>(result)
            })
            .await
    }

    /// The `top_n` most frequent categories in `year`, by count descending.
    ///
    /// Counts come from the server. Rows with no category or an unreadable
    /// count are left out.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutOfRange`] if `year` or `top_n` is unsupported,
    /// or [`RecipeError::Fetch`] if the request fails.
    pub async fn top_categories(
        &self,
        year: i32,
        top_n: u32,
    ) -> Result<Arc<AggregateResult<CategoryCount>>, RecipeError> {
        self.check_year("year", year)?;
        check_parameter("top_n", top_n, &self.config.limits.top_n)?;

        self.caches
            .top_categories
            .get_or_compute((year, top_n), || async move {
                let query = shapes::top_categories(year, top_n)?;
                let mut request_urls = Vec::with_capacity(1);
                let table = self.fetch(&query, &mut request_urls).await?;

                let rows = table.rows().filter_map(|row| category_count(&row)).collect();
                Ok::<_, RecipeError>(AggregateResult { rows, request_urls })
            })
            .await
    }

    /// Per-year counts of the `top_n` leading categories over `years`.
    ///
    /// The leading categories are ranked over the whole range first, then
    /// counted per year. If the ranking returns no categories the second
    /// request is skipped and the result is empty. Pairs with no incidents
    /// are absent rather than zero.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutOfRange`] if `years` or `top_n` is
    /// unsupported, or [`RecipeError::Fetch`] if a request fails.
    pub async fn category_trend(
        &self,
        years: YearRange,
        top_n: u32,
    ) -> Result<Arc<AggregateResult<YearCategoryCount>>, RecipeError> {
        self.check_year("start_year", years.start())?;
        self.check_year("end_year", years.end())?;
        check_parameter("top_n", top_n, &self.config.limits.top_n)?;

        self.caches
            .trend
            .get_or_compute((years, top_n), || async move {
                let mut request_urls = Vec::with_capacity(2);

                let leading = shapes::leading_categories(years, top_n)?;
                let table = self.fetch(&leading, &mut request_urls).await?;
                let categories: Vec<String> = table
                    .rows()
                    .filter_map(|row| row.get(KnownColumn::PrimaryType))
                    .filter(|category| !category.is_empty())
                    .map(str::to_owned)
                    .collect();

                let Some(trend) = shapes::category_trend(years, &categories)? else {
                    log::info!("No leading categories for {years}; skipping trend query");
                    return Ok::<_, RecipeError>(AggregateResult {
                        rows: Vec::new(),
                        request_urls,
                    });
                };

                let table = self.fetch(&trend, &mut request_urls).await?;
                let mut rows: Vec<YearCategoryCount> = table
                    .rows()
                    .filter_map(|row| year_category_count(&row))
                    .collect();
                rows.sort_by_key(|row| row.year);

                Ok::<_, RecipeError>(AggregateResult { rows, request_urls })
            })
            .await
    }

    /// The `limit` most recent incidents of `year` that have coordinates,
    /// cleaned.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutOfRange`] if `year` or `limit` is unsupported,
    /// or [`RecipeError::Fetch`] if the request fails.
    pub async fn geo_sample(&self, year: i32, limit: u32) -> Result<Arc<GeoSample>, RecipeError> {
        self.check_year("year", year)?;
        check_parameter("limit", limit, &self.config.limits.sample_limit)?;

        self.caches
            .geo
            .get_or_compute((year, limit), || async move {
                let query = shapes::geo_sample(year, limit)?;
                let request_url = self.source.request_url(&query);
                let table = self.source.fetch_table(&query).await?;

                let cleaned = clean(&table, &self.config.bounds);
                let mut records = cleaned.records;
                let before = records.len();
                records.retain(|record| record.location.is_some());
                if records.len() < before {
                    log::warn!(
                        "Dropped {} sampled records without coordinates",
                        before - records.len()
                    );
                }

                Ok::<_, RecipeError>(GeoSample {
                    records,
                    report: cleaned.report,
                    request_url,
                })
            })
            .await
    }

    async fn fetch(
        &self,
        query: &QuerySpec,
        request_urls: &mut Vec<String>,
    ) -> Result<RawTable, FetchError> {
        request_urls.push(self.source.request_url(query));
        self.source.fetch_table(query).await
    }

    fn check_year(&self, parameter: &'static str, year: i32) -> Result<(), BuildError> {
        if self.years.contains(year) {
            return Ok(());
        }
        Err(BuildError::OutOfRange {
            parameter,
            value: i64::from(year),
            min: i64::from(self.years.start()),
            max: i64::from(self.years.end()),
        })
    }
}

fn check_parameter(
    parameter: &'static str,
    value: u32,
    range: &ParameterRange,
) -> Result<(), BuildError> {
    if range.contains(value) {
        return Ok(());
    }
    Err(BuildError::OutOfRange {
        parameter,
        value: i64::from(value),
        min: i64::from(range.min),
        max: i64::from(range.max),
    })
}

fn scalar_count(table: &RawTable) -> Option<u64> {
    table
        .first_row()
        .and_then(|row| row.get(KnownColumn::Count))
        .and_then(parse_count)
}

fn category_count(row: &RawRow<'_>) -> Option<CategoryCount> {
    let category = row
        .get(KnownColumn::PrimaryType)
        .filter(|c| !c.is_empty())?;
    let count = row.get(KnownColumn::Count).and_then(parse_count)?;
    Some(CategoryCount {
        category: category.to_owned(),
        count,
    })
}

fn year_category_count(row: &RawRow<'_>) -> Option<YearCategoryCount> {
    let year = row
        .get(KnownColumn::Year)
        .and_then(parse_count)
        .and_then(|y| i32::try_from(y).ok())?;
    let CategoryCount { category, count } = category_count(row)?;
    Some(YearCategoryCount {
        year,
        category,
        count,
    })
}
