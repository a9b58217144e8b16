//! Runs one dashboard view and prints it.

use crime_dashboard_analytics::Dashboard;
use crime_dashboard_analytics_models::{
    AggregateResult, CategoryCount, GeoSample, MonthCount, YearCategoryCount, YearCount,
};
use crime_dashboard_soql::YearRange;
use indicatif::MultiProgress;
use serde::Serialize;

use crate::progress::with_spinner;
use crate::render;

/// A view with its parameters resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Crimes per supported year.
    Yearly,
    /// Crimes per month of one year.
    Monthly {
        /// Selected year.
        year: i32,
    },
    /// Leading categories of one year.
    TopTypes {
        /// Selected year.
        year: i32,
        /// Number of categories.
        top_n: u32,
    },
    /// Per-year counts of the leading categories.
    Trend {
        /// Years covered.
        years: YearRange,
        /// Number of categories followed.
        top_n: u32,
    },
    /// Cleaned point sample of one year.
    Map {
        /// Selected year.
        year: i32,
        /// Rows requested.
        limit: u32,
    },
    /// Every view for one year with default parameters.
    Overview {
        /// Selected year.
        year: i32,
    },
}

/// How results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Print JSON instead of text tables.
    pub json: bool,
    /// Print the request URLs behind each view.
    pub show_urls: bool,
    /// Sample rows listed in text mode.
    pub max_points: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Overview<'a> {
    year: i32,
    yearly: &'a AggregateResult<YearCount>,
    monthly: &'a AggregateResult<MonthCount>,
    top_categories: &'a AggregateResult<CategoryCount>,
    trend: &'a AggregateResult<YearCategoryCount>,
    geo_sample: &'a GeoSample,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_urls(output: &Output, urls: &[String]) {
    if output.show_urls {
        print!("{}", render::request_urls(urls));
    }
}

/// Fetches and prints `view`.
///
/// # Errors
///
/// Returns an error if a recipe rejects its parameters, a request fails,
/// or JSON serialization fails.
pub async fn show(
    dashboard: &Dashboard,
    multi: &MultiProgress,
    view: View,
    output: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    match view {
        View::Yearly => {
            let result = with_spinner(multi, "Counting crimes per year", dashboard.yearly_totals())
                .await?;
            if output.json {
                return Ok(print_json(&*result)?);
            }
            println!("Crimes by year, {}", dashboard.years());
            print!("{}", render::yearly(&result));
            print_urls(output, &result.request_urls);
        }
        View::Monthly { year } => {
            let result = with_spinner(
                multi,
                &format!("Counting crimes per month of {year}"),
                dashboard.monthly_totals(year),
            )
            .await?;
            if output.json {
                return Ok(print_json(&*result)?);
            }
            print!("{}", render::monthly(year, &result));
            print_urls(output, &result.request_urls);
        }
        View::TopTypes { year, top_n } => {
            let result = with_spinner(
                multi,
                &format!("Ranking categories for {year}"),
                dashboard.top_categories(year, top_n),
            )
            .await?;
            if output.json {
                return Ok(print_json(&*result)?);
            }
            print!("{}", render::top_categories(year, &result));
            print_urls(output, &result.request_urls);
        }
        View::Trend { years, top_n } => {
            let result = with_spinner(
                multi,
                &format!("Following the top {top_n} categories over {years}"),
                dashboard.category_trend(years, top_n),
            )
            .await?;
            if output.json {
                return Ok(print_json(&*result)?);
            }
            println!("Top {top_n} categories by year, {years}");
            print!("{}", render::trend(&result));
            print_urls(output, &result.request_urls);
        }
        View::Map { year, limit } => {
            let sample = with_spinner(
                multi,
                &format!("Sampling {limit} located incidents from {year}"),
                dashboard.geo_sample(year, limit),
            )
            .await?;
            if output.json {
                return Ok(print_json(&*sample)?);
            }
            print!("{}", render::geo_sample(year, &sample, output.max_points));
            print_urls(output, std::slice::from_ref(&sample.request_url));
        }
        View::Overview { year } => overview(dashboard, multi, year, output).await?,
    }

    Ok(())
}

async fn overview(
    dashboard: &Dashboard,
    multi: &MultiProgress,
    year: i32,
    output: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let limits = dashboard.config().limits;

    let yearly = with_spinner(multi, "Counting crimes per year", dashboard.yearly_totals()).await?;
    let monthly = with_spinner(
        multi,
        "Counting crimes per month",
        dashboard.monthly_totals(year),
    )
    .await?;
    let top = with_spinner(
        multi,
        "Ranking categories",
        dashboard.top_categories(year, limits.top_n.default),
    )
    .await?;
    let trend = with_spinner(
        multi,
        "Following leading categories",
        dashboard.category_trend(dashboard.years(), limits.trend_top_n),
    )
    .await?;
    let sample = with_spinner(
        multi,
        "Sampling located incidents",
        dashboard.geo_sample(year, limits.sample_limit.default),
    )
    .await?;

    if output.json {
        return Ok(print_json(&Overview {
            year,
            yearly: &yearly,
            monthly: &monthly,
            top_categories: &top,
            trend: &trend,
            geo_sample: &sample,
        })?);
    }

    println!("== Crimes by year, {} ==", dashboard.years());
    print!("{}", render::yearly(&yearly));
    print_urls(output, &yearly.request_urls);

    println!("\n== Monthly pattern ==");
    print!("{}", render::monthly(year, &monthly));
    print_urls(output, &monthly.request_urls);

    println!("\n== Category distribution ==");
    print!("{}", render::top_categories(year, &top));
    print_urls(output, &top.request_urls);

    println!("\n== Category trend, {} ==", dashboard.years());
    print!("{}", render::trend(&trend));
    print_urls(output, &trend.request_urls);

    println!("\n== Map sample ==");
    print!("{}", render::geo_sample(year, &sample, output.max_points));
    print_urls(output, std::slice::from_ref(&sample.request_url));

    println!(
        "\nYearly and monthly counts are server-side count(*) over the full dataset. \
         The map uses a sample."
    );

    Ok(())
}
