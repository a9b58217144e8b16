#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line dashboard over the Chicago crime dataset.
//!
//! ```text
//! crime_dashboard yearly
//! crime_dashboard monthly [--year 2024]
//! crime_dashboard top-types [--year 2024] [--top-n 10]
//! crime_dashboard trend [--start 2018] [--end 2024] [--top-n 5]
//! crime_dashboard map [--year 2024] [--limit 20000] [--max-points 25]
//! crime_dashboard overview [--year 2024]
//! ```
//!
//! Global flags: `--config <path>` loads another dataset configuration,
//! `--show-urls` prints the request URLs behind each view, and `--json`
//! prints results as JSON. Running with no subcommand opens a menu.
//!
//! `CRIME_DASHBOARD_ENDPOINT` overrides the dataset URL and
//! `SOCRATA_APP_TOKEN` supplies an application token.

mod interactive;
mod progress;
mod render;
mod views;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_dashboard_analytics::{Dashboard, DashboardConfig};
use crime_dashboard_soql::YearRange;

use crate::views::{Output, View};

#[derive(Parser)]
#[command(
    name = "crime_dashboard",
    about = "Explore Chicago crime counts, categories, and locations"
)]
struct Cli {
    /// Dataset configuration file (TOML); defaults to the built-in Chicago config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the request URLs behind each view
    #[arg(long, global = true)]
    show_urls: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crimes per year across the supported range
    Yearly,
    /// Crimes per month of one year
    Monthly {
        /// Year to show (defaults to the latest supported year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Most frequent crime types of one year
    TopTypes {
        /// Year to show (defaults to the latest supported year)
        #[arg(long)]
        year: Option<i32>,
        /// Number of crime types
        #[arg(long)]
        top_n: Option<u32>,
    },
    /// Yearly counts of the leading crime types
    Trend {
        /// First year (defaults to the first supported year)
        #[arg(long)]
        start: Option<i32>,
        /// Last year (defaults to the last supported year)
        #[arg(long)]
        end: Option<i32>,
        /// Number of crime types to follow
        #[arg(long)]
        top_n: Option<u32>,
    },
    /// Cleaned sample of located incidents
    Map {
        /// Year to sample (defaults to the latest supported year)
        #[arg(long)]
        year: Option<i32>,
        /// Rows to request
        #[arg(long)]
        limit: Option<u32>,
        /// Rows to list in text output
        #[arg(long, default_value = "25")]
        max_points: usize,
    },
    /// Every view for one year
    Overview {
        /// Year to show (defaults to the latest supported year)
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Sample rows listed in text output when not given on the command line.
const DEFAULT_MAX_POINTS: usize = 25;

/// Fills unset subcommand options from the dashboard's configuration.
/// Returns the view and the number of sample rows to list.
fn resolve(
    command: Commands,
    dashboard: &Dashboard,
) -> Result<(View, usize), Box<dyn std::error::Error>> {
    let years = dashboard.years();
    let limits = dashboard.config().limits;
    let latest = years.end();
    let mut max_points = DEFAULT_MAX_POINTS;

    let view = match command {
        Commands::Yearly => View::Yearly,
        Commands::Monthly { year } => View::Monthly {
            year: year.unwrap_or(latest),
        },
        Commands::TopTypes { year, top_n } => View::TopTypes {
            year: year.unwrap_or(latest),
            top_n: top_n.unwrap_or(limits.top_n.default),
        },
        Commands::Trend { start, end, top_n } => View::Trend {
            years: YearRange::new(start.unwrap_or(years.start()), end.unwrap_or(latest))?,
            top_n: top_n.unwrap_or(limits.trend_top_n),
        },
        Commands::Map {
            year,
            limit,
            max_points: points,
        } => {
            max_points = points;
            View::Map {
                year: year.unwrap_or(latest),
                limit: limit.unwrap_or(limits.sample_limit.default),
            }
        }
        Commands::Overview { year } => View::Overview {
            year: year.unwrap_or(latest),
        },
    };

    Ok((view, max_points))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    let config = DashboardConfig::load(cli.config.as_deref())?;
    log::debug!("Using endpoint {}", config.endpoint.base_url);
    let dashboard = Dashboard::connect(config)?;

    let mut output = Output {
        json: cli.json,
        show_urls: cli.show_urls,
        max_points: DEFAULT_MAX_POINTS,
    };

    let Some(command) = cli.command else {
        return interactive::run(&dashboard, &multi, &output).await;
    };

    let (view, max_points) = resolve(command, &dashboard)?;
    output.max_points = max_points;

    views::show(&dashboard, &multi, view, &output).await
}
