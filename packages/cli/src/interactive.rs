//! Menu-driven session over one [`Dashboard`].
//!
//! The dashboard lives for the whole session, so revisiting a view with the
//! same parameters is answered from its cache.

use crime_dashboard_analytics::Dashboard;
use crime_dashboard_analytics::config::ParameterRange;
use crime_dashboard_soql::YearRange;
use dialoguer::{Input, Select};
use indicatif::MultiProgress;

use crate::views::{Output, View, show};

/// Top-level menu entries.
enum MenuItem {
    Yearly,
    Monthly,
    TopTypes,
    Trend,
    Map,
    Overview,
    CacheStats,
    Quit,
}

impl MenuItem {
    const ALL: &[Self] = &[
        Self::Yearly,
        Self::Monthly,
        Self::TopTypes,
        Self::Trend,
        Self::Map,
        Self::Overview,
        Self::CacheStats,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Yearly => "Crimes by year",
            Self::Monthly => "Crimes by month",
            Self::TopTypes => "Top crime types",
            Self::Trend => "Crime type trend",
            Self::Map => "Map sample",
            Self::Overview => "Full overview",
            Self::CacheStats => "Cache statistics",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the menu until the user quits.
///
/// A failed view is reported and the menu is shown again, so the user can
/// retry.
///
/// # Errors
///
/// Returns an error if a prompt cannot be displayed.
pub async fn run(
    dashboard: &Dashboard,
    multi: &MultiProgress,
    output: &Output,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Chicago Crime Dashboard");
    println!();

    let labels: Vec<&str> = MenuItem::ALL.iter().map(MenuItem::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("Choose a view")
            .items(&labels)
            .default(0)
            .interact()?;

        let view = match MenuItem::ALL[idx] {
            MenuItem::Quit => return Ok(()),
            MenuItem::CacheStats => {
                print_cache_stats(dashboard);
                continue;
            }
            MenuItem::Yearly => View::Yearly,
            MenuItem::Monthly => View::Monthly {
                year: pick_year(dashboard)?,
            },
            MenuItem::TopTypes => View::TopTypes {
                year: pick_year(dashboard)?,
                top_n: pick_number("Top N crime types", &dashboard.config().limits.top_n)?,
            },
            MenuItem::Trend => View::Trend {
                years: pick_years(dashboard)?,
                top_n: pick_number(
                    "Categories to follow",
                    &ParameterRange {
                        default: dashboard.config().limits.trend_top_n,
                        ..dashboard.config().limits.top_n
                    },
                )?,
            },
            MenuItem::Map => View::Map {
                year: pick_year(dashboard)?,
                limit: pick_number(
                    "Map sample limit",
                    &dashboard.config().limits.sample_limit,
                )?,
            },
            MenuItem::Overview => View::Overview {
                year: pick_year(dashboard)?,
            },
        };

        println!();
        if let Err(e) = show(dashboard, multi, view, output).await {
            eprintln!("Could not load this view: {e}");
            eprintln!("Pick it again to retry.");
        }
        println!();
    }
}

/// Years newest first, defaulting to the latest.
fn pick_year(dashboard: &Dashboard) -> Result<i32, dialoguer::Error> {
    let years: Vec<i32> = dashboard.years().years().rev().collect();
    let labels: Vec<String> = years.iter().map(ToString::to_string).collect();

    let idx = Select::new()
        .with_prompt("Year")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(years[idx])
}

fn pick_years(dashboard: &Dashboard) -> Result<YearRange, dialoguer::Error> {
    let supported = dashboard.years();
    let start: i32 = Input::new()
        .with_prompt("First year")
        .default(supported.start())
        .validate_with(|year: &i32| -> Result<(), String> {
            if supported.contains(*year) {
                Ok(())
            } else {
                Err(format!("Choose a year in {supported}"))
            }
        })
        .interact_text()?;
    let end: i32 = Input::new()
        .with_prompt("Last year")
        .default(supported.end())
        .validate_with(|year: &i32| -> Result<(), String> {
            if *year >= start && supported.contains(*year) {
                Ok(())
            } else {
                Err(format!("Choose a year in {start}..={}", supported.end()))
            }
        })
        .interact_text()?;

    Ok(YearRange::new(start, end).unwrap_or(supported))
}

fn pick_number(prompt: &str, range: &ParameterRange) -> Result<u32, dialoguer::Error> {
    let range = *range;
    Input::new()
        .with_prompt(format!("{prompt} ({}-{})", range.min, range.max))
        .default(range.default)
        .validate_with(move |value: &u32| -> Result<(), String> {
            if range.contains(*value) {
                Ok(())
            } else {
                Err(format!("Choose a value in {}..={}", range.min, range.max))
            }
        })
        .interact_text()
}

fn print_cache_stats(dashboard: &Dashboard) {
    println!();
    println!("{:<16} {:>6} {:>6} {:>8}", "RECIPE", "HITS", "MISSES", "ENTRIES");
    println!("{}", "-".repeat(39));
    for (recipe, stats) in dashboard.cache_stats() {
        println!(
            "{:<16} {:>6} {:>6} {:>8}",
            recipe.to_string(),
            stats.hits,
            stats.misses,
            stats.entries
        );
    }
    println!();
}
