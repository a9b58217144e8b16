//! Query builders for each aggregation shape the dashboard renders.
//!
//! Every date window is half-open: `>= start` and `< first instant after the
//! window`. Year windows end at the next Jan 1 and month windows at the first
//! of the next month, so December rolls into the following year and
//! fractional seconds on Dec 31 land in the same year for every shape.

use chrono::{NaiveDate, NaiveDateTime};
use crime_dashboard_source_models::KnownColumn;

use crate::{
    BuildError, Comparison, Expr, OrderBy, OrderTarget, Predicate, QuerySpec, Selection, YearRange,
};

/// Expression the trend query groups and sorts by. Selected under the
/// [`KnownColumn::Year`] alias.
pub const YEAR_EXPR: Expr = Expr::YearOf(KnownColumn::Date);

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime, BuildError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(BuildError::InvalidDate { year, month, day })
}

fn next_year(year: i32) -> Result<i32, BuildError> {
    year.checked_add(1).ok_or(BuildError::InvalidDate {
        year,
        month: 12,
        day: 31,
    })
}

fn half_open(start: NaiveDateTime, end: NaiveDateTime) -> Predicate {
    Predicate::and([
        Predicate::compare(KnownColumn::Date, Comparison::Ge, start),
        Predicate::compare(KnownColumn::Date, Comparison::Lt, end),
    ])
}

const fn positive(parameter: &'static str, value: u32) -> Result<u32, BuildError> {
    if value == 0 {
        return Err(BuildError::NonPositive {
            parameter,
            value: 0,
        });
    }
    Ok(value)
}

const fn count_selection() -> Selection {
    Selection::aliased(Expr::CountAll, KnownColumn::Count)
}

/// Half-open window from Jan 1 of the first year to Jan 1 after the last.
///
/// # Errors
///
/// Returns [`BuildError::InvalidDate`] if a boundary is not representable.
pub fn years_window(years: YearRange) -> Result<Predicate, BuildError> {
    Ok(half_open(
        midnight(years.start(), 1, 1)?,
        midnight(next_year(years.end())?, 1, 1)?,
    ))
}

/// Half-open window covering every timestamp in `year`.
///
/// # Errors
///
/// Returns [`BuildError::InvalidDate`] if a boundary is not representable.
pub fn year_window(year: i32) -> Result<Predicate, BuildError> {
    years_window(YearRange::new(year, year)?)
}

/// Half-open `[start, end)` bounds of one calendar month.
///
/// # Errors
///
/// Returns [`BuildError::OutOfRange`] if `month` is not 1-12, or
/// [`BuildError::InvalidDate`] if a boundary is not representable.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDateTime, NaiveDateTime), BuildError> {
    if !(1..=12).contains(&month) {
        return Err(BuildError::OutOfRange {
            parameter: "month",
            value: i64::from(month),
            min: 1,
            max: 12,
        });
    }

    let start = midnight(year, month, 1)?;
    let end = if month == 12 {
        midnight(next_year(year)?, 1, 1)?
    } else {
        midnight(year, month + 1, 1)?
    };

    Ok((start, end))
}

/// Scalar `count(*) as cnt` over one year.
///
/// # Errors
///
/// Returns [`BuildError`] if the year window cannot be built.
pub fn yearly_count(year: i32) -> Result<QuerySpec, BuildError> {
    Ok(QuerySpec::new()
        .select(count_selection())
        .filter(year_window(year)?))
}

/// Scalar `count(*) as cnt` over one month.
///
/// # Errors
///
/// Returns [`BuildError`] if `month` is not 1-12.
pub fn monthly_count(year: i32, month: u32) -> Result<QuerySpec, BuildError> {
    let (start, end) = month_bounds(year, month)?;

    Ok(QuerySpec::new()
        .select(count_selection())
        .filter(half_open(start, end)))
}

fn ranked_categories(window: Predicate, top_n: u32) -> Result<QuerySpec, BuildError> {
    let top_n = positive("top_n", top_n)?;

    Ok(QuerySpec::new()
        .select(Expr::Column(KnownColumn::PrimaryType))
        .select(count_selection())
        .filter(window)
        .group_by(Expr::Column(KnownColumn::PrimaryType))
        .order_by(OrderBy::desc(OrderTarget::Alias(KnownColumn::Count)))
        .limit(top_n))
}

/// The `top_n` categories of one year, by count descending.
///
/// # Errors
///
/// Returns [`BuildError::NonPositive`] if `top_n` is zero.
pub fn top_categories(year: i32, top_n: u32) -> Result<QuerySpec, BuildError> {
    ranked_categories(year_window(year)?, top_n)
}

/// First query of the trend chain: the `top_n` categories over the whole
/// multi-year window.
///
/// # Errors
///
/// Returns [`BuildError::NonPositive`] if `top_n` is zero.
pub fn leading_categories(years: YearRange, top_n: u32) -> Result<QuerySpec, BuildError> {
    ranked_categories(years_window(years)?, top_n)
}

/// Second query of the trend chain: counts grouped by (year, category),
/// restricted to `categories`.
///
/// Returns `Ok(None)` when `categories` is empty, meaning no second query is
/// needed. Duplicate categories are collapsed, keeping first-seen order.
///
/// # Errors
///
/// Returns [`BuildError`] if the year window cannot be built.
pub fn category_trend(
    years: YearRange,
    categories: &[String],
) -> Result<Option<QuerySpec>, BuildError> {
    let mut unique: Vec<&str> = Vec::with_capacity(categories.len());
    for category in categories {
        if !unique.contains(&category.as_str()) {
            unique.push(category);
        }
    }

    if unique.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        QuerySpec::new()
            .select(Selection::aliased(YEAR_EXPR, KnownColumn::Year))
            .select(Expr::Column(KnownColumn::PrimaryType))
            .select(count_selection())
            .filter(years_window(years)?)
            .filter(Predicate::one_of(KnownColumn::PrimaryType, unique))
            .group_by(YEAR_EXPR)
            .group_by(Expr::Column(KnownColumn::PrimaryType))
            .order_by(OrderBy::asc(OrderTarget::Expr(YEAR_EXPR))),
    ))
}

/// Row-level point sample for one year: the `limit` most recent incidents
/// that have coordinates.
///
/// # Errors
///
/// Returns [`BuildError::NonPositive`] if `limit` is zero.
pub fn geo_sample(year: i32, limit: u32) -> Result<QuerySpec, BuildError> {
    let limit = positive("limit", limit)?;

    Ok(QuerySpec::new()
        .select(Expr::Column(KnownColumn::Id))
        .select(Expr::Column(KnownColumn::Date))
        .select(Expr::Column(KnownColumn::PrimaryType))
        .select(Expr::Column(KnownColumn::Latitude))
        .select(Expr::Column(KnownColumn::Longitude))
        .filter(year_window(year)?)
        .filter(Predicate::IsNotNull(KnownColumn::Latitude))
        .filter(Predicate::IsNotNull(KnownColumn::Longitude))
        .order_by(OrderBy::desc(OrderTarget::Expr(Expr::Column(
            KnownColumn::Date,
        ))))
        .limit(limit))
}
