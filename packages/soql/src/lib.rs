#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed `SoQL` query construction.
//!
//! A [`QuerySpec`] describes one request against a Socrata tabular endpoint
//! as structured clauses (`$select`, `$where`, `$group`, `$order`, `$limit`).
//! Predicates are built from tagged [`Predicate`] variants and string
//! literals are escaped on serialization, so category values containing
//! quotes cannot corrupt a filter.
//!
//! The [`shapes`] module holds one builder per aggregation shape the
//! dashboard needs. Nothing in this crate touches the network.

pub mod expr;
pub mod predicate;
pub mod shapes;

use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use expr::{Direction, Expr, OrderBy, OrderTarget, Selection};
pub use predicate::{Comparison, Literal, Predicate};

/// Errors raised while building a query. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A count-like parameter was zero.
    #[error("{parameter} must be positive, got {value}")]
    NonPositive {
        /// Parameter name.
        parameter: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A parameter fell outside its supported range.
    #[error("{parameter} = {value} is outside the supported range {min}..={max}")]
    OutOfRange {
        /// Parameter name.
        parameter: &'static str,
        /// The rejected value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// A year range whose start is after its end.
    #[error("year range start {start} is after end {end}")]
    InvertedYearRange {
        /// First year.
        start: i32,
        /// Last year.
        end: i32,
    },

    /// A calendar date that does not exist.
    #[error("invalid date {year}-{month:02}-{day:02}")]
    InvalidDate {
        /// Year component.
        year: i32,
        /// Month component.
        month: u32,
        /// Day component.
        day: u32,
    },
}

/// An inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Creates a range covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvertedYearRange`] if `start > end`.
    pub const fn new(start: i32, end: i32) -> Result<Self, BuildError> {
        if start > end {
            return Err(BuildError::InvertedYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First year in the range.
    #[must_use]
    pub const fn start(&self) -> i32 {
        self.start
    }

    /// Last year in the range.
    #[must_use]
    pub const fn end(&self) -> i32 {
        self.end
    }

    /// Whether `year` lies in the range.
    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Whether `other` lies entirely within this range.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// The years in the range, ascending. Reversible for newest-first lists.
    #[must_use]
    pub const fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A recognized `SoQL` clause key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
pub enum Clause {
    /// Projection and aggregation expressions.
    #[strum(serialize = "$select")]
    Select,
    /// Row filter.
    #[strum(serialize = "$where")]
    Where,
    /// Grouping expressions.
    #[strum(serialize = "$group")]
    Group,
    /// Sort order.
    #[strum(serialize = "$order")]
    Order,
    /// Row cap.
    #[strum(serialize = "$limit")]
    Limit,
}

/// A structured request against the tabular endpoint.
///
/// Two specs are equal when their serialized clauses are equal.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    select: Vec<Selection>,
    filter: Option<Predicate>,
    group: Vec<Expr>,
    order: Vec<OrderBy>,
    limit: Option<u32>,
}

impl QuerySpec {
    /// Creates an empty spec (selects everything, no filter).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            select: Vec::new(),
            filter: None,
            group: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Appends a projection.
    #[must_use]
    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.select.push(selection.into());
        self
    }

    /// Sets the row filter, combining with any existing filter by `AND`.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Predicate::and([existing, predicate]),
            None => predicate,
        });
        self
    }

    /// Appends a grouping expression.
    ///
    /// Grouping takes an [`Expr`], which has no alias form, so the grouping
    /// clause always names the underlying expression.
    #[must_use]
    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group.push(expr);
        self
    }

    /// Appends a sort key.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Projections in declaration order.
    #[must_use]
    pub fn selections(&self) -> &[Selection] {
        &self.select
    }

    /// The row filter, if any.
    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    /// Grouping expressions in declaration order.
    #[must_use]
    pub fn grouping(&self) -> &[Expr] {
        &self.group
    }

    /// Sort keys in declaration order.
    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    /// The row cap, if any.
    #[must_use]
    pub const fn row_limit(&self) -> Option<u32> {
        self.limit
    }

    /// Whether the spec aggregates (selects `count(*)`).
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.select.iter().any(|s| s.expr == Expr::CountAll)
    }

    /// Serializes the present clauses in fixed order.
    #[must_use]
    pub fn clauses(&self) -> Vec<(Clause, String)> {
        let mut clauses = Vec::with_capacity(5);

        if !self.select.is_empty() {
            clauses.push((Clause::Select, join(&self.select)));
        }
        if let Some(filter) = &self.filter {
            clauses.push((Clause::Where, filter.to_string()));
        }
        if !self.group.is_empty() {
            clauses.push((Clause::Group, join(&self.group)));
        }
        if !self.order.is_empty() {
            clauses.push((Clause::Order, join(&self.order)));
        }
        if let Some(limit) = self.limit {
            clauses.push((Clause::Limit, limit.to_string()));
        }

        clauses
    }
}

impl PartialEq for QuerySpec {
    fn eq(&self, other: &Self) -> bool {
        self.clauses() == other.clauses()
    }
}

impl Eq for QuerySpec {}

impl Hash for QuerySpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clauses().hash(state);
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
