//! Projection, grouping, and ordering expressions.

use std::fmt;

use crime_dashboard_source_models::KnownColumn;

/// A `SoQL` value expression.
///
/// Has no alias form. Aliases live on [`Selection`], so `$group`, which takes
/// bare expressions, can only name expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A plain column reference.
    Column(KnownColumn),
    /// `count(*)`.
    CountAll,
    /// `date_extract_y(<column>)`.
    YearOf(KnownColumn),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(column) => f.write_str(column.as_ref()),
            Self::CountAll => f.write_str("count(*)"),
            Self::YearOf(column) => write!(f, "date_extract_y({})", column.as_ref()),
        }
    }
}

/// One entry of the `$select` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    /// The projected expression.
    pub expr: Expr,
    /// Output column name, if renamed.
    pub alias: Option<KnownColumn>,
}

impl Selection {
    /// Projects `expr` under the name `alias`.
    #[must_use]
    pub const fn aliased(expr: Expr, alias: KnownColumn) -> Self {
        Self {
            expr,
            alias: Some(alias),
        }
    }

    /// The column name this selection produces in the response header.
    #[must_use]
    pub const fn output_column(&self) -> Option<KnownColumn> {
        match (self.alias, self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Column(column)) => Some(column),
            (None, _) => None,
        }
    }
}

impl From<Expr> for Selection {
    fn from(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alias {
            Some(alias) => write!(f, "{} as {}", self.expr, alias.as_ref()),
            None => self.expr.fmt(f),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// What a sort key refers to.
///
/// Unlike `$group`, `$order` accepts select aliases, which the top-N shapes
/// use to sort by the `cnt` alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderTarget {
    /// An expression.
    Expr(Expr),
    /// A select alias.
    Alias(KnownColumn),
}

/// One entry of the `$order` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Sort key.
    pub target: OrderTarget,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderBy {
    /// Ascending sort on `target`.
    #[must_use]
    pub const fn asc(target: OrderTarget) -> Self {
        Self {
            target,
            direction: Direction::Asc,
        }
    }

    /// Descending sort on `target`.
    #[must_use]
    pub const fn desc(target: OrderTarget) -> Self {
        Self {
            target,
            direction: Direction::Desc,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            OrderTarget::Expr(expr) => expr.fmt(f)?,
            OrderTarget::Alias(alias) => f.write_str(alias.as_ref())?,
        }
        match self.direction {
            Direction::Asc => f.write_str(" asc"),
            Direction::Desc => f.write_str(" desc"),
        }
    }
}
