//! `$where` predicate construction.
//!
//! Filters are assembled from tagged variants and rendered to `SoQL` only on
//! [`Display`](std::fmt::Display), which is where string literals get quoted
//! and escaped.

use std::fmt;

use chrono::NaiveDateTime;
use crime_dashboard_source_models::KnownColumn;

/// Timestamp literal format accepted by the endpoint (floating timestamp).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A literal value embedded in a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// A string. Rendered single-quoted with embedded quotes doubled.
    Text(String),
    /// A floating timestamp. Rendered as a quoted ISO string.
    Timestamp(NaiveDateTime),
    /// An integer.
    Integer(i64),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "'{}'", escape_text(text)),
            Self::Timestamp(ts) => write!(f, "'{}'", ts.format(TIMESTAMP_FORMAT)),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// Escapes a string for use inside a single-quoted `SoQL` literal.
#[must_use]
pub fn escape_text(text: &str) -> String {
    text.replace('\'', "''")
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A boolean filter over columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `column between low and high` (inclusive on both ends).
    Between {
        /// Filtered column.
        column: KnownColumn,
        /// Lower bound.
        low: Literal,
        /// Upper bound.
        high: Literal,
    },
    /// `column <op> value`.
    Compare {
        /// Filtered column.
        column: KnownColumn,
        /// Operator.
        op: Comparison,
        /// Right-hand side.
        value: Literal,
    },
    /// `column IN (values...)`.
    In {
        /// Filtered column.
        column: KnownColumn,
        /// Accepted values.
        values: Vec<Literal>,
    },
    /// `column IS NOT NULL`.
    IsNotNull(KnownColumn),
    /// Conjunction of all children.
    And(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction of `parts`, flattening nested conjunctions.
    ///
    /// A single part is returned unwrapped.
    #[must_use]
    pub fn and(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Self::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }

        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::And(flat)
        }
    }

    /// `column between low and high`.
    #[must_use]
    pub fn between(column: KnownColumn, low: impl Into<Literal>, high: impl Into<Literal>) -> Self {
        Self::Between {
            column,
            low: low.into(),
            high: high.into(),
        }
    }

    /// `column <op> value`.
    #[must_use]
    pub fn compare(column: KnownColumn, op: Comparison, value: impl Into<Literal>) -> Self {
        Self::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    /// `column IN (values...)`.
    #[must_use]
    pub fn one_of<I, L>(column: KnownColumn, values: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Self::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Between { column, low, high } => {
                write!(f, "{} between {low} and {high}", column.as_ref())
            }
            Self::Compare { column, op, value } => {
                write!(f, "{} {} {value}", column.as_ref(), op.symbol())
            }
            Self::In { column, values } => {
                write!(f, "{} IN (", column.as_ref())?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    value.fmt(f)?;
                }
                f.write_str(")")
            }
            Self::IsNotNull(column) => write!(f, "{} IS NOT NULL", column.as_ref()),
            Self::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    if matches!(child, Self::And(_)) {
                        write!(f, "({child})")?;
                    } else {
                        child.fmt(f)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn escapes_quotes_in_text_literals() {
        assert_eq!(Literal::from("THEFT").to_string(), "'THEFT'");
        assert_eq!(
            Literal::from("O'HARE'); DROP").to_string(),
            "'O''HARE''); DROP'"
        );
    }

    #[test]
    fn renders_timestamps_without_fraction() {
        assert_eq!(
            Literal::from(ts(2021, 1, 1, 0, 0, 0)).to_string(),
            "'2021-01-01T00:00:00'"
        );
    }

    #[test]
    fn renders_between_and_compare() {
        let between = Predicate::between(
            KnownColumn::Date,
            ts(2021, 1, 1, 0, 0, 0),
            ts(2021, 12, 31, 23, 59, 59),
        );
        assert_eq!(
            between.to_string(),
            "date between '2021-01-01T00:00:00' and '2021-12-31T23:59:59'"
        );

        let lt = Predicate::compare(KnownColumn::Date, Comparison::Lt, ts(2022, 1, 1, 0, 0, 0));
        assert_eq!(lt.to_string(), "date < '2022-01-01T00:00:00'");
    }

    #[test]
    fn renders_membership_with_escaping() {
        let p = Predicate::one_of(KnownColumn::PrimaryType, ["THEFT", "CRIM'L DAMAGE"]);
        assert_eq!(p.to_string(), "primary_type IN ('THEFT', 'CRIM''L DAMAGE')");
    }

    #[test]
    fn and_flattens_and_unwraps() {
        let single = Predicate::and([Predicate::IsNotNull(KnownColumn::Latitude)]);
        assert_eq!(single, Predicate::IsNotNull(KnownColumn::Latitude));

        let nested = Predicate::and([
            Predicate::and([
                Predicate::IsNotNull(KnownColumn::Latitude),
                Predicate::IsNotNull(KnownColumn::Longitude),
            ]),
            Predicate::IsNotNull(KnownColumn::Id),
        ]);
        match &nested {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert_eq!(
            nested.to_string(),
            "latitude IS NOT NULL AND longitude IS NOT NULL AND id IS NOT NULL"
        );
    }

    #[test]
    fn integer_literals_are_bare() {
        let p = Predicate::compare(KnownColumn::Year, Comparison::Ge, Literal::Integer(2018));
        assert_eq!(p.to_string(), "year >= 2018");
    }
}
