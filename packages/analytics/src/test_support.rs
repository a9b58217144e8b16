//! In-memory [`TableSource`] that evaluates query specs over fixture rows.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Datelike as _;
use crime_dashboard_cleaning::parse_timestamp;
use crime_dashboard_soql::{
    Comparison, Direction, Expr, Literal, OrderTarget, Predicate, QuerySpec, Selection,
};
use crime_dashboard_source::{FetchError, TableSource};
use crime_dashboard_source_models::{KnownColumn, RawTable};

pub const BASE_URL: &str = "https://example.test/resource/fixture.csv";

/// Serves fixture rows and counts fetches.
#[derive(Debug, Default)]
pub struct InMemorySource {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    fetches: AtomicUsize,
    requested: Mutex<Vec<QuerySpec>>,
    fail: bool,
}

impl InMemorySource {
    pub fn new(fixture: Fixture) -> Arc<Self> {
        Arc::new(Self {
            headers: fixture.headers,
            rows: fixture.rows,
            ..Self::default()
        })
    }

    /// A source whose every fetch fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<QuerySpec> {
        self.requested.lock().unwrap().clone()
    }

    /// Evaluates `query` against the fixture without counting a fetch.
    pub fn evaluate(&self, query: &QuerySpec) -> RawTable {
        let matching: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|cells| {
                query
                    .predicate()
                    .is_none_or(|predicate| self.matches(cells, predicate))
            })
            .collect();

        let mut rows = if query.is_aggregate() {
            self.aggregate(query, &matching)
        } else {
            self.project(query, &matching)
        };

        let headers: Vec<String> = query
            .selections()
            .iter()
            .map(|s| s.output_column().map_or_else(|| s.expr.to_string(), |c| c.to_string()))
            .collect();

        for order in query.ordering().iter().rev() {
            let Some(idx) = sort_column(query.selections(), order.target) else {
                continue;
            };
            rows.sort_by(|a, b| {
                let ord = compare_cells(&a[idx], &b[idx]);
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.row_limit() {
            rows.truncate(limit as usize);
        }

        RawTable::new(headers, rows)
    }

    fn cell<'a>(&self, cells: &'a [String], column: KnownColumn) -> &'a str {
        self.headers
            .iter()
            .position(|h| h == column.as_ref())
            .and_then(|idx| cells.get(idx))
            .map_or("", String::as_str)
    }

    fn eval_expr(&self, cells: &[String], expr: Expr) -> String {
        match expr {
            Expr::Column(column) => self.cell(cells, column).to_string(),
            Expr::YearOf(column) => parse_timestamp(self.cell(cells, column))
                .map(|ts| ts.year().to_string())
                .unwrap_or_default(),
            Expr::CountAll => String::new(),
        }
    }

    fn matches(&self, cells: &[String], predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Between { column, low, high } => {
                let cell = self.cell(cells, *column);
                compare_literal(cell, low).is_some_and(CmpOrdering::is_ge)
                    && compare_literal(cell, high).is_some_and(CmpOrdering::is_le)
            }
            Predicate::Compare { column, op, value } => {
                compare_literal(self.cell(cells, *column), value).is_some_and(|ord| match op {
                    Comparison::Eq => ord.is_eq(),
                    Comparison::Lt => ord.is_lt(),
                    Comparison::Le => ord.is_le(),
                    Comparison::Gt => ord.is_gt(),
                    Comparison::Ge => ord.is_ge(),
                })
            }
            Predicate::In { column, values } => {
                let cell = self.cell(cells, *column);
                values
                    .iter()
                    .any(|v| compare_literal(cell, v).is_some_and(CmpOrdering::is_eq))
            }
            Predicate::IsNotNull(column) => !self.cell(cells, *column).is_empty(),
            Predicate::And(parts) => parts.iter().all(|p| self.matches(cells, p)),
        }
    }

    fn aggregate(&self, query: &QuerySpec, matching: &[&Vec<String>]) -> Vec<Vec<String>> {
        let mut groups: BTreeMap<Vec<String>, u64> = BTreeMap::new();
        if query.grouping().is_empty() {
            groups.insert(vec![], matching.len() as u64);
        } else {
            for cells in matching {
                let key = query
                    .grouping()
                    .iter()
                    .map(|e| self.eval_expr(cells, *e))
                    .collect();
                *groups.entry(key).or_default() += 1;
            }
        }

        groups
            .into_iter()
            .map(|(key, count)| {
                query
                    .selections()
                    .iter()
                    .map(|s| {
                        if s.expr == Expr::CountAll {
                            return count.to_string();
                        }
                        query
                            .grouping()
                            .iter()
                            .position(|g| *g == s.expr)
                            .map(|i| key[i].clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }

    fn project(&self, query: &QuerySpec, matching: &[&Vec<String>]) -> Vec<Vec<String>> {
        matching
            .iter()
            .map(|cells| {
                query
                    .selections()
                    .iter()
                    .map(|s| self.eval_expr(cells, s.expr))
                    .collect()
            })
            .collect()
    }
}

fn sort_column(selections: &[Selection], target: OrderTarget) -> Option<usize> {
    selections.iter().position(|s| match target {
        OrderTarget::Alias(alias) => s.alias == Some(alias),
        OrderTarget::Expr(expr) => s.expr == expr,
    })
}

fn compare_cells(a: &str, b: &str) -> CmpOrdering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
        _ => a.cmp(b),
    }
}

fn compare_literal(cell: &str, literal: &Literal) -> Option<CmpOrdering> {
    match literal {
        Literal::Timestamp(ts) => parse_timestamp(cell).map(|c| c.cmp(ts)),
        Literal::Text(text) => Some(cell.cmp(text.as_str())),
        Literal::Integer(n) => cell.parse::<i64>().ok().map(|c| c.cmp(n)),
    }
}

#[async_trait]
impl TableSource for InMemorySource {
    fn request_url(&self, query: &QuerySpec) -> String {
        let base = crime_dashboard_source::socrata::parse_endpoint(BASE_URL).unwrap();
        crime_dashboard_source::socrata::build_request_url(&base, query).to_string()
    }

    async fn fetch_table(&self, query: &QuerySpec) -> Result<RawTable, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(FetchError::Parse {
                message: "fixture failure".to_string(),
            });
        }
        Ok(self.evaluate(query))
    }
}

/// Header row plus data rows.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Fixture {
    pub fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows,
        }
    }

    pub fn to_table(&self) -> RawTable {
        RawTable::new(self.headers.clone(), self.rows.clone())
    }
}

const CATEGORIES: &[&str] = &[
    "THEFT",
    "THEFT",
    "THEFT",
    "BATTERY",
    "BATTERY",
    "CRIMINAL DAMAGE",
    "ASSAULT",
    "O'HARE DISTURBANCE",
];

/// A clean incident dataset spanning 2018-2024: unique ids, valid
/// coordinates, and timestamps that exercise year and month edges.
pub fn incidents() -> Fixture {
    let mut rows = Vec::new();
    let mut id = 0;
    for year in 2018..=2024 {
        let per_year = 20 + (year - 2018) * 3;
        for i in 0..per_year {
            id += 1;
            let i = usize::try_from(i).unwrap();
            let month = 1 + (i * 5) % 12;
            let day = 1 + (i * 7) % 28;
            let hour = (i * 3) % 24;
            let category = CATEGORIES[(i + usize::try_from(year).unwrap()) % CATEGORIES.len()];
            rows.push(vec![
                id.to_string(),
                format!("{year}-{month:02}-{day:02}T{hour:02}:15:00.000"),
                category.to_string(),
                format!("{:.6}", 41.70 + f64::from(u32::try_from(i % 10).unwrap()) * 0.03),
                format!("{:.6}", -87.80 + f64::from(u32::try_from(i % 7).unwrap()) * 0.04),
            ]);
        }

        id += 1;
        rows.push(vec![
            id.to_string(),
            format!("{year}-12-31T23:59:59.000"),
            "THEFT".to_string(),
            "41.88".to_string(),
            "-87.63".to_string(),
        ]);
        id += 1;
        rows.push(vec![
            id.to_string(),
            format!("{year}-01-01T00:00:00.000"),
            "BATTERY".to_string(),
            "41.88".to_string(),
            "-87.63".to_string(),
        ]);
    }

    rows.push(vec![
        "bad-date".to_string(),
        "not a timestamp".to_string(),
        "THEFT".to_string(),
        "41.88".to_string(),
        "-87.63".to_string(),
    ]);

    Fixture::new(&["id", "date", "primary_type", "latitude", "longitude"], rows)
}
