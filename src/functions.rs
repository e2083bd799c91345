//! Row functions, summary aggregates and the inactivation predicate.
//!
//! These are the collaborators a table calls out to. The engine treats every
//! result as an opaque [`Cell`]; the built-ins below exist so common columns
//! (elapsed time, progress ratio, totals) can be named instead of written.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::row::Row;
use crate::value::{Cell, Value};

/// Computed-column callback signature.
pub type RowFn = dyn Fn(&Row) -> Cell + Send + Sync;

/// Summary aggregate callback signature.
pub type AggregateFn = dyn Fn(&SummaryContext<'_>) -> Cell + Send + Sync;

/// Inactivation predicate callback signature.
pub type PredicateFn = dyn Fn(&Row) -> bool + Send + Sync;

/// Field read by the `percent` and `speed` row functions.
pub const CURRENT_FIELD: &str = "current";
/// Field read by the `percent` row function.
pub const TOTAL_FIELD: &str = "total";

/// A value-producing function for a computed column.
#[derive(Clone)]
pub enum RowFunc {
    /// Time since the row started, frozen once it finishes.
    Elapsed,
    /// `current / total` as a float ratio; empty while `total` is unknown.
    Percent,
    /// `current` per elapsed second.
    Speed,
    Custom(Arc<RowFn>),
}

impl RowFunc {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Row) -> Cell + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        Some(match name {
            "elapsed" => Self::Elapsed,
            "percent" => Self::Percent,
            "speed" => Self::Speed,
            _ => return None,
        })
    }

    #[must_use]
    pub fn apply(&self, row: &Row) -> Cell {
        match self {
            Self::Elapsed => Value::Duration(row.elapsed()).into(),
            Self::Percent => ratio(row).into(),
            Self::Speed => speed(row).into(),
            Self::Custom(f) => f(row),
        }
    }
}

fn ratio(row: &Row) -> Option<Value> {
    let current = row.get(CURRENT_FIELD)?.as_f64()?;
    let total = row.get(TOTAL_FIELD)?.as_f64()?;
    (total > 0.0).then(|| Value::Float(current / total))
}

fn speed(row: &Row) -> Option<Value> {
    let current = row.get(CURRENT_FIELD)?.as_f64()?;
    let secs = row.elapsed().as_secs_f64();
    (secs > 0.0).then(|| Value::Float(current / secs))
}

impl fmt::Debug for RowFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed => f.write_str("Elapsed"),
            Self::Percent => f.write_str("Percent"),
            Self::Speed => f.write_str("Speed"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Everything a summary aggregate may look at.
#[derive(Debug)]
pub struct SummaryContext<'a> {
    /// The column's raw value for every row, in display order.
    pub values: &'a [Value],
    /// Snapshots of every row, in display order.
    pub rows: &'a [Row],
    /// When the table (or its last reset) started.
    pub table_started: Instant,
}

/// Table-wide aggregate shown in a column's summary cell.
///
/// Non-numeric and absent values are skipped. `Sum` of nothing is `0`;
/// `Avg`, `Min` and `Max` of nothing are empty.
#[derive(Clone)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    /// Number of rows.
    Count,
    /// Number of active rows.
    Active,
    /// Time since the table started.
    Elapsed,
    Custom(Arc<AggregateFn>),
}

impl Aggregate {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SummaryContext<'_>) -> Cell + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        Some(match name {
            "sum" => Self::Sum,
            "avg" | "mean" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "active" => Self::Active,
            "elapsed" => Self::Elapsed,
            _ => return None,
        })
    }

    #[must_use]
    pub fn apply(&self, ctx: &SummaryContext<'_>) -> Cell {
        let numeric = || ctx.values.iter().filter(|v| v.as_f64().is_some());
        match self {
            Self::Sum => sum(numeric()).into(),
            Self::Avg => avg(numeric()).into(),
            Self::Min => numeric().min_by(|a, b| cmp_numeric(a, b)).cloned().into(),
            Self::Max => numeric().max_by(|a, b| cmp_numeric(a, b)).cloned().into(),
            Self::Count => Value::from(ctx.rows.len()).into(),
            Self::Active => Value::from(ctx.rows.iter().filter(|r| r.is_active()).count()).into(),
            Self::Elapsed => Value::Duration(ctx.table_started.elapsed()).into(),
            Self::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sum => "Sum",
            Self::Avg => "Avg",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Count => "Count",
            Self::Active => "Active",
            Self::Elapsed => "Elapsed",
            Self::Custom(_) => "Custom(..)",
        };
        f.write_str(name)
    }
}

fn cmp_numeric(a: &Value, b: &Value) -> Ordering {
    a.as_f64()
        .partial_cmp(&b.as_f64())
        .unwrap_or(Ordering::Equal)
}

fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let values: Vec<&Value> = values.collect();
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for v in &values {
            if let Value::Int(i) = v {
                total = total.saturating_add(*i);
            }
        }
        return Value::Int(total);
    }
    if values.iter().all(|v| matches!(v, Value::Duration(_))) {
        return Value::Duration(
            values
                .iter()
                .filter_map(|v| match v {
                    Value::Duration(d) => Some(*d),
                    _ => None,
                })
                .sum(),
        );
    }
    Value::Float(values.iter().filter_map(|v| v.as_f64()).sum())
}

fn avg<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let values: Vec<&Value> = values.collect();
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().filter_map(|v| v.as_f64()).sum::<f64>() / values.len() as f64;
    if values.iter().all(|v| matches!(v, Value::Duration(_))) {
        let mean = Duration::try_from_secs_f64(mean.max(0.0)).unwrap_or(Duration::MAX);
        return Some(Value::Duration(mean));
    }
    Some(Value::Float(mean))
}

/// Decides when an updated row stops being active.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Never deactivates a row.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    #[must_use]
    pub fn test(&self, row: &Row) -> bool {
        (self.0)(row)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Deactivate a row once boolean `field` is set to `true`.
#[must_use]
pub fn flag(field: &str) -> Predicate {
    let field = field.to_string();
    Predicate::new(move |row| row.get(&field).and_then(Value::as_bool) == Some(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Fields;

    fn row(fields: Fields) -> Row {
        Row::new(fields, Instant::now())
    }

    fn summarize(aggregate: &Aggregate, values: &[Value]) -> Cell {
        let ctx = SummaryContext {
            values,
            rows: &[],
            table_started: Instant::now(),
        };
        aggregate.apply(&ctx)
    }

    #[test]
    fn test_percent_function() {
        let r = row(Fields::new().with("current", 25).with("total", 100));
        assert_eq!(RowFunc::Percent.apply(&r), Cell::Value(Value::Float(0.25)));

        let unknown = row(Fields::new().with("current", 25));
        assert_eq!(RowFunc::Percent.apply(&unknown), Cell::empty());

        let zero = row(Fields::new().with("current", 0).with("total", 0));
        assert_eq!(RowFunc::Percent.apply(&zero), Cell::empty());
    }

    #[test]
    fn test_elapsed_function_is_duration() {
        let r = row(Fields::new());
        assert!(matches!(
            RowFunc::Elapsed.apply(&r),
            Cell::Value(Value::Duration(_))
        ));
    }

    #[test]
    fn test_named_functions() {
        assert!(RowFunc::named("elapsed").is_some());
        assert!(RowFunc::named("nope").is_none());
        assert!(Aggregate::named("sum").is_some());
        assert!(Aggregate::named("median").is_none());
    }

    #[test]
    fn test_sum_keeps_integers() {
        let values = [Value::from(2), Value::from("skip"), Value::Empty, Value::from(3)];
        assert_eq!(summarize(&Aggregate::Sum, &values), Cell::Value(Value::Int(5)));
    }

    #[test]
    fn test_sum_promotes_to_float() {
        let values = [Value::from(2), Value::from(0.5)];
        assert_eq!(summarize(&Aggregate::Sum, &values), Cell::Value(Value::Float(2.5)));
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        assert_eq!(summarize(&Aggregate::Sum, &[]), Cell::Value(Value::Int(0)));
    }

    #[test]
    fn test_avg_min_max_of_nothing_is_empty() {
        for agg in [Aggregate::Avg, Aggregate::Min, Aggregate::Max] {
            assert_eq!(summarize(&agg, &[Value::from("x")]), Cell::empty(), "{agg:?}");
        }
    }

    #[test]
    fn test_avg_min_max() {
        let values = [Value::from(1), Value::from(5), Value::from(3)];
        assert_eq!(summarize(&Aggregate::Avg, &values), Cell::Value(Value::Float(3.0)));
        assert_eq!(summarize(&Aggregate::Min, &values), Cell::Value(Value::Int(1)));
        assert_eq!(summarize(&Aggregate::Max, &values), Cell::Value(Value::Int(5)));
    }

    #[test]
    fn test_durations_aggregate_as_durations() {
        let values = [
            Value::from(Duration::from_secs(10)),
            Value::from(Duration::from_secs(20)),
        ];
        assert_eq!(
            summarize(&Aggregate::Sum, &values),
            Cell::Value(Value::Duration(Duration::from_secs(30)))
        );
        assert_eq!(
            summarize(&Aggregate::Avg, &values),
            Cell::Value(Value::Duration(Duration::from_secs(15)))
        );
    }

    #[test]
    fn test_count_and_active() {
        let mut done = row(Fields::new());
        done.deactivate(Instant::now());
        let rows = [row(Fields::new()), done];
        let ctx = SummaryContext {
            values: &[],
            rows: &rows,
            table_started: Instant::now(),
        };
        assert_eq!(Aggregate::Count.apply(&ctx), Cell::Value(Value::Int(2)));
        assert_eq!(Aggregate::Active.apply(&ctx), Cell::Value(Value::Int(1)));
    }

    #[test]
    fn test_flag_predicate() {
        let predicate = flag("done");
        assert!(!predicate.test(&row(Fields::new())));
        assert!(!predicate.test(&row(Fields::new().with("done", false))));
        assert!(predicate.test(&row(Fields::new().with("done", true))));
        assert!(!Predicate::default().test(&row(Fields::new().with("done", true))));
    }
}
