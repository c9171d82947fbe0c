//! FILENAME: grouping-engine/src/aggregate.rs
//! PURPOSE: Built-in aggregation functions and the caller-facing registry.
//! CONTEXT: Aggregations summarize a group's leaf rows into one value per
//! column. The built-ins cover the common numeric and distinct-value
//! summaries; callers register custom functions by name, and a custom
//! registration shadows a built-in of the same name. Resolution failure is
//! never an error; an unresolvable name degrades to an empty aggregated
//! cell upstream.

use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use table_model::{AggregateFn, DataValue, KeyValue, Row, TableContext};

// ============================================================================
// AGGREGATION TYPE
// ============================================================================

/// The built-in aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    Sum,
    Min,
    Max,
    /// The [min, max] pair as a two-value list.
    Extent,
    Mean,
    Median,
    /// Distinct values in first-seen order, as a list.
    Unique,
    UniqueCount,
    Count,
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Count
    }
}

impl AggregationType {
    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Extent => "extent",
            AggregationType::Mean => "mean",
            AggregationType::Median => "median",
            AggregationType::Unique => "unique",
            AggregationType::UniqueCount => "uniqueCount",
            AggregationType::Count => "count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(AggregationType::Sum),
            "min" => Some(AggregationType::Min),
            "max" => Some(AggregationType::Max),
            "extent" => Some(AggregationType::Extent),
            "mean" => Some(AggregationType::Mean),
            "median" => Some(AggregationType::Median),
            "unique" => Some(AggregationType::Unique),
            "uniqueCount" => Some(AggregationType::UniqueCount),
            "count" => Some(AggregationType::Count),
            _ => None,
        }
    }

    /// Computes this aggregation over a group's leaf rows.
    ///
    /// Numeric aggregations skip non-numeric (and NaN) leaf values; over a
    /// numeric-empty set `sum` yields 0 and the rest yield `Empty`.
    /// Distinct-value aggregations compare by normalized value equality.
    /// Tolerates an empty `leaf_rows` slice even though the engine never
    /// produces one.
    pub fn compute(self, ctx: &dyn TableContext, column_id: &str, leaf_rows: &[Rc<Row>]) -> DataValue {
        match self {
            AggregationType::Sum => {
                DataValue::Number(numeric_values(ctx, column_id, leaf_rows).iter().sum())
            }
            AggregationType::Min => match numeric_extent(ctx, column_id, leaf_rows) {
                Some((min, _)) => DataValue::Number(min),
                None => DataValue::Empty,
            },
            AggregationType::Max => match numeric_extent(ctx, column_id, leaf_rows) {
                Some((_, max)) => DataValue::Number(max),
                None => DataValue::Empty,
            },
            AggregationType::Extent => match numeric_extent(ctx, column_id, leaf_rows) {
                Some((min, max)) => {
                    DataValue::List(vec![DataValue::Number(min), DataValue::Number(max)])
                }
                None => DataValue::Empty,
            },
            AggregationType::Mean => {
                let values = numeric_values(ctx, column_id, leaf_rows);
                if values.is_empty() {
                    DataValue::Empty
                } else {
                    DataValue::Number(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            AggregationType::Median => {
                let mut values = numeric_values(ctx, column_id, leaf_rows);
                if values.is_empty() {
                    return DataValue::Empty;
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    DataValue::Number(values[mid])
                } else {
                    DataValue::Number((values[mid - 1] + values[mid]) / 2.0)
                }
            }
            AggregationType::Unique => DataValue::List(distinct_values(ctx, column_id, leaf_rows)),
            AggregationType::UniqueCount => {
                DataValue::Number(distinct_values(ctx, column_id, leaf_rows).len() as f64)
            }
            AggregationType::Count => DataValue::Number(leaf_rows.len() as f64),
        }
    }
}

/// Numeric leaf values for one column, non-numbers and NaN skipped.
fn numeric_values(ctx: &dyn TableContext, column_id: &str, rows: &[Rc<Row>]) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.value(ctx, column_id).as_number())
        .filter(|n| !n.is_nan())
        .collect()
}

fn numeric_extent(ctx: &dyn TableContext, column_id: &str, rows: &[Rc<Row>]) -> Option<(f64, f64)> {
    let mut extent: Option<(f64, f64)> = None;
    for value in numeric_values(ctx, column_id, rows) {
        extent = Some(match extent {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
    }
    extent
}

/// Distinct leaf values in first-seen order.
fn distinct_values(ctx: &dyn TableContext, column_id: &str, rows: &[Rc<Row>]) -> Vec<DataValue> {
    let mut seen: FxHashSet<KeyValue> = FxHashSet::default();
    let mut distinct = Vec::new();
    for row in rows {
        let value = row.value(ctx, column_id);
        if seen.insert(KeyValue::from(&value)) {
            distinct.push(value);
        }
    }
    distinct
}

/// Wraps a built-in as a pluggable [`AggregateFn`].
pub fn builtin_fn(aggregation: AggregationType) -> AggregateFn {
    Rc::new(move |ctx, column_id, leaf_rows, _direct| {
        aggregation.compute(ctx, column_id, leaf_rows)
    })
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Name-to-function mapping for aggregations: caller-registered custom
/// functions layered over the built-ins.
#[derive(Default)]
pub struct AggregationRegistry {
    custom: FxHashMap<String, AggregateFn>,
}

impl AggregationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom aggregation. Shadows a built-in of the same name.
    pub fn register(&mut self, name: impl Into<String>, f: AggregateFn) {
        self.custom.insert(name.into(), f);
    }

    pub fn resolve(&self, name: &str) -> Option<AggregateFn> {
        if let Some(f) = self.custom.get(name) {
            return Some(Rc::clone(f));
        }
        AggregationType::from_name(name).map(builtin_fn)
    }
}

impl fmt::Debug for AggregationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
