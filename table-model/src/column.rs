//! FILENAME: table-model/src/column.rs
//! PURPOSE: Column definitions, value accessors, and the table seam.
//! CONTEXT: A `Column` describes how to read one field out of a record
//! (plain field lookup or computed closure), optionally how to derive the
//! value rows are bucketed by, and which aggregation function summarizes
//! it on group rows. `TableContext` is the lookup interface the row model
//! and the grouping engine consume; the orchestrator implements it.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::record::Record;
use crate::row::Row;
use crate::value::DataValue;

/// Column identifier, unique within one table.
pub type ColumnId = String;

// ============================================================================
// ACCESSORS
// ============================================================================

/// How a column reads its value out of a record.
#[derive(Clone)]
pub enum Accessor {
    /// Look the value up by field name.
    Field(String),
    /// Derive the value with a caller-supplied function.
    Computed(Rc<dyn Fn(&Record) -> DataValue>),
}

impl Accessor {
    pub fn eval(&self, record: &Record) -> DataValue {
        match self {
            Accessor::Field(field) => record.value_or_empty(field),
            Accessor::Computed(f) => f(record),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Accessor::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Derives the value a row is bucketed by, when it differs from the
/// display value (e.g. grouping dates by their year).
pub type GroupingAccessor = Rc<dyn Fn(&Record) -> DataValue>;

/// A pure aggregation function: `(ctx, column_id, leaf_rows, direct_child_rows)`
/// to a single summary value. `leaf_rows` are the original, ungrouped rows
/// under the group; `direct_child_rows` the group's members at its own level.
pub type AggregateFn = Rc<dyn Fn(&dyn TableContext, &str, &[Rc<Row>], &[Rc<Row>]) -> DataValue>;

// ============================================================================
// COLUMN
// ============================================================================

/// One column of the table.
#[derive(Clone)]
pub struct Column {
    pub id: ColumnId,

    /// Display-value accessor.
    pub accessor: Accessor,

    /// Bucket-value accessor; when absent, grouping falls back to the
    /// display value.
    pub grouping_accessor: Option<GroupingAccessor>,

    /// Name of the aggregation function summarizing this column on group
    /// rows. Resolved through the aggregation registry; an unknown name
    /// (or None) degrades to an empty aggregated cell.
    pub aggregation: Option<String>,
}

impl Column {
    /// Creates a column whose value is the record field of the same name.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Column {
            accessor: Accessor::Field(id.clone()),
            id,
            grouping_accessor: None,
            aggregation: None,
        }
    }

    /// Creates a column with a computed accessor.
    pub fn computed(id: impl Into<String>, f: impl Fn(&Record) -> DataValue + 'static) -> Self {
        let id = id.into();
        Column {
            id,
            accessor: Accessor::Computed(Rc::new(f)),
            grouping_accessor: None,
            aggregation: None,
        }
    }

    /// Creates a field column summarized by the named aggregation function.
    pub fn aggregated(id: impl Into<String>, aggregation: impl Into<String>) -> Self {
        let mut column = Column::new(id);
        column.aggregation = Some(aggregation.into());
        column
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("accessor", &self.accessor)
            .field("has_grouping_accessor", &self.grouping_accessor.is_some())
            .field("aggregation", &self.aggregation)
            .finish()
    }
}

// ============================================================================
// COLUMN SET
// ============================================================================

/// The table's current columns, with O(1) resolution by id.
/// Grouping keys referencing ids absent from the set are silently dropped
/// by the engine.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
    by_id: FxHashMap<ColumnId, usize>,
}

impl ColumnSet {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut by_id = FxHashMap::default();
        for (i, column) in columns.iter().enumerate() {
            by_id.entry(column.id.clone()).or_insert(i);
        }
        ColumnSet { columns, by_id }
    }

    pub fn resolve(&self, id: &str) -> Option<&Column> {
        self.by_id.get(id).map(|&i| &self.columns[i])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }
}

// ============================================================================
// TABLE CONTEXT
// ============================================================================

/// The lookup seam between rows/engine and the owning table: column
/// existence (used to drop stale grouping keys) and aggregation-function
/// resolution.
pub trait TableContext {
    fn resolve_column(&self, id: &str) -> Option<&Column>;

    /// Resolves the column's aggregation function, if one is registered.
    fn aggregation_fn(&self, column: &Column) -> Option<AggregateFn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessor() {
        let record = Record::from_pairs([("price", DataValue::from(9.5))]);
        let column = Column::new("price");
        assert_eq!(column.accessor.eval(&record), DataValue::Number(9.5));
    }

    #[test]
    fn test_computed_accessor() {
        let record = Record::from_pairs([
            ("first", DataValue::from("Ada")),
            ("last", DataValue::from("Lovelace")),
        ]);
        let column = Column::computed("full_name", |r| {
            DataValue::Text(format!(
                "{} {}",
                r.value_or_empty("first"),
                r.value_or_empty("last")
            ))
        });
        assert_eq!(
            column.accessor.eval(&record),
            DataValue::Text("Ada Lovelace".to_string())
        );
    }

    #[test]
    fn test_column_set_resolution() {
        let set = ColumnSet::new(vec![Column::new("a"), Column::aggregated("b", "sum")]);
        assert!(set.resolve("a").is_some());
        assert_eq!(set.resolve("b").unwrap().aggregation.as_deref(), Some("sum"));
        assert!(set.resolve("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let mut second = Column::new("x");
        second.aggregation = Some("sum".to_string());
        let set = ColumnSet::new(vec![Column::new("x"), second]);
        assert!(set.resolve("x").unwrap().aggregation.is_none());
    }
}
