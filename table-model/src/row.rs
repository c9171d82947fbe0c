//! FILENAME: table-model/src/row.rs
//! PURPOSE: The addressable row: leaf, group header, or aggregated sibling.
//! CONTEXT: Rows wrap either an original record (leaves, possibly with a
//! pre-existing native sub-row tree) or a synthesized group. Display and
//! grouping values are memoized per row; the caches are created fresh with
//! each grouping result and die with it. A group header and its aggregated
//! sibling share the same caches, so a value computed through either is
//! visible through both.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::{ColumnId, TableContext};
use crate::record::Record;
use crate::value::{DataValue, GroupPath};

/// Row identifier, unique within one row model.
/// Leaf ids are caller-supplied; group ids are synthesized by the engine
/// as `"<columnId>:<value>"`, chained with `">"` under the parent id, and
/// aggregated siblings carry an extra `"aggregated:"` prefix.
pub type RowId = String;

type ValueCache = Rc<RefCell<FxHashMap<ColumnId, DataValue>>>;

// ============================================================================
// GROUP INFO
// ============================================================================

/// Data shared between a group header and its aggregated sibling.
#[derive(Debug)]
pub struct GroupInfo {
    /// The grouping key this level grouped by.
    pub column_id: ColumnId,

    /// The raw grouping value shared by every member of the bucket.
    pub value: DataValue,

    /// Composite identity: the key values from the outermost level down to
    /// this group. Collision-free where the string id is not.
    pub path: GroupPath,

    /// Every original, ungrouped row under this group, in input order.
    /// This is the aggregation input.
    pub leaf_rows: Vec<Rc<Row>>,

    /// The bucket's member rows at this level, before deeper grouping.
    pub direct_rows: Vec<Rc<Row>>,

    /// Snapshot of the effective grouping key list at build time. Columns
    /// in this list pass through; all others aggregate.
    pub grouping: Rc<Vec<ColumnId>>,
}

// ============================================================================
// ROW KIND
// ============================================================================

/// What a row represents.
#[derive(Debug)]
pub enum RowKind {
    /// A caller-supplied row wrapping an original record.
    Leaf,
    /// The row owning a bucket's children.
    GroupHeader(Rc<GroupInfo>),
    /// The childless twin of a group header, used to render a compact
    /// aggregate line without re-triggering the group's child recursion.
    AggregatedSibling(Rc<GroupInfo>),
}

// ============================================================================
// ROW
// ============================================================================

/// One addressable node in the (possibly grouped) hierarchy.
#[derive(Debug)]
pub struct Row {
    pub id: RowId,

    /// Position among siblings (source index for leaves, partition index
    /// for groups).
    pub index: usize,

    /// Nesting level, 0 at the root. Re-stamped by the engine on every
    /// grouping pass.
    depth: Cell<usize>,

    /// The underlying record, shared by reference across all rows derived
    /// from it. Group rows carry their first leaf's record.
    pub original: Rc<Record>,

    /// Back-reference only, never an ownership relation.
    pub parent_id: Option<RowId>,

    /// Ordered children, exclusively owned by this row.
    pub sub_rows: Vec<Rc<Row>>,

    pub kind: RowKind,

    /// Memoized display values per column.
    values: ValueCache,

    /// Memoized grouping values: custom bucket-accessor results on leaves,
    /// aggregation results on group rows.
    grouping_values: ValueCache,
}

impl Row {
    /// Creates a leaf row. Native children and a parent back-reference can
    /// be attached through the public fields before the row is shared.
    pub fn leaf(id: impl Into<RowId>, index: usize, original: Rc<Record>) -> Self {
        Row {
            id: id.into(),
            index,
            depth: Cell::new(0),
            original,
            parent_id: None,
            sub_rows: Vec::new(),
            kind: RowKind::Leaf,
            values: Rc::new(RefCell::new(FxHashMap::default())),
            grouping_values: Rc::new(RefCell::new(FxHashMap::default())),
        }
    }

    /// Creates a group header row together with its aggregated sibling.
    /// The sibling is a shallow copy: same record, same caches, prefixed
    /// id, no children. The engine emits the two adjacently.
    pub fn group_pair(
        id: RowId,
        index: usize,
        depth: usize,
        parent_id: Option<RowId>,
        sub_rows: Vec<Rc<Row>>,
        info: Rc<GroupInfo>,
    ) -> (Row, Row) {
        let original = info
            .leaf_rows
            .first()
            .map(|row| Rc::clone(&row.original))
            .unwrap_or_default();
        let values: ValueCache = Rc::new(RefCell::new(FxHashMap::default()));
        let grouping_values: ValueCache = Rc::new(RefCell::new(FxHashMap::default()));

        let header = Row {
            id: id.clone(),
            index,
            depth: Cell::new(depth),
            original: Rc::clone(&original),
            parent_id: parent_id.clone(),
            sub_rows,
            kind: RowKind::GroupHeader(Rc::clone(&info)),
            values: Rc::clone(&values),
            grouping_values: Rc::clone(&grouping_values),
        };
        let sibling = Row {
            id: format!("aggregated:{}", id),
            index,
            depth: Cell::new(depth),
            original,
            parent_id,
            sub_rows: Vec::new(),
            kind: RowKind::AggregatedSibling(info),
            values,
            grouping_values,
        };
        (header, sibling)
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn set_depth(&self, depth: usize) {
        self.depth.set(depth);
    }

    /// True for group header rows.
    pub fn is_grouped(&self) -> bool {
        matches!(self.kind, RowKind::GroupHeader(_))
    }

    /// True for aggregated sibling rows.
    pub fn is_aggregated(&self) -> bool {
        matches!(self.kind, RowKind::AggregatedSibling(_))
    }

    pub fn group_info(&self) -> Option<&Rc<GroupInfo>> {
        match &self.kind {
            RowKind::Leaf => None,
            RowKind::GroupHeader(info) | RowKind::AggregatedSibling(info) => Some(info),
        }
    }

    /// The grouping key this row's level grouped by, if it is a group row.
    pub fn grouping_column_id(&self) -> Option<&str> {
        self.group_info().map(|info| info.column_id.as_str())
    }

    // ========================================================================
    // VALUE ACCESS
    // ========================================================================

    /// The display value of `column_id` for this row.
    ///
    /// Leaves evaluate the column accessor against the record. Group rows
    /// pass grouping columns through from their first member and aggregate
    /// everything else; a column with no resolvable aggregation function
    /// yields `Empty`. Results are memoized; a caller-supplied accessor or
    /// aggregation that panics propagates unchanged.
    pub fn value(&self, ctx: &dyn TableContext, column_id: &str) -> DataValue {
        if let Some(cached) = self.values.borrow().get(column_id) {
            return cached.clone();
        }

        match &self.kind {
            RowKind::Leaf => {
                let column = match ctx.resolve_column(column_id) {
                    Some(column) => column,
                    None => return DataValue::Empty,
                };
                let value = column.accessor.eval(&self.original);
                self.values
                    .borrow_mut()
                    .insert(column_id.to_string(), value.clone());
                value
            }
            RowKind::GroupHeader(info) | RowKind::AggregatedSibling(info) => {
                if info.grouping.iter().any(|id| id == column_id) {
                    // Grouping columns are never aggregated: pass the first
                    // member's value through.
                    let value = match info.direct_rows.first() {
                        Some(first) => first.value(ctx, column_id),
                        None => DataValue::Empty,
                    };
                    self.values
                        .borrow_mut()
                        .insert(column_id.to_string(), value.clone());
                    value
                } else {
                    self.aggregated_value(ctx, column_id, info)
                }
            }
        }
    }

    fn aggregated_value(
        &self,
        ctx: &dyn TableContext,
        column_id: &str,
        info: &GroupInfo,
    ) -> DataValue {
        if let Some(cached) = self.grouping_values.borrow().get(column_id) {
            return cached.clone();
        }
        let aggregate = ctx
            .resolve_column(column_id)
            .and_then(|column| ctx.aggregation_fn(column));
        match aggregate {
            Some(f) => {
                let value = f(ctx, column_id, &info.leaf_rows, &info.direct_rows);
                self.grouping_values
                    .borrow_mut()
                    .insert(column_id.to_string(), value.clone());
                value
            }
            // No aggregation registered: empty cell, not cached.
            None => DataValue::Empty,
        }
    }

    /// The value this row is bucketed by for `column_id`: the column's
    /// custom grouping accessor when one exists (memoized), otherwise the
    /// display value.
    pub fn grouping_value(&self, ctx: &dyn TableContext, column_id: &str) -> DataValue {
        if let Some(cached) = self.grouping_values.borrow().get(column_id) {
            return cached.clone();
        }
        let custom = ctx
            .resolve_column(column_id)
            .and_then(|column| column.grouping_accessor.clone());
        match custom {
            Some(f) => {
                let value = f(&self.original);
                self.grouping_values
                    .borrow_mut()
                    .insert(column_id.to_string(), value.clone());
                value
            }
            None => self.value(ctx, column_id),
        }
    }
}
