//! FILENAME: grouping-engine/src/engine.rs
//! PURPOSE: The grouping core: recursive tree construction and aggregation.
//! CONTEXT: Takes the pre-grouping row list (post-filter, post-sort) and an
//! ordered grouping key list and produces the grouped row tree plus flat
//! index structures. Synchronous, pure, no I/O; a caller-supplied accessor
//! or aggregation that panics propagates unchanged.
//!
//! Algorithm (depth-first over grouping keys):
//! 1. Drop grouping keys whose columns no longer exist
//! 2. Partition the level's rows by raw grouping value, first-occurrence order
//! 3. Recurse into each partition, then build its header/aggregated pair
//! 4. Past the last key, re-stamp depths and walk native sub-row trees

use std::rc::Rc;

use rustc_hash::FxHashMap;

use table_model::{
    AggregateFn, Column, ColumnId, ColumnSet, DataValue, GroupInfo, GroupPath, KeyValue, Row,
    RowId, TableContext,
};

use crate::aggregate::AggregationRegistry;

/// Maximum nesting the engine will descend into, grouping levels and
/// pre-existing native sub-row chains combined. Keeps adversarial native
/// trees from exhausting the stack; deeper nodes are left unvisited.
pub const MAX_GROUPING_DEPTH: usize = 64;

// ============================================================================
// GROUPING CONTEXT
// ============================================================================

/// The engine's view of the owning table: column resolution plus the
/// aggregation registry.
#[derive(Debug)]
pub struct GroupingContext {
    pub columns: ColumnSet,
    pub aggregations: AggregationRegistry,
}

impl GroupingContext {
    pub fn new(columns: ColumnSet) -> Self {
        GroupingContext {
            columns,
            aggregations: AggregationRegistry::new(),
        }
    }
}

impl TableContext for GroupingContext {
    fn resolve_column(&self, id: &str) -> Option<&Column> {
        self.columns.resolve(id)
    }

    fn aggregation_fn(&self, column: &Column) -> Option<AggregateFn> {
        column
            .aggregation
            .as_deref()
            .and_then(|name| self.aggregations.resolve(name))
    }
}

// ============================================================================
// GROUPING RESULT
// ============================================================================

/// The engine's output. Created fresh on every recomputation, never
/// mutated afterwards, superseded wholesale by the next recomputation.
#[derive(Debug)]
pub struct GroupingResult {
    /// Top-level rows, tree-shaped. Group headers only; aggregated
    /// siblings appear in `flat_rows` but not in the nested tree.
    pub rows: Vec<Rc<Row>>,

    /// Pre-order flattening of every node. Each group header is
    /// immediately followed by its aggregated sibling; this adjacency is
    /// part of the output contract.
    pub flat_rows: Vec<Rc<Row>>,

    /// Every row (aggregated siblings included) by id.
    pub rows_by_id: FxHashMap<RowId, Rc<Row>>,
}

// ============================================================================
// GROUPING
// ============================================================================

/// Groups `all_rows` by the ordered `grouping` key list.
///
/// Keys that do not resolve to a column are silently dropped. With no
/// rows, or no keys left after dropping, the input passes through
/// unchanged (same rows, same order). Grouping with no keys is a no-op.
pub fn group_rows(
    all_rows: &[Rc<Row>],
    grouping: &[ColumnId],
    ctx: &dyn TableContext,
) -> GroupingResult {
    let existing: Vec<ColumnId> = grouping
        .iter()
        .filter(|id| ctx.resolve_column(id).is_some())
        .cloned()
        .collect();

    if all_rows.is_empty() || existing.is_empty() {
        let rows_by_id = all_rows
            .iter()
            .map(|row| (row.id.clone(), Rc::clone(row)))
            .collect();
        return GroupingResult {
            rows: all_rows.to_vec(),
            flat_rows: all_rows.to_vec(),
            rows_by_id,
        };
    }

    let grouping = Rc::new(existing);
    let mut rows_by_id = FxHashMap::default();
    let level = group_up(
        all_rows,
        0,
        None,
        &GroupPath::new(),
        &grouping,
        ctx,
        &mut rows_by_id,
    );

    GroupingResult {
        rows: level.rows,
        flat_rows: level.flat,
        rows_by_id,
    }
}

/// One recursion level's output: the level's own rows plus the pre-order
/// flattening of everything beneath it.
struct GroupedLevel {
    rows: Vec<Rc<Row>>,
    flat: Vec<Rc<Row>>,
}

fn group_up(
    rows: &[Rc<Row>],
    depth: usize,
    parent_id: Option<&str>,
    parent_path: &GroupPath,
    grouping: &Rc<Vec<ColumnId>>,
    ctx: &dyn TableContext,
    rows_by_id: &mut FxHashMap<RowId, Rc<Row>>,
) -> GroupedLevel {
    // Past the last grouping key: keep the rows as they are, re-stamp
    // their depth, and walk any pre-existing native sub-row trees so
    // grouping coexists with parent/child business rows.
    if depth >= grouping.len() {
        let mut flat = Vec::with_capacity(rows.len());
        for row in rows {
            row.set_depth(depth);
            flat.push(Rc::clone(row));
            rows_by_id.insert(row.id.clone(), Rc::clone(row));
            if !row.sub_rows.is_empty() && depth < MAX_GROUPING_DEPTH {
                let children = group_up(
                    &row.sub_rows,
                    depth + 1,
                    Some(&row.id),
                    parent_path,
                    grouping,
                    ctx,
                    rows_by_id,
                );
                flat.extend(children.flat);
            }
        }
        return GroupedLevel {
            rows: rows.to_vec(),
            flat,
        };
    }

    let column_id = &grouping[depth];
    let partitions = partition_by_key(rows, column_id, ctx);

    let mut level_rows = Vec::with_capacity(partitions.len());
    let mut flat = Vec::new();

    for (index, partition) in partitions.into_iter().enumerate() {
        let Partition { key, value, rows: members } = partition;

        let mut id = format!("{}:{}", column_id, key);
        if let Some(parent) = parent_id {
            id = format!("{}>{}", parent, id);
        }
        let path = parent_path.child(key);

        // Recurse before aggregation so the header owns finished children.
        let children = group_up(
            &members,
            depth + 1,
            Some(&id),
            &path,
            grouping,
            ctx,
            rows_by_id,
        );

        // Leaf rows always mean the original, ungrouped rows. At the first
        // level the partition members already are those; deeper down they
        // are recovered by flattening any native sub-row chains.
        let leaf_rows = if depth == 0 {
            members.clone()
        } else {
            flatten_by(&members)
        };

        let info = Rc::new(GroupInfo {
            column_id: column_id.clone(),
            value,
            path,
            leaf_rows,
            direct_rows: members,
            grouping: Rc::clone(grouping),
        });
        let (header, sibling) = Row::group_pair(
            id,
            index,
            depth,
            parent_id.map(str::to_string),
            children.rows,
            info,
        );
        let header = Rc::new(header);
        let sibling = Rc::new(sibling);

        rows_by_id.insert(header.id.clone(), Rc::clone(&header));
        rows_by_id.insert(sibling.id.clone(), Rc::clone(&sibling));

        // The header/aggregated pair is adjacent by contract; children
        // follow in pre-order.
        flat.push(Rc::clone(&header));
        flat.push(sibling);
        flat.extend(children.flat);
        level_rows.push(header);
    }

    GroupedLevel {
        rows: level_rows,
        flat,
    }
}

// ============================================================================
// PARTITIONING
// ============================================================================

/// One bucket of a grouping level.
struct Partition {
    /// Normalized key, used for equality and the synthesized id.
    key: KeyValue,
    /// The raw grouping value shared by the bucket's members.
    value: DataValue,
    rows: Vec<Rc<Row>>,
}

/// Partitions rows by their grouping value for `column_id`, in
/// first-occurrence order of each distinct value. Equality is decided on
/// the normalized raw value, never on its string form.
fn partition_by_key(rows: &[Rc<Row>], column_id: &str, ctx: &dyn TableContext) -> Vec<Partition> {
    let mut order: FxHashMap<KeyValue, usize> = FxHashMap::default();
    let mut partitions: Vec<Partition> = Vec::new();

    for row in rows {
        let value = row.grouping_value(ctx, column_id);
        let key = KeyValue::from(&value);
        match order.get(&key) {
            Some(&i) => partitions[i].rows.push(Rc::clone(row)),
            None => {
                order.insert(key.clone(), partitions.len());
                partitions.push(Partition {
                    key,
                    value,
                    rows: vec![Rc::clone(row)],
                });
            }
        }
    }

    partitions
}

/// Flattens rows through their native sub-row chains, every node included,
/// depth-bounded like the main recursion.
fn flatten_by(rows: &[Rc<Row>]) -> Vec<Rc<Row>> {
    fn recurse(rows: &[Rc<Row>], flat: &mut Vec<Rc<Row>>, depth: usize) {
        for row in rows {
            flat.push(Rc::clone(row));
            if !row.sub_rows.is_empty() && depth < MAX_GROUPING_DEPTH {
                recurse(&row.sub_rows, flat, depth + 1);
            }
        }
    }

    let mut flat = Vec::with_capacity(rows.len());
    recurse(rows, &mut flat, 0);
    flat
}

// ============================================================================
// TESTS
// ============================================================================
