//! FILENAME: grouping-engine/src/memo.rs
//! PURPOSE: Recomputation trigger that memoizes grouping over its two inputs.
//! CONTEXT: The engine is pure; this wrapper decides when to re-run it
//! (row-list identity or grouping-key-list change) and, after every
//! recomputation, fires the two invalidation signals against the owning
//! table state: clamp expansion, clamp pagination. The signals fire
//! regardless of whether the new result actually changed shape.

use std::rc::Rc;

use table_model::{ColumnId, ExpandedState, PaginationState, Row, TableContext};

use crate::engine::{group_rows, GroupingResult};

// ============================================================================
// INVALIDATION HOOKS
// ============================================================================

/// The two side-effecting follow-ups scheduled after every recomputation.
/// Fire-and-forget from the engine's point of view; the orchestrator owns
/// the state they act on.
pub trait GroupingEffects {
    /// Drop expanded-row state whose target ids no longer exist.
    fn clamp_expanded(&mut self, result: &GroupingResult);

    /// Re-clamp the page index if the new flat row count invalidates it.
    fn clamp_pagination(&mut self, flat_row_count: usize);
}

/// The obvious [`GroupingEffects`] over the shared table-state types.
#[derive(Debug)]
pub struct StateEffects<'a> {
    pub expanded: &'a mut ExpandedState,
    pub pagination: &'a mut PaginationState,
}

impl GroupingEffects for StateEffects<'_> {
    fn clamp_expanded(&mut self, result: &GroupingResult) {
        self.expanded
            .retain_existing(|id| result.rows_by_id.contains_key(id));
    }

    fn clamp_pagination(&mut self, flat_row_count: usize) {
        if self.pagination.clamp_to(flat_row_count) {
            log::debug!(
                "page index clamped to {} for {} rows",
                self.pagination.page_index,
                flat_row_count
            );
        }
    }
}

// ============================================================================
// GROUPED ROW MODEL
// ============================================================================

/// Memoized grouping: re-runs the engine only when the row-list identity
/// or the grouping key list changes; otherwise hands back the cached
/// result. Results are shared snapshots (`Rc`), superseded wholesale.
#[derive(Debug, Default)]
pub struct GroupedRowModel {
    last_rows: Option<Rc<Vec<Rc<Row>>>>,
    last_grouping: Vec<ColumnId>,
    cached: Option<Rc<GroupingResult>>,
}

impl GroupedRowModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grouping result for `(rows, grouping)`, recomputing
    /// only when either input changed: identity for the row list, shallow
    /// sequence equality for the key list. On recomputation both
    /// invalidation hooks fire, always.
    pub fn get(
        &mut self,
        rows: &Rc<Vec<Rc<Row>>>,
        grouping: &[ColumnId],
        ctx: &dyn TableContext,
        effects: &mut dyn GroupingEffects,
    ) -> Rc<GroupingResult> {
        if let (Some(last_rows), Some(cached)) = (&self.last_rows, &self.cached) {
            if Rc::ptr_eq(last_rows, rows) && self.last_grouping == grouping {
                return Rc::clone(cached);
            }
        }

        log::trace!("regrouping {} rows by {:?}", rows.len(), grouping);
        let result = Rc::new(group_rows(rows, grouping, ctx));
        self.last_rows = Some(Rc::clone(rows));
        self.last_grouping = grouping.to_vec();
        self.cached = Some(Rc::clone(&result));

        effects.clamp_expanded(&result);
        effects.clamp_pagination(result.flat_rows.len());
        result
    }

    /// Drops the cached result; the next [`get`] recomputes.
    ///
    /// [`get`]: GroupedRowModel::get
    pub fn invalidate(&mut self) {
        self.last_rows = None;
        self.last_grouping.clear();
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GroupingContext;
    use table_model::{Column, ColumnSet, DataValue, Record};

    struct CountingEffects {
        expanded: ExpandedState,
        pagination: PaginationState,
        fired: usize,
    }

    impl GroupingEffects for CountingEffects {
        fn clamp_expanded(&mut self, result: &GroupingResult) {
            self.expanded
                .retain_existing(|id| result.rows_by_id.contains_key(id));
            self.fired += 1;
        }

        fn clamp_pagination(&mut self, flat_row_count: usize) {
            self.pagination.clamp_to(flat_row_count);
        }
    }

    fn effects() -> CountingEffects {
        CountingEffects {
            expanded: ExpandedState::default(),
            pagination: PaginationState::default(),
            fired: 0,
        }
    }

    fn fixture() -> (Rc<Vec<Rc<Row>>>, GroupingContext) {
        let rows: Vec<Rc<Row>> = [("A", "x"), ("B", "y"), ("A", "z")]
            .iter()
            .enumerate()
            .map(|(i, (dept, name))| {
                Rc::new(Row::leaf(
                    i.to_string(),
                    i,
                    Rc::new(Record::from_pairs([
                        ("dept", DataValue::from(*dept)),
                        ("name", DataValue::from(*name)),
                    ])),
                ))
            })
            .collect();
        let ctx = GroupingContext::new(ColumnSet::new(vec![
            Column::new("dept"),
            Column::new("name"),
        ]));
        (Rc::new(rows), ctx)
    }

    fn keys(ids: &[&str]) -> Vec<ColumnId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_identical_inputs_hit_the_cache() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();

        let first = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);
        let second = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);

        assert!(Rc::ptr_eq(&first, &second));
        // Hooks fired only for the one real recomputation.
        assert_eq!(effects.fired, 1);
    }

    #[test]
    fn test_key_change_recomputes() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();

        let first = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);
        let second = model.get(&rows, &keys(&["dept", "name"]), &ctx, &mut effects);

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(effects.fired, 2);
    }

    #[test]
    fn test_row_identity_change_recomputes() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();

        let first = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);
        // Structurally equal list, different identity.
        let copied = Rc::new(rows.as_ref().clone());
        let second = model.get(&copied, &keys(&["dept"]), &ctx, &mut effects);

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(effects.fired, 2);
    }

    #[test]
    fn test_invalidate_forces_recomputation() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();

        let first = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);
        model.invalidate();
        let second = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);

        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stale_expansion_is_clamped() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();
        effects.expanded.expand("dept:A");
        effects.expanded.expand("dept:GONE");

        model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);

        assert!(effects.expanded.is_expanded("dept:A"));
        assert!(!effects.expanded.is_expanded("dept:GONE"));
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut effects = effects();
        effects.pagination.page_size = 5;
        effects.pagination.page_index = 9;

        let result = model.get(&rows, &keys(&["dept"]), &ctx, &mut effects);

        // 7 flat rows at page size 5: pages 0 and 1.
        assert_eq!(result.flat_rows.len(), 7);
        assert_eq!(effects.pagination.page_index, 1);
    }

    #[test]
    fn test_state_effects_wires_the_shared_state() {
        let (rows, ctx) = fixture();
        let mut model = GroupedRowModel::new();
        let mut expanded = ExpandedState::default();
        expanded.expand("dept:GONE");
        let mut pagination = PaginationState {
            page_index: 4,
            page_size: 3,
        };

        model.get(
            &rows,
            &keys(&["dept"]),
            &ctx,
            &mut StateEffects {
                expanded: &mut expanded,
                pagination: &mut pagination,
            },
        );

        assert!(!expanded.is_expanded("dept:GONE"));
        assert_eq!(pagination.page_index, 2);
    }
}
