//! FILENAME: table-model/src/state.rs
//! PURPOSE: Orchestrator-owned table state the grouping hooks clamp.
//! CONTEXT: Expansion and pagination live outside the engine; the engine's
//! memoization wrapper fires "clamp expansion" / "clamp pagination"
//! signals against these types after every recomputation so that stale row
//! ids and out-of-range page indices never survive a regroup.

use serde::{Deserialize, Serialize};
use rustc_hash::FxHashSet;

use crate::column::ColumnId;
use crate::row::RowId;

/// The ordered grouping key list. Owned by the orchestrator, passed by
/// value into the engine on each call; empty means "no grouping".
pub type GroupingState = Vec<ColumnId>;

// ============================================================================
// EXPANSION
// ============================================================================

/// Which rows are currently expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpandedState {
    /// Every row is expanded.
    All,
    /// Exactly the listed row ids are expanded.
    Rows(FxHashSet<RowId>),
}

impl Default for ExpandedState {
    fn default() -> Self {
        ExpandedState::Rows(FxHashSet::default())
    }
}

impl ExpandedState {
    pub fn is_all(&self) -> bool {
        matches!(self, ExpandedState::All)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        match self {
            ExpandedState::All => true,
            ExpandedState::Rows(ids) => ids.contains(id),
        }
    }

    pub fn expand(&mut self, id: impl Into<RowId>) {
        if let ExpandedState::Rows(ids) = self {
            ids.insert(id.into());
        }
    }

    /// Collapses one row. In `All` mode the id universe is unknown here;
    /// callers first materialize the current ids via [`materialize`].
    ///
    /// [`materialize`]: ExpandedState::materialize
    pub fn collapse(&mut self, id: &str) {
        if let ExpandedState::Rows(ids) = self {
            ids.remove(id);
        }
    }

    pub fn expand_all(&mut self) {
        *self = ExpandedState::All;
    }

    pub fn collapse_all(&mut self) {
        *self = ExpandedState::default();
    }

    /// Converts `All` into the explicit id set, enabling per-row collapse.
    pub fn materialize<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RowId>,
    {
        if self.is_all() {
            *self = ExpandedState::Rows(ids.into_iter().collect());
        }
    }

    /// Drops expanded ids that no longer resolve to a row. `All` is left
    /// untouched (it has no ids to go stale).
    pub fn retain_existing<F>(&mut self, mut exists: F)
    where
        F: FnMut(&str) -> bool,
    {
        if let ExpandedState::Rows(ids) = self {
            ids.retain(|id| exists(id));
        }
    }

    pub fn expanded_count(&self) -> Option<usize> {
        match self {
            ExpandedState::All => None,
            ExpandedState::Rows(ids) => Some(ids.len()),
        }
    }
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Current page position. Pagination happens downstream of grouping; the
/// engine only re-clamps the index when the flat row count shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState {
            page_index: 0,
            page_size: 10,
        }
    }
}

impl PaginationState {
    pub fn page_count(&self, row_count: usize) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        row_count.div_ceil(self.page_size)
    }

    /// Pulls the page index back into range for `row_count` rows.
    /// Returns true when the index actually moved.
    pub fn clamp_to(&mut self, row_count: usize) -> bool {
        let max_index = self.page_count(row_count).saturating_sub(1);
        if self.page_index > max_index {
            self.page_index = max_index;
            true
        } else {
            false
        }
    }
}
