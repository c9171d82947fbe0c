//! FILENAME: grouping-engine/src/lib.rs
//! Hierarchical grouping subsystem for the data table.
//!
//! This crate provides the grouping & aggregation engine as a standalone
//! module, separate from the shared table data model. It depends on
//! `table-model` only for shared types (DataValue, Record, Column, Row).
//!
//! Layers:
//! - `aggregate`: Built-in aggregation functions and the registry
//! - `engine`: The recursive tree-building core (WHAT gets computed)
//! - `memo`: Recomputation trigger and invalidation hooks (WHEN it runs)

pub mod aggregate;
pub mod engine;
pub mod memo;

pub use aggregate::{builtin_fn, AggregationRegistry, AggregationType};
pub use engine::{group_rows, GroupingContext, GroupingResult, MAX_GROUPING_DEPTH};
pub use memo::{GroupedRowModel, GroupingEffects, StateEffects};
