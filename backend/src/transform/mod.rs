//! Transformation module.
//!
//! This module turns a normalized table into what the catalog shows:
//! - Filter: Row predicates and the "All" sentinel
//! - Grouper: Filtered rows to asset groups
//! - View: Tabs, cards and drill-down details
//! - Pipeline: Sheet source to catalog

pub mod filter;
pub mod grouper;
pub mod pipeline;
pub mod view;

pub use filter::{Filter, FilterSet, Predicate, ALL};
pub use grouper::{chunk_groups, filter_and_group, select_group, selector_options, GroupQuery};
pub use pipeline::*;
pub use view::*;
