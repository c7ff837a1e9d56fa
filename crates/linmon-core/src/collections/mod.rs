//! Augmented search structures backing the monitors.

pub mod interval_tree;
pub mod segment_tree;
pub mod slab;

pub use interval_tree::{Interval, IntervalTree, StaticIntervalTree};
pub use segment_tree::{CoverSum, LazySegmentTree, SegmentValue};
pub use slab::Slab;
