//! Per-datatype decision procedures sharing the history front-end.
//!
//! Each module exposes `is_linearizable` and, selected by the caller when
//! the history carries no peek-style methods, a faster
//! `is_linearizable_no_peeks` variant. There is no runtime datatype
//! abstraction; the dispatch below matches on the tag.

pub mod priority_queue;
pub mod queue;
pub mod set;
pub mod stack;

use crate::history::{DataKind, History, Value};

/// Decide linearizability of `hist` against `kind`'s sequential
/// specification. `exclude_peeks` asserts the history contains no
/// peek-style methods and selects the faster variant.
///
/// A `false` verdict covers both genuine non-linearizability and
/// histories violating the distinct-value restriction.
pub fn is_linearizable(
    kind: DataKind,
    hist: &mut History,
    empty_val: Value,
    exclude_peeks: bool,
) -> bool {
    match (kind, exclude_peeks) {
        (DataKind::Set, false) => set::is_linearizable(hist, empty_val),
        (DataKind::Set, true) => set::is_linearizable_no_peeks(hist, empty_val),
        (DataKind::Stack, false) => stack::is_linearizable(hist, empty_val),
        (DataKind::Stack, true) => stack::is_linearizable_no_peeks(hist, empty_val),
        (DataKind::Queue, false) => queue::is_linearizable(hist, empty_val),
        (DataKind::Queue, true) => queue::is_linearizable_no_peeks(hist, empty_val),
        (DataKind::PriorityQueue, false) => priority_queue::is_linearizable(hist, empty_val),
        (DataKind::PriorityQueue, true) => {
            priority_queue::is_linearizable_no_peeks(hist, empty_val)
        }
    }
}
