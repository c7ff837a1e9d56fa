//! Shared history preprocessing: extension, event tuning, empty-operation
//! validation and stripping.
//!
//! Every monitor runs (a subset of) the same pipeline before its own
//! decision procedure:
//!
//! 1. [`extend_history`]: enforce the distinct-value restriction and
//!    synthesize a trailing remove for every value added but never
//!    removed.
//! 2. [`tune_events`] / [`tune_events_no_peeks`]: rewrite timestamps into
//!    a dense strictly increasing sequence under which the operations on
//!    each value are well nested (add responds early, remove invokes
//!    late), preserving the order of non-overlapping operations.
//! 3. [`verify_empty`]: check every empty-observation operation could
//!    have seen an empty structure at some instant of its interval.
//! 4. [`strip_empty`]: drop empty observations; they carry no further
//!    constraint.
//!
//! Tuning failures and empty-observation violations are the legitimate
//! `false` verdict of the decision procedure, not errors.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::events::{counting_sort_events, sort_events, Event, EventKind};
use crate::history::{DataKind, History, Operation, Time, Value};

#[derive(Debug, Default, Clone, Copy)]
struct AddRemove {
    adds: u32,
    removes: u32,
}

/// Validate the distinct-value restriction and extend the history so that
/// every real value has exactly one add and one remove.
///
/// Rejects duplicate adds, duplicate removes, and any value that is
/// observed without ever being added. Values with an add but no remove
/// receive a synthesized remove of the datatype's canonical remove method
/// spanning `[max_time + 1, max_time + 2)`, with fresh ids, appended in
/// history order.
pub fn extend_history(hist: &mut History, kind: DataKind, empty_val: Value) -> bool {
    let mut max_time: Time = 0;
    let mut max_id = hist.max_id();
    let mut seen: HashMap<Value, AddRemove> = HashMap::with_capacity(hist.len());

    for o in &hist.ops {
        if o.is_empty_observation(empty_val) {
            continue;
        }
        let entry = seen.entry(o.value).or_default();
        if kind.is_add(o.method) {
            entry.adds += 1;
            if entry.adds > 1 {
                debug!(value = o.value, "value added more than once");
                return false;
            }
        }
        if kind.is_remove(o.method) {
            entry.removes += 1;
            if entry.removes > 1 {
                debug!(value = o.value, "value removed more than once");
                return false;
            }
        }
        max_time = max_time.max(o.end);
    }

    if let Some((&value, _)) = seen.iter().find(|(_, e)| e.adds == 0) {
        debug!(value, "value observed without an add");
        return false;
    }

    let mut synthesized = Vec::new();
    for o in &hist.ops {
        if o.is_empty_observation(empty_val) || !kind.is_add(o.method) {
            continue;
        }
        let entry = seen
            .get_mut(&o.value)
            .expect("every add was recorded above");
        if entry.removes == 0 {
            entry.removes = 1;
            max_id += 1;
            synthesized.push(Operation::new(
                max_id,
                kind.canonical_remove(),
                o.value,
                max_time + 1,
                max_time + 2,
            ));
        }
    }
    hist.ops.extend(synthesized);
    true
}

#[derive(Debug, Default)]
struct ValueState {
    add: Option<usize>,
    remove: Option<usize>,
    add_ended: bool,
    remove_ended: bool,
    /// Peek-style operations invoked but not yet assigned a response time.
    deferred: VecDeque<usize>,
}

/// Rewrite timestamps so operations on the same value are well nested.
///
/// Walks the sorted event stream with a monotonic counter, deferring
/// peek-style operations between the add response and the remove
/// invocation of their value. Fails when a remove of `v` responds before
/// any add of `v` is known, or when a peek-style operation on `v` is
/// invoked after `v`'s remove already responded.
///
/// The rewritten event times are written back into `events`, which may no
/// longer be sorted afterwards.
pub fn tune_events(
    hist: &mut History,
    events: &mut [Event],
    kind: DataKind,
    empty_val: Value,
) -> bool {
    sort_events(events);

    let mut by_value: HashMap<Value, ValueState> = HashMap::new();
    let mut ongoing = vec![false; hist.len()];
    let mut now: Time = 0;

    for i in 0..events.len() {
        let Event {
            kind: ev_kind,
            op: idx,
            ..
        } = events[i];
        let (value, method) = {
            let o = &hist.ops[idx];
            (o.value, o.method)
        };

        if value == empty_val {
            now += 1;
            match ev_kind {
                EventKind::Invocation => hist.ops[idx].start = now,
                EventKind::Response => hist.ops[idx].end = now,
            }
            continue;
        }

        let state = by_value.entry(value).or_default();
        match ev_kind {
            EventKind::Invocation => {
                now += 1;
                hist.ops[idx].start = now;
                if kind.is_add(method) {
                    state.add = Some(idx);
                    // Everything on this value that invoked earlier must
                    // re-invoke after the add.
                    for &other in &state.deferred {
                        now += 1;
                        hist.ops[other].start = now;
                    }
                    if let Some(rem) = state.remove {
                        now += 1;
                        hist.ops[rem].start = now;
                    }
                } else if kind.is_remove(method) {
                    state.remove = Some(idx);
                } else {
                    ongoing[idx] = true;
                    state.deferred.push_back(idx);
                    if let Some(rem) = state.remove {
                        if state.remove_ended {
                            debug!(value, "peek-style op invoked after its remove responded");
                            return false;
                        }
                        now += 1;
                        hist.ops[rem].start = now;
                    }
                }
            }
            EventKind::Response => {
                if kind.is_add(method) {
                    now += 1;
                    hist.ops[idx].end = now;
                    state.add_ended = true;
                } else if kind.is_remove(method) {
                    let Some(add) = state.add else {
                        debug!(value, "remove responded before any add invoked");
                        return false;
                    };
                    if !state.add_ended {
                        now += 1;
                        hist.ops[add].end = now;
                    }
                    while let Some(other) = state.deferred.pop_front() {
                        if !ongoing[other] {
                            continue;
                        }
                        ongoing[other] = false;
                        now += 1;
                        hist.ops[other].end = now;
                    }
                    now += 1;
                    hist.ops[idx].end = now;
                    state.remove_ended = true;
                } else {
                    if !ongoing[idx] {
                        // Already flushed by the remove response.
                        continue;
                    }
                    let Some(add) = state.add else {
                        debug!(value, "peek-style op responded before any add invoked");
                        return false;
                    };
                    if !state.add_ended {
                        now += 1;
                        hist.ops[add].end = now;
                        state.add_ended = true;
                    }
                    ongoing[idx] = false;
                    now += 1;
                    hist.ops[idx].end = now;
                }
            }
        }
    }

    write_back_times(hist, events);
    true
}

/// [`tune_events`] without the peek bookkeeping: every non-add operation
/// is treated as the remove of its value.
pub fn tune_events_no_peeks(
    hist: &mut History,
    events: &mut [Event],
    kind: DataKind,
    empty_val: Value,
) -> bool {
    sort_events(events);

    let mut by_value: HashMap<Value, ValueState> = HashMap::new();
    let mut now: Time = 0;

    for i in 0..events.len() {
        let Event {
            kind: ev_kind,
            op: idx,
            ..
        } = events[i];
        let (value, method) = {
            let o = &hist.ops[idx];
            (o.value, o.method)
        };

        if value == empty_val {
            now += 1;
            match ev_kind {
                EventKind::Invocation => hist.ops[idx].start = now,
                EventKind::Response => hist.ops[idx].end = now,
            }
            continue;
        }

        let state = by_value.entry(value).or_default();
        match ev_kind {
            EventKind::Invocation => {
                now += 1;
                hist.ops[idx].start = now;
                if kind.is_add(method) {
                    state.add = Some(idx);
                    if let Some(rem) = state.remove {
                        now += 1;
                        hist.ops[rem].start = now;
                    }
                } else {
                    state.remove = Some(idx);
                }
            }
            EventKind::Response => {
                if kind.is_add(method) {
                    now += 1;
                    hist.ops[idx].end = now;
                    state.add_ended = true;
                } else {
                    let Some(add) = state.add else {
                        debug!(value, "remove responded before any add invoked");
                        return false;
                    };
                    if !state.add_ended {
                        now += 1;
                        hist.ops[add].end = now;
                    }
                    now += 1;
                    hist.ops[idx].end = now;
                }
            }
        }
    }

    write_back_times(hist, events);
    true
}

fn write_back_times(hist: &History, events: &mut [Event]) {
    for e in events.iter_mut() {
        let o = &hist.ops[e.op];
        e.time = match e.kind {
            EventKind::Invocation => o.start,
            EventKind::Response => o.end,
        };
    }
}

/// Check empty-observation operations against the tuned event stream.
///
/// A value is critical from its add response to its remove invocation.
/// Every empty observation must contain an instant with no critical
/// value; the running set of in-flight empty operations is cleared
/// whenever the critical count drops to zero, and an empty operation
/// still tracked at its response fails the history.
///
/// Sorts `events` (counting sort; tuned timestamps are dense and
/// distinct).
pub fn verify_empty(
    hist: &History,
    events: &mut Vec<Event>,
    kind: DataKind,
    empty_val: Value,
) -> bool {
    counting_sort_events(events);

    let mut running_empty: HashSet<usize> = HashSet::new();
    let mut critical_seen: HashSet<Value> = HashSet::new();
    let mut critical_count: i64 = 0;

    for e in events.iter() {
        let o = &hist.ops[e.op];
        if !o.is_empty_observation(empty_val) {
            if e.kind == EventKind::Invocation && kind.is_remove(o.method) {
                if !critical_seen.insert(o.value) {
                    critical_count -= 1;
                }
            } else if e.kind == EventKind::Response
                && kind.is_add(o.method)
                && critical_seen.insert(o.value)
            {
                critical_count += 1;
            }
        } else {
            match e.kind {
                EventKind::Invocation => {
                    running_empty.insert(e.op);
                }
                EventKind::Response => {
                    if running_empty.contains(&e.op) {
                        debug!(
                            id = o.id,
                            "empty observation overlaps no empty instant"
                        );
                        return false;
                    }
                }
            }
        }

        if critical_count == 0 {
            running_empty.clear();
        }
    }

    true
}

/// Drop every empty-observation operation from the history. Event streams
/// extracted earlier refer to stale indices and must be re-extracted.
pub fn strip_empty(hist: &mut History, empty_val: Value) {
    hist.retain_real(empty_val);
}

/// Largest timestamp in an event stream, 0 when empty.
#[must_use]
pub fn max_event_time(events: &[Event]) -> Time {
    events.iter().map(|e| e.time).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::events_of;
    use crate::history::Method;

    const EMPTY: Value = -1;

    fn op(id: u32, method: Method, value: Value, start: Time, end: Time) -> Operation {
        Operation::new(id, method, value, start, end)
    }

    #[test]
    fn extension_synthesizes_trailing_removes() {
        let mut hist = History::new(vec![
            op(1, Method::Enq, 7, 1, 3),
            op(2, Method::Enq, 8, 2, 5),
            op(3, Method::Deq, 7, 6, 9),
        ]);
        assert!(extend_history(&mut hist, DataKind::Queue, EMPTY));
        assert_eq!(hist.len(), 4);
        let synth = hist.ops[3];
        assert_eq!(synth.method, Method::Deq);
        assert_eq!(synth.value, 8);
        assert_eq!((synth.start, synth.end), (10, 11));
        assert_eq!(synth.id, 4);
    }

    #[test]
    fn extension_is_idempotent() {
        let mut hist = History::new(vec![op(1, Method::Push, 3, 1, 2)]);
        assert!(extend_history(&mut hist, DataKind::Stack, EMPTY));
        let extended = hist.clone();
        assert!(extend_history(&mut hist, DataKind::Stack, EMPTY));
        assert_eq!(hist.ops, extended.ops);
    }

    #[test]
    fn extension_rejects_duplicate_adds_and_removes() {
        let mut dup_add = History::new(vec![
            op(1, Method::Push, 3, 1, 2),
            op(2, Method::Push, 3, 3, 4),
        ]);
        assert!(!extend_history(&mut dup_add, DataKind::Stack, EMPTY));

        let mut dup_remove = History::new(vec![
            op(1, Method::Push, 3, 1, 2),
            op(2, Method::Pop, 3, 3, 4),
            op(3, Method::Pop, 3, 5, 6),
        ]);
        assert!(!extend_history(&mut dup_remove, DataKind::Stack, EMPTY));
    }

    #[test]
    fn extension_rejects_values_never_added() {
        let mut hist = History::new(vec![op(1, Method::Deq, 3, 1, 2)]);
        assert!(!extend_history(&mut hist, DataKind::Queue, EMPTY));

        let mut peek_only = History::new(vec![op(1, Method::Peek, 3, 1, 2)]);
        assert!(!extend_history(&mut peek_only, DataKind::Stack, EMPTY));
    }

    #[test]
    fn extension_ignores_empty_observations() {
        let mut hist = History::new(vec![
            op(1, Method::Deq, EMPTY, 1, 2),
            op(2, Method::Deq, EMPTY, 3, 4),
        ]);
        assert!(extend_history(&mut hist, DataKind::Queue, EMPTY));
        assert_eq!(hist.len(), 2);
    }

    #[test]
    fn tuning_produces_distinct_increasing_times() {
        let mut hist = History::new(vec![
            op(1, Method::Push, 1, 1, 10),
            op(2, Method::Peek, 1, 2, 8),
            op(3, Method::Pop, 1, 3, 12),
        ]);
        let mut events = events_of(&hist);
        assert!(tune_events(&mut hist, &mut events, DataKind::Stack, EMPTY));
        let mut times: Vec<Time> = Vec::new();
        for o in &hist.ops {
            times.push(o.start);
            times.push(o.end);
        }
        let mut sorted = times.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), times.len(), "tuned times must be distinct");
        for o in &hist.ops {
            assert!(o.start < o.end);
        }
    }

    #[test]
    fn tuning_preserves_order_of_disjoint_operations() {
        let mut hist = History::new(vec![
            op(1, Method::Enq, 1, 1, 2),
            op(2, Method::Enq, 2, 5, 6),
            op(3, Method::Deq, 1, 8, 9),
            op(4, Method::Deq, 2, 11, 14),
        ]);
        let mut events = events_of(&hist);
        assert!(tune_events(&mut hist, &mut events, DataKind::Queue, EMPTY));
        assert!(hist.ops[0].end < hist.ops[1].start);
        assert!(hist.ops[1].end < hist.ops[2].start);
        assert!(hist.ops[2].end < hist.ops[3].start);
    }

    #[test]
    fn tuning_rejects_remove_responding_before_any_add() {
        let mut hist = History::new(vec![
            op(1, Method::Deq, 1, 1, 2),
            op(2, Method::Enq, 1, 5, 6),
        ]);
        let mut events = events_of(&hist);
        assert!(!tune_events(&mut hist, &mut events, DataKind::Queue, EMPTY));

        let mut hist = History::new(vec![
            op(1, Method::Deq, 1, 1, 2),
            op(2, Method::Enq, 1, 5, 6),
        ]);
        let mut events = events_of(&hist);
        assert!(!tune_events_no_peeks(
            &mut hist,
            &mut events,
            DataKind::Queue,
            EMPTY
        ));
    }

    #[test]
    fn tuning_rejects_peek_after_responded_remove() {
        let mut hist = History::new(vec![
            op(1, Method::Push, 1, 1, 2),
            op(2, Method::Pop, 1, 3, 4),
            op(3, Method::Peek, 1, 5, 6),
        ]);
        let mut events = events_of(&hist);
        assert!(!tune_events(&mut hist, &mut events, DataKind::Stack, EMPTY));
    }

    #[test]
    fn tuning_nests_overlapping_same_value_operations() {
        let mut hist = History::new(vec![
            op(1, Method::Push, 1, 1, 10),
            op(2, Method::Pop, 1, 2, 12),
        ]);
        let mut events = events_of(&hist);
        assert!(tune_events(&mut hist, &mut events, DataKind::Stack, EMPTY));
        let (push, pop) = (hist.ops[0], hist.ops[1]);
        // Both invoked before either responded, so the pair stays
        // overlapping and the critical interval [push.end, pop.start) is
        // empty.
        assert!(pop.start < push.end);
        assert_eq!(max_event_time(&events), 4);
    }

    #[test]
    fn verify_empty_rejects_observation_inside_critical_window() {
        // Value 5 is critical over the whole empty-DEQ interval.
        let mut hist = History::new(vec![
            op(1, Method::Enq, 5, 1, 2),
            op(2, Method::Deq, EMPTY, 3, 4),
            op(3, Method::Deq, 5, 5, 6),
        ]);
        let mut events = events_of(&hist);
        assert!(tune_events(&mut hist, &mut events, DataKind::Queue, EMPTY));
        assert!(!verify_empty(&hist, &mut events, DataKind::Queue, EMPTY));
    }

    #[test]
    fn verify_empty_accepts_observation_with_an_empty_instant() {
        // The empty DEQ overlaps the gap before the ENQ responds.
        let mut hist = History::new(vec![
            op(1, Method::Deq, EMPTY, 1, 4),
            op(2, Method::Enq, 5, 2, 3),
            op(3, Method::Deq, 5, 5, 6),
        ]);
        let mut events = events_of(&hist);
        assert!(tune_events(&mut hist, &mut events, DataKind::Queue, EMPTY));
        assert!(verify_empty(&hist, &mut events, DataKind::Queue, EMPTY));
    }

    #[test]
    fn strip_empty_drops_only_empty_observations() {
        let mut hist = History::new(vec![
            op(1, Method::Enq, 5, 1, 2),
            op(2, Method::Deq, EMPTY, 3, 4),
            op(3, Method::Deq, 5, 5, 6),
        ]);
        strip_empty(&mut hist, EMPTY);
        assert_eq!(hist.len(), 2);
        assert!(hist.ops.iter().all(|o| o.value == 5));
    }
}
