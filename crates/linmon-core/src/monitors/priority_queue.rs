//! Priority-queue monitor: higher-priority cover counting.
//!
//! Values are processed in descending priority order. Once a value's
//! operations are known, the window `[minResponse, maxInvocation)` in
//! which the value is provably present is committed as a +1 cover over
//! time. A poll of a lower value whose whole interval sits under a
//! positive cover must have observed a strictly higher priority at the
//! head throughout, so the history is rejected.

use crate::collections::LazySegmentTree;
use crate::events::events_of;
use crate::frontend::{
    extend_history, max_event_time, strip_empty, tune_events, verify_empty,
};
use crate::history::{DataKind, History, Method, Time, Value};

pub fn is_linearizable(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::PriorityQueue, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events(hist, &mut events, DataKind::PriorityQueue, empty_val)
        || !verify_empty(hist, &mut events, DataKind::PriorityQueue, empty_val)
    {
        return false;
    }
    let max_time = max_event_time(&events);
    strip_empty(hist, empty_val);
    if hist.is_empty() {
        return true;
    }

    let mut cover = LazySegmentTree::<i64>::new(max_time as usize);
    hist.ops
        .sort_by(|a, b| b.value.cmp(&a.value).then(a.id.cmp(&b.id)));

    let mut current: Option<Value> = None;
    let mut min_response: Time = 0;
    let mut max_invocation: Time = 0;
    for i in 0..hist.ops.len() {
        let op = hist.ops[i];
        if current != Some(op.value) {
            // Commit the window of the previous (strictly higher) value.
            if current.is_some() && min_response < max_invocation {
                cover.update_range(
                    min_response as usize,
                    max_invocation as usize - 1,
                    1,
                );
            }
            current = Some(op.value);
            min_response = op.end;
            max_invocation = op.start;
        } else {
            min_response = min_response.min(op.end);
            max_invocation = max_invocation.max(op.start);
        }

        if op.method != Method::Insert {
            if let Some((min, _)) =
                cover.min_in_range(op.start as usize, op.end as usize - 1)
            {
                if min > 0 {
                    return false;
                }
            }
        }
    }

    true
}

/// Without peeks every value is exactly an insert/poll pair, so the
/// cover marks only the gap between the insert response and the poll
/// invocation.
pub fn is_linearizable_no_peeks(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::PriorityQueue, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events(hist, &mut events, DataKind::PriorityQueue, empty_val)
        || !verify_empty(hist, &mut events, DataKind::PriorityQueue, empty_val)
    {
        return false;
    }
    let max_time = max_event_time(&events);
    strip_empty(hist, empty_val);
    if hist.is_empty() {
        return true;
    }

    let mut cover = LazySegmentTree::<i64>::new(max_time as usize);
    hist.ops.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then((b.method == Method::Insert).cmp(&(a.method == Method::Insert)))
    });

    let mut insert_response: Time = 0;
    for op in &hist.ops {
        if op.method == Method::Insert {
            insert_response = op.end;
        } else {
            if let Some((min, _)) =
                cover.min_in_range(op.start as usize, op.end as usize - 1)
            {
                if min > 0 {
                    return false;
                }
            }
            if insert_response < op.start {
                cover.update_range(
                    insert_response as usize,
                    op.start as usize - 1,
                    1,
                );
            }
        }
    }

    true
}
