//! Queue monitor: alternating front-of-queue observation scan.
//!
//! After the front-end, FIFO linearizability reduces to a fixed-point
//! computation over the tuned event stream. Two cooperating scanners
//! share per-value reconciliation state:
//!
//! - *pending*: the value has been accounted for by one scanner;
//! - *ignored*: accounted for by both; its remaining events are skipped;
//! - a running-front counter for values observed at the front more than
//!   once (dequeue plus peeks).
//!
//! The enqueue scanner stalls at an enqueue endpoint until the front
//! scanner has consumed every front observation of that value, and vice
//! versa; the history is linearizable iff both scanners drain the stream.
//!
//! With peek-style operations the scan runs backward from the end of the
//! stream, tracking the last front value. The no-peek variant is the same
//! scan under time reversal (which swaps enqueue/dequeue roles and
//! invocation/response endpoints), so it runs forward tracking a
//! candidate first front value.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::events::{events_of, sort_events, Event, EventKind};
use crate::frontend::{
    extend_history, strip_empty, tune_events, tune_events_no_peeks, verify_empty,
};
use crate::history::{DataKind, History, Method, Value};

#[derive(Debug, Default)]
struct ScanState {
    pending: HashSet<Value>,
    ignored: HashSet<Value>,
    running_front: HashMap<Value, usize>,
    count_by_val: HashMap<Value, usize>,
}

impl ScanState {
    fn new(hist: &History) -> Self {
        let mut state = Self::default();
        for o in &hist.ops {
            *state.count_by_val.entry(o.value).or_insert(0) += 1;
        }
        state
    }

    /// First visit marks the value pending, the second reconciles it.
    fn upgrade(&mut self, value: Value) {
        if self.pending.remove(&value) {
            self.ignored.insert(value);
        } else {
            self.pending.insert(value);
        }
    }

    /// All operations on `value` except its enqueue have been consumed at
    /// the front.
    fn limit_front(&self, value: Value) -> bool {
        let running = self.running_front.get(&value).copied().unwrap_or(0);
        let total = self.count_by_val.get(&value).copied().unwrap_or(0);
        running + 1 == total
    }

    fn consume_front(&mut self, value: Value) {
        *self.running_front.entry(value).or_insert(0) += 1;
        if self.limit_front(value) {
            self.upgrade(value);
        }
    }

    /// Backward over enqueue events: upgrade on each response, stall at an
    /// invocation whose value is not yet reconciled.
    fn backward_enqueues(&mut self, events: &[Event], hist: &History, cursor: &mut usize) -> bool {
        let begin = *cursor;
        while *cursor > 0 {
            let e = events[*cursor - 1];
            let o = &hist.ops[e.op];
            if self.ignored.contains(&o.value) || o.method != Method::Enq {
                *cursor -= 1;
                continue;
            }
            if e.kind == EventKind::Invocation {
                break;
            }
            self.upgrade(o.value);
            *cursor -= 1;
        }
        begin != *cursor
    }

    /// Backward over dequeue/peek events, tracking the last front value.
    fn backward_fronts(
        &mut self,
        events: &[Event],
        hist: &History,
        cursor: &mut usize,
        last_front: &mut Option<Value>,
    ) -> bool {
        let begin = *cursor;
        while *cursor > 0 {
            let e = events[*cursor - 1];
            let o = &hist.ops[e.op];
            if self.ignored.contains(&o.value) || o.method == Method::Enq {
                *cursor -= 1;
                continue;
            }

            if last_front.is_some_and(|last| self.ignored.contains(&last)) {
                *last_front = None;
            }

            match e.kind {
                EventKind::Invocation => {
                    if last_front.is_none() {
                        *last_front = Some(o.value);
                    }
                    if *last_front != Some(o.value) || self.limit_front(o.value) {
                        break;
                    }
                }
                EventKind::Response => self.consume_front(o.value),
            }
            *cursor -= 1;
        }
        begin != *cursor
    }

    /// Forward over dequeue events: the time-mirror of
    /// [`ScanState::backward_enqueues`].
    fn forward_dequeues(&mut self, events: &[Event], hist: &History, cursor: &mut usize) -> bool {
        let begin = *cursor;
        while *cursor < events.len() {
            let e = events[*cursor];
            let o = &hist.ops[e.op];
            if self.ignored.contains(&o.value) || o.method != Method::Deq {
                *cursor += 1;
                continue;
            }
            if e.kind == EventKind::Response {
                break;
            }
            self.upgrade(o.value);
            *cursor += 1;
        }
        begin != *cursor
    }

    /// Forward over enqueue events, tracking the candidate first front
    /// value: the time-mirror of [`ScanState::backward_fronts`].
    fn forward_fronts(
        &mut self,
        events: &[Event],
        hist: &History,
        cursor: &mut usize,
        first_front: &mut Option<Value>,
    ) -> bool {
        let begin = *cursor;
        while *cursor < events.len() {
            let e = events[*cursor];
            let o = &hist.ops[e.op];
            if self.ignored.contains(&o.value) || o.method == Method::Deq {
                *cursor += 1;
                continue;
            }

            if first_front.is_some_and(|first| self.ignored.contains(&first)) {
                *first_front = None;
            }

            match e.kind {
                EventKind::Response => {
                    if first_front.is_none() {
                        *first_front = Some(o.value);
                    }
                    if *first_front != Some(o.value) || self.limit_front(o.value) {
                        break;
                    }
                }
                EventKind::Invocation => self.consume_front(o.value),
            }
            *cursor += 1;
        }
        begin != *cursor
    }
}

pub fn is_linearizable(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::Queue, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events(hist, &mut events, DataKind::Queue, empty_val)
        || !verify_empty(hist, &mut events, DataKind::Queue, empty_val)
    {
        return false;
    }
    strip_empty(hist, empty_val);

    let mut events = events_of(hist);
    sort_events(&mut events);

    let mut state = ScanState::new(hist);
    let mut enq_cursor = events.len();
    let mut front_cursor = events.len();
    let mut last_front: Option<Value> = None;

    while state.backward_enqueues(&events, hist, &mut enq_cursor)
        || state.backward_fronts(&events, hist, &mut front_cursor, &mut last_front)
    {}

    if enq_cursor != 0 || front_cursor != 0 {
        debug!(enq_cursor, front_cursor, "scanners stalled before the stream start");
        return false;
    }
    true
}

pub fn is_linearizable_no_peeks(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::Queue, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events_no_peeks(hist, &mut events, DataKind::Queue, empty_val)
        || !verify_empty(hist, &mut events, DataKind::Queue, empty_val)
    {
        return false;
    }
    strip_empty(hist, empty_val);

    let mut events = events_of(hist);
    sort_events(&mut events);

    let mut state = ScanState::new(hist);
    let mut deq_cursor = 0usize;
    let mut front_cursor = 0usize;
    let mut first_front: Option<Value> = None;

    while state.forward_dequeues(&events, hist, &mut deq_cursor)
        || state.forward_fronts(&events, hist, &mut front_cursor, &mut first_front)
    {}

    deq_cursor == events.len() && front_cursor == events.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Operation, Time, DEFAULT_EMPTY_VALUE as EMPTY};

    fn hist(ops: &[(Method, Value, Time, Time)]) -> History {
        ops.iter()
            .enumerate()
            .map(|(i, &(m, v, s, e))| Operation::new(i as u32 + 1, m, v, s, e))
            .collect()
    }

    fn check_both(ops: &[(Method, Value, Time, Time)], want: bool) {
        let mut h = hist(ops);
        assert_eq!(is_linearizable(&mut h, EMPTY), want, "peek variant");
        if ops
            .iter()
            .all(|&(m, ..)| matches!(m, Method::Enq | Method::Deq))
        {
            let mut h = hist(ops);
            assert_eq!(
                is_linearizable_no_peeks(&mut h, EMPTY),
                want,
                "no-peek variant"
            );
        }
    }

    #[test]
    fn accepts_fifo_order() {
        check_both(
            &[
                (Method::Enq, 1, 1, 2),
                (Method::Enq, 2, 3, 4),
                (Method::Deq, 1, 5, 6),
                (Method::Deq, 2, 7, 8),
            ],
            true,
        );
    }

    #[test]
    fn rejects_fifo_inversion() {
        check_both(
            &[
                (Method::Enq, 1, 1, 2),
                (Method::Enq, 2, 3, 4),
                (Method::Deq, 2, 5, 6),
                (Method::Deq, 1, 7, 8),
            ],
            false,
        );
    }

    #[test]
    fn accepts_inverted_dequeues_of_overlapping_enqueues() {
        check_both(
            &[
                (Method::Enq, 1, 1, 4),
                (Method::Enq, 2, 2, 3),
                (Method::Deq, 2, 5, 6),
                (Method::Deq, 1, 7, 8),
            ],
            true,
        );
    }

    #[test]
    fn accepts_overlapping_dequeues_in_either_order() {
        check_both(
            &[
                (Method::Enq, 1, 1, 2),
                (Method::Enq, 2, 3, 4),
                (Method::Deq, 2, 5, 8),
                (Method::Deq, 1, 6, 7),
            ],
            true,
        );
    }

    #[test]
    fn accepts_peek_of_current_front() {
        let mut h = hist(&[
            (Method::Enq, 1, 1, 2),
            (Method::PeekFront, 1, 3, 4),
            (Method::Enq, 2, 5, 6),
            (Method::Deq, 1, 7, 8),
            (Method::Deq, 2, 9, 10),
        ]);
        assert!(is_linearizable(&mut h, EMPTY));
    }

    #[test]
    fn rejects_peek_of_buried_value() {
        // Value 1 is still at the front when value 2 is peeked.
        let mut h = hist(&[
            (Method::Enq, 1, 1, 2),
            (Method::Enq, 2, 3, 4),
            (Method::PeekFront, 2, 5, 6),
            (Method::Deq, 1, 7, 8),
            (Method::Deq, 2, 9, 10),
        ]);
        assert!(!is_linearizable(&mut h, EMPTY));
    }

    #[test]
    fn accepts_unmatched_enqueues() {
        check_both(
            &[(Method::Enq, 1, 1, 2), (Method::Enq, 2, 3, 4)],
            true,
        );
    }

    #[test]
    fn rejects_dequeue_of_never_enqueued_value() {
        check_both(&[(Method::Deq, 9, 1, 2)], false);
    }

    #[test]
    fn rejects_empty_dequeue_while_queue_provably_nonempty() {
        check_both(
            &[
                (Method::Enq, 1, 1, 2),
                (Method::Deq, EMPTY, 3, 4),
                (Method::Deq, 1, 5, 6),
            ],
            false,
        );
    }

    #[test]
    fn accepts_empty_dequeue_after_drain() {
        check_both(
            &[
                (Method::Enq, 1, 1, 2),
                (Method::Deq, 1, 3, 4),
                (Method::Deq, EMPTY, 5, 6),
            ],
            true,
        );
    }

    #[test]
    fn empty_history_is_linearizable() {
        check_both(&[], true);
    }
}
