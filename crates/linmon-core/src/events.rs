//! Event streams over histories.
//!
//! Every operation contributes an invocation event at its start time and a
//! response event at its end time. Events reference operations by index
//! into the history so the tuner can rewrite timestamps in place.

use crate::history::{History, Time};

/// Invocation or response of an operation. Invocations order before
/// responses at equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Invocation,
    Response,
}

/// One endpoint of an operation's interval. `op` indexes the history the
/// event stream was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: Time,
    pub kind: EventKind,
    pub op: usize,
}

/// Extract the event stream of a history, unsorted.
#[must_use]
pub fn events_of(hist: &History) -> Vec<Event> {
    let mut events = Vec::with_capacity(hist.len() * 2);
    for (op, o) in hist.ops.iter().enumerate() {
        events.push(Event {
            time: o.start,
            kind: EventKind::Invocation,
            op,
        });
        events.push(Event {
            time: o.end,
            kind: EventKind::Response,
            op,
        });
    }
    events
}

/// Sort events lexicographically by `(time, kind)`, invocations first.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by_key(|e| (e.time, e.kind));
}

/// O(n) counting sort for tuned event streams, whose timestamps are
/// distinct and dense (bounded by twice the history size).
pub fn counting_sort_events(events: &mut Vec<Event>) {
    let Some(max_time) = events.iter().map(|e| e.time).max() else {
        return;
    };
    let mut count = vec![0usize; max_time as usize + 1];
    for e in events.iter() {
        count[e.time as usize] += 1;
    }
    for i in 1..count.len() {
        count[i] += count[i - 1];
    }
    let mut output = vec![
        Event {
            time: 0,
            kind: EventKind::Invocation,
            op: 0,
        };
        events.len()
    ];
    for e in events.iter() {
        count[e.time as usize] -= 1;
        output[count[e.time as usize]] = *e;
    }
    *events = output;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Method, Operation};

    fn history() -> History {
        History::new(vec![
            Operation::new(1, Method::Push, 5, 2, 6),
            Operation::new(2, Method::Pop, 5, 6, 9),
        ])
    }

    #[test]
    fn extraction_yields_two_events_per_operation() {
        let events = events_of(&history());
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].time, 2);
        assert_eq!(events[0].kind, EventKind::Invocation);
        assert_eq!(events[1].time, 6);
        assert_eq!(events[1].kind, EventKind::Response);
    }

    #[test]
    fn invocations_sort_before_responses_at_equal_time() {
        let mut events = events_of(&history());
        sort_events(&mut events);
        // Push responds at 6, Pop invokes at 6: the invocation comes first.
        assert_eq!(events[1].kind, EventKind::Invocation);
        assert_eq!(events[1].op, 1);
        assert_eq!(events[2].kind, EventKind::Response);
        assert_eq!(events[2].op, 0);
    }

    #[test]
    fn counting_sort_matches_comparison_sort() {
        let hist = History::new(vec![
            Operation::new(1, Method::Enq, 1, 5, 8),
            Operation::new(2, Method::Enq, 2, 1, 3),
            Operation::new(3, Method::Deq, 1, 9, 12),
            Operation::new(4, Method::Deq, 2, 2, 4),
        ]);
        let mut expected = events_of(&hist);
        sort_events(&mut expected);
        let mut actual = events_of(&hist);
        counting_sort_events(&mut actual);
        // All timestamps distinct here, so both sorts agree exactly.
        assert_eq!(actual, expected);
    }

    #[test]
    fn counting_sort_of_empty_stream_is_a_noop() {
        let mut events: Vec<Event> = Vec::new();
        counting_sort_events(&mut events);
        assert!(events.is_empty());
    }
}
