//! Stack monitor: permissive-position search.
//!
//! Every value whose push completes before its pop begins pins a critical
//! interval `[push.end, pop.start)` during which it must sit in the
//! stack. The monitor keeps a segment tree of critical covers (each node
//! carries `(cover, value-sum)` so the unique covering value is
//! recoverable wherever the cover is exactly one) and repeatedly picks
//! the least-covered position:
//!
//! - cover 0: the position is free; every live operation containing it
//!   may linearize there and is discharged;
//! - cover 1: the covering value is the mandated top of stack, so only
//!   its own operations discharge there; the position is replayed once
//!   that value's cover is retracted;
//! - cover >= 2: two values both demand the top of the same instant and
//!   the history is rejected, unless the cover is saturated past the
//!   position count, which signals every position was already consumed
//!   and the remainder discharges trivially.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::collections::{
    CoverSum, Interval, IntervalTree, LazySegmentTree, SegmentValue, StaticIntervalTree,
};
use crate::events::events_of;
use crate::frontend::{
    extend_history, max_event_time, strip_empty, tune_events, tune_events_no_peeks,
    verify_empty,
};
use crate::history::{DataKind, History, Method, Time, Value};

/// Outcome of selecting the next permissive position.
#[derive(Debug)]
enum Permissive {
    /// Cover 0: any live operation containing the position may linearize.
    Free(Time),
    /// Cover 1: only operations on this value may linearize here.
    Pinned(Time, Value),
    /// Cover >= 2 from live values: no single top of stack exists.
    MultiLayers,
    /// Saturated cover: every position has been consumed already.
    InfiniteLayers,
}

/// Critical-interval cover tree plus the deferred-position bookkeeping.
struct CriticalCovers {
    tree: LazySegmentTree<CoverSum>,
    intervals: HashMap<Value, (Time, Time)>,
    /// Positions chosen under cover 1, replayable once the value retires.
    waiting_returns: HashMap<Value, Vec<Time>>,
    pending_returns: Vec<Time>,
    positions: i64,
}

impl CriticalCovers {
    fn new(hist: &History, max_time: Time) -> Self {
        let mut intervals: HashMap<Value, (Time, Time)> = HashMap::with_capacity(hist.len());
        for o in &hist.ops {
            if o.method == Method::Push {
                intervals.entry(o.value).or_insert((0, 0)).0 = o.end;
            } else if o.method == Method::Pop {
                intervals.entry(o.value).or_insert((0, 0)).1 = o.start;
            }
        }

        let mut leaves = vec![CoverSum::IDENTITY; max_time as usize + 1];
        for (&value, &(start, end)) in &intervals {
            if start < end {
                leaves[start as usize].cover += 1;
                leaves[start as usize].sum += value;
                leaves[end as usize].cover -= 1;
                leaves[end as usize].sum -= value;
            }
        }
        let mut running = CoverSum::IDENTITY;
        for leaf in &mut leaves {
            running.cover += leaf.cover;
            running.sum += leaf.sum;
            *leaf = running;
        }

        Self {
            tree: LazySegmentTree::from_leaves(&leaves),
            intervals,
            waiting_returns: HashMap::new(),
            pending_returns: Vec::new(),
            positions: max_time as i64,
        }
    }

    /// Retire a fully discharged value: retract its cover and requeue the
    /// positions that were waiting on it.
    fn retract(&mut self, value: Value) {
        if let Some(&(start, end)) = self.intervals.get(&value) {
            if start < end {
                self.tree.update_range(
                    start as usize,
                    end as usize - 1,
                    CoverSum {
                        cover: -1,
                        sum: -value,
                    },
                );
            }
        }
        if let Some(positions) = self.waiting_returns.remove(&value) {
            self.pending_returns.extend(positions);
        }
    }

    fn next_permissive(&mut self) -> Permissive {
        if let Some(position) = self.pending_returns.pop() {
            return Permissive::Free(position);
        }

        let (layers, position) = self.tree.min();
        self.tree.remove_point(position);
        match layers.cover {
            0 => Permissive::Free(position as Time),
            1 => {
                self.waiting_returns
                    .entry(layers.sum)
                    .or_default()
                    .push(position as Time);
                Permissive::Pinned(position as Time, layers.sum)
            }
            cover if cover <= self.positions => Permissive::MultiLayers,
            _ => Permissive::InfiniteLayers,
        }
    }
}

pub fn is_linearizable(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::Stack, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events(hist, &mut events, DataKind::Stack, empty_val)
        || !verify_empty(hist, &mut events, DataKind::Stack, empty_val)
    {
        return false;
    }
    let max_time = max_event_time(&events);
    strip_empty(hist, empty_val);
    if hist.is_empty() {
        return true;
    }

    let mut live = IntervalTree::bounded(hist.len());
    let mut by_value: HashMap<Value, IntervalTree> = HashMap::new();
    let mut value_at_start: Vec<Value> = vec![0; max_time as usize + 1];
    let mut covers = CriticalCovers::new(hist, max_time);

    for o in &hist.ops {
        let interval = Interval::new(o.start, o.end);
        live.insert(interval);
        value_at_start[o.start as usize] = o.value;
        by_value
            .entry(o.value)
            .or_insert_with(|| IntervalTree::growable(2))
            .insert(interval);
    }

    while !live.is_empty() {
        let discharged = match covers.next_permissive() {
            Permissive::MultiLayers => {
                debug!("two values demand the top of the same position");
                return false;
            }
            Permissive::InfiniteLayers => return true,
            Permissive::Free(position) => live.stab(position),
            Permissive::Pinned(position, value) => by_value[&value].stab(position),
        };
        for interval in discharged {
            let value = value_at_start[interval.start as usize];
            let tree = by_value
                .get_mut(&value)
                .expect("discharged operation belongs to a live value");
            tree.remove(interval);
            live.remove(interval);
            if tree.is_empty() {
                covers.retract(value);
            }
        }
    }

    true
}

/// Without peeks every value is exactly a push/pop pair, so per-value
/// interval trees collapse to a second-visit set and the live operations
/// fit a bulk-built static tree.
pub fn is_linearizable_no_peeks(hist: &mut History, empty_val: Value) -> bool {
    if !extend_history(hist, DataKind::Stack, empty_val) {
        return false;
    }
    let mut events = events_of(hist);
    if !tune_events_no_peeks(hist, &mut events, DataKind::Stack, empty_val)
        || !verify_empty(hist, &mut events, DataKind::Stack, empty_val)
    {
        return false;
    }
    let max_time = max_event_time(&events);
    strip_empty(hist, empty_val);
    if hist.is_empty() {
        return true;
    }

    let mut value_at_start: Vec<Value> = vec![0; max_time as usize + 1];
    let mut intervals = Vec::with_capacity(hist.len());
    for o in &hist.ops {
        intervals.push(Interval::new(o.start, o.end));
        value_at_start[o.start as usize] = o.value;
    }
    let mut covers = CriticalCovers::new(hist, max_time);
    let mut live = StaticIntervalTree::new(intervals);
    let mut seen_once: HashSet<Value> = HashSet::with_capacity(hist.len() / 2 + 1);

    while !live.is_empty() {
        match covers.next_permissive() {
            Permissive::MultiLayers => return false,
            Permissive::InfiniteLayers => return true,
            Permissive::Pinned(..) => continue,
            Permissive::Free(position) => {
                for interval in live.remove_containing(position) {
                    let value = value_at_start[interval.start as usize];
                    if !seen_once.insert(value) {
                        covers.retract(value);
                    }
                }
            }
        }
    }

    true
}
