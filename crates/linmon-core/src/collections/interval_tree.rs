//! Interval trees over half-open timestamp intervals.
//!
//! [`IntervalTree`] is an arena-backed AVL tree keyed by interval start
//! and augmented with the subtree maximum endpoint, supporting O(log n)
//! insert/remove and `O(m log n)` stabbing queries. [`StaticIntervalTree`]
//! bulk-builds flat arrays from the full interval set and only supports
//! stab-and-remove, compacting itself once half the entries are gone.

use crate::collections::slab::Slab;
use crate::history::Time;

/// Half-open interval `[start, end)` over the timestamp space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Time,
    pub end: Time,
}

impl Interval {
    #[must_use]
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, point: Time) -> bool {
        self.start <= point && point < self.end
    }
}

const NIL: u32 = u32::MAX;

#[derive(Debug)]
struct Node {
    interval: Interval,
    max_end: Time,
    height: u32,
    left: u32,
    right: u32,
}

/// Self-balancing interval tree. Inserted intervals must have unique
/// start times (post-tune timestamps are distinct).
#[derive(Debug)]
pub struct IntervalTree {
    nodes: Slab<Node>,
    root: u32,
}

impl IntervalTree {
    /// A tree whose node arena never exceeds `cap` live nodes.
    #[must_use]
    pub fn bounded(cap: usize) -> Self {
        Self {
            nodes: Slab::bounded(cap),
            root: NIL,
        }
    }

    /// A tree whose node arena grows on demand.
    #[must_use]
    pub fn growable(cap: usize) -> Self {
        Self {
            nodes: Slab::growable(cap),
            root: NIL,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn insert(&mut self, interval: Interval) {
        self.root = self.insert_at(self.root, interval);
    }

    /// Remove an interval previously inserted. Removing an interval that
    /// is not present leaves the tree unchanged.
    pub fn remove(&mut self, interval: Interval) {
        self.root = self.remove_at(self.root, interval);
    }

    /// Every interval containing `point`, in tree order.
    #[must_use]
    pub fn stab(&self, point: Time) -> Vec<Interval> {
        let mut out = Vec::new();
        self.collect(self.root, point, &mut out);
        out
    }

    fn height(&self, n: u32) -> u32 {
        if n == NIL {
            0
        } else {
            self.nodes[n].height
        }
    }

    fn max_end(&self, n: u32) -> Time {
        if n == NIL {
            0
        } else {
            self.nodes[n].max_end
        }
    }

    /// Recompute height and `max_end` from both children.
    fn refresh(&mut self, n: u32) {
        let (left, right) = (self.nodes[n].left, self.nodes[n].right);
        let height = 1 + self.height(left).max(self.height(right));
        let max_end = self.nodes[n]
            .interval
            .end
            .max(self.max_end(left))
            .max(self.max_end(right));
        let node = &mut self.nodes[n];
        node.height = height;
        node.max_end = max_end;
    }

    fn balance_factor(&self, n: u32) -> i32 {
        self.height(self.nodes[n].left) as i32 - self.height(self.nodes[n].right) as i32
    }

    fn rotate_right(&mut self, y: u32) -> u32 {
        let x = self.nodes[y].left;
        let t2 = self.nodes[x].right;
        self.nodes[x].right = y;
        self.nodes[y].left = t2;
        self.refresh(y);
        self.refresh(x);
        x
    }

    fn rotate_left(&mut self, x: u32) -> u32 {
        let y = self.nodes[x].right;
        let t2 = self.nodes[y].left;
        self.nodes[y].left = x;
        self.nodes[x].right = t2;
        self.refresh(x);
        self.refresh(y);
        y
    }

    fn rebalance(&mut self, n: u32) -> u32 {
        let balance = self.balance_factor(n);
        if balance >= 2 {
            let left = self.nodes[n].left;
            if self.balance_factor(left) == -1 {
                let rotated = self.rotate_left(left);
                self.nodes[n].left = rotated;
            }
            return self.rotate_right(n);
        }
        if balance <= -2 {
            let right = self.nodes[n].right;
            if self.balance_factor(right) == 1 {
                let rotated = self.rotate_right(right);
                self.nodes[n].right = rotated;
            }
            return self.rotate_left(n);
        }
        n
    }

    fn insert_at(&mut self, n: u32, interval: Interval) -> u32 {
        if n == NIL {
            return self.nodes.alloc(Node {
                interval,
                max_end: interval.end,
                height: 1,
                left: NIL,
                right: NIL,
            });
        }
        if interval.start < self.nodes[n].interval.start {
            let left = self.insert_at(self.nodes[n].left, interval);
            self.nodes[n].left = left;
        } else {
            let right = self.insert_at(self.nodes[n].right, interval);
            self.nodes[n].right = right;
        }
        self.refresh(n);
        self.rebalance(n)
    }

    fn min_node(&self, mut n: u32) -> u32 {
        while self.nodes[n].left != NIL {
            n = self.nodes[n].left;
        }
        n
    }

    fn remove_at(&mut self, n: u32, interval: Interval) -> u32 {
        if n == NIL {
            return NIL;
        }
        let start = self.nodes[n].interval.start;
        if interval.start < start {
            let left = self.remove_at(self.nodes[n].left, interval);
            self.nodes[n].left = left;
        } else if interval.start > start {
            let right = self.remove_at(self.nodes[n].right, interval);
            self.nodes[n].right = right;
        } else {
            let (left, right) = (self.nodes[n].left, self.nodes[n].right);
            if left == NIL || right == NIL {
                let child = if left != NIL { left } else { right };
                self.nodes.free(n);
                return child;
            }
            let successor = self.min_node(right);
            let succ_interval = self.nodes[successor].interval;
            self.nodes[n].interval = succ_interval;
            let right = self.remove_at(right, succ_interval);
            self.nodes[n].right = right;
        }
        self.refresh(n);
        self.rebalance(n)
    }

    fn collect(&self, n: u32, point: Time, out: &mut Vec<Interval>) {
        if n == NIL {
            return;
        }
        let interval = self.nodes[n].interval;
        let (left, right) = (self.nodes[n].left, self.nodes[n].right);
        if interval.contains(point) {
            out.push(interval);
        }
        if left != NIL && self.nodes[left].max_end > point {
            self.collect(left, point, out);
        }
        if right != NIL && interval.start <= point {
            self.collect(right, point, out);
        }
    }
}

const NONE: usize = usize::MAX;

/// An interval whose `end` was cleared to this value has been removed.
/// Live intervals always have `end > start >= 0`.
const REMOVED_END: Time = 0;

#[derive(Debug, Clone, Copy, Default)]
struct NodeStat {
    left: usize,
    right: usize,
    max_end: Time,
}

/// Balanced interval tree over a fixed interval set, laid out flat.
#[derive(Debug)]
pub struct StaticIntervalTree {
    intervals: Vec<Interval>,
    stats: Vec<NodeStat>,
    live: usize,
    root: usize,
}

impl StaticIntervalTree {
    #[must_use]
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by_key(|iv| iv.start);
        let n = intervals.len();
        let mut tree = Self {
            intervals,
            stats: vec![NodeStat::default(); n],
            live: n,
            root: NONE,
        };
        if n > 0 {
            tree.root = tree.build(0, n - 1);
        }
        tree
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Remove and return every live interval containing `point`.
    pub fn remove_containing(&mut self, point: Time) -> Vec<Interval> {
        let mut out = Vec::new();
        if self.root != NONE {
            self.remove_rec(self.root, point, &mut out);
            self.live -= out.len();
            if self.live < self.root {
                self.rebuild();
            }
        }
        out
    }

    fn stat_max_end(&self, n: usize) -> Time {
        if n == NONE {
            0
        } else {
            self.stats[n].max_end
        }
    }

    fn build(&mut self, l: usize, r: usize) -> usize {
        let mid = (l + r) / 2;
        let left = if l < mid { self.build(l, mid - 1) } else { NONE };
        let right = if mid < r { self.build(mid + 1, r) } else { NONE };
        let max_end = self.intervals[mid]
            .end
            .max(self.stat_max_end(left))
            .max(self.stat_max_end(right));
        self.stats[mid] = NodeStat {
            left,
            right,
            max_end,
        };
        mid
    }

    fn remove_rec(&mut self, n: usize, point: Time, out: &mut Vec<Interval>) {
        let NodeStat { left, right, .. } = self.stats[n];
        if left != NONE && self.stats[left].max_end > point {
            self.remove_rec(left, point, out);
        }
        if right != NONE && self.intervals[n].start <= point {
            self.remove_rec(right, point, out);
        }
        let interval = self.intervals[n];
        if interval.contains(point) {
            out.push(interval);
            self.intervals[n].end = REMOVED_END;
            self.stats[n].max_end = self.stat_max_end(left).max(self.stat_max_end(right));
        }
    }

    /// Compact away removed entries and rebuild over the survivors, which
    /// are still sorted by start.
    fn rebuild(&mut self) {
        self.intervals.retain(|iv| iv.start < iv.end);
        debug_assert_eq!(self.intervals.len(), self.live);
        let n = self.intervals.len();
        self.stats = vec![NodeStat::default(); n];
        self.root = if n > 0 { self.build(0, n - 1) } else { NONE };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn iv(start: Time, end: Time) -> Interval {
        Interval::new(start, end)
    }

    #[test]
    fn stab_is_half_open() {
        let mut tree = IntervalTree::bounded(4);
        tree.insert(iv(2, 5));
        assert!(tree.stab(1).is_empty());
        assert_eq!(tree.stab(2), vec![iv(2, 5)]);
        assert_eq!(tree.stab(4), vec![iv(2, 5)]);
        assert!(tree.stab(5).is_empty());
    }

    #[test]
    fn long_interval_is_not_lost_behind_short_siblings() {
        // A rotation-free insertion order where a stale subtree max_end
        // would prune away the only match.
        let mut tree = IntervalTree::bounded(8);
        tree.insert(iv(20, 21));
        tree.insert(iv(10, 11));
        tree.insert(iv(30, 31));
        tree.insert(iv(5, 99));
        assert_eq!(tree.stab(50), vec![iv(5, 99)]);
    }

    #[test]
    fn remove_keeps_remaining_intervals_queryable() {
        let mut tree = IntervalTree::bounded(8);
        for (s, e) in [(1, 10), (2, 4), (3, 8), (6, 12)] {
            tree.insert(iv(s, e));
        }
        tree.remove(iv(3, 8));
        let mut got = tree.stab(7);
        got.sort_by_key(|i| i.start);
        assert_eq!(got, vec![iv(1, 10), iv(6, 12)]);
        tree.remove(iv(1, 10));
        tree.remove(iv(2, 4));
        tree.remove(iv(6, 12));
        assert!(tree.is_empty());
    }

    #[test]
    fn randomized_tree_matches_naive_oracle() {
        let mut rng = StdRng::seed_from_u64(0x1417);
        let mut tree = IntervalTree::growable(4);
        let mut naive: Vec<Interval> = Vec::new();
        // Unique starts, as the monitors guarantee post-tune.
        let mut starts: Vec<Time> = (1..400).collect();
        for _ in 0..300 {
            if naive.is_empty() || rng.gen_bool(0.6) {
                let pos = rng.gen_range(0..starts.len());
                let start = starts.swap_remove(pos);
                let end = start + rng.gen_range(1..40);
                let interval = iv(start, end);
                tree.insert(interval);
                naive.push(interval);
            } else {
                let victim = naive.swap_remove(rng.gen_range(0..naive.len()));
                tree.remove(victim);
                starts.push(victim.start);
            }
            let point = rng.gen_range(0..450);
            let mut got = tree.stab(point);
            got.sort_by_key(|i| i.start);
            let mut want: Vec<Interval> =
                naive.iter().copied().filter(|i| i.contains(point)).collect();
            want.sort_by_key(|i| i.start);
            assert_eq!(got, want);
        }
    }

    #[test]
    fn static_tree_removes_everything_it_returns() {
        let intervals: Vec<Interval> =
            [(1, 5), (2, 9), (4, 6), (7, 12), (10, 11)].map(|(s, e)| iv(s, e)).to_vec();
        let mut tree = StaticIntervalTree::new(intervals);
        let mut got = tree.remove_containing(4);
        got.sort_by_key(|i| i.start);
        assert_eq!(got, vec![iv(1, 5), iv(2, 9), iv(4, 6)]);
        assert!(tree.remove_containing(4).is_empty());
        let rest = tree.remove_containing(10);
        assert_eq!(rest.len(), 2);
        assert!(tree.is_empty());
    }

    #[test]
    fn static_tree_survives_compaction() {
        let mut rng = StdRng::seed_from_u64(0xacde);
        let mut naive: Vec<Interval> = (0..200u64)
            .map(|i| {
                let start = i * 3 + 1;
                iv(start, start + rng.gen_range(1..30))
            })
            .collect();
        let mut tree = StaticIntervalTree::new(naive.clone());
        while !tree.is_empty() {
            let point = rng.gen_range(0..650);
            let mut got = tree.remove_containing(point);
            got.sort_by_key(|i| i.start);
            let mut want: Vec<Interval> =
                naive.iter().copied().filter(|i| i.contains(point)).collect();
            want.sort_by_key(|i| i.start);
            assert_eq!(got, want);
            naive.retain(|i| !i.contains(point));
        }
        assert!(naive.is_empty());
    }
}
