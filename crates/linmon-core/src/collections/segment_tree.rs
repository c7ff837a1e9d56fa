//! Lazy segment tree with range add, minimum queries and point disabling.
//!
//! Leaf payloads are pluggable: the priority-queue monitor counts plain
//! covers, the stack monitor carries a `(cover, value-sum)` composite so
//! the unique covering value is recoverable wherever the cover is exactly
//! one. Minimum queries compare only the payload's key and break ties to
//! the leftmost position.

/// Payload stored at each position of a [`LazySegmentTree`].
pub trait SegmentValue: Copy {
    /// The neutral element for [`SegmentValue::accumulate`].
    const IDENTITY: Self;

    /// Fold a range-update delta into this payload.
    fn accumulate(&mut self, delta: Self);

    /// The component minimized by `min` queries.
    fn key(&self) -> i64;

    /// Push the key to `i64::MAX` so the position is never chosen again.
    fn saturate(&mut self);
}

impl SegmentValue for i64 {
    const IDENTITY: Self = 0;

    fn accumulate(&mut self, delta: Self) {
        *self = self.saturating_add(delta);
    }

    fn key(&self) -> i64 {
        *self
    }

    fn saturate(&mut self) {
        *self = i64::MAX;
    }
}

/// Cover count paired with the sum of covering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverSum {
    pub cover: i64,
    pub sum: i64,
}

impl SegmentValue for CoverSum {
    const IDENTITY: Self = CoverSum { cover: 0, sum: 0 };

    fn accumulate(&mut self, delta: Self) {
        self.cover = self.cover.saturating_add(delta.cover);
        self.sum += delta.sum;
    }

    fn key(&self) -> i64 {
        self.cover
    }

    fn saturate(&mut self) {
        self.cover = i64::MAX;
    }
}

#[derive(Debug, Clone, Copy)]
struct Node<V> {
    min: V,
    min_pos: usize,
    pending: V,
}

/// Segment tree over positions `[0, len)`. Ranges are inclusive on both
/// ends; an inverted range is a no-op.
#[derive(Debug)]
pub struct LazySegmentTree<V: SegmentValue> {
    nodes: Vec<Node<V>>,
    len: usize,
}

impl<V: SegmentValue> LazySegmentTree<V> {
    /// All positions start at the identity payload.
    #[must_use]
    pub fn new(len: usize) -> Self {
        assert!(len >= 1, "segment tree needs at least one position");
        let mut tree = Self {
            nodes: vec![
                Node {
                    min: V::IDENTITY,
                    min_pos: 0,
                    pending: V::IDENTITY,
                };
                4 * len
            ],
            len,
        };
        tree.build(1, 0, len - 1, &[]);
        tree
    }

    /// Positions start at the given payloads.
    #[must_use]
    pub fn from_leaves(leaves: &[V]) -> Self {
        assert!(!leaves.is_empty(), "segment tree needs at least one position");
        let len = leaves.len();
        let mut tree = Self {
            nodes: vec![
                Node {
                    min: V::IDENTITY,
                    min_pos: 0,
                    pending: V::IDENTITY,
                };
                4 * len
            ],
            len,
        };
        tree.build(1, 0, len - 1, leaves);
        tree
    }

    /// Number of positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Accumulate `delta` into every position of `[l, r]`.
    pub fn update_range(&mut self, l: usize, r: usize, delta: V) {
        if l > r {
            return;
        }
        debug_assert!(r < self.len);
        self.update(1, 0, self.len - 1, l, r, delta);
    }

    /// The minimum payload (by key) and its leftmost position. O(1).
    #[must_use]
    pub fn min(&self) -> (V, usize) {
        (self.nodes[1].min, self.nodes[1].min_pos)
    }

    /// The minimum payload over `[l, r]` and its leftmost position.
    /// Returns `None` for an inverted range.
    pub fn min_in_range(&mut self, l: usize, r: usize) -> Option<(V, usize)> {
        if l > r {
            return None;
        }
        debug_assert!(r < self.len);
        self.query_min(1, 0, self.len - 1, l, r)
    }

    /// The fully propagated payload at `pos`.
    pub fn value_at(&mut self, pos: usize) -> V {
        debug_assert!(pos < self.len);
        let mut v = 1;
        let (mut tl, mut tr) = (0, self.len - 1);
        while tl != tr {
            self.push_down(v);
            let tm = (tl + tr) / 2;
            if pos <= tm {
                v *= 2;
                tr = tm;
            } else {
                v = 2 * v + 1;
                tl = tm + 1;
            }
        }
        self.nodes[v].min
    }

    /// Saturate the payload at `pos` so no minimum query selects it again.
    pub fn remove_point(&mut self, pos: usize) {
        debug_assert!(pos < self.len);
        self.remove(1, 0, self.len - 1, pos);
    }

    fn build(&mut self, v: usize, tl: usize, tr: usize, leaves: &[V]) {
        if tl == tr {
            self.nodes[v].min = leaves.get(tl).copied().unwrap_or(V::IDENTITY);
            self.nodes[v].min_pos = tl;
            return;
        }
        let tm = (tl + tr) / 2;
        self.build(2 * v, tl, tm, leaves);
        self.build(2 * v + 1, tm + 1, tr, leaves);
        self.merge(v);
    }

    fn apply(&mut self, v: usize, delta: V) {
        self.nodes[v].min.accumulate(delta);
        self.nodes[v].pending.accumulate(delta);
    }

    fn push_down(&mut self, v: usize) {
        let pending = std::mem::replace(&mut self.nodes[v].pending, V::IDENTITY);
        self.apply(2 * v, pending);
        self.apply(2 * v + 1, pending);
    }

    fn merge(&mut self, v: usize) {
        let left = &self.nodes[2 * v];
        let right = &self.nodes[2 * v + 1];
        let take_left = left.min.key() <= right.min.key();
        let (min, min_pos) = if take_left {
            (left.min, left.min_pos)
        } else {
            (right.min, right.min_pos)
        };
        self.nodes[v].min = min;
        self.nodes[v].min_pos = min_pos;
    }

    fn update(&mut self, v: usize, tl: usize, tr: usize, l: usize, r: usize, delta: V) {
        if l > r {
            return;
        }
        if l == tl && r == tr {
            self.apply(v, delta);
            return;
        }
        self.push_down(v);
        let tm = (tl + tr) / 2;
        self.update(2 * v, tl, tm, l, r.min(tm), delta);
        self.update(2 * v + 1, tm + 1, tr, l.max(tm + 1), r, delta);
        self.merge(v);
    }

    fn query_min(
        &mut self,
        v: usize,
        tl: usize,
        tr: usize,
        l: usize,
        r: usize,
    ) -> Option<(V, usize)> {
        if l > r {
            return None;
        }
        if l == tl && r == tr {
            return Some((self.nodes[v].min, self.nodes[v].min_pos));
        }
        self.push_down(v);
        let tm = (tl + tr) / 2;
        let left = self.query_min(2 * v, tl, tm, l, r.min(tm));
        let right = self.query_min(2 * v + 1, tm + 1, tr, l.max(tm + 1), r);
        match (left, right) {
            (Some(a), Some(b)) => Some(if a.0.key() <= b.0.key() { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    fn remove(&mut self, v: usize, tl: usize, tr: usize, pos: usize) {
        if tl == tr {
            self.nodes[v].min.saturate();
            return;
        }
        self.push_down(v);
        let tm = (tl + tr) / 2;
        if pos <= tm {
            self.remove(2 * v, tl, tm, pos);
        } else {
            self.remove(2 * v + 1, tm + 1, tr, pos);
        }
        self.merge(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn point_values_accumulate_range_updates() {
        let mut tree = LazySegmentTree::<i64>::new(8);
        tree.update_range(0, 4, 2);
        tree.update_range(3, 7, 5);
        assert_eq!(tree.value_at(0), 2);
        assert_eq!(tree.value_at(3), 7);
        assert_eq!(tree.value_at(4), 7);
        assert_eq!(tree.value_at(5), 5);
    }

    #[test]
    fn min_ties_break_leftmost() {
        let mut tree = LazySegmentTree::<i64>::new(6);
        tree.update_range(0, 1, 3);
        // Positions 2..=5 all hold 0; the leftmost wins.
        assert_eq!(tree.min(), (0, 2));
        tree.update_range(2, 5, 3);
        assert_eq!(tree.min(), (3, 0));
    }

    #[test]
    fn removed_points_are_never_chosen() {
        let mut tree = LazySegmentTree::<i64>::new(4);
        tree.remove_point(0);
        tree.remove_point(1);
        assert_eq!(tree.min(), (0, 2));
        tree.remove_point(2);
        tree.remove_point(3);
        assert_eq!(tree.min().0, i64::MAX);
    }

    #[test]
    fn cover_sum_recovers_single_covering_value() {
        let mut tree = LazySegmentTree::<CoverSum>::new(10);
        tree.update_range(2, 6, CoverSum { cover: 1, sum: 42 });
        tree.update_range(4, 8, CoverSum { cover: 1, sum: 7 });
        let at3 = tree.value_at(3);
        assert_eq!(at3, CoverSum { cover: 1, sum: 42 });
        let at5 = tree.value_at(5);
        assert_eq!(at5, CoverSum { cover: 2, sum: 49 });
        tree.update_range(2, 6, CoverSum { cover: -1, sum: -42 });
        assert_eq!(tree.value_at(5), CoverSum { cover: 1, sum: 7 });
    }

    #[test]
    fn from_leaves_build_matches_point_queries() {
        let leaves: Vec<i64> = vec![5, 1, 4, 1, 3];
        let mut tree = LazySegmentTree::from_leaves(&leaves);
        for (pos, &want) in leaves.iter().enumerate() {
            assert_eq!(tree.value_at(pos), want);
        }
        assert_eq!(tree.min(), (1, 1));
    }

    #[test]
    fn randomized_updates_match_naive_oracle() {
        let mut rng = StdRng::seed_from_u64(0x5e67);
        let len = 64;
        let mut tree = LazySegmentTree::<i64>::new(len);
        let mut naive = vec![0i64; len];
        for _ in 0..500 {
            let l = rng.gen_range(0..len);
            let r = rng.gen_range(l..len);
            let delta = rng.gen_range(-5..=5i64);
            tree.update_range(l, r, delta);
            for slot in &mut naive[l..=r] {
                *slot += delta;
            }

            let ql = rng.gen_range(0..len);
            let qr = rng.gen_range(ql..len);
            let (got, got_pos) = tree.min_in_range(ql, qr).unwrap();
            let want = *naive[ql..=qr].iter().min().unwrap();
            assert_eq!(got, want);
            assert_eq!(naive[got_pos], want);
            assert!((ql..=qr).contains(&got_pos));

            let p = rng.gen_range(0..len);
            assert_eq!(tree.value_at(p), naive[p]);
        }
    }
}
