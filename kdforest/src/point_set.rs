// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A multiset of points ordered by a relaxed or idle k-d tree (spec.md §1's
//! point-set container, built as a thin adaptor over `kdforest-core::Tree`).

use kdforest_core::{
    iter::{Bounds, EqualTo, InOrder, Mapping, Neighbor, Region},
    Balancing, CoordCompare, Loose, Metric, Point, Rank, Result, Tree,
};

/// A multiset of `k`-dimensional points, ordered by a k-d tree.
///
/// Duplicate points are permitted, matching the engine's native multiset
/// semantics (spec.md §8: `rebalance` is stated to preserve "the multiset
/// of stored values"). Use [`PointSet::remove_all`] to drop every
/// occurrence of a key at once.
#[derive(Clone, Debug)]
pub struct PointSet<P: Point, R: Rank, B: Balancing = Loose> {
    tree: Tree<P, CoordCompare, R, B>,
}

impl<P: Point, R: Rank, B: Balancing> PointSet<P, R, B> {
    /// Construct an empty set over the given rank and balancing policy.
    pub fn new(rank: R, balancing: B) -> Self {
        Self { tree: Tree::new(rank, CoordCompare, balancing) }
    }

    /// Insert a point, allowing duplicates.
    pub fn insert(&mut self, point: P) {
        self.tree.insert(point);
    }

    /// Does the set contain a point equal to `point` on every coordinate?
    pub fn contains(&self, point: &P) -> bool {
        self.tree.find(point).is_some()
    }

    /// Remove one occurrence of `point`, if present.
    pub fn remove(&mut self, point: &P) -> bool {
        match self.tree.find(point) {
            Some(id) => {
                self.tree.erase(id);
                true
            }
            None => false,
        }
    }

    /// Remove every occurrence of `point`, returning how many were removed.
    pub fn remove_all(&mut self, point: &P) -> usize {
        let mut count = 0;
        while let Some(id) = self.tree.find(point) {
            self.tree.erase(id);
            count += 1;
        }
        count
    }

    /// Number of points stored, counting duplicates.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Force a full rebuild into a balanced tree (spec.md §4.4). Mainly
    /// useful for the idle balancing policy, which never rebalances on its
    /// own.
    pub fn rebalance(&mut self) {
        self.tree.rebalance();
    }

    /// Exchange contents with `other` in constant time (spec.md §4.4).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    /// Structural traversal in the tree's own order (spec.md §4.5).
    pub fn iter(&self) -> InOrder<'_, P, CoordCompare, R, B> {
        self.tree.iter()
    }

    /// Ascending traversal along one axis (spec.md §4.6). Returns
    /// [`kdforest_core::Error::InvalidDimension`] if `axis` is out of range.
    pub fn mapping(&self, axis: usize) -> Result<Mapping<'_, P, CoordCompare, R, B>> {
        self.tree.mapping(axis)
    }

    /// Like [`PointSet::mapping`], starting at the first point whose
    /// coordinate on `axis` is at least (`inclusive`) or strictly greater
    /// than (`!inclusive`) `bound` (spec.md §4.6).
    pub fn mapping_lower_bound(&self, axis: usize, bound: P::Coord) -> Result<Mapping<'_, P, CoordCompare, R, B>> {
        self.tree.mapping_lower_bound(axis, bound)
    }

    /// Like [`PointSet::mapping`], starting strictly past the last point
    /// whose coordinate on `axis` is at most `bound` (spec.md §4.6).
    pub fn mapping_upper_bound(&self, axis: usize, bound: P::Coord) -> Result<Mapping<'_, P, CoordCompare, R, B>> {
        self.tree.mapping_upper_bound(axis, bound)
    }

    /// Points matching a region predicate, e.g. [`Bounds`] (spec.md §4.7).
    pub fn region<Pred: kdforest_core::RegionPredicate<P>>(
        &self,
        pred: Pred,
    ) -> Region<'_, P, CoordCompare, R, B, Pred> {
        self.tree.region(pred)
    }

    /// All points equal to `target` (spec.md §4.7's equal-bounds factory).
    pub fn equal_range(&self, target: P) -> Region<'_, P, CoordCompare, R, B, EqualTo<P>> {
        self.tree.region(EqualTo::new(target))
    }

    /// All points within a half-open or closed box (spec.md §4.7).
    pub fn in_box(&self, bounds: Bounds<P>) -> Region<'_, P, CoordCompare, R, B, Bounds<P>> {
        self.tree.region(bounds)
    }

    /// Points in increasing distance from `target` under `metric` (spec.md §4.8).
    pub fn neighbors<M: Metric<P>>(&self, metric: M, target: P) -> Neighbor<'_, P, CoordCompare, R, B, M> {
        self.tree.neighbors(metric, target)
    }

    /// Like [`PointSet::neighbors`], starting at the first point at least
    /// `bound` away from `target`. Returns
    /// [`kdforest_core::Error::NegativeDistance`] if `bound` is negative
    /// (spec.md §4.8).
    pub fn neighbors_lower_bound<M: Metric<P>>(
        &self,
        metric: M,
        target: P,
        bound: M::Distance,
    ) -> Result<Neighbor<'_, P, CoordCompare, R, B, M>>
    where
        M::Distance: Default,
    {
        self.tree.neighbors_lower_bound(metric, target, bound)
    }

    /// Like [`PointSet::neighbors`], starting strictly past the last point
    /// at most `bound` away from `target`. Returns
    /// [`kdforest_core::Error::NegativeDistance`] if `bound` is negative
    /// (spec.md §4.8).
    pub fn neighbors_upper_bound<M: Metric<P>>(
        &self,
        metric: M,
        target: P,
        bound: M::Distance,
    ) -> Result<Neighbor<'_, P, CoordCompare, R, B, M>>
    where
        M::Distance: Default,
    {
        self.tree.neighbors_upper_bound(metric, target, bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdforest_core::{EuclidianF64, StaticRank};

    fn set() -> PointSet<[f64; 2], StaticRank<2>, Loose> {
        PointSet::new(StaticRank::<2>::new(), Loose)
    }

    #[test]
    fn insert_and_contains() {
        let mut s = set();
        s.insert([1.0, 2.0]);
        s.insert([3.0, 4.0]);
        assert!(s.contains(&[1.0, 2.0]));
        assert!(!s.contains(&[5.0, 5.0]));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn duplicates_are_retained_until_remove_all() {
        let mut s = set();
        s.insert([1.0, 1.0]);
        s.insert([1.0, 1.0]);
        s.insert([1.0, 1.0]);
        assert_eq!(s.len(), 3);
        assert!(s.remove(&[1.0, 1.0]));
        assert_eq!(s.len(), 2);
        assert_eq!(s.remove_all(&[1.0, 1.0]), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn neighbors_orders_by_distance() {
        let mut s = set();
        for p in [[0.0, 0.0], [5.0, 5.0], [1.0, 1.0], [-2.0, -2.0]] {
            s.insert(p);
        }
        let nearest = s.neighbors(EuclidianF64, [0.0, 0.0]).next().unwrap();
        assert_eq!(nearest.0, &[0.0, 0.0]);
    }

    #[test]
    fn mapping_rejects_out_of_range_axis() {
        let s = set();
        assert!(s.mapping(2).is_err());
        assert!(s.mapping(0).is_ok());
    }

    #[test]
    fn swap_is_involutive() {
        let mut a = set();
        let mut b = set();
        a.insert([1.0, 1.0]);
        b.insert([9.0, 9.0]);
        b.insert([8.0, 8.0]);
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(&[9.0, 9.0]));
        assert_eq!(b.len(), 1);
        assert!(b.contains(&[1.0, 1.0]));
        a.swap(&mut b);
        assert_eq!(a.len(), 1);
        assert!(a.contains(&[1.0, 1.0]));
    }

    proptest::proptest! {
        #[test]
        fn insert_and_remove_round_trip(xs in proptest::collection::vec(-100i64..100, 0..30)) {
            let mut s: PointSet<[i64; 1], StaticRank<1>, Loose> = PointSet::new(StaticRank::<1>::new(), Loose);
            for x in &xs {
                s.insert([*x]);
            }
            proptest::prop_assert_eq!(s.len(), xs.len());
            for x in &xs {
                proptest::prop_assert!(s.contains(&[*x]));
            }
            for x in &xs {
                s.remove(&[*x]);
            }
            proptest::prop_assert!(s.is_empty());
        }
    }
}
