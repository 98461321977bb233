// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A multiset of boxes ordered by a relaxed or idle k-d tree over `2k` flat
//! coordinates (spec.md §1's box-set container; layout validated per
//! spec.md §6).

use kdforest_core::{
    iter::{Bounds, EqualTo, InOrder, Mapping, Neighbor, Region},
    Balancing, CoordCompare, Loose, Metric, Point, Rank, Result, Tree,
};

use crate::box_layout::{check_box, BoxLayout};

/// A multiset of boxes, each key packing `2k` coordinates per `layout`.
///
/// The tree's own rank is `2k`; the box's spatial dimension `k` is always
/// `rank / 2`, following `original_source`'s `container.dimension() >> 1`.
#[derive(Clone, Debug)]
pub struct BoxSet<P: Point, R: Rank, B: Balancing = Loose> {
    tree: Tree<P, CoordCompare, R, B>,
    layout: BoxLayout,
}

impl<P: Point, R: Rank, B: Balancing> BoxSet<P, R, B> {
    /// Construct an empty set over a `2k`-dimensional rank and a box layout.
    pub fn new(rank: R, balancing: B, layout: BoxLayout) -> Self {
        Self { tree: Tree::new(rank, CoordCompare, balancing), layout }
    }

    fn spatial_rank(&self) -> usize {
        self.tree.dimension() / 2
    }

    /// Insert a box, validating it against this set's layout first.
    pub fn insert(&mut self, key: P) -> Result<()> {
        check_box(self.layout, self.spatial_rank(), &CoordCompare, &key)?;
        self.tree.insert(key);
        Ok(())
    }

    /// Does the set contain a box equal to `key` on every coordinate?
    pub fn contains(&self, key: &P) -> bool {
        self.tree.find(key).is_some()
    }

    /// Remove one occurrence of `key`, if present.
    pub fn remove(&mut self, key: &P) -> bool {
        match self.tree.find(key) {
            Some(id) => {
                self.tree.erase(id);
                true
            }
            None => false,
        }
    }

    /// Number of boxes stored, counting duplicates.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Remove every box.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Force a full rebuild into a balanced tree (spec.md §4.4).
    pub fn rebalance(&mut self) {
        self.tree.rebalance();
    }

    /// Exchange contents and layout with `other` in constant time (spec.md §4.4).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
        core::mem::swap(&mut self.layout, &mut other.layout);
    }

    /// Structural traversal in the tree's own order (spec.md §4.5).
    pub fn iter(&self) -> InOrder<'_, P, CoordCompare, R, B> {
        self.tree.iter()
    }

    /// Ascending traversal along one flat coordinate (spec.md §4.6). Returns
    /// [`kdforest_core::Error::InvalidDimension`] if `axis` is out of range.
    pub fn mapping(&self, axis: usize) -> Result<Mapping<'_, P, CoordCompare, R, B>> {
        self.tree.mapping(axis)
    }

    /// Boxes matching a region predicate over the flat `2k` coordinates (spec.md §4.7).
    pub fn region<Pred: kdforest_core::RegionPredicate<P>>(
        &self,
        pred: Pred,
    ) -> Region<'_, P, CoordCompare, R, B, Pred> {
        self.tree.region(pred)
    }

    /// Every box exactly equal to `target` (spec.md §4.7).
    pub fn equal_range(&self, target: P) -> Region<'_, P, CoordCompare, R, B, EqualTo<P>> {
        self.tree.region(EqualTo::new(target))
    }

    /// Every box within a half-open or closed flat-coordinate bound (spec.md §4.7).
    pub fn in_box(&self, bounds: Bounds<P>) -> Region<'_, P, CoordCompare, R, B, Bounds<P>> {
        self.tree.region(bounds)
    }

    /// Boxes in increasing distance from `target` under `metric` (spec.md §4.8).
    pub fn neighbors<M: Metric<P>>(&self, metric: M, target: P) -> Neighbor<'_, P, CoordCompare, R, B, M> {
        self.tree.neighbors(metric, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdforest_core::StaticRank;

    fn set() -> BoxSet<[i32; 4], StaticRank<4>, Loose> {
        BoxSet::new(StaticRank::<4>::new(), Loose, BoxLayout::LowHigh)
    }

    #[test]
    fn rejects_inverted_box() {
        let mut s = set();
        assert!(s.insert([2, 0, 0, 2]).is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn accepts_well_formed_box() {
        let mut s = set();
        assert!(s.insert([0, 0, 2, 2]).is_ok());
        assert_eq!(s.len(), 1);
        assert!(s.contains(&[0, 0, 2, 2]));
    }

    #[test]
    fn swap_is_involutive() {
        let mut a = set();
        let mut b = set();
        a.insert([0, 0, 1, 1]).unwrap();
        b.insert([0, 0, 2, 2]).unwrap();
        b.insert([0, 0, 3, 3]).unwrap();
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        a.swap(&mut b);
        assert_eq!(a.len(), 1);
        assert!(a.contains(&[0, 0, 1, 1]));
        assert_eq!(b.len(), 2);
    }
}
