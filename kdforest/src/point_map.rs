// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A map from points to values, ordered by a relaxed or idle k-d tree
//! (spec.md §1's point-map container).

use kdforest_core::{
    iter::Bounds, Balancing, CoordCompare, Loose, Metric, Point, Rank, RegionPredicate, RegionSide, Result, Tree,
};

/// A point carrying a mapped value alongside its coordinates.
///
/// The engine's comparator only ever calls [`Point::coord`], so `mapped`
/// never participates in ordering, splitting, or equality — it rides along
/// for [`PointMap::get`]/`get_mut` to recover after a lookup. `mapped` is
/// `None` only for the transient probe key a lookup builds to call
/// [`Tree::find`]; every key actually stored in the tree carries `Some`.
#[derive(Clone, Debug)]
struct Entry<K: Point, V> {
    key: K,
    mapped: Option<V>,
}

impl<K: Point, V> Point for Entry<K, V> {
    type Coord = K::Coord;

    fn dims(&self) -> usize {
        self.key.dims()
    }

    fn coord(&self, dim: usize) -> Self::Coord {
        self.key.coord(dim)
    }
}

fn split<K: Point, V>(entry: &Entry<K, V>) -> (&K, &V) {
    (&entry.key, entry.mapped.as_ref().expect("stored entries always carry a value"))
}

/// A map keyed by `k`-dimensional points, ordered by a k-d tree.
///
/// Unlike [`crate::PointSet`], keys are unique: inserting over an existing
/// key replaces its value.
#[derive(Clone, Debug)]
pub struct PointMap<K: Point, V, R: Rank, B: Balancing = Loose> {
    tree: Tree<Entry<K, V>, CoordCompare, R, B>,
}

impl<K: Point, V, R: Rank, B: Balancing> PointMap<K, V, R, B> {
    /// Construct an empty map over the given rank and balancing policy.
    pub fn new(rank: R, balancing: B) -> Self {
        Self { tree: Tree::new(rank, CoordCompare, balancing) }
    }

    fn probe(&self, key: &K) -> Entry<K, V> {
        Entry { key: key.clone(), mapped: None }
    }

    /// Insert `value` under `key`, returning the previous value if the key
    /// was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.remove(&key);
        self.tree.insert(Entry { key, mapped: Some(value) });
        previous
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.tree.find(&self.probe(key))?;
        self.tree.get(id).expect("id came from Tree::find, never the header").mapped.as_ref()
    }

    /// Look up a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.tree.find(&self.probe(key))?;
        self.tree.get_mut(id).expect("id came from Tree::find, never the header").mapped.as_mut()
    }

    /// Does the map contain `key`?
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.find(&self.probe(key)).is_some()
    }

    /// Remove and return the value stored under `key`, if any.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.tree.find(&self.probe(key))?;
        self.tree.erase(id).mapped
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the map empty?
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Force a full rebuild into a balanced tree (spec.md §4.4).
    pub fn rebalance(&mut self) {
        self.tree.rebalance();
    }

    /// Exchange contents with `other` in constant time (spec.md §4.4).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    /// Structural traversal over `(key, value)` pairs in the tree's own
    /// order (spec.md §4.5).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> {
        self.tree.iter().map(split)
    }

    /// Ascending traversal along one axis over `(key, value)` pairs (spec.md
    /// §4.6). Returns [`kdforest_core::Error::InvalidDimension`] if `axis`
    /// is out of range.
    pub fn mapping(&self, axis: usize) -> Result<impl Iterator<Item = (&K, &V)>> {
        Ok(self.tree.mapping(axis)?.map(split))
    }

    /// Like [`PointMap::mapping`], starting at the first entry whose key
    /// coordinate on `axis` is at least `bound` (spec.md §4.6).
    pub fn mapping_lower_bound(&self, axis: usize, bound: K::Coord) -> Result<impl Iterator<Item = (&K, &V)>> {
        Ok(self.tree.mapping_lower_bound(axis, bound)?.map(split))
    }

    /// Like [`PointMap::mapping`], starting strictly past the last entry
    /// whose key coordinate on `axis` is at most `bound` (spec.md §4.6).
    pub fn mapping_upper_bound(&self, axis: usize, bound: K::Coord) -> Result<impl Iterator<Item = (&K, &V)>> {
        Ok(self.tree.mapping_upper_bound(axis, bound)?.map(split))
    }

    /// Entries whose key lies within a half-open or closed box (spec.md §4.7).
    pub fn in_box(&self, bounds: Bounds<K>) -> impl Iterator<Item = (&K, &V)> {
        self.tree.region(BoundsOnKey(bounds)).map(split)
    }

    /// Entries in increasing distance from `target` under `metric` (spec.md §4.8).
    pub fn neighbors<M: Metric<K>>(&self, metric: M, target: K) -> impl Iterator<Item = (&K, &V, M::Distance)> {
        self.tree
            .neighbors(AdaptMetric(metric), self.probe(&target))
            .map(|(entry, distance)| {
                let (k, v) = split(entry);
                (k, v, distance)
            })
    }

    /// Like [`PointMap::neighbors`], starting at the first entry at least
    /// `bound` away from `target`. Returns
    /// [`kdforest_core::Error::NegativeDistance`] if `bound` is negative
    /// (spec.md §4.8).
    pub fn neighbors_lower_bound<M: Metric<K>>(
        &self,
        metric: M,
        target: K,
        bound: M::Distance,
    ) -> Result<impl Iterator<Item = (&K, &V, M::Distance)>>
    where
        M::Distance: Default,
    {
        Ok(self
            .tree
            .neighbors_lower_bound(AdaptMetric(metric), self.probe(&target), bound)?
            .map(|(entry, distance)| {
                let (k, v) = split(entry);
                (k, v, distance)
            }))
    }
}

struct BoundsOnKey<K: Point>(Bounds<K>);

impl<K: Point, V> RegionPredicate<Entry<K, V>> for BoundsOnKey<K> {
    fn test(&self, dim: usize, key: &Entry<K, V>) -> RegionSide {
        self.0.test(dim, &key.key)
    }
}

struct AdaptMetric<M>(M);

impl<K: Point, V, M: Metric<K>> Metric<Entry<K, V>> for AdaptMetric<M> {
    type Distance = M::Distance;

    fn distance_to_key(&self, rank: usize, a: &Entry<K, V>, b: &Entry<K, V>) -> Self::Distance {
        self.0.distance_to_key(rank, &a.key, &b.key)
    }

    fn distance_to_plane(&self, dim: usize, a: &Entry<K, V>, b: &Entry<K, V>) -> Self::Distance {
        self.0.distance_to_plane(dim, &a.key, &b.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdforest_core::StaticRank;

    fn map() -> PointMap<[i32; 2], &'static str, StaticRank<2>, Loose> {
        PointMap::new(StaticRank::<2>::new(), Loose)
    }

    #[test]
    fn insert_get_remove() {
        let mut m = map();
        assert_eq!(m.insert([1, 1], "a"), None);
        assert_eq!(m.get(&[1, 1]), Some(&"a"));
        assert_eq!(m.insert([1, 1], "b"), Some("a"));
        assert_eq!(m.get(&[1, 1]), Some(&"b"));
        assert_eq!(m.remove(&[1, 1]), Some("b"));
        assert_eq!(m.get(&[1, 1]), None);
    }

    #[test]
    fn distinct_keys_coexist() {
        let mut m = map();
        m.insert([0, 0], "origin");
        m.insert([1, 0], "east");
        m.insert([0, 1], "north");
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(&[1, 0]), Some(&"east"));
    }

    #[test]
    fn mapping_iterates_in_axis_order() {
        let mut m = map();
        m.insert([3, 0], "c");
        m.insert([1, 0], "a");
        m.insert([2, 0], "b");
        let xs: alloc::vec::Vec<i32> = m.mapping(0).unwrap().map(|(k, _)| k.coord(0)).collect();
        assert_eq!(xs, alloc::vec![1, 2, 3]);
        assert!(m.mapping(5).is_err());
    }

    #[test]
    fn swap_is_involutive() {
        let mut a = map();
        let mut b = map();
        a.insert([1, 1], "a");
        b.insert([9, 9], "b");
        b.insert([8, 8], "c");
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(&[9, 9]), Some(&"b"));
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(&[1, 1]), Some(&"a"));
        a.swap(&mut b);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(&[1, 1]), Some(&"a"));
    }
}
