// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A map from boxes to values, ordered by a relaxed or idle k-d tree over
//! `2k` flat coordinates (spec.md §1's box-map container).

use kdforest_core::{
    iter::Bounds, Balancing, CoordCompare, Loose, Metric, Point, Rank, RegionPredicate, RegionSide, Result, Tree,
};

use crate::box_layout::{check_box, BoxLayout};

/// A box key carrying a mapped value alongside its `2k` flat coordinates.
/// See [`crate::point_map::Entry`] for why `mapped` rides along untouched
/// by the engine's comparator.
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

/// A map keyed by boxes, each key packing `2k` flat coordinates per
/// `layout`. Keys are unique: inserting over an existing key replaces its
/// value.
#[derive(Clone, Debug)]
pub struct BoxMap<K: Point, V, R: Rank, B: Balancing = Loose> {
    tree: Tree<Entry<K, V>, CoordCompare, R, B>,
    layout: BoxLayout,
}

impl<K: Point, V, R: Rank, B: Balancing> BoxMap<K, V, R, B> {
    /// Construct an empty map over a `2k`-dimensional rank and a box layout.
    pub fn new(rank: R, balancing: B, layout: BoxLayout) -> Self {
        Self { tree: Tree::new(rank, CoordCompare, balancing), layout }
    }

    fn spatial_rank(&self) -> usize {
        self.tree.dimension() / 2
    }

    fn probe(&self, key: &K) -> Entry<K, V> {
        Entry { key: key.clone(), mapped: None }
    }

    /// Insert `value` under box `key`, validating the box's layout first
    /// and returning the previous value if the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        check_box(self.layout, self.spatial_rank(), &CoordCompare, &key)?;
        let previous = self.remove(&key);
        self.tree.insert(Entry { key, mapped: Some(value) });
        Ok(previous)
    }

    /// Look up the value stored under box `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.tree.find(&self.probe(key))?;
        self.tree.get(id).expect("id came from Tree::find, never the header").mapped.as_ref()
    }

    /// Look up a mutable reference to the value stored under box `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.tree.find(&self.probe(key))?;
        self.tree.get_mut(id).expect("id came from Tree::find, never the header").mapped.as_mut()
    }

    /// Does the map contain box `key`?
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.find(&self.probe(key)).is_some()
    }

    /// Remove and return the value stored under box `key`, if any.
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

    /// Exchange contents and layout with `other` in constant time (spec.md §4.4).
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
        core::mem::swap(&mut self.layout, &mut other.layout);
    }

    /// Structural traversal over `(box, value)` pairs in the tree's own
    /// order (spec.md §4.5).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> {
        self.tree.iter().map(split)
    }

    /// Ascending traversal along one flat coordinate (spec.md §4.6). Returns
    /// [`kdforest_core::Error::InvalidDimension`] if `axis` is out of range.
    pub fn mapping(&self, axis: usize) -> Result<impl Iterator<Item = (&K, &V)>> {
        Ok(self.tree.mapping(axis)?.map(split))
    }

    /// Entries whose box lies within a half-open or closed flat-coordinate
    /// bound (spec.md §4.7).
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

    fn map() -> BoxMap<[i32; 4], &'static str, StaticRank<4>, Loose> {
        BoxMap::new(StaticRank::<4>::new(), Loose, BoxLayout::LowHigh)
    }

    #[test]
    fn insert_get_remove() {
        let mut m = map();
        assert_eq!(m.insert([0, 0, 2, 2], "room").unwrap(), None);
        assert_eq!(m.get(&[0, 0, 2, 2]), Some(&"room"));
        assert_eq!(m.remove(&[0, 0, 2, 2]), Some("room"));
        assert!(m.is_empty());
    }

    #[test]
    fn rejects_inverted_box() {
        let mut m = map();
        assert!(m.insert([2, 0, 0, 2], "bad").is_err());
    }

    #[test]
    fn mapping_rejects_out_of_range_axis() {
        let m = map();
        assert!(m.mapping(9).is_err());
    }

    #[test]
    fn swap_is_involutive() {
        let mut a = map();
        let mut b = map();
        a.insert([0, 0, 1, 1], "a").unwrap();
        b.insert([0, 0, 2, 2], "b").unwrap();
        a.swap(&mut b);
        assert_eq!(a.get(&[0, 0, 2, 2]), Some(&"b"));
        assert_eq!(b.get(&[0, 0, 1, 1]), Some(&"a"));
        a.swap(&mut b);
        assert_eq!(a.get(&[0, 0, 1, 1]), Some(&"a"));
        assert_eq!(b.get(&[0, 0, 2, 2]), Some(&"b"));
    }
}
