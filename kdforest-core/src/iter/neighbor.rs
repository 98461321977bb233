// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-neighbor iteration in increasing distance order, by branch and
//! bound (spec.md §4.8).
//!
//! A single priority queue mixes two kinds of entry: nodes not yet visited,
//! keyed by a lower bound on any distance achievable within their subtree,
//! and nodes already visited, keyed by their exact distance to the target.
//! Because a node's exact distance is trivially also a valid lower bound on
//! itself, both kinds can share one heap: whatever is popped first is
//! either the answer (an exact distance, nothing else in the queue can beat
//! it) or work to expand (an unvisited subtree, which is expanded into one
//! exact-distance entry for its own key plus up to two new bounded entries
//! for its children). This relies on [`Metric::distance_to_plane`] never
//! exceeding [`Metric::distance_to_key`] for the same inputs.
//!
//! [`Metric`] only ever supplies a *lower* bound on distance to a subtree,
//! not an upper one, so there is no equivalently lazy farthest-first
//! traversal for [`Neighbor::next_back`]. Instead, the first call to
//! `next_back` exhaustively computes and sorts every remaining key's exact
//! distance once; both directions then share a `returned` set so neither
//! yields a key the other already has.

use alloc::collections::{BTreeSet, BinaryHeap};
use alloc::vec::Vec;
use core::cmp::{Ordering, Reverse};

use crate::balance::Balancing;
use crate::compare::KeyCompare;
use crate::error::Result;
use crate::metric::{Metric, check_positive_distance};
use crate::node::NodeId;
use crate::point::Point;
use crate::rank::Rank;
use crate::tree::Tree;

struct HeapItem<D, T> {
    priority: D,
    payload: T,
}

impl<D: PartialOrd, T> PartialEq for HeapItem<D, T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority.partial_cmp(&other.priority) == Some(Ordering::Equal)
    }
}
impl<D: PartialOrd, T> Eq for HeapItem<D, T> {}
impl<D: PartialOrd, T> PartialOrd for HeapItem<D, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.priority.partial_cmp(&other.priority)
    }
}
impl<D: PartialOrd, T> Ord for HeapItem<D, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

enum Entry {
    Candidate(NodeId),
    Pending(NodeId, usize),
}

/// Iterates keys in increasing distance from a target, under a chosen
/// [`Metric`]. Construct via the owning container; bound the scan early
/// with [`Neighbor::within`] when only nearby results matter, or start
/// partway through the order with a distance already in hand.
pub struct Neighbor<'a, P, C, R, B, M: Metric<P>> {
    tree: &'a Tree<P, C, R, B>,
    metric: M,
    target: P,
    heap: BinaryHeap<Reverse<HeapItem<M::Distance, Entry>>>,
    max_distance: Option<M::Distance>,
    returned: BTreeSet<usize>,
    peeked: Option<(NodeId, M::Distance)>,
    back: Option<Vec<(NodeId, M::Distance)>>,
}

impl<'a, P, C, R, B, M> Neighbor<'a, P, C, R, B, M>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
    M: Metric<P>,
{
    pub(crate) fn new(tree: &'a Tree<P, C, R, B>, metric: M, target: P) -> Self {
        let mut heap = BinaryHeap::new();
        if let Some(root) = tree.root() {
            let zero = metric.distance_to_key(tree.rank().k(), &target, &target);
            heap.push(Reverse(HeapItem {
                priority: zero,
                payload: Entry::Pending(root, 0),
            }));
        }
        Self {
            tree,
            metric,
            target,
            heap,
            max_distance: None,
            returned: BTreeSet::new(),
            peeked: None,
            back: None,
        }
    }

    /// Restrict iteration to keys within `max_distance` of the target
    /// (spec.md §4.8). Later keys in distance order are still pruned
    /// correctly since any pending entry beyond the cutoff can be dropped.
    pub fn within(mut self, max_distance: M::Distance) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Starting position at the first key whose distance to the target is
    /// at least `bound`. Returns [`crate::error::Error::NegativeDistance`]
    /// if `bound` is negative.
    pub(crate) fn lower_bound(tree: &'a Tree<P, C, R, B>, metric: M, target: P, bound: M::Distance) -> Result<Self>
    where
        M::Distance: Default,
    {
        check_positive_distance(bound)?;
        let mut n = Self::new(tree, metric, target);
        n.advance_to(bound, true);
        Ok(n)
    }

    /// Starting position at the first key whose distance to the target is
    /// strictly greater than `bound`. Returns
    /// [`crate::error::Error::NegativeDistance`] if `bound` is negative.
    pub(crate) fn upper_bound(tree: &'a Tree<P, C, R, B>, metric: M, target: P, bound: M::Distance) -> Result<Self>
    where
        M::Distance: Default,
    {
        check_positive_distance(bound)?;
        let mut n = Self::new(tree, metric, target);
        n.advance_to(bound, false);
        Ok(n)
    }

    fn advance_to(&mut self, bound: M::Distance, inclusive: bool) {
        while let Some((id, d)) = self.pop_forward() {
            let qualifies = if inclusive { d >= bound } else { d > bound };
            if qualifies {
                self.peeked = Some((id, d));
                return;
            }
        }
    }

    /// The forward branch-and-bound step, shared by `next` and the
    /// bound-positioning constructors. Marks whatever it returns as
    /// `returned` so `next_back` never yields it again.
    fn pop_forward(&mut self) -> Option<(NodeId, M::Distance)> {
        loop {
            let Reverse(HeapItem { priority, payload }) = self.heap.pop()?;
            if let Some(max) = self.max_distance {
                if priority > max {
                    self.heap.clear();
                    return None;
                }
            }
            match payload {
                Entry::Candidate(id) => {
                    if !self.returned.insert(id.index()) {
                        continue;
                    }
                    return Some((id, priority));
                }
                Entry::Pending(node, dim) => {
                    let rank = self.tree.rank().k();
                    let key = self.tree.key(node);
                    let exact = self.metric.distance_to_key(rank, &self.target, key);
                    self.heap.push(Reverse(HeapItem {
                        priority: exact,
                        payload: Entry::Candidate(node),
                    }));

                    let next_dim = self.tree.rank().next(dim);
                    let target_on_dim = self.target.coord(dim);
                    let node_on_dim = key.coord(dim);
                    let (near, far) = if target_on_dim < node_on_dim {
                        (self.tree.left_of(node), self.tree.right_of(node))
                    } else {
                        (self.tree.right_of(node), self.tree.left_of(node))
                    };
                    if let Some(n) = near {
                        self.heap.push(Reverse(HeapItem {
                            priority,
                            payload: Entry::Pending(n, next_dim),
                        }));
                    }
                    if let Some(f) = far {
                        let plane = self.metric.distance_to_plane(dim, &self.target, key);
                        self.heap.push(Reverse(HeapItem {
                            priority: plane,
                            payload: Entry::Pending(f, next_dim),
                        }));
                    }
                }
            }
        }
    }

    fn ensure_back_buffer(&mut self) {
        if self.back.is_some() {
            return;
        }
        let rank = self.tree.rank().k();
        let mut all: Vec<(NodeId, M::Distance)> = self
            .tree
            .all_node_ids()
            .into_iter()
            .map(|id| {
                let d = self.metric.distance_to_key(rank, &self.target, self.tree.key(id));
                (id, d)
            })
            .filter(|(_, d)| self.max_distance.is_none_or(|max| *d <= max))
            .collect();
        all.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.index().cmp(&b.0.index()))
        });
        self.back = Some(all);
    }
}

impl<'a, P, C, R, B, M> Iterator for Neighbor<'a, P, C, R, B, M>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
    M: Metric<P>,
{
    type Item = (&'a P, M::Distance);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((id, d)) = self.peeked.take() {
            self.returned.insert(id.index());
            return Some((self.tree.key(id), d));
        }
        self.pop_forward().map(|(id, d)| (self.tree.key(id), d))
    }
}

impl<'a, P, C, R, B, M> DoubleEndedIterator for Neighbor<'a, P, C, R, B, M>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
    M: Metric<P>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ensure_back_buffer();
        let buf = self.back.as_mut().expect("just ensured");
        while let Some((id, d)) = buf.pop() {
            if self.returned.insert(id.index()) {
                return Some((self.tree.key(id), d));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Loose;
    use crate::compare::CoordCompare;
    use crate::metric::Quadrance;
    use crate::rank::StaticRank;

    fn build() -> Tree<[i32; 2], CoordCompare, StaticRank<2>, Loose> {
        let mut t = Tree::new(StaticRank::<2>::new(), CoordCompare, Loose);
        for k in [[0, 0], [5, 5], [2, 3], [8, 8], [3, 2], [9, 1], [1, 9], [-4, -4]] {
            t.insert(k);
        }
        t
    }

    #[test]
    fn yields_in_increasing_distance_order() {
        let t = build();
        let n = Neighbor::new(&t, Quadrance, [0, 0]);
        let dists: alloc::vec::Vec<i32> = n.map(|(_, d)| d).collect();
        let mut sorted = dists.clone();
        sorted.sort_unstable();
        assert_eq!(dists, sorted);
        assert_eq!(dists.len(), 8);
    }

    #[test]
    fn closest_point_is_itself_when_present() {
        let t = build();
        let mut n = Neighbor::new(&t, Quadrance, [2, 3]);
        let (key, dist) = n.next().unwrap();
        assert_eq!(*key, [2, 3]);
        assert_eq!(dist, 0);
    }

    #[test]
    fn within_cuts_off_far_results() {
        let t = build();
        let n = Neighbor::new(&t, Quadrance, [0, 0]).within(10);
        let found: alloc::vec::Vec<_> = n.collect();
        for (_, d) in &found {
            assert!(*d <= 10);
        }
        assert!(found.len() < 8);
    }

    #[test]
    fn reverse_iteration_mirrors_forward() {
        let t = build();
        let forward: alloc::vec::Vec<i32> = Neighbor::new(&t, Quadrance, [0, 0]).map(|(_, d)| d).collect();
        let mut backward: alloc::vec::Vec<i32> = Neighbor::new(&t, Quadrance, [0, 0]).rev().map(|(_, d)| d).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn bound_positioning_matches_scenario() {
        let mut t: Tree<[i32; 2], CoordCompare, StaticRank<2>, Loose> =
            Tree::new(StaticRank::<2>::new(), CoordCompare, Loose);
        for k in [[0, 0], [1, 1], [-2, -2]] {
            t.insert(k);
        }
        let mut lower = Neighbor::lower_bound(&t, Quadrance, [0, 0], 2).unwrap();
        let (key, dist) = lower.next().unwrap();
        assert_eq!(*key, [1, 1]);
        assert_eq!(dist, 2);

        let mut upper = Neighbor::upper_bound(&t, Quadrance, [0, 0], 3).unwrap();
        let (key, dist) = upper.next().unwrap();
        assert_eq!(*key, [-2, -2]);
        assert_eq!(dist, 8);

        let mut past_end = Neighbor::upper_bound(&t, Quadrance, [0, 0], 25).unwrap();
        assert_eq!(past_end.next(), None);
    }
}
