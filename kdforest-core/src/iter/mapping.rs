// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Iteration ordered by a single axis (spec.md §4.6).
//!
//! A k-d tree's structural (in-order) traversal has no relationship to the
//! ordering of any one axis, since the splitting dimension rotates with
//! depth. Walking in axis order instead means, at each step, searching for
//! the smallest (or, in reverse, largest) remaining key on that axis —
//! using the tree's own invariant to prune whichever side of a
//! same-dimension split cannot hold it, the same shape of search as
//! [`crate::tree::Tree::find`]'s sibling `find_min`/`find_max` helpers.
//! Both directions share one recursive search, parameterized by which
//! extreme they are after; [`crate::compare::less_by_tiebreak`] supplies the
//! total order both directions advance along.

use crate::balance::Balancing;
use crate::compare::{KeyCompare, less_by_tiebreak};
use crate::node::NodeId;
use crate::point::{Coordinate, Point};
use crate::rank::Rank;
use crate::tree::Tree;

/// Bidirectional iteration over one axis, breaking ties by node address so
/// the order is total even when several keys share a coordinate (spec.md
/// §4.2, §4.6's Open Question on tiebreaking).
#[derive(Clone)]
pub struct Mapping<'a, P, C, R, B> {
    tree: &'a Tree<P, C, R, B>,
    axis: usize,
    /// Last key yielded from the front, if any: nothing at or below it (by
    /// the tiebreak order) qualifies again.
    front: Option<(P, usize)>,
    /// Last key yielded from the back, if any.
    back: Option<(P, usize)>,
    /// A starting position for [`Tree::mapping_lower_bound`]/
    /// `mapping_upper_bound`: `(bound, inclusive)`. Only ever narrows the
    /// range from below; unset for a plain [`Tree::mapping`].
    floor: Option<(P::Coord, bool)>,
    exhausted: bool,
}

impl<'a, P, C, R, B> Mapping<'a, P, C, R, B>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
{
    pub(crate) fn new(tree: &'a Tree<P, C, R, B>, axis: usize) -> Self {
        Self {
            tree,
            axis,
            front: None,
            back: None,
            floor: None,
            exhausted: tree.is_empty(),
        }
    }

    /// Like [`Mapping::new`], but starting from the first key whose
    /// coordinate on `axis` is at least (`inclusive`) or strictly greater
    /// than (`!inclusive`) `bound`.
    pub(crate) fn with_floor(tree: &'a Tree<P, C, R, B>, axis: usize, bound: P::Coord, inclusive: bool) -> Self {
        let mut m = Self::new(tree, axis);
        m.floor = Some((bound, inclusive));
        m
    }

    fn qualifies(&self, point: &P, addr: usize) -> bool {
        let coord = point.coord(self.axis);
        if let Some((bound, inclusive)) = self.floor {
            let floor_ok = if inclusive { coord >= bound } else { coord > bound };
            if !floor_ok {
                return false;
            }
        }
        let passes_front = match &self.front {
            Some((fp, faddr)) => less_by_tiebreak(self.tree.compare(), self.axis, fp, *faddr, point, addr),
            None => true,
        };
        let passes_back = match &self.back {
            Some((bp, baddr)) => less_by_tiebreak(self.tree.compare(), self.axis, point, addr, bp, *baddr),
            None => true,
        };
        passes_front && passes_back
    }

    /// Picks whichever of `a`/`b` is closer to the extreme this search wants:
    /// smallest for `want_min`, largest otherwise.
    fn better(&self, a: (NodeId, usize), b: (NodeId, usize), want_min: bool) -> (NodeId, usize) {
        let pa = self.tree.key(a.0);
        let pb = self.tree.key(b.0);
        let a_is_better = if want_min {
            less_by_tiebreak(self.tree.compare(), self.axis, pa, a.0.index(), pb, b.0.index())
        } else {
            less_by_tiebreak(self.tree.compare(), self.axis, pb, b.0.index(), pa, a.0.index())
        };
        if a_is_better { a } else { b }
    }

    fn search(&self, node: Option<NodeId>, node_dim: usize, want_min: bool) -> Option<(NodeId, usize)> {
        let node = node?;
        let next_dim = self.tree.rank().next(node_dim);
        let point = self.tree.key(node);
        let coord = point.coord(self.axis);

        let mut best = if self.qualifies(point, node.index()) {
            Some((node, node_dim))
        } else {
            None
        };

        // When this node splits on the axis we're walking, its left child
        // holds only keys strictly less than `coord` (ties are sent right on
        // insert). If even `coord` itself is already behind whatever we're
        // searching past, nothing on the left can qualify either.
        let skip_left = node_dim == self.axis && {
            let threshold = self
                .front
                .as_ref()
                .map(|(p, _)| p.coord(self.axis))
                .or_else(|| self.floor.map(|(b, _)| b));
            matches!(threshold, Some(t) if coord <= t)
        };
        // Symmetric pruning for a reverse (max) search: the right child holds
        // only keys greater than or equal to `coord`, so once `coord` alone
        // is already past the back cursor, the whole right side is too.
        let skip_right = !want_min
            && node_dim == self.axis
            && matches!(&self.back, Some((bp, _)) if coord > bp.coord(self.axis));

        if !skip_left {
            if let Some(cand) = self.search(self.tree.left_of(node), next_dim, want_min) {
                best = Some(match best {
                    Some(b) => self.better(cand, b, want_min),
                    None => cand,
                });
            }
        }
        if !skip_right {
            if let Some(cand) = self.search(self.tree.right_of(node), next_dim, want_min) {
                best = Some(match best {
                    Some(b) => self.better(cand, b, want_min),
                    None => cand,
                });
            }
        }
        best
    }
}

impl<'a, P, C, R, B> Iterator for Mapping<'a, P, C, R, B>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
{
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.search(self.tree.root(), 0, true) {
            Some((id, _)) => {
                self.front = Some((self.tree.key(id).clone(), id.index()));
                Some(self.tree.key(id))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl<'a, P, C, R, B> DoubleEndedIterator for Mapping<'a, P, C, R, B>
where
    P: Point,
    C: KeyCompare<P>,
    R: Rank,
    B: Balancing,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.search(self.tree.root(), 0, false) {
            Some((id, _)) => {
                self.back = Some((self.tree.key(id).clone(), id.index()));
                Some(self.tree.key(id))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}
