// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point and box containers built on the `kdforest-core` k-d tree engine.
//!
//! [`PointSet`]/[`PointMap`] key on bare `k`-dimensional points;
//! [`BoxSet`]/[`BoxMap`] key on `2k`-coordinate boxes validated against a
//! [`BoxLayout`] on insert. All four are thin adaptors: construction,
//! argument validation, and pair-wrapping for map semantics, over the
//! shared `kdforest_core::Tree` engine (spec.md §1).

#![no_std]

extern crate alloc;

mod box_layout;
mod box_map;
mod box_set;
mod point_map;
mod point_set;

pub use box_layout::{check_box, BoxLayout};
pub use box_map::BoxMap;
pub use box_set::BoxSet;
pub use point_map::PointMap;
pub use point_set::PointSet;

pub use kdforest_core::{
    iter, Balancing, Coordinate, CoordCompare, DynamicRank, Error, EuclidianF32, EuclidianF64,
    Idle, KeyCompare, Loose, Manhattan, Metric, NodeId, Perfect, Point, Quadrance, Rank, Result,
    StaticRank, Tight, Tree,
};
