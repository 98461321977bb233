// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The k-d tree engine underneath the `kdforest` containers: arena-backed
//! nodes, the strict and relaxed splitting-dimension invariants, scapegoat
//! rebalancing, and the four traversal iterator families.
//!
//! This crate is intentionally low-level and untyped at the container seam
//! (no `PointSet`/`BoxSet` here) — see the `kdforest` crate for the
//! dimension-trait-checked, box-layout-aware surface built on top of it.

#![no_std]

extern crate alloc;

mod balance;
mod compare;
mod error;
mod metric;
mod node;
mod point;
mod rank;
mod tree;

pub mod iter;

pub use balance::{Balancing, Idle, Loose, Perfect, Tight};
pub use compare::{CoordCompare, KeyCompare, RegionPredicate, RegionSide, match_all, match_any, match_most};
pub use error::{Error, Result};
pub use metric::{EuclidianF32, EuclidianF64, Manhattan, Metric, Quadrance, check_positive_distance};
pub use node::NodeId;
pub use point::{Coordinate, Point};
pub use rank::{DynamicRank, Rank, StaticRank};
pub use tree::Tree;
