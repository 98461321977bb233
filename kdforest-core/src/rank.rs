// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static or dynamic source of the dimension count `k` (spec.md §3, §4.1).

use crate::error::{Error, Result};

/// A source of the dimensionality `k` of the space a tree is built over.
///
/// `k` must be at least 1. Static rank carries `k` as a compile-time
/// constant via [`StaticRank`]; dynamic rank stores it at runtime via
/// [`DynamicRank`].
pub trait Rank: Copy + core::fmt::Debug {
    /// The dimension count, `k >= 1`.
    fn k(&self) -> usize;

    /// The dimension one step after `dim`, wrapping at `k`.
    fn next(&self, dim: usize) -> usize {
        (dim + 1) % self.k()
    }

    /// The dimension one step before `dim`, wrapping at `k`.
    fn prev(&self, dim: usize) -> usize {
        (dim + self.k() - 1) % self.k()
    }

    /// By convention, the header's "current" dimension, so its children
    /// (the root) start at dimension 0.
    fn header_dim(&self) -> usize {
        self.k() - 1
    }

    /// Validate that `dim` is a legal axis index for this rank.
    fn check_dimension(&self, dim: usize) -> Result<()> {
        if dim >= self.k() {
            return Err(Error::InvalidDimension(alloc::format!(
                "axis {dim} is out of range for rank {}",
                self.k()
            )));
        }
        Ok(())
    }
}

/// A compile-time dimension count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticRank<const K: usize>;

impl<const K: usize> StaticRank<K> {
    /// Construct a static rank. `K` must be nonzero; this is a compile-time
    /// invariant of the type parameter, not validated at runtime.
    pub const fn new() -> Self {
        Self
    }
}

impl<const K: usize> Rank for StaticRank<K> {
    fn k(&self) -> usize {
        K
    }
}

/// A runtime dimension count, for containers whose rank is chosen at
/// construction time rather than baked into the type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DynamicRank(usize);

impl DynamicRank {
    /// Construct a dynamic rank. Returns [`Error::InvalidRank`] if `k == 0`.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidRank(alloc::string::String::from(
                "rank must be at least 1",
            )));
        }
        Ok(Self(k))
    }
}

impl Rank for DynamicRank {
    fn k(&self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_rank_arithmetic() {
        let r = StaticRank::<3>::new();
        assert_eq!(r.k(), 3);
        assert_eq!(r.next(2), 0);
        assert_eq!(r.prev(0), 2);
        assert_eq!(r.header_dim(), 2);
    }

    #[test]
    fn dynamic_rank_rejects_zero() {
        assert!(DynamicRank::new(0).is_err());
        assert!(DynamicRank::new(2).is_ok());
    }

    #[test]
    fn dimension_check() {
        let r = DynamicRank::new(2).unwrap();
        assert!(r.check_dimension(0).is_ok());
        assert!(r.check_dimension(1).is_ok());
        assert!(r.check_dimension(2).is_err());
    }
}
