// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The boundary error surface (spec.md §6-7): argument validity, and the
//! arithmetic errors raised by the checked-arithmetic metric path.

use alloc::string::String;

/// Errors thrown at the kdforest-core API boundary.
///
/// Every variant carries a human-readable message, matching
/// `original_source/src/exception.hpp`'s `std::logic_error`-derived
/// exceptions. Insertion, traversal, and comparison never return this type;
/// only argument validation and the metric's checked-arithmetic path do.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A runtime rank of zero was supplied.
    #[error("invalid rank: {0}")]
    InvalidRank(String),

    /// An axis index was out of range for the rank.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A null or header pointer was passed to an operation requiring a live node.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// An iterator from a different or invalidated container was passed to an operation.
    #[error("invalid iterator: {0}")]
    InvalidIterator(String),

    /// An operation that disallows empty input was given an empty container.
    #[error("invalid empty container: {0}")]
    InvalidEmptyContainer(String),

    /// `lower > upper` on some dimension for a bounds/open/closed-bounds predicate.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// A box's coordinates violate its declared layout.
    #[error("invalid box: {0}")]
    InvalidBox(String),

    /// A metric produced a negative distance where one was not expected.
    #[error("negative distance: {0}")]
    NegativeDistance(String),

    /// A checked arithmetic operation in the safer-arithmetic metric path overflowed.
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),
}

/// Convenience alias used throughout the crate's fallible constructors.
pub type Result<T> = core::result::Result<T, Error>;
