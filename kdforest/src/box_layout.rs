// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box key layouts and the validation that keeps a box's low and high
//! corners consistent (spec.md §6).
//!
//! A box container's key packs `2k` coordinates for a `k`-dimensional box.
//! The four layouts below differ only in how those `2k` coordinates are
//! arranged; `check_box` enforces that every low coordinate is at most its
//! matching high coordinate, regardless of arrangement.

use kdforest_core::{Error, KeyCompare, Point, Result};

/// How a box's `2k` coordinates are arranged within its key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoxLayout {
    /// `[lo_0..lo_{k-1}, hi_0..hi_{k-1}]`: all lows, then all highs.
    LowHigh,
    /// `[hi_0..hi_{k-1}, lo_0..lo_{k-1}]`: all highs, then all lows.
    HighLow,
    /// `[lo_0, hi_0, lo_1, hi_1, ...]`: low/high pairs, one pair per dimension.
    LowHighPairs,
    /// `[hi_0, lo_0, hi_1, lo_1, ...]`: high/low pairs, one pair per dimension.
    HighLowPairs,
}

/// Check that every low coordinate of `key` is at most its matching high
/// coordinate, per `layout`. `rank` is the box's spatial dimension `k`; the
/// key itself carries `2 * rank` coordinates.
///
/// Grounded on `original_source/src/bits/spatial_exceptions.hpp`'s
/// `check_box` overloads, one per layout tag.
pub fn check_box<P, C>(layout: BoxLayout, rank: usize, compare: &C, key: &P) -> Result<()>
where
    P: Point,
    C: KeyCompare<P>,
{
    match layout {
        BoxLayout::LowHigh => {
            for i in 0..rank {
                if compare.less_cross(i + rank, key, i, key) {
                    return Err(invalid(i));
                }
            }
        }
        BoxLayout::HighLow => {
            for i in 0..rank {
                if compare.less_cross(i, key, i + rank, key) {
                    return Err(invalid(i));
                }
            }
        }
        BoxLayout::LowHighPairs => {
            for i in (0..rank * 2).step_by(2) {
                if compare.less_cross(i + 1, key, i, key) {
                    return Err(invalid(i / 2));
                }
            }
        }
        BoxLayout::HighLowPairs => {
            for i in (0..rank * 2).step_by(2) {
                if compare.less_cross(i, key, i + 1, key) {
                    return Err(invalid(i / 2));
                }
            }
        }
    }
    Ok(())
}

fn invalid(dim: usize) -> Error {
    Error::InvalidBox(alloc::format!(
        "high coordinate is below the low coordinate on dimension {dim}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdforest_core::CoordCompare;

    #[test]
    fn low_high_accepts_well_formed_box() {
        let key = [0, 0, 2, 2];
        assert!(check_box(BoxLayout::LowHigh, 2, &CoordCompare, &key).is_ok());
    }

    #[test]
    fn low_high_rejects_inverted_box() {
        let key = [2, 0, 0, 2];
        assert!(check_box(BoxLayout::LowHigh, 2, &CoordCompare, &key).is_err());
    }

    #[test]
    fn high_low_accepts_well_formed_box() {
        let key = [2, 2, 0, 0];
        assert!(check_box(BoxLayout::HighLow, 2, &CoordCompare, &key).is_ok());
    }

    #[test]
    fn pairs_layouts_validate_each_dimension_independently() {
        let low_high = [0, 2, 5, 4];
        assert!(check_box(BoxLayout::LowHighPairs, 2, &CoordCompare, &low_high).is_ok());
        let broken = [0, 2, 5, 1];
        assert!(check_box(BoxLayout::LowHighPairs, 2, &CoordCompare, &broken).is_err());

        let high_low = [2, 0, 4, 5];
        assert!(check_box(BoxLayout::HighLowPairs, 2, &CoordCompare, &high_low).is_ok());
        let broken = [2, 0, 1, 5];
        assert!(check_box(BoxLayout::HighLowPairs, 2, &CoordCompare, &broken).is_err());
    }

    #[test]
    fn degenerate_box_is_accepted() {
        let key = [1, 1, 1, 1];
        assert!(check_box(BoxLayout::LowHigh, 2, &CoordCompare, &key).is_ok());
    }
}
