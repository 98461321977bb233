// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distance from a target to a key and to an axis-aligned splitting plane
//! (spec.md §3, §4.8), plus the built-in metric catalog.

use crate::error::{Error, Result};
use crate::point::{Coordinate, Point};

/// Distance from a target to a key, and a lower bound on distance to a
/// splitting plane, for a given [`Point`] type.
///
/// `distance_to_key` must be commutative in its two key arguments.
/// `distance_to_plane` must never exceed `distance_to_key` for the same
/// `target`/`key`/`dim` — the neighbor iterator's pruning correctness
/// depends on this inequality (spec.md §3).
pub trait Metric<P: Point> {
    /// The type distances are expressed in. Must be totally ordered.
    type Distance: Copy + PartialOrd;

    /// Distance from `target` to `key`.
    fn distance_to_key(&self, rank: usize, target: &P, key: &P) -> Self::Distance;

    /// Lower bound on the distance from `target` to the hyperplane through
    /// `key` perpendicular to axis `dim`.
    fn distance_to_plane(&self, dim: usize, target: &P, key: &P) -> Self::Distance;
}

// Checked arithmetic for the `safer_arithmetic` metric path (spec.md §4.8,
// §9). `Metric::distance_to_key`/`distance_to_plane` are infallible by
// trait contract (mirroring the source, which throws `arithmetic_error`
// rather than returning one) so overflow here panics rather than returning
// `Result` — the closest no_std equivalent of the source's C++ exception.
#[cfg(feature = "safer_arithmetic")]
mod checked {
    use crate::point::Coordinate;

    pub fn abs<T: Coordinate>(x: T) -> T {
        if x >= T::default() {
            return x;
        }
        let a = -x;
        assert!(a >= T::default(), "absolute value of element overflowed");
        a
    }

    pub fn add_positive<T: Coordinate>(x: T, y: T) -> T {
        assert!(
            (T::max_value() - x) >= y,
            "addition of two elements overflowed"
        );
        x + y
    }

    pub fn mul_positive<T: Coordinate>(x: T, y: T) -> T {
        let zero = T::default();
        if x == zero || y == zero {
            return zero;
        }
        assert!(
            (T::max_value() / x) >= y,
            "multiplication of two elements overflowed"
        );
        x * y
    }
}

/// Check that a distance is non-negative, as every built-in metric promises
/// (spec.md §3). Only invoked from the safer-arithmetic path; the default
/// path trusts the metric's own arithmetic.
pub fn check_positive_distance<T: PartialOrd + Default>(x: T) -> Result<()> {
    if x < T::default() {
        return Err(Error::NegativeDistance(alloc::string::String::from(
            "distance is negative",
        )));
    }
    Ok(())
}

fn diff<P: Point>(dim: usize, a: &P, b: &P) -> P::Coord {
    a.coord(dim) - b.coord(dim)
}

/// Squared Euclidian distance ("quadrance"). Faster than [`Euclidian`] and
/// works over any [`Coordinate`], but its values are not comparable across
/// differently-scaled spaces since it never takes a square root
/// (spec.md §4.8).
#[derive(Copy, Clone, Debug, Default)]
pub struct Quadrance;

impl<P: Point> Metric<P> for Quadrance {
    type Distance = P::Coord;

    fn distance_to_key(&self, rank: usize, target: &P, key: &P) -> P::Coord {
        let mut sum = P::Coord::default();
        for dim in 0..rank {
            let d = diff(dim, target, key);
            #[cfg(feature = "safer_arithmetic")]
            {
                let abs_d = checked::abs(d);
                sum = checked::add_positive(sum, checked::mul_positive(abs_d, abs_d));
            }
            #[cfg(not(feature = "safer_arithmetic"))]
            {
                sum = sum + d * d;
            }
        }
        #[cfg(feature = "safer_arithmetic")]
        check_positive_distance(sum).expect("sum of squares cannot be negative");
        sum
    }

    fn distance_to_plane(&self, dim: usize, target: &P, key: &P) -> P::Coord {
        let d = diff(dim, target, key);
        d * d
    }
}

/// Manhattan (L1) distance: the sum of absolute per-axis differences,
/// over any [`Coordinate`] (spec.md §4.8).
#[derive(Copy, Clone, Debug, Default)]
pub struct Manhattan;

impl<P: Point> Metric<P> for Manhattan {
    type Distance = P::Coord;

    fn distance_to_key(&self, rank: usize, target: &P, key: &P) -> P::Coord {
        let mut sum = P::Coord::default();
        for dim in 0..rank {
            let d = diff(dim, target, key).abs();
            sum = sum + d;
        }
        #[cfg(feature = "safer_arithmetic")]
        check_positive_distance(sum).expect("sum of absolute differences cannot be negative");
        sum
    }

    fn distance_to_plane(&self, dim: usize, target: &P, key: &P) -> P::Coord {
        diff(dim, target, key).abs()
    }
}

fn sqrt_f64(x: f64) -> f64 {
    #[cfg(feature = "std")]
    {
        x.sqrt()
    }
    #[cfg(all(not(feature = "std"), feature = "libm"))]
    {
        libm::sqrt(x)
    }
    #[cfg(all(not(feature = "std"), not(feature = "libm")))]
    {
        compile_error!("the euclidian metric needs either the `std` or `libm` feature");
        #[allow(unreachable_code)]
        x
    }
}

fn sqrt_f32(x: f32) -> f32 {
    #[cfg(feature = "std")]
    {
        x.sqrt()
    }
    #[cfg(all(not(feature = "std"), feature = "libm"))]
    {
        libm::sqrtf(x)
    }
    #[cfg(all(not(feature = "std"), not(feature = "libm")))]
    {
        compile_error!("the euclidian metric needs either the `std` or `libm` feature");
        #[allow(unreachable_code)]
        x
    }
}

macro_rules! impl_euclidian {
    ($name:ident, $t:ty, $sqrt:ident) => {
        /// Euclidian distance over
        #[doc = concat!("`", stringify!($t), "`")]
        /// coordinates.
        ///
        /// Uses a hypot-style formula (`max * sqrt(1 + sum((diff_i/max)^2))`)
        /// to reduce the risk of overflow when components span wide
        /// magnitudes, following `original_source/src/bits/spatial_math.hpp`.
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $name;

        impl<P: Point<Coord = $t>> Metric<P> for $name {
            type Distance = $t;

            fn distance_to_key(&self, rank: usize, target: &P, key: &P) -> $t {
                if rank == 0 {
                    return 0.0;
                }
                let mut max = diff(0, target, key).abs();
                let mut max_dim = 0;
                for dim in 1..rank {
                    let d = diff(dim, target, key).abs();
                    if d > max {
                        max = d;
                        max_dim = dim;
                    }
                }
                if max == 0.0 {
                    return 0.0;
                }
                let mut sum: $t = 0.0;
                for dim in 0..rank {
                    if dim == max_dim {
                        continue;
                    }
                    let ratio = diff(dim, target, key) / max;
                    sum += ratio * ratio;
                }
                max * $sqrt(1.0 + sum)
            }

            fn distance_to_plane(&self, dim: usize, target: &P, key: &P) -> $t {
                diff(dim, target, key).abs()
            }
        }
    };
}

impl_euclidian!(EuclidianF64, f64, sqrt_f64);
impl_euclidian!(EuclidianF32, f32, sqrt_f32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrance_2d() {
        let q = Quadrance;
        let dist: i32 = q.distance_to_key(2, &[0, 0], &[3, 4]);
        assert_eq!(dist, 25);
        let plane: i32 = q.distance_to_plane(0, &[0, 0], &[3, 4]);
        assert_eq!(plane, 9);
    }

    #[test]
    fn manhattan_2d() {
        let m = Manhattan;
        let dist: i32 = m.distance_to_key(2, &[0, 0], &[3, -4]);
        assert_eq!(dist, 7);
    }

    #[test]
    fn euclidian_matches_quadrance_sqrt() {
        let e = EuclidianF64;
        let q = Quadrance;
        let d_e: f64 = e.distance_to_key(2, &[0.0, 0.0], &[3.0, 4.0]);
        let d_q: f64 = q.distance_to_key(2, &[0.0, 0.0], &[3.0, 4.0]);
        assert!((d_e - d_q.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn distance_to_plane_never_exceeds_distance_to_key() {
        let e = EuclidianF64;
        let target = [1.0, -2.0, 5.0];
        let key = [4.0, 3.0, -1.0];
        let dk: f64 = e.distance_to_key(3, &target, &key);
        for dim in 0..3 {
            let dp: f64 = e.distance_to_plane(dim, &target, &key);
            assert!(dp <= dk + 1e-9);
        }
    }
}
