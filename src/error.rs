// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Errors returned by programmer-facing entry points.
///
/// Structural refusals that are a normal outcome of ordinary image geometry
/// (too few samples, a singular fit) are *not* represented here; they are
/// reported as [`crate::CurvatureStatus`] or [`crate::FitOutcome`] sentinels
/// instead, since callers are expected to encounter them routinely.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum CurveError {
    /// A mask or image buffer's length didn't match `width * height`.
    #[error("buffer has {actual} elements, expected {expected} ({width}x{height})")]
    ShapeMismatch {
        /// Number of elements actually present.
        actual: usize,
        /// Number of elements required by the declared size.
        expected: usize,
        /// Declared grid width.
        width: u32,
        /// Declared grid height.
        height: u32,
    },
    /// A seed coordinate or seed direction was out of range.
    #[error("seed ({i}, {j}) with direction {dir} is invalid for a {width}x{height} grid")]
    InvalidSeed {
        /// Seed row.
        i: i32,
        /// Seed column.
        j: i32,
        /// Seed direction, expected to be in `0..8`.
        dir: u8,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// Width or height was zero.
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyGrid {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
