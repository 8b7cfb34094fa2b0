// Copyright 2006 The Android Open Source Project
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Scalar, 2D point and real-cubic-root helpers shared by [curv](https://docs.rs/curv/).
//!
//! Kept as a separate, dependency-light crate the way `tiny-skia-path` is
//! kept separate from `tiny-skia`: these are the numeric primitives the
//! higher-level grid/fitter/cutter code builds on, usable on their own.
//!
//! All types use double precision (`f64`) — curvature and path-length
//! arithmetic accumulate over long walks (up to `LINELEN` steps each way)
//! and the single-precision budget `tiny-skia-path` uses for path geometry
//! isn't enough headroom here.

#![no_std]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::upper_case_acronyms)]

#[cfg(not(any(feature = "std", feature = "no-std-float")))]
compile_error!("You have to activate either the `std` or the `no-std-float` feature.");

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod point;
mod roots;
mod scalar;

pub use point::*;
pub use roots::*;
pub use scalar::*;
