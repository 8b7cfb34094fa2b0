// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Topology-preserving thinning, per-pixel curvature estimation and
//! junction cutting for curvilinear binary images (e.g. skeletonised neuron
//! traces).
//!
//! The crate is organised as a small DAG of components, leaves first:
//!
//! - [`grid`] — the `on`/`term`/`precious`/`cut` masks and topology-
//!   preserving thinning.
//! - [`fitter`] — least-squares parametric cubic fitting, with optional
//!   knot-parameter refitting.
//! - [`curvature`] — a per-pixel curvature field built on top of the
//!   fitter.
//! - [`paths`] — depth-first path enumeration from a junction pixel.
//! - [`cutter`] — the driver that scores candidate cuts and commits them.
//!
//! [`CutterConfig`] documents every tunable; [`cut_neuron`] is the entry
//! point most callers want.

#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub use curv_numeric::{
    angular_distance, direction_step_cost, opposite_direction, Point, DIRECTION_COUNT,
    DIRECTION_OFFSETS,
};

mod config;
pub mod cutter;
pub mod curvature;
mod error;
pub mod fitter;
pub mod grid;
pub mod paths;

pub use config::CutterConfig;
pub use cutter::{cut_neuron, CutResult, JunctionCutter};
pub use curvature::{CurvatureField, CurvatureStatus};
pub use error::CurveError;
pub use fitter::{CubicCoeffs, FitOutcome};
pub use grid::{GridSize, Mask};
pub use paths::{try_enumerate_paths, PathEnumCtx, PathRow, PathTable};
