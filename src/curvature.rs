// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-pixel curvature estimation: for every on-pixel with exactly two
//! neighbours, walk outward in both directions, fit a cubic to the
//! resulting window, and evaluate curvature at the centre.

use curv_numeric::{direction_step_cost, DIRECTION_OFFSETS};

use crate::config::CutterConfig;
use crate::fitter::{fit_parametric_cubic, fit_parametric_cubic_iterative, FitOutcome};
use crate::grid::{neighbour_count, GridSize, Mask};

/// Fixed search order used when walking out from a pixel: try straight
/// ahead, then alternately one step left/right, out to three steps, never
/// the exact reverse.
const SEARCH_OFFSETS: [u8; 7] = [0, 1, 7, 2, 6, 3, 5];

/// Why a pixel's curvature could not be (or was not) computed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CurvatureStatus {
    /// Curvature was computed successfully.
    Ok,
    /// The pixel does not have exactly two on-neighbours.
    WrongNumberOfNeighbors,
    /// The walk in one or both directions was too short to fit a cubic.
    NotLongEnough,
    /// The cubic fit's design matrix was singular.
    DegenerateSystem,
    /// The pixel was removed by thinning; no curvature is defined here.
    ThinnedAway,
}

/// One sample in the window walked out from a pixel for fitting.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SamplePoint {
    /// Row.
    pub i: i32,
    /// Column.
    pub j: i32,
    /// Cumulative arc length from the centre pixel (signed).
    pub t: f64,
}

/// Optional hook invoked once per successfully-fit curvature window.
///
/// Production callers pass `()`, whose blanket impl is a no-op expected to
/// optimise away entirely.
pub trait DebugSink {
    /// Called after a successful fit at `(i, j)` with the window of samples
    /// used, ordered by ascending `t`.
    fn on_curvature_sample(&mut self, i: i32, j: i32, window: &[SamplePoint]);
}

impl DebugSink for () {
    fn on_curvature_sample(&mut self, _i: i32, _j: i32, _window: &[SamplePoint]) {}
}

/// Result of estimating curvature at a single pixel.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CurvaturePointResult {
    /// Outcome sentinel.
    pub status: CurvatureStatus,
    /// `|κ|` or signed `κ`, per [`CutterConfig::abs_curvature`]. `0.0` when
    /// `status != Ok`.
    pub kappa: f64,
    /// Half the arc-length between the pixel's immediate neighbours (or the
    /// first-step cost, if [`CutterConfig::balance_weight`] is off).
    pub weight: f64,
}

/// A dense curvature field over a grid, paired with a cause for every
/// pixel whose curvature is not `Ok`.
#[derive(Clone, PartialEq, Debug)]
pub struct CurvatureField {
    magnitude: Vec<f64>,
    status: Vec<CurvatureStatus>,
    size: GridSize,
}

impl CurvatureField {
    /// Computes curvature at every on-pixel of `on`. Off-pixels are
    /// recorded as [`CurvatureStatus::ThinnedAway`].
    pub fn compute(on: &Mask, config: &CutterConfig) -> Self {
        Self::compute_with_sink(on, config, &mut ())
    }

    /// As [`Self::compute`], additionally invoking `sink` once per
    /// successful fit.
    pub fn compute_with_sink<S: DebugSink + ?Sized>(on: &Mask, config: &CutterConfig, sink: &mut S) -> Self {
        let size = on.size();
        let mut magnitude = vec![0.0_f64; size.len()];
        let mut status = vec![CurvatureStatus::ThinnedAway; size.len()];

        for i in 0..size.height() as i32 {
            for j in 0..size.width() as i32 {
                if !on.get(i, j) {
                    continue;
                }

                let idx = i as usize * size.width() as usize + j as usize;
                let result = curvature_at_point_with_sink(on, i, j, config, sink);
                magnitude[idx] = result.kappa;
                status[idx] = result.status;
            }
        }

        CurvatureField { magnitude, status, size }
    }

    /// Field size.
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Curvature at `(i, j)`; `0.0` outside the grid or where the status
    /// isn't `Ok`.
    pub fn get(&self, i: i32, j: i32) -> f64 {
        self.index(i, j).map_or(0.0, |idx| self.magnitude[idx])
    }

    /// The status recorded at `(i, j)`; `ThinnedAway` outside the grid.
    pub fn status(&self, i: i32, j: i32) -> CurvatureStatus {
        self.index(i, j).map_or(CurvatureStatus::ThinnedAway, |idx| self.status[idx])
    }

    fn index(&self, i: i32, j: i32) -> Option<usize> {
        if self.size.contains(i, j) {
            Some(i as usize * self.size.width() as usize + j as usize)
        } else {
            None
        }
    }
}

/// Estimates curvature at a single on-pixel.
pub fn curvature_at_point(on: &Mask, i: i32, j: i32, config: &CutterConfig) -> CurvaturePointResult {
    curvature_at_point_with_sink(on, i, j, config, &mut ())
}

fn curvature_at_point_with_sink<S: DebugSink + ?Sized>(
    on: &Mask,
    i: i32,
    j: i32,
    config: &CutterConfig,
    sink: &mut S,
) -> CurvaturePointResult {
    if neighbour_count(on, i, j) != 2 {
        return CurvaturePointResult {
            status: CurvatureStatus::WrongNumberOfNeighbors,
            kappa: 0.0,
            weight: 0.0,
        };
    }

    let line_len = config.line_len.max(1);
    let walk = match walk_both_directions(on, i, j, line_len) {
        Some(w) => w,
        None => {
            return CurvaturePointResult {
                status: CurvatureStatus::NotLongEnough,
                kappa: 0.0,
                weight: 0.0,
            }
        }
    };

    let mut pos = walk.pos;
    let mut neg = walk.neg;

    if pos - neg + 1 < 4 || pos < config.min_buffer_length as i32 || neg > -(config.min_buffer_length as i32) {
        return CurvaturePointResult {
            status: CurvatureStatus::NotLongEnough,
            kappa: 0.0,
            weight: 0.0,
        };
    }

    if config.symmetric_fit {
        pos = pos.abs().min(neg.abs());
        neg = -pos;
    }

    let len = (pos - neg + 1) as usize;
    let mut t = Vec::with_capacity(len);
    let mut xs = Vec::with_capacity(len);
    let mut ys = Vec::with_capacity(len);
    for k in neg..=pos {
        let p = walk.sample(line_len, k);
        t.push(p.t);
        xs.push(p.j as f64);
        ys.push(p.i as f64);
    }

    let weight = if config.balance_weight {
        let plus_one = walk.sample(line_len, 1).t;
        let minus_one = walk.sample(line_len, -1).t;
        (plus_one - minus_one) / 2.0
    } else {
        walk.initial_weight
    };

    let centre_index = (-neg) as usize;
    let (fit, t_used) = if config.iterative_fit {
        fit_parametric_cubic_iterative(&t, &xs, &ys, None, config.fit_iterations)
    } else {
        (fit_parametric_cubic(&t, &xs, &ys, None), t.clone())
    };

    match fit {
        FitOutcome::Fitted { coeffs, .. } => {
            let t_centre = t_used[centre_index];
            let (xp, yp) = coeffs.eval_derivative(t_centre);
            let (xpp, ypp) = coeffs.eval_second_derivative(t_centre);
            let denom = (xp * xp + yp * yp).powf(1.5);
            let mut kappa = if denom > 0.0 {
                2.0 * (xp * ypp - yp * xpp) / denom
            } else {
                0.0
            };
            if config.abs_curvature {
                kappa = kappa.abs();
            }

            let window: Vec<SamplePoint> = (neg..=pos).map(|k| walk.sample(line_len, k)).collect();
            sink.on_curvature_sample(i, j, &window);

            CurvaturePointResult {
                status: CurvatureStatus::Ok,
                kappa,
                weight,
            }
        }
        FitOutcome::DegenerateSystem => {
            log::warn!("degenerate cubic fit while estimating curvature at ({i}, {j})");
            CurvaturePointResult {
                status: CurvatureStatus::DegenerateSystem,
                kappa: 0.0,
                weight,
            }
        }
        FitOutcome::WrongSampleCount => CurvaturePointResult {
            status: CurvatureStatus::NotLongEnough,
            kappa: 0.0,
            weight,
        },
    }
}

/// The walked sample buffer plus its valid extent on each side.
struct Walk {
    buffer: Vec<Option<SamplePoint>>,
    line_len: usize,
    pos: i32,
    neg: i32,
    initial_weight: f64,
}

impl Walk {
    fn sample(&self, line_len: usize, k: i32) -> SamplePoint {
        debug_assert_eq!(line_len, self.line_len);
        self.buffer[(self.line_len as i32 + k) as usize].expect("sample within [neg, pos] must be populated")
    }

    fn set(&mut self, k: i32, sample: SamplePoint) {
        let idx = (self.line_len as i32 + k) as usize;
        self.buffer[idx] = Some(sample);
    }

    fn get(&self, k: i32) -> Option<SamplePoint> {
        self.buffer.get((self.line_len as i32 + k) as usize).copied().flatten()
    }
}

/// Finds the first on-neighbour of `(i, j)` in the fixed search order,
/// walks outward in that direction and the opposite one, and returns the
/// resulting buffer plus the valid (positive, negative) extents.
///
/// Returns `None` if `(i, j)` has no on-neighbour at all (shouldn't happen
/// for a pixel that already passed the `neighbour_count == 2` check, but
/// handled defensively).
fn walk_both_directions(on: &Mask, i: i32, j: i32, line_len: usize) -> Option<Walk> {
    let mut walk = Walk {
        buffer: vec![None; 2 * line_len + 1],
        line_len,
        pos: 0,
        neg: 0,
        initial_weight: 1.0,
    };
    walk.set(0, SamplePoint { i, j, t: 0.0 });

    let mut first_dir = None;
    for &off in SEARCH_OFFSETS.iter().chain(core::iter::once(&4)) {
        let (di, dj) = DIRECTION_OFFSETS[off as usize];
        let ni = i + di;
        let nj = j + dj;
        if on.get(ni, nj) {
            first_dir = Some((off, ni, nj));
            break;
        }
    }

    let (dir, ni, nj) = first_dir?;
    let weight = direction_step_cost(dir);
    walk.initial_weight = weight;
    walk.set(1, SamplePoint { i: ni, j: nj, t: weight });

    walk.pos = walk_in_direction(on, &mut walk, ni, nj, dir, 2);
    let opposite = (dir + 4) % 8;
    walk.neg = walk_in_direction(on, &mut walk, i, j, opposite, -1);

    Some(walk)
}

/// Iterative form of the reference recursion: walks from `(i, j)` in
/// `start_dir`, extending `walk`'s buffer at increasing `|depth|`, stopping
/// when the host pixel itself isn't a 2-neighbour pass-through, when every
/// candidate direction is either off or already sampled, or when the
/// buffer side is full.
fn walk_in_direction(on: &Mask, walk: &mut Walk, mut i: i32, mut j: i32, mut dir: u8, mut depth: i32) -> i32 {
    let sign: i32 = if depth <= 0 { -1 } else { 1 };

    loop {
        if neighbour_count(on, i, j) > 2 {
            return depth - sign;
        }

        let mut found = None;
        for &off in &SEARCH_OFFSETS {
            let candidate_dir = (dir + off) % 8;
            let (di, dj) = DIRECTION_OFFSETS[candidate_dir as usize];
            let ni = i + di;
            let nj = j + dj;
            if !on.get(ni, nj) {
                continue;
            }

            let already_sampled = if depth < 0 {
                ((depth + 1)..=0).any(|k| walk.get(k).is_some_and(|p| p.i == ni && p.j == nj))
            } else {
                (0..depth).any(|k| walk.get(k).is_some_and(|p| p.i == ni && p.j == nj))
            };
            if already_sampled {
                continue;
            }

            found = Some((candidate_dir, ni, nj));
            break;
        }

        let (new_dir, ni, nj) = match found {
            Some(v) => v,
            None => return depth - sign,
        };

        let prev_t = walk.get(depth - sign).expect("previous step must be populated").t;
        let t = prev_t + sign as f64 * direction_step_cost(new_dir);
        walk.set(depth, SamplePoint { i: ni, j: nj, t });

        if depth.unsigned_abs() < walk.line_len as u32 {
            depth += sign;
            i = ni;
            j = nj;
            dir = new_dir;
        } else {
            return depth;
        }
    }
}
