// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Junction cutting: find pairs of paths leaving a high-degree pixel that
//! look like a single smooth curve passing through, and cut the pixel free
//! of its neighbours so downstream consumers see two strokes instead of
//! one tangle.

use core::cmp::Ordering;

use crate::config::CutterConfig;
use crate::curvature::CurvatureField;
use crate::fitter::{fit_parametric_cubic, FitOutcome};
use crate::grid::{neighbour_count, neighbour_count_excluding_aligned, thin_preserving_connectivity, GridSize, Mask, PixelSource};
use crate::paths::{enumerate_paths, PathTable};

/// Output of [`cut_neuron`]: the four masks named in the data model, plus
/// the curvature field computed along the way (callers scoring their own
/// candidates, or just inspecting the result, don't need to recompute it).
#[derive(Clone, Debug)]
pub struct CutResult {
    /// The thinned skeleton, with every committed junction pixel cleared of
    /// the neighbours it was cut from (its own bit stays set; see `cut`).
    pub on: Mask,
    /// Pixels blocking further path growth: either adjacent to an already
    /// committed cut, or marked `precious`.
    pub term: Mask,
    /// Pixels that are part of a committed path prefix and must not be
    /// claimed by a later cut.
    pub precious: Mask,
    /// Junction pixels that were cut.
    pub cut: Mask,
    /// Curvature estimated over the thinned skeleton before any cuts.
    pub curvature: CurvatureField,
}

/// Driver for the three-pass junction-cutting loop described in 4.E.
#[derive(Clone, Copy, Debug)]
pub struct JunctionCutter {
    config: CutterConfig,
}

impl JunctionCutter {
    /// Creates a cutter bound to `config`.
    pub fn new(config: CutterConfig) -> Self {
        JunctionCutter { config }
    }

    /// Runs the full three-pass cut over a binary image.
    pub fn cut<S: PixelSource>(&self, source: &S) -> CutResult {
        let mut on = Mask::from_pixel_source(source, self.config.brightness_threshold);
        thin_preserving_connectivity(&mut on);
        let curvature = CurvatureField::compute(&on, &self.config);

        let size = on.size();
        let mut term = Mask::new(size);
        let mut precious = Mask::new(size);
        let mut cut = Mask::new(size);
        let mut tables: [PathTable; 8] = core::array::from_fn(|_| PathTable::new());

        for pass in 0..3u8 {
            loop {
                let mut candidates =
                    self.collect_pass_candidates(pass, &on, &term, &precious, &cut, &curvature, &mut tables);
                if candidates.is_empty() {
                    break;
                }

                candidates.sort_by(|a, b| a.quality.partial_cmp(&b.quality).unwrap_or(Ordering::Equal));

                let mut committed = 0usize;
                for idx in 0..candidates.len() {
                    if candidates[idx].invalidated {
                        continue;
                    }

                    let ci = candidates[idx].i;
                    let cj = candidates[idx].j;
                    let quality = candidates[idx].quality;
                    let path1 = candidates[idx].path1.clone();
                    let path2 = candidates[idx].path2.clone();

                    commit_cut(ci, cj, &path1, &path2, &self.config, &on, &mut precious, &mut term);
                    cut.set(ci, cj, true);
                    precious.set(ci, cj, true);
                    on.set(ci, cj, false);
                    committed += 1;
                    log::debug!("committed cut at ({ci}, {cj}) with quality {quality}");

                    if self.config.iterative_cutting {
                        let radius = (self.config.commit_size() + self.config.max_path_len) as i64;
                        let radius_sq = radius * radius;
                        for later in candidates.iter_mut().skip(idx + 1) {
                            let di = (ci - later.i) as i64;
                            let dj = (cj - later.j) as i64;
                            if di * di + dj * dj < radius_sq {
                                later.invalidated = true;
                            }
                        }
                    }
                }

                if committed == 0 {
                    break;
                }
            }
        }

        CutResult { on, term, precious, cut, curvature }
    }

    fn collect_pass_candidates(
        &self,
        pass: u8,
        on: &Mask,
        term: &Mask,
        precious: &Mask,
        cut: &Mask,
        curvature: &CurvatureField,
        tables: &mut [PathTable; 8],
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        let height = on.height() as i32;
        let width = on.width() as i32;

        for i in 0..height {
            for j in 0..width {
                if !on.get(i, j) || cut.get(i, j) || term.get(i, j) || precious.get(i, j) {
                    continue;
                }

                let qualifies = if pass == 0 {
                    neighbour_count_excluding_aligned(on, i, j) > 2
                } else {
                    neighbour_count(on, i, j) > 2
                };
                if !qualifies {
                    continue;
                }

                let scored = match score_junction(on, term, curvature, &self.config, tables, i, j) {
                    Some(s) => s,
                    None => {
                        log::trace!("junction at ({i}, {j}) could not be scored in pass {pass}");
                        continue;
                    }
                };

                let accept = pass > 1 || (scored.len1 > self.config.min_buffer_length && scored.len2 > self.config.min_buffer_length);
                if !accept {
                    continue;
                }

                out.push(Candidate {
                    i,
                    j,
                    path1: scored.path1,
                    path2: scored.path2,
                    quality: scored.quality,
                    invalidated: false,
                });
            }
        }

        out
    }
}

/// Runs [`JunctionCutter`] with the given configuration over a binary
/// image.
pub fn cut_neuron<S: PixelSource>(source: &S, config: &CutterConfig) -> CutResult {
    JunctionCutter::new(*config).cut(source)
}

struct Candidate {
    i: i32,
    j: i32,
    path1: Vec<(i32, i32)>,
    path2: Vec<(i32, i32)>,
    quality: f64,
    invalidated: bool,
}

struct ScoredPair {
    path1: Vec<(i32, i32)>,
    path2: Vec<(i32, i32)>,
    len1: usize,
    len2: usize,
    quality: f64,
}

/// Enumerates all 8 seed-direction path tables rooted at `(i, j)`, screens
/// for a "good trio" of mutually non-overlapping paths, and returns the
/// best-scoring admissible pair (lowest quality value wins).
fn score_junction(
    on: &Mask,
    term: &Mask,
    curvature: &CurvatureField,
    config: &CutterConfig,
    tables: &mut [PathTable; 8],
    i: i32,
    j: i32,
) -> Option<ScoredPair> {
    for (dir, table) in tables.iter_mut().enumerate() {
        enumerate_paths(on, term, Some(curvature), config, table, i, j, dir as u8);
    }

    if !has_good_trio(tables) {
        return None;
    }

    let mut best: Option<ScoredPair> = None;

    for d1 in 0..8usize {
        for d2 in (d1 + 1)..8usize {
            for p1 in 0..tables[d1].len() {
                let row1 = tables[d1].row(p1);
                let len1 = row1.len();
                if len1 <= 1 {
                    continue;
                }

                for p2 in 0..tables[d2].len() {
                    let row2 = tables[d2].row(p2);
                    let len2 = row2.len();
                    if len2 <= 1 {
                        continue;
                    }

                    if len1 < config.min_buffer_length && len2 < config.min_buffer_length {
                        continue;
                    }
                    if cells_overlap(row1.cells(), row2.cells(), 1, 1) {
                        continue;
                    }
                    if config.no_self_touching_paths && paths_touch_self(row1.cells(), row2.cells()) {
                        continue;
                    }

                    if let Some(quality) = score_pair(row1.cells(), row1.steps(), row2.cells(), row2.steps(), config) {
                        let better = match &best {
                            Some(b) => quality < b.quality,
                            None => true,
                        };
                        if better {
                            best = Some(ScoredPair {
                                path1: row1.cells().to_vec(),
                                path2: row2.cells().to_vec(),
                                len1,
                                len2,
                                quality,
                            });
                        }
                    }
                }
            }
        }
    }

    best
}

/// Whether there exist three distinct seed directions each holding a path,
/// pairwise non-overlapping beyond the shared seed pixel. A pure existence
/// check: the reference implementation keeps scanning after finding one,
/// but never acts on a second.
fn has_good_trio(tables: &[PathTable; 8]) -> bool {
    for d1 in 0..8usize {
        for d2 in (d1 + 1)..8usize {
            for d3 in (d2 + 1)..8usize {
                for p1 in 0..tables[d1].len() {
                    let r1 = tables[d1].row(p1);
                    if r1.len() < 2 {
                        continue;
                    }
                    for p2 in 0..tables[d2].len() {
                        let r2 = tables[d2].row(p2);
                        if r2.len() < 2 {
                            continue;
                        }
                        if cells_overlap(r1.cells(), r2.cells(), 1, 1) {
                            continue;
                        }
                        for p3 in 0..tables[d3].len() {
                            let r3 = tables[d3].row(p3);
                            if r3.len() < 2 {
                                continue;
                            }
                            if cells_overlap(r1.cells(), r3.cells(), 1, 1) {
                                continue;
                            }
                            if cells_overlap(r2.cells(), r3.cells(), 1, 1) {
                                continue;
                            }
                            return true;
                        }
                    }
                }
            }
        }
    }
    false
}

/// Whether `a[from_a..]` and `b[from_b..]` share any cell.
fn cells_overlap(a: &[(i32, i32)], b: &[(i32, i32)], from_a: usize, from_b: usize) -> bool {
    if from_a >= a.len() || from_b >= b.len() {
        return false;
    }
    a[from_a..].iter().any(|cell| b[from_b..].contains(cell))
}

/// No-self-touch between two paths sharing a seed: true if any interior
/// cell (index `>= 2`) of one path is 8-adjacent to an interior cell of the
/// other.
fn paths_touch_self(a: &[(i32, i32)], b: &[(i32, i32)]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for &(ai, aj) in &a[2..] {
        for &(bi, bj) in &b[2..] {
            if (ai - bi).abs() < 2 && (aj - bj).abs() < 2 {
                return true;
            }
        }
    }
    false
}

/// Scores a candidate pair by fitting a single joint cubic through both
/// paths (the first walking forward from the junction, the second mirrored
/// onto negative parameter values) and returns the smaller of the plain and
/// jump-junction quality values. Lower is better; `None` if neither variant
/// produces a usable fit.
fn score_pair(
    cells1: &[(i32, i32)],
    steps1: &[f64],
    cells2: &[(i32, i32)],
    steps2: &[f64],
    config: &CutterConfig,
) -> Option<f64> {
    let plain = score_variant(cells1, steps1, cells2, steps2, 0, config.abs_curvature);

    let jump = if cells1.len() >= config.min_buffer_length && cells2.len() >= config.min_buffer_length {
        score_variant(cells1, steps1, cells2, steps2, config.junction_size, config.abs_curvature)
    } else {
        None
    };

    match (plain, jump) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Builds the joint sample sequence for one scoring variant and returns its
/// quality, `(5 * kappa_stdev + rms_error) / (fit_len1 + fit_len2 - 5)`.
///
/// `drop` is `0` for the plain variant, where both paths' cell `0` is the
/// literal shared junction pixel and only `fit_len1 + fit_len2 - 1` samples
/// are distinct; or [`CutterConfig::junction_size`] for the jump-junction
/// variant, which drops that many samples from the head of each path (the
/// ones nearest the messy junction pixel) and stitches the two remainders
/// together across a synthetic gap of half the Euclidean distance between
/// the two new path heads, contributing `fit_len1 + fit_len2` distinct
/// samples (there is no longer a literally shared pixel to dedupe).
fn score_variant(
    cells1: &[(i32, i32)],
    steps1: &[f64],
    cells2: &[(i32, i32)],
    steps2: &[f64],
    drop: usize,
    abs_curvature: bool,
) -> Option<f64> {
    let fit_len1 = cells1.len().checked_sub(drop)?;
    let fit_len2 = cells2.len().checked_sub(drop)?;
    if fit_len1 < 2 || fit_len2 < 2 {
        return None;
    }

    let seed_t = if drop == 0 {
        0.0
    } else {
        let (i1, j1) = cells1[drop];
        let (i2, j2) = cells2[drop];
        let di = (i1 - i2) as f64;
        let dj = (j1 - j2) as f64;
        (di * di + dj * dj).sqrt() / 2.0
    };

    let mut t = Vec::with_capacity(fit_len1 + fit_len2);
    let mut xs = Vec::with_capacity(fit_len1 + fit_len2);
    let mut ys = Vec::with_capacity(fit_len1 + fit_len2);

    let mut acc = seed_t;
    for k in 0..fit_len1 {
        let (ci, cj) = cells1[drop + k];
        t.push(acc);
        xs.push(cj as f64);
        ys.push(ci as f64);
        if k + 1 < fit_len1 {
            acc += steps1[drop + k + 1];
        }
    }

    // The plain variant shares its index-0 pixel with path1's, so path2
    // contributes starting at its own index 1; the jump variant has no
    // shared pixel, so path2 contributes in full from its (post-drop) index 0.
    let path2_start = if drop == 0 { 1 } else { 0 };
    let mut acc = if drop == 0 { -steps2[1] } else { -seed_t };
    for k in path2_start..fit_len2 {
        let (ci, cj) = cells2[drop + k];
        t.push(acc);
        xs.push(cj as f64);
        ys.push(ci as f64);
        if k + 1 < fit_len2 {
            acc -= steps2[drop + k + 1];
        }
    }

    let fit = fit_parametric_cubic(&t, &xs, &ys, None);
    let (coeffs, error) = match fit {
        FitOutcome::Fitted { coeffs, rms_error } => (coeffs, rms_error),
        _ => return None,
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let n = t.len();
    for (idx, &tk) in t.iter().enumerate() {
        let (xp, yp) = coeffs.eval_derivative(tk);
        let (xpp, ypp) = coeffs.eval_second_derivative(tk);
        let denom = (xp * xp + yp * yp).powf(1.5);
        let mut kappa = if denom > 0.0 { 2.0 * (xp * ypp - yp * xpp) / denom } else { 0.0 };
        if idx < fit_len1 || abs_curvature {
            kappa = kappa.abs();
        }
        sum += kappa;
        sum_sq += kappa * kappa;
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    let stdev = variance.sqrt();

    let denom = fit_len1 as f64 + fit_len2 as f64 - 5.0;
    if denom <= 0.0 {
        return None;
    }

    Some((5.0 * stdev + error) / denom)
}

/// Commits a winning pair: marks the near prefix of each path precious, and
/// seals off their on-neighbours (that aren't on either path) as
/// terminators, so later candidates can't grow back through the cut.
fn commit_cut(
    i: i32,
    j: i32,
    path1: &[(i32, i32)],
    path2: &[(i32, i32)],
    config: &CutterConfig,
    on: &Mask,
    precious: &mut Mask,
    term: &mut Mask,
) {
    for path in [path1, path2] {
        let path_len = path.len();
        let max_subset = if path_len <= 4 {
            continue;
        } else if config.commit_to_entire_path {
            path_len - 4
        } else {
            (path_len - 4).min(config.commit_size())
        };

        for k in 0..max_subset {
            let (ii, jj) = path[k];

            if k + 1 < max_subset && (ii != i || jj != j) && !term.get(ii, jj) {
                precious.set(ii, jj, true);
            }

            for di in -1..=1i32 {
                for dj in -1..=1i32 {
                    let ni = ii + di;
                    let nj = jj + dj;
                    if ni == ii && nj == jj {
                        continue;
                    }
                    if !on.get(ni, nj) {
                        continue;
                    }
                    if pixel_on_path(path1, ni, nj) || pixel_on_path(path2, ni, nj) {
                        continue;
                    }
                    if precious.get(ni, nj) {
                        continue;
                    }
                    term.set(ni, nj, true);
                }
            }
        }
    }
}

fn pixel_on_path(path: &[(i32, i32)], i: i32, j: i32) -> bool {
    path.contains(&(i, j))
}
