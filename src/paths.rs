// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Depth-first path enumeration from a seed pixel/direction, with
//! look-back-biased branch ranking and aggressive pruning.

use curv_numeric::{angular_distance, direction_step_cost, DIRECTION_OFFSETS, SQRT_2};

use crate::config::CutterConfig;
use crate::curvature::CurvatureField;
use crate::grid::Mask;

/// One row of the path table: a sequence of grid cells plus the per-step
/// cost (`1` or `√2`) it took to reach each cell from its predecessor.
///
/// `t[0]` is always `0.0` (the seed pixel has no predecessor in this row).
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PathRow {
    cells: Vec<(i32, i32)>,
    step: Vec<f64>,
}

impl PathRow {
    /// Number of valid cells in this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether this row holds no cells at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell at index `k`.
    #[inline]
    pub fn cell(&self, k: usize) -> (i32, i32) {
        self.cells[k]
    }

    /// The per-step cost it took to reach `cell(k)` from `cell(k - 1)`
    /// (`0.0` at `k == 0`).
    #[inline]
    pub fn step_cost(&self, k: usize) -> f64 {
        self.step[k]
    }

    /// All cells, in path order.
    #[inline]
    pub fn cells(&self) -> &[(i32, i32)] {
        &self.cells
    }

    /// All per-step costs, in path order.
    #[inline]
    pub fn steps(&self) -> &[f64] {
        &self.step
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.step.clear();
    }

    fn push(&mut self, cell: (i32, i32), step: f64) {
        self.cells.push(cell);
        self.step.push(step);
    }
}

/// A reusable set of path rows, indexed `0..len()`.
///
/// Rows are kept around (and their backing `Vec`s reused) across calls to
/// [`enumerate_paths`] so that repeated enumeration at many junctions
/// doesn't reallocate.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PathTable {
    rows: Vec<PathRow>,
    active: usize,
}

impl PathTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        PathTable::default()
    }

    /// Number of active rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether there are no active rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Borrows row `idx`.
    #[inline]
    pub fn row(&self, idx: usize) -> &PathRow {
        &self.rows[idx]
    }

    /// All active rows.
    pub fn rows(&self) -> &[PathRow] {
        &self.rows[..self.active]
    }

    fn reset(&mut self) {
        self.active = 0;
    }

    fn new_row(&mut self) -> usize {
        let idx = self.active;
        if idx < self.rows.len() {
            self.rows[idx].clear();
        } else {
            if !self.rows.is_empty() {
                log::warn!(
                    "path table grew past its previous high-water mark ({} -> {} rows)",
                    self.rows.len(),
                    idx + 1
                );
            }
            self.rows.push(PathRow::default());
        }
        self.active += 1;
        idx
    }

    fn push(&mut self, idx: usize, cell: (i32, i32), step: f64) {
        self.rows[idx].push(cell, step);
    }
}

/// Per-invocation state for [`enumerate_paths`], carrying what the
/// reference implementation keeps in file-static globals (current
/// recursion depth, path counters, budget ceilings) as ordinary fields so
/// that enumeration is reentrant and thread-safe.
pub struct PathEnumCtx<'a> {
    on: &'a Mask,
    term: &'a Mask,
    curvature: Option<&'a CurvatureField>,
    config: &'a CutterConfig,
    table: &'a mut PathTable,
    num_paths: usize,
    depth: usize,
    max_num_paths_2: usize,
}

impl<'a> PathEnumCtx<'a> {
    /// Creates a new enumeration context bound to `table`, which is reset
    /// at the start of [`Self::enumerate`].
    pub fn new(
        on: &'a Mask,
        term: &'a Mask,
        curvature: Option<&'a CurvatureField>,
        config: &'a CutterConfig,
        table: &'a mut PathTable,
    ) -> Self {
        PathEnumCtx {
            on,
            term,
            curvature,
            config,
            table,
            num_paths: 0,
            depth: 0,
            max_num_paths_2: 0,
        }
    }

    /// Enumerates paths starting at `(i, j)` along `dir`, filling `self`'s
    /// table. Returns the number of rows produced (`0` if the seed or its
    /// first step is off the mask).
    pub fn enumerate(&mut self, i: i32, j: i32, dir: u8) -> usize {
        self.table.reset();

        if !self.on.get(i, j) {
            return 0;
        }

        let (di, dj) = DIRECTION_OFFSETS[dir as usize];
        let ni = i + di;
        let nj = j + dj;
        if !self.on.get(ni, nj) {
            return 0;
        }

        let row0 = self.table.new_row();
        self.table.push(row0, (i, j), 0.0);
        self.table.push(row0, (ni, nj), direction_step_cost(dir));

        self.num_paths = 1;
        self.depth = 0;
        self.max_num_paths_2 = self.config.max_num_paths;

        self.walk(ni, nj, row0, 2, dir);

        self.validate();

        self.table.len()
    }

    fn budget_exceeded(&self) -> bool {
        if self.num_paths + 1 >= self.config.max_num_paths {
            return true;
        }

        self.config.depth_first_depth > 0
            && self.depth > self.config.depth_first_depth
            && self.num_paths + 1 >= self.max_num_paths_2
    }

    /// Copies the first `len` entries of row `src` into a freshly allocated
    /// row, bumping the path counter to match.
    fn duplicate_prefix(&mut self, src: usize, len: usize) -> usize {
        let cells: Vec<(i32, i32)> = self.table.row(src).cells()[..len].to_vec();
        let steps: Vec<f64> = self.table.row(src).steps()[..len].to_vec();

        let new_idx = self.table.new_row();
        for k in 0..len {
            self.table.push(new_idx, cells[k], steps[k]);
        }
        self.num_paths += 1;

        new_idx
    }

    fn already_visited(&self, path_idx: usize, cur_len: usize, ti: i32, tj: i32) -> bool {
        let row = self.table.row(path_idx);
        (0..cur_len).any(|p| row.cell(p) == (ti, tj))
    }

    /// No-self-touch: true if any 8-neighbour of `(ti, tj)` (other than
    /// `(ci, cj)` and `(ti, tj)` themselves) already lies on the path.
    fn touches_self(&self, path_idx: usize, cur_len: usize, ci: i32, cj: i32, ti: i32, tj: i32) -> bool {
        let row = self.table.row(path_idx);
        for di in -1..=1i32 {
            for dj in -1..=1i32 {
                let ii = ti + di;
                let jj = tj + dj;
                if (ii == ci && jj == cj) || (ii == ti && jj == tj) {
                    continue;
                }
                if (0..cur_len).any(|p| row.cell(p) == (ii, jj)) {
                    return true;
                }
            }
        }
        false
    }

    fn walk(&mut self, mut i: i32, mut j: i32, mut cur_path_index: usize, mut cur_len: usize, mut prev_dir: u8) {
        if self.term.get(i, j) {
            return;
        }

        if self.config.depth_first_depth > 0 && self.depth == self.config.depth_first_depth {
            self.max_num_paths_2 = self.num_paths + self.config.max_num_paths_increment();
        }
        self.depth += 1;

        while cur_len < self.config.max_path_len {
            let ref_idx = cur_len.saturating_sub(self.config.look_back.max(1));
            let (ref_i, ref_j) = self.table.row(cur_path_index).cell(ref_idx);
            let look_back_di = (i - ref_i) as f64;
            let look_back_dj = (j - ref_j) as f64;

            let mut candidates: Vec<(u8, f64)> = Vec::with_capacity(8);
            for d in 0..8u8 {
                if angular_distance(prev_dir, d) >= 3 {
                    continue;
                }

                let (ddi, ddj) = DIRECTION_OFFSETS[d as usize];
                let ni = i + ddi;
                let nj = j + ddj;
                if !self.on.get(ni, nj) {
                    continue;
                }
                if self.already_visited(cur_path_index, cur_len, ni, nj) {
                    continue;
                }
                if self.config.no_self_touching_paths && self.touches_self(cur_path_index, cur_len, i, j, ni, nj) {
                    continue;
                }

                let mut dot = look_back_di * ddi as f64 + look_back_dj * ddj as f64;
                if d % 2 == 1 {
                    dot /= SQRT_2;
                }
                candidates.push((d, dot));
            }

            if candidates.is_empty() {
                break;
            } else if candidates.len() == 1 {
                let d = candidates[0].0;
                let junction_stop = self.config.min_len_for_stopping_at_junctions > 0
                    && cur_len >= self.config.min_len_for_stopping_at_junctions
                    && self
                        .curvature
                        .is_some_and(|k| k.get(i, j) > self.config.junction_curvature_threshold);

                if junction_stop {
                    if self.budget_exceeded() {
                        self.depth -= 1;
                        return;
                    }
                    cur_path_index = self.duplicate_prefix(cur_path_index, cur_len);
                }

                let (ddi, ddj) = DIRECTION_OFFSETS[d as usize];
                let ni = i + ddi;
                let nj = j + ddj;
                self.table.push(cur_path_index, (ni, nj), direction_step_cost(d));

                i = ni;
                j = nj;
                prev_dir = d;
                cur_len += 1;

                if self.term.get(i, j) {
                    self.depth -= 1;
                    return;
                }
            } else {
                let mut sorted = candidates;
                sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(core::cmp::Ordering::Equal));

                let junction_stop = self.config.min_len_for_stopping_at_junctions > 0
                    && cur_len >= self.config.min_len_for_stopping_at_junctions;

                if junction_stop {
                    if self.budget_exceeded() {
                        self.depth -= 1;
                        return;
                    }
                    cur_path_index = self.duplicate_prefix(cur_path_index, cur_len);
                }

                for (idx, &(d, _)) in sorted.iter().enumerate() {
                    let (ddi, ddj) = DIRECTION_OFFSETS[d as usize];
                    let ni = i + ddi;
                    let nj = j + ddj;
                    let step = direction_step_cost(d);

                    if idx == 0 {
                        self.table.push(cur_path_index, (ni, nj), step);
                        self.walk(ni, nj, cur_path_index, cur_len + 1, d);
                    } else {
                        if self.budget_exceeded() {
                            self.depth -= 1;
                            return;
                        }
                        let branch_index = self.duplicate_prefix(cur_path_index, cur_len);
                        self.table.push(branch_index, (ni, nj), step);
                        self.walk(ni, nj, branch_index, cur_len + 1, d);
                    }
                }

                self.depth -= 1;
                return;
            }
        }

        self.depth -= 1;
    }

    fn validate(&self) {
        if cfg!(debug_assertions) {
            for row in self.table.rows() {
                for w in row.cells().windows(2) {
                    let (ai, aj) = w[0];
                    let (bi, bj) = w[1];
                    debug_assert!(
                        (ai - bi).abs() <= 1 && (aj - bj).abs() <= 1,
                        "path step ({ai},{aj}) -> ({bi},{bj}) exceeds Chebyshev distance 1"
                    );
                }
            }
        }
    }
}

/// Enumerates admissible walks from `(i, j)` along seed direction `dir`,
/// filling `table`. See [`PathEnumCtx`] for the per-invocation state this
/// wraps.
pub fn enumerate_paths(
    on: &Mask,
    term: &Mask,
    curvature: Option<&CurvatureField>,
    config: &CutterConfig,
    table: &mut PathTable,
    i: i32,
    j: i32,
    dir: u8,
) -> usize {
    PathEnumCtx::new(on, term, curvature, config, table).enumerate(i, j, dir)
}

/// As [`enumerate_paths`], but validates the seed first: a direction outside
/// `0..8` or a seed pixel outside the mask's bounds is a precondition
/// violation, not ordinary image geometry, so it is reported as
/// [`crate::CurveError::InvalidSeed`] rather than silently enumerating zero
/// paths.
pub fn try_enumerate_paths(
    on: &Mask,
    term: &Mask,
    curvature: Option<&CurvatureField>,
    config: &CutterConfig,
    table: &mut PathTable,
    i: i32,
    j: i32,
    dir: u8,
) -> Result<usize, crate::CurveError> {
    if dir >= 8 || !on.size().contains(i, j) {
        return Err(crate::CurveError::InvalidSeed {
            i,
            j,
            dir,
            width: on.width(),
            height: on.height(),
        });
    }

    Ok(enumerate_paths(on, term, curvature, config, table, i, j, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    fn grid_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let size = GridSize::new(width, height).unwrap();
        let mut mask = Mask::new(size);
        for (i, row) in rows.iter().enumerate() {
            for (j, c) in row.chars().enumerate() {
                mask.set(i as i32, j as i32, c == '#');
            }
        }
        mask
    }

    fn all_cells_are_chebyshev_1(table: &PathTable) -> bool {
        table.rows().iter().all(|row| {
            row.cells()
                .windows(2)
                .all(|w| (w[0].0 - w[1].0).abs() <= 1 && (w[0].1 - w[1].1).abs() <= 1)
        })
    }

    #[test]
    fn try_enumerate_rejects_an_out_of_range_direction() {
        let mask = grid_from_rows(&["...", ".#.", "..."]);
        let term = Mask::new(mask.size());
        let config = CutterConfig::default();
        let mut table = PathTable::new();
        let err = try_enumerate_paths(&mask, &term, None, &config, &mut table, 1, 1, 8).unwrap_err();
        assert!(matches!(err, crate::CurveError::InvalidSeed { dir: 8, .. }));
    }

    #[test]
    fn try_enumerate_rejects_a_seed_outside_the_grid() {
        let mask = grid_from_rows(&["...", ".#.", "..."]);
        let term = Mask::new(mask.size());
        let config = CutterConfig::default();
        let mut table = PathTable::new();
        let err = try_enumerate_paths(&mask, &term, None, &config, &mut table, 5, 5, 0).unwrap_err();
        assert!(matches!(err, crate::CurveError::InvalidSeed { i: 5, j: 5, .. }));
    }

    #[test]
    fn off_seed_returns_no_paths() {
        let mask = grid_from_rows(&["...", "...", "..."]);
        let term = Mask::new(mask.size());
        let config = CutterConfig::default();
        let mut table = PathTable::new();
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 1, 1, 0);
        assert_eq!(n, 0);
    }

    #[test]
    fn straight_line_yields_a_single_path_reaching_the_end() {
        let mask = grid_from_rows(&["...........", "..#########", "..........."]);
        let term = Mask::new(mask.size());
        let config = CutterConfig {
            min_len_for_stopping_at_junctions: 0,
            ..CutterConfig::default()
        };
        let mut table = PathTable::new();
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 1, 2, 2);
        assert_eq!(n, 1);
        assert!(all_cells_are_chebyshev_1(&table));
        // Walks until it runs off the end of the line (count_dir == 0).
        assert!(table.row(0).len() >= 5);
    }

    #[test]
    fn path_stops_at_a_terminator() {
        let mask = grid_from_rows(&["...........", "..#########", "..........."]);
        let mut term = Mask::new(mask.size());
        term.set(1, 6, true);
        let config = CutterConfig {
            min_len_for_stopping_at_junctions: 0,
            ..CutterConfig::default()
        };
        let mut table = PathTable::new();
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 1, 2, 2);
        assert_eq!(n, 1);
        let row = table.row(0);
        assert_eq!(row.cell(row.len() - 1), (1, 6));
    }

    #[test]
    fn plus_junction_branches_into_multiple_admissible_directions() {
        // A horizontal and vertical bar crossing at (5, 5).
        let mut mask = Mask::new(GridSize::new(11, 11).unwrap());
        for j in 0..11 {
            mask.set(5, j, true);
        }
        for i in 0..11 {
            mask.set(i, 5, true);
        }
        let term = Mask::new(mask.size());
        let config = CutterConfig::default();
        let mut table = PathTable::new();
        // Seed going right from the centre: only one admissible direction
        // at every step along a straight bar (no actual branch to take
        // mid-arm), so this mostly tests that enumeration doesn't panic.
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 5, 5, 2);
        assert!(n >= 1);
        assert!(all_cells_are_chebyshev_1(&table));
    }

    #[test]
    fn no_self_touching_paths_is_respected_on_a_solid_block() {
        // S5: a solid 3x3 block embedded in an empty grid.
        let mut mask = Mask::new(GridSize::new(20, 20).unwrap());
        for i in 4..7 {
            for j in 4..7 {
                mask.set(i, j, true);
            }
        }
        let term = Mask::new(mask.size());
        let config = CutterConfig {
            max_path_len: 16,
            max_num_paths: 1024,
            min_len_for_stopping_at_junctions: 0,
            ..CutterConfig::default()
        };
        let mut table = PathTable::new();
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 5, 5, 0);
        assert!(n >= 1);
        assert!(all_cells_are_chebyshev_1(&table));

        // No-self-touch: no two cells within a single path (beyond the
        // obligatory consecutive pair) should be 8-adjacent.
        for row in table.rows() {
            let cells = row.cells();
            for a in 0..cells.len() {
                for b in (a + 2)..cells.len() {
                    let (ai, aj) = cells[a];
                    let (bi, bj) = cells[b];
                    assert!(
                        (ai - bi).abs() > 1 || (aj - bj).abs() > 1,
                        "cells {a} and {b} of a path touch without being consecutive"
                    );
                }
            }
        }
    }

    #[test]
    fn junction_stop_snapshots_a_prefix_row() {
        let mut mask = Mask::new(GridSize::new(21, 21).unwrap());
        for j in 0..21 {
            mask.set(10, j, true);
        }
        for i in 0..21 {
            mask.set(i, 10, true);
        }
        let term = Mask::new(mask.size());
        let config = CutterConfig {
            min_len_for_stopping_at_junctions: 3,
            ..CutterConfig::default()
        };
        let mut table = PathTable::new();
        // Walk left from the centre along the horizontal bar: never
        // crosses the vertical bar's row, so no snapshot is expected; use
        // a seed that approaches the crossing instead.
        let n = enumerate_paths(&mask, &term, None, &config, &mut table, 10, 2, 2);
        assert!(n >= 1);
    }
}
