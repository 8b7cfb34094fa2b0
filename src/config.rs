// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Every tunable used by the fitter, curvature estimator, path enumerator
/// and junction cutter, gathered in one place.
///
/// One struct, one `Default` impl, one doc comment per field naming the
/// default.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CutterConfig {
    // --- Fitter (4.B) ---
    /// Whether to run the two-iteration knot-parameter refit after the
    /// initial cubic fit.
    ///
    /// Default: `false`.
    pub iterative_fit: bool,
    /// Number of refit iterations performed when `iterative_fit` is set.
    ///
    /// Default: `2`.
    pub fit_iterations: usize,

    // --- Curvature (4.C) ---
    /// Trim the positive/negative sample buffers to an equal length before
    /// fitting.
    ///
    /// Default: `true`.
    pub symmetric_fit: bool,
    /// Weight each sample by half the arc-length between its immediate
    /// neighbours rather than uniformly.
    ///
    /// Default: `true`.
    pub balance_weight: bool,
    /// Report `|κ|` instead of signed curvature.
    ///
    /// Default: `true`.
    pub abs_curvature: bool,
    /// Minimum number of samples required on each side of a pixel before
    /// curvature is considered well-defined.
    ///
    /// Default: `8`.
    pub min_buffer_length: usize,
    /// Half-length of the sample buffer walked out from a pixel in each
    /// direction.
    ///
    /// Default: `16`.
    pub line_len: usize,

    // --- Path enumerator (4.D) ---
    /// Number of steps back along the current path used as the reference
    /// point for look-back branch ranking.
    ///
    /// Default: `7`.
    pub look_back: usize,
    /// Forbid a path from advancing into a cell adjacent to one of its own
    /// earlier cells.
    ///
    /// Default: `true`.
    pub no_self_touching_paths: bool,
    /// Recursion depth at which the local, tighter path-count ceiling
    /// (`max_num_paths_2`) kicks in.
    ///
    /// Default: `5`.
    pub depth_first_depth: usize,
    /// Global ceiling on the number of rows a single `enumerate_paths` call
    /// may produce.
    ///
    /// Default: `9^5 = 59049`.
    pub max_num_paths: usize,
    /// Maximum number of cells recorded in a single path.
    ///
    /// Default: `64`.
    pub max_path_len: usize,
    /// Minimum path length at which junction-stop snapshotting is armed; a
    /// value of `0` disables junction-stop entirely.
    ///
    /// Default: `8`.
    pub min_len_for_stopping_at_junctions: usize,
    /// Curvature threshold above which a single-branch (`k = 1`) pixel still
    /// counts as a junction-stop point.
    ///
    /// Default: `0.10`.
    pub junction_curvature_threshold: f64,

    // --- Cutter (4.E) ---
    /// Keep scanning for further cuts within a pass instead of committing
    /// only the single best candidate.
    ///
    /// Default: `true`.
    pub iterative_cutting: bool,
    /// Commit the entire matched path as precious instead of just the
    /// `commit_size`-pixel prefix nearest the junction.
    ///
    /// Default: `false`.
    pub commit_to_entire_path: bool,
    /// Number of samples dropped from each side of the joint sample
    /// sequence by the jump-junction scoring variant.
    ///
    /// Default: `2`.
    pub junction_size: usize,
    /// Maximum length of a path considered by the cutter; also the basis of
    /// `commit_size = max_cut_path_length / 2`.
    ///
    /// Default: `16`.
    pub max_cut_path_length: usize,
    /// Minimum pixel brightness (0-255) that counts as "on" when building
    /// the initial mask from an image.
    ///
    /// Default: `128`.
    pub brightness_threshold: u8,
}

impl CutterConfig {
    /// `max_num_paths / 9^depth_first_depth`, the per-depth budget increment
    /// used once recursion passes `depth_first_depth` (see 4.D step 7).
    pub(crate) fn max_num_paths_increment(&self) -> usize {
        let base = 9usize.saturating_pow(self.depth_first_depth as u32);
        if base == 0 {
            0
        } else {
            self.max_num_paths / base
        }
    }

    /// `max_cut_path_length / 2`, the number of prefix pixels a commit marks
    /// precious (before the `commit_to_entire_path` override).
    pub(crate) fn commit_size(&self) -> usize {
        self.max_cut_path_length / 2
    }
}

impl Default for CutterConfig {
    fn default() -> Self {
        CutterConfig {
            iterative_fit: false,
            fit_iterations: 2,

            symmetric_fit: true,
            balance_weight: true,
            abs_curvature: true,
            min_buffer_length: 8,
            line_len: 16,

            look_back: 7,
            no_self_touching_paths: true,
            depth_first_depth: 5,
            max_num_paths: 59049,
            max_path_len: 64,
            min_len_for_stopping_at_junctions: 8,
            junction_curvature_threshold: 0.10,

            iterative_cutting: true,
            commit_to_entire_path: false,
            junction_size: 2,
            max_cut_path_length: 16,
            brightness_threshold: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let c = CutterConfig::default();
        assert!(!c.iterative_fit);
        assert_eq!(c.fit_iterations, 2);
        assert!(c.symmetric_fit);
        assert!(c.balance_weight);
        assert!(c.abs_curvature);
        assert_eq!(c.min_buffer_length, 8);
        assert_eq!(c.line_len, 16);
        assert_eq!(c.look_back, 7);
        assert!(c.no_self_touching_paths);
        assert_eq!(c.depth_first_depth, 5);
        assert_eq!(c.max_num_paths, 59049);
        assert_eq!(c.max_path_len, 64);
        assert_eq!(c.min_len_for_stopping_at_junctions, 8);
        assert!((c.junction_curvature_threshold - 0.10).abs() < 1e-12);
        assert!(c.iterative_cutting);
        assert!(!c.commit_to_entire_path);
        assert_eq!(c.junction_size, 2);
        assert_eq!(c.max_cut_path_length, 16);
        assert_eq!(c.brightness_threshold, 128);
    }

    #[test]
    fn commit_size_is_half_max_cut_path_length() {
        let c = CutterConfig::default();
        assert_eq!(c.commit_size(), 8);
    }

    #[test]
    fn max_num_paths_increment_matches_9_to_the_depth() {
        let c = CutterConfig::default();
        assert_eq!(c.max_num_paths_increment(), 1);
    }
}
