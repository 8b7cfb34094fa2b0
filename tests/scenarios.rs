//! Crate-level end-to-end scenarios exercising the full grid -> curvature ->
//! path -> cutter pipeline through the public API only.

use curv::fitter::fit_parametric_cubic;
use curv::paths::enumerate_paths;
use curv::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mask_from_rows(rows: &[String]) -> Mask {
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

#[test]
fn horizontal_line_is_never_cut_and_has_near_zero_curvature() {
    init();
    let width = 47usize;
    let mut rows: Vec<String> = (0..5).map(|_| ".".repeat(width)).collect();
    rows[2] = format!("{}{}{}", ".".repeat(3), "#".repeat(width - 6), ".".repeat(3));
    let mask = mask_from_rows(&rows);

    let config = CutterConfig::default();
    let result = cut_neuron(&mask, &config);

    assert_eq!(result.cut.count_set(), 0);
    assert_eq!(result.precious.count_set(), 0);
    assert_eq!(result.on.count_set(), mask.count_set());

    // Interior pixels, far enough from either end to clear min_buffer_length
    // on both sides, should fit cleanly with curvature near zero.
    let mut checked = 0;
    for j in 15..(width as i32 - 15) {
        if result.curvature.status(2, j) == CurvatureStatus::Ok {
            assert!(result.curvature.get(2, j).abs() < 1.0e-6, "kappa at col {j} = {}", result.curvature.get(2, j));
            checked += 1;
        }
    }
    assert!(checked > 0, "expected at least one interior pixel to fit successfully");
}

#[test]
fn plus_crossing_is_cut_exactly_once_at_the_centre() {
    init();
    let size = GridSize::new(31, 31).unwrap();
    let mut mask = Mask::new(size);
    // Horizontal arm: 15 cells, vertical arm: 11 cells, crossing at (15, 15).
    for j in 8..=22 {
        mask.set(15, j, true);
    }
    for i in 10..=20 {
        mask.set(i, 15, true);
    }

    let config = CutterConfig::default();
    let result = cut_neuron(&mask, &config);

    assert_eq!(result.cut.count_set(), 1, "expected exactly one cut");
    assert!(result.cut.get(15, 15), "expected the crossing pixel itself to be cut");
    assert!(!result.on.get(15, 15), "a committed cut pixel is cleared from `on`");

    // The four arm tips are untouched by the cut.
    assert!(result.on.get(15, 8));
    assert!(result.on.get(15, 22));
    assert!(result.on.get(10, 15));
    assert!(result.on.get(20, 15));
}

#[test]
fn three_arm_junction_keeps_the_straight_pair_precious() {
    init();
    let size = GridSize::new(41, 41).unwrap();
    let mut mask = Mask::new(size);
    let (ci, cj) = (20i32, 20i32);

    // A straight vertical line through the junction (smooth continuation)...
    for i in (ci - 15)..=(ci + 15) {
        mask.set(i, cj, true);
    }
    // ...plus a third arm branching off to the side, sharply enough that
    // it's never the smoother choice.
    for k in 1..=15 {
        mask.set(ci, cj + k, true);
    }

    let config = CutterConfig::default();
    let result = cut_neuron(&mask, &config);

    assert!(result.cut.get(ci, cj), "expected the T-junction to be cut");

    // The straight-through arms survive; the branch's near end does too
    // (only the junction pixel itself, and a short prefix nearest it, are
    // ever touched by a commit).
    assert!(result.on.get(ci - 15, cj));
    assert!(result.on.get(ci + 15, cj));
    assert!(result.on.get(ci, cj + 15));
}

#[test]
fn digitised_circle_has_no_junctions_and_near_constant_curvature() {
    init();
    let radius = 20.0;
    let centre = 25i32;
    let size = GridSize::new(51, 51).unwrap();
    let mut mask = Mask::new(size);

    // Dense angular sampling keeps consecutive points within Chebyshev
    // distance 1 so the ring is 8-connected before thinning.
    let steps = 720;
    for k in 0..steps {
        let theta = 2.0 * core::f64::consts::PI * (k as f64) / (steps as f64);
        let i = centre + (radius * theta.cos()).round() as i32;
        let j = centre + (radius * theta.sin()).round() as i32;
        mask.set(i, j, true);
    }

    let config = CutterConfig::default();
    let result = cut_neuron(&mask, &config);

    assert_eq!(result.cut.count_set(), 0, "a simple closed loop has no junctions to cut");

    let mut sum = 0.0;
    let mut count = 0;
    for i in 0..size.height() as i32 {
        for j in 0..size.width() as i32 {
            if result.curvature.status(i, j) == CurvatureStatus::Ok {
                sum += result.curvature.get(i, j);
                count += 1;
            }
        }
    }
    assert!(count > 0, "expected at least some pixels to fit successfully");
    let mean_kappa = sum / count as f64;
    let expected = 1.0 / radius;
    assert!(
        (mean_kappa - expected).abs() < 0.5 * expected,
        "mean kappa {mean_kappa} too far from the expected 1/{radius}"
    );
}

#[test]
fn budget_stress_on_a_solid_block_respects_no_self_touch() {
    init();
    let size = GridSize::new(20, 20).unwrap();
    let mut mask = Mask::new(size);
    for i in 4..7 {
        for j in 4..7 {
            mask.set(i, j, true);
        }
    }

    let term = Mask::new(size);
    let config = CutterConfig {
        max_path_len: 16,
        max_num_paths: 1024,
        min_len_for_stopping_at_junctions: 0,
        ..CutterConfig::default()
    };
    let mut table = PathTable::new();
    let n = enumerate_paths(&mask, &term, None, &config, &mut table, 5, 5, 0);

    assert!(n >= 1, "expected at least one path out of the block");
    for row in table.rows() {
        let cells = row.cells();
        for w in cells.windows(2) {
            assert!((w[0].0 - w[1].0).abs() <= 1 && (w[0].1 - w[1].1).abs() <= 1);
        }
        for a in 0..cells.len() {
            for b in (a + 2)..cells.len() {
                let (ai, aj) = cells[a];
                let (bi, bj) = cells[b];
                assert!(
                    (ai - bi).abs() > 1 || (aj - bj).abs() > 1,
                    "path cells {a} and {b} touch without being consecutive"
                );
            }
        }
    }
}

#[test]
fn four_collinear_samples_fit_degenerately_or_to_near_zero_error() {
    init();
    let ts = [0.0, 1.0, 2.0, 3.0];
    let xs = [0.0, 0.0, 0.0, 0.0];
    let ys = [0.0, 1.0, 2.0, 3.0];

    match fit_parametric_cubic(&ts, &xs, &ys, None) {
        FitOutcome::Fitted { coeffs, rms_error } => {
            assert!(rms_error < 1.0e-6);
            for &c in &coeffs.x {
                assert!(c.abs() < 1.0e-6);
            }
            assert!((coeffs.y[0]).abs() < 1.0e-6);
            assert!((coeffs.y[1] - 1.0).abs() < 1.0e-6);
            assert!(coeffs.y[2].abs() < 1.0e-6);
            assert!(coeffs.y[3].abs() < 1.0e-6);
        }
        FitOutcome::DegenerateSystem => {
            // Also an acceptable outcome: a collinear window is a valid
            // degenerate design matrix.
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
