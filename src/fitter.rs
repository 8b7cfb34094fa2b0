// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Least-squares parametric cubic fitting, with optional knot-parameter
//! refitting.

use nalgebra::{DMatrix, DVector};

use curv_numeric::real_cubic_roots;

/// Coefficients of a pair of cubics `x(t)`, `y(t)`, stored ascending
/// (`[a0, a1, a2, a3]` so that `x(t) = a3*t^3 + a2*t^2 + a1*t + a0`).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CubicCoeffs {
    /// `x(t)` coefficients, ascending.
    pub x: [f64; 4],
    /// `y(t)` coefficients, ascending.
    pub y: [f64; 4],
}

impl CubicCoeffs {
    /// Evaluates `(x(t), y(t))`.
    pub fn eval(&self, t: f64) -> (f64, f64) {
        (eval_cubic(&self.x, t), eval_cubic(&self.y, t))
    }

    /// Evaluates `(x'(t), y'(t))`.
    pub fn eval_derivative(&self, t: f64) -> (f64, f64) {
        (eval_cubic_d1(&self.x, t), eval_cubic_d1(&self.y, t))
    }

    /// Evaluates `(x''(t), y''(t))`.
    pub fn eval_second_derivative(&self, t: f64) -> (f64, f64) {
        (eval_cubic_d2(&self.x, t), eval_cubic_d2(&self.y, t))
    }
}

#[inline]
fn eval_cubic(c: &[f64; 4], t: f64) -> f64 {
    c[3] * t * t * t + c[2] * t * t + c[1] * t + c[0]
}

#[inline]
fn eval_cubic_d1(c: &[f64; 4], t: f64) -> f64 {
    3.0 * c[3] * t * t + 2.0 * c[2] * t + c[1]
}

#[inline]
fn eval_cubic_d2(c: &[f64; 4], t: f64) -> f64 {
    6.0 * c[3] * t + 2.0 * c[2]
}

/// Result of a fit attempt.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FitOutcome {
    /// The fit succeeded.
    Fitted {
        /// Fitted coefficients.
        coeffs: CubicCoeffs,
        /// `sqrt(2/n * sum of squared residuals)`.
        rms_error: f64,
    },
    /// Fewer than 4 samples were provided.
    WrongSampleCount,
    /// The weighted design matrix was singular.
    DegenerateSystem,
}

impl FitOutcome {
    /// The fitted coefficients, if any.
    pub fn coeffs(&self) -> Option<CubicCoeffs> {
        match self {
            FitOutcome::Fitted { coeffs, .. } => Some(*coeffs),
            _ => None,
        }
    }
}

/// Fits `x(t)`, `y(t)` cubics to `n >= 4` weighted samples, with no
/// parameter refitting.
pub fn fit_parametric_cubic(t: &[f64], xs: &[f64], ys: &[f64], weights: Option<&[f64]>) -> FitOutcome {
    fit_parametric_cubic_impl(t, xs, ys, weights, 1).0
}

/// Fits `x(t)`, `y(t)` cubics with `iterations` rounds of knot-parameter
/// refitting (see 4.B); returns the final fit and the refit `t` values used
/// to produce it.
pub fn fit_parametric_cubic_iterative(
    t: &[f64],
    xs: &[f64],
    ys: &[f64],
    weights: Option<&[f64]>,
    iterations: usize,
) -> (FitOutcome, Vec<f64>) {
    fit_parametric_cubic_impl(t, xs, ys, weights, iterations.max(1))
}

fn fit_parametric_cubic_impl(
    t: &[f64],
    xs: &[f64],
    ys: &[f64],
    weights: Option<&[f64]>,
    passes: usize,
) -> (FitOutcome, Vec<f64>) {
    let n = t.len();
    if n < 4 || xs.len() != n || ys.len() != n || weights.is_some_and(|w| w.len() != n) {
        return (FitOutcome::WrongSampleCount, t.to_vec());
    }

    let mut t_cur = t.to_vec();
    let mut fitted: Option<CubicCoeffs> = None;

    for pass in 0..passes {
        let mut a = DMatrix::<f64>::zeros(n, 4);
        let mut rx = DVector::<f64>::zeros(n);
        let mut ry = DVector::<f64>::zeros(n);

        for k in 0..n {
            let w = weights.map_or(1.0, |ws| ws[k]);
            let tk = t_cur[k];
            a[(k, 0)] = w * tk * tk * tk;
            a[(k, 1)] = w * tk * tk;
            a[(k, 2)] = w * tk;
            a[(k, 3)] = w;
            rx[k] = w * xs[k];
            ry[k] = w * ys[k];
        }

        let pinv = match a.pseudo_inverse(1.0e-10) {
            Ok(p) => p,
            Err(_) => {
                log::warn!("pseudoinverse singular while fitting a parametric cubic ({n} samples)");
                return (FitOutcome::DegenerateSystem, t_cur);
            }
        };

        let cx = &pinv * &rx;
        let cy = &pinv * &ry;
        let coeffs = CubicCoeffs {
            x: [cx[3], cx[2], cx[1], cx[0]],
            y: [cy[3], cy[2], cy[1], cy[0]],
        };
        fitted = Some(coeffs);

        if pass + 1 < passes {
            t_cur = refit_parametric_cubic_parameter(&t_cur, xs, ys, &coeffs);
        }
    }

    let coeffs = match fitted {
        Some(c) => c,
        None => return (FitOutcome::WrongSampleCount, t_cur),
    };

    let mut sum_sq = 0.0;
    for k in 0..n {
        let (ex, ey) = coeffs.eval(t_cur[k]);
        let dx = ex - xs[k];
        let dy = ey - ys[k];
        sum_sq += dx * dx + dy * dy;
    }
    let rms_error = (2.0 * sum_sq / n as f64).sqrt();

    (FitOutcome::Fitted { coeffs, rms_error }, t_cur)
}

/// Knot-parameter refitting: for every sample, find the real roots of
/// `x(t) - x_k = 0` and `y(t) - y_k = 0`, blend every root pair and keep the
/// blend minimising `|r1-r2| * |r-t_k| * (new residual)^2`.
fn refit_parametric_cubic_parameter(t: &[f64], xs: &[f64], ys: &[f64], coeffs: &CubicCoeffs) -> Vec<f64> {
    let n = t.len();
    let mut out = t.to_vec();

    for k in 0..n {
        let tk = t[k];
        let px = [coeffs.x[0] - xs[k], coeffs.x[1], coeffs.x[2], coeffs.x[3]];
        let py = [coeffs.y[0] - ys[k], coeffs.y[1], coeffs.y[2], coeffs.y[3]];

        let roots_x = real_cubic_roots(px[0], px[1], px[2], px[3]);
        let roots_y = real_cubic_roots(py[0], py[1], py[2], py[3]);
        if roots_x.is_empty() || roots_y.is_empty() {
            continue;
        }

        let mut best_key = f64::INFINITY;
        let mut best_t = tk;

        for &r1 in roots_x.as_slice() {
            for &r2 in roots_y.as_slice() {
                let p1x = eval_cubic(&coeffs.x, r1);
                let p1y = eval_cubic(&coeffs.y, r1);
                let p2x = eval_cubic(&coeffs.x, r2);
                let p2y = eval_cubic(&coeffs.y, r2);

                let dx = p2x - p1x;
                let dy = p2y - p1y;
                let dy_sqd = dy * dy;
                let denom = dy_sqd + dx * dx;
                if denom <= 0.0 {
                    continue;
                }
                let alpha = dy_sqd / denom;
                let r = alpha * r2 + (1.0 - alpha) * r1;

                let new_ex = eval_cubic(&coeffs.x, r) - xs[k];
                let new_ey = eval_cubic(&coeffs.y, r) - ys[k];
                let e3 = (r1 - r2).abs();
                let e4 = (r - tk).abs();
                let key = e3 * e4 * (new_ex * new_ex + new_ey * new_ey);

                if key < best_key {
                    best_key = key;
                    best_t = r;
                }
            }
        }

        if best_key.is_finite() {
            out[k] = best_t;
        }
    }

    out
}
