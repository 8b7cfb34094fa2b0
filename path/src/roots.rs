// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Closed-form real roots of a cubic, used by the parametric cubic fitter's
//! knot-parameter refitting step (it needs `x(t) - x_k = 0` and
//! `y(t) - y_k = 0` solved for `t` once per sample, per refit iteration —
//! cheap enough that pulling in a general polynomial-root crate isn't
//! warranted).

#[cfg(all(not(feature = "std"), feature = "no-std-float"))]
use crate::NoStdFloat;

/// Up to 3 real roots of a cubic, returned in ascending order.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CubicRoots {
    roots: [f64; 3],
    count: u8,
}

impl CubicRoots {
    #[inline]
    fn push(&mut self, r: f64) {
        self.roots[self.count as usize] = r;
        self.count += 1;
    }

    /// The roots found, as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.roots[..self.count as usize]
    }

    /// Number of real roots found (0 to 3).
    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// True if no real root was found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Solves `c3*t^3 + c2*t^2 + c1*t + c0 = 0` for real `t`, via Cardano's
/// method with a trigonometric branch for the three-real-roots case.
///
/// Falls back to the quadratic/linear solver when `c3` is (nearly) zero,
/// since the fitter's coefficient matrices are not guaranteed to produce a
/// true cubic (a flat, collinear window degenerates to a line).
pub fn real_cubic_roots(c0: f64, c1: f64, c2: f64, c3: f64) -> CubicRoots {
    if c3.abs() < 1.0e-12 {
        return real_quadratic_roots(c0, c1, c2);
    }

    // Normalize to t^3 + a*t^2 + b*t + c = 0.
    let a = c2 / c3;
    let b = c1 / c3;
    let c = c0 / c3;

    // Depressed cubic t = u - a/3: u^3 + p*u + q = 0.
    let a_third = a / 3.0;
    let p = b - a * a_third;
    let q = 2.0 * a_third * a_third * a_third - a_third * b + c;

    let mut out = CubicRoots::default();
    // Sign of (q/2)^2 + (p/3)^3 drives the root-count branch.
    let discriminant = (q / 2.0) * (q / 2.0) + (p / 3.0) * (p / 3.0) * (p / 3.0);

    if discriminant > 1.0e-14 {
        let sqrt_disc = discriminant.sqrt();
        let u = cbrt(-q / 2.0 + sqrt_disc);
        let v = cbrt(-q / 2.0 - sqrt_disc);
        out.push(u + v - a_third);
    } else if discriminant.abs() <= 1.0e-14 {
        let u = cbrt(-q / 2.0);
        out.push(2.0 * u - a_third);
        out.push(-u - a_third);
    } else {
        // Three distinct real roots, trigonometric solution.
        let r = (-p * p * p / 27.0).sqrt();
        let phi = clamp(-q / (2.0 * r), -1.0, 1.0).acos();
        let m = 2.0 * (-p / 3.0).sqrt();
        for k in 0..3 {
            let angle = (phi + 2.0 * core::f64::consts::PI * k as f64) / 3.0;
            out.push(m * angle.cos() - a_third);
        }
    }

    out.roots[..out.count as usize].sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn real_quadratic_roots(c0: f64, c1: f64, c2: f64) -> CubicRoots {
    let mut out = CubicRoots::default();
    if c2.abs() < 1.0e-12 {
        if c1.abs() > 1.0e-12 {
            out.push(-c0 / c1);
        }
        return out;
    }
    let disc = c1 * c1 - 4.0 * c2 * c0;
    if disc < 0.0 {
        return out;
    }
    let sqrt_disc = disc.sqrt();
    let r1 = (-c1 - sqrt_disc) / (2.0 * c2);
    let r2 = (-c1 + sqrt_disc) / (2.0 * c2);
    out.push(r1.min(r2));
    if disc > 0.0 {
        out.push(r1.max(r2));
    }
    out
}

fn cbrt(v: f64) -> f64 {
    if v < 0.0 {
        -(-v).cbrt()
    } else {
        v.cbrt()
    }
}
