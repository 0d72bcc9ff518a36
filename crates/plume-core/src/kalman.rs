// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Kalman Filter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete-time Kalman filter over one extended subdomain.
//!
//! The process model is only available through its inverse, B = A⁻¹,
//! so the prior covariance A·P·Aᵀ is formed from two right solves of
//! the LU-decomposed B. The posterior step inverts the innovation
//! covariance with a Cholesky factorization.

use crate::model::{ext_extent, ext_index};
use ndarray::{Array1, Array2};
use plume_math::dense::{mat_mul_tr, symmetrize};
use plume_math::{Cholesky, LuSolver};
use plume_types::error::{PlumeError, PlumeResult};
use rand::Rng;

/// Kalman filter with reusable factorization storage.
#[derive(Debug, Clone, Default)]
pub struct KalmanFilter {
    lu: LuSolver,
    chol: Cholesky,
}

impl KalmanFilter {
    pub fn new() -> Self {
        KalmanFilter::default()
    }

    /// Prior step: x ← B⁻¹ x, P ← A·P·Aᵀ + Q with A = B⁻¹, then
    /// symmetrize P against round-off drift.
    pub fn propagate_state_inverse(
        &mut self,
        x: &mut Array1<f64>,
        p: &mut Array2<f64>,
        b: &Array2<f64>,
        q: &Array2<f64>,
    ) -> PlumeResult<()> {
        self.lu.factor(b)?;
        *x = self.lu.solve(x.view());

        // P ← B⁻¹ (B⁻¹ P)ᵀ = A P Aᵀ (P symmetric).
        let half = self.lu.batch_solve(p);
        *p = self.lu.batch_solve_tr(&half);
        *p += q;
        symmetrize(p);
        Ok(())
    }

    /// Posterior step: fold the observation vector z into (x, P).
    ///
    /// With no observation rows the state is left untouched. A
    /// non-positive-definite innovation covariance is surfaced as
    /// [`PlumeError::FilterIllConditioned`].
    pub fn solve_filter(
        &mut self,
        x: &mut Array1<f64>,
        p: &mut Array2<f64>,
        h: &Array2<f64>,
        r: &Array2<f64>,
        z: &Array1<f64>,
    ) -> PlumeResult<()> {
        if h.nrows() == 0 {
            return Ok(());
        }
        debug_assert_eq!(h.ncols(), x.len());
        debug_assert_eq!(z.len(), h.nrows());

        // y = z − H x
        let y = z - &h.dot(&*x);

        // S = H P Hᵀ + R
        let pht = mat_mul_tr(p, h); // P Hᵀ, n×m
        let mut s = h.dot(&pht) + r;
        symmetrize(&mut s);

        self.chol.factor(&s).map_err(|err| match err {
            PlumeError::SingularOperator { row, pivot } => {
                PlumeError::FilterIllConditioned { row, diagonal: pivot }
            }
            other => other,
        })?;

        // x ← x + P Hᵀ S⁻¹ y
        let gain_y = self.chol.solve(y.view());
        *x += &pht.dot(&gain_y);

        // P ← P − P Hᵀ S⁻¹ H P
        let hp = pht.t().to_owned();
        let inv_s_hp = self.chol.batch_solve(&hp);
        *p -= &pht.dot(&inv_s_hp);
        symmetrize(p);
        Ok(())
    }
}

/// Initial state covariance from an exponential-distance correlation.
///
/// `scale_x`/`scale_y` are the correlation radii in node units (at
/// least one node); correlations are truncated at four radii. Indices
/// run over the extended subdomain so the covariance matches the
/// filter's state layout.
pub fn initial_covariance(sx: usize, sy: usize, variance: f64, scale_x: f64, scale_y: f64) -> Array2<f64> {
    let ex = ext_extent(sx);
    let ey = ext_extent(sy);
    let n = ex * ey;
    let sx_scale = scale_x.max(1.0);
    let sy_scale = scale_y.max(1.0);
    let rx = (4.0 * sx_scale).ceil() as isize;
    let ry = (4.0 * sy_scale).ceil() as isize;

    let mut p = Array2::zeros((n, n));
    for u in 0..ex {
        for v in 0..ey {
            let i = ext_index(u, v, sy);
            for x in (u as isize - rx)..=(u as isize + rx) {
                if x < 0 || x >= ex as isize {
                    continue;
                }
                let dx = (u as isize - x) as f64 / sx_scale;
                for y in (v as isize - ry)..=(v as isize + ry) {
                    if y < 0 || y >= ey as isize {
                        continue;
                    }
                    let dy = (v as isize - y) as f64 / sy_scale;
                    let j = ext_index(x as usize, y as usize, sy);
                    if i <= j {
                        let value = variance * (-0.5 * (dx * dx + dy * dy)).exp();
                        p[[i, j]] = value;
                        p[[j, i]] = value;
                    }
                }
            }
        }
    }
    p
}

/// Redraw a noise covariance: identity plus `amplitude · uniform[0,1]`
/// on the diagonal, which keeps it positive definite.
pub fn refresh_noise_covariance<R: Rng>(cov: &mut Array2<f64>, amplitude: f64, rng: &mut R) {
    let n = cov.nrows();
    debug_assert_eq!(n, cov.ncols());
    cov.fill(0.0);
    for k in 0..n {
        cov[[k, k]] = 1.0 + amplitude * rng.gen::<f64>();
    }
}
