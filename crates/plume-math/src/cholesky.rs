// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Cholesky
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cholesky factorization S = L·Lᵀ for symmetric positive-definite S.
//!
//! The factor storage is reused across repeated [`Cholesky::factor`]
//! calls of the same order, which matters because the filter refactors
//! its innovation covariance every time step.

use ndarray::{Array1, Array2, ArrayView1};
use plume_types::error::{PlumeError, PlumeResult};

/// Pivot magnitude below which the factorization is declared singular.
const PIVOT_TINY: f64 = 1e-260;

/// Reusable Cholesky solver.
#[derive(Debug, Clone, Default)]
pub struct Cholesky {
    l: Array2<f64>,
    n: usize,
}

impl Cholesky {
    pub fn new() -> Self {
        Cholesky::default()
    }

    /// Factor a symmetric positive-definite matrix.
    ///
    /// Fails with [`PlumeError::SingularOperator`] when a diagonal pivot
    /// underflows, which for a symmetric argument means loss of positive
    /// definiteness.
    pub fn factor(&mut self, s: &Array2<f64>) -> PlumeResult<()> {
        let n = s.nrows();
        debug_assert_eq!(n, s.ncols(), "Cholesky expects a square matrix");
        if self.n != n {
            self.l = Array2::zeros((n, n));
            self.n = n;
        } else {
            self.l.fill(0.0);
        }

        for j in 0..n {
            let mut diag = s[[j, j]];
            for k in 0..j {
                diag -= self.l[[j, k]] * self.l[[j, k]];
            }
            if diag <= PIVOT_TINY {
                return Err(PlumeError::SingularOperator { row: j, pivot: diag });
            }
            let ljj = diag.sqrt();
            self.l[[j, j]] = ljj;

            for i in (j + 1)..n {
                let mut sum = s[[i, j]];
                for k in 0..j {
                    sum -= self.l[[i, k]] * self.l[[j, k]];
                }
                self.l[[i, j]] = sum / ljj;
            }
        }
        Ok(())
    }

    /// Order of the factored matrix.
    pub fn order(&self) -> usize {
        self.n
    }

    /// x = S⁻¹ b via forward and back substitution.
    pub fn solve(&self, b: ArrayView1<f64>) -> Array1<f64> {
        debug_assert_eq!(b.len(), self.n, "right-hand side length mismatch");
        let n = self.n;
        let mut x = Array1::zeros(n);

        // L y = b
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.l[[i, k]] * x[k];
            }
            x[i] = sum / self.l[[i, i]];
        }
        // Lᵀ x = y
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum -= self.l[[k, i]] * x[k];
            }
            x[i] = sum / self.l[[i, i]];
        }
        x
    }

    /// X = S⁻¹ B, column by column.
    pub fn batch_solve(&self, b: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(b.nrows(), self.n, "right-hand side row count mismatch");
        let mut x = Array2::zeros(b.raw_dim());
        for (j, column) in b.columns().into_iter().enumerate() {
            x.column_mut(j).assign(&self.solve(column));
        }
        x
    }
}
