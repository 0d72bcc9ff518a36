// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — LU
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! LU decomposition with partial pivoting.
//!
//! Beyond plain solves, the decomposition offers a transposed batch
//! solve `(A⁻¹ Bᵀ)ᵀ`, which lets the filter form A·P·Aᵀ from two right
//! solves when only the inverse model matrix B = A⁻¹ is materialized.

use ndarray::{Array1, Array2, ArrayView1};
use plume_types::error::{PlumeError, PlumeResult};

/// Pivot magnitude below which the factorization is declared singular.
const PIVOT_TINY: f64 = 1e-260;

/// Reusable LU solver.
#[derive(Debug, Clone, Default)]
pub struct LuSolver {
    lu: Array2<f64>,
    perm: Vec<usize>,
    n: usize,
}

impl LuSolver {
    pub fn new() -> Self {
        LuSolver::default()
    }

    /// Factor a square matrix as P·A = L·U.
    pub fn factor(&mut self, a: &Array2<f64>) -> PlumeResult<()> {
        let n = a.nrows();
        debug_assert_eq!(n, a.ncols(), "LU expects a square matrix");
        if self.n != n {
            self.lu = Array2::zeros((n, n));
            self.perm = vec![0; n];
            self.n = n;
        }
        self.lu.assign(a);
        for (i, p) in self.perm.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            // Partial pivoting: swap in the largest magnitude below the diagonal.
            let mut pivot_row = k;
            let mut pivot_mag = self.lu[[k, k]].abs();
            for i in (k + 1)..n {
                let mag = self.lu[[i, k]].abs();
                if mag > pivot_mag {
                    pivot_mag = mag;
                    pivot_row = i;
                }
            }
            if pivot_mag <= PIVOT_TINY {
                return Err(PlumeError::SingularOperator {
                    row: k,
                    pivot: self.lu[[pivot_row, k]],
                });
            }
            if pivot_row != k {
                self.perm.swap(k, pivot_row);
                for j in 0..n {
                    let tmp = self.lu[[k, j]];
                    self.lu[[k, j]] = self.lu[[pivot_row, j]];
                    self.lu[[pivot_row, j]] = tmp;
                }
            }

            let pivot = self.lu[[k, k]];
            for i in (k + 1)..n {
                let factor = self.lu[[i, k]] / pivot;
                self.lu[[i, k]] = factor;
                for j in (k + 1)..n {
                    self.lu[[i, j]] -= factor * self.lu[[k, j]];
                }
            }
        }
        Ok(())
    }

    /// Order of the factored matrix.
    pub fn order(&self) -> usize {
        self.n
    }

    /// x = A⁻¹ b.
    pub fn solve(&self, b: ArrayView1<f64>) -> Array1<f64> {
        debug_assert_eq!(b.len(), self.n, "right-hand side length mismatch");
        let n = self.n;
        let mut x = Array1::zeros(n);

        // Forward: L y = P b (unit diagonal in L).
        for i in 0..n {
            let mut sum = b[self.perm[i]];
            for k in 0..i {
                sum -= self.lu[[i, k]] * x[k];
            }
            x[i] = sum;
        }
        // Backward: U x = y.
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum -= self.lu[[i, k]] * x[k];
            }
            x[i] = sum / self.lu[[i, i]];
        }
        x
    }

    /// X = A⁻¹ B, column by column.
    pub fn batch_solve(&self, b: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(b.nrows(), self.n, "right-hand side row count mismatch");
        let mut x = Array2::zeros(b.raw_dim());
        for (j, column) in b.columns().into_iter().enumerate() {
            x.column_mut(j).assign(&self.solve(column));
        }
        x
    }

    /// X = (A⁻¹ Bᵀ)ᵀ = B · A⁻ᵀ, row by row.
    pub fn batch_solve_tr(&self, b: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(b.ncols(), self.n, "right-hand side column count mismatch");
        let mut x = Array2::zeros(b.raw_dim());
        for (i, row) in b.rows().into_iter().enumerate() {
            x.row_mut(i).assign(&self.solve(row));
        }
        x
    }
}
