// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Dense Kernels
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Element-wise and structural helpers over `ndarray`.
//!
//! Plain products, sums and scaling come straight from `ndarray`
//! (`a.dot(&b)`, `&a + &b`, `a * s`); this module adds the operations
//! the covariance algebra needs beyond them.

use ndarray::{Array1, Array2};

/// C = A · Bᵀ without materializing the transpose.
pub fn mat_mul_tr(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    debug_assert_eq!(a.ncols(), b.ncols());
    a.dot(&b.t())
}

/// Identity matrix of order n.
pub fn identity(n: usize) -> Array2<f64> {
    Array2::eye(n)
}

/// Restore the symmetry a round-off-polluted symmetric matrix has lost:
/// A ← (A + Aᵀ) / 2.
pub fn symmetrize(a: &mut Array2<f64>) {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols(), "symmetrize expects a square matrix");
    for i in 0..n {
        for j in (i + 1)..n {
            let mean = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = mean;
            a[[j, i]] = mean;
        }
    }
}

/// Frobenius norm of a matrix.
pub fn frobenius_norm(a: &Array2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// L2 norm of a vector.
pub fn norm(v: &Array1<f64>) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// L2 norm of a vector difference |a - b|.
pub fn norm_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// |A - Aᵀ|_F / |A|_F, the departure of a square matrix from symmetry.
pub fn relative_asymmetry(a: &Array2<f64>) -> f64 {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    let mut asym = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = a[[i, j]] - a[[j, i]];
            asym += 2.0 * d * d;
        }
    }
    let denom = frobenius_norm(a);
    if denom > 0.0 {
        asym.sqrt() / denom
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_mat_mul_tr_matches_explicit_transpose() {
        let a = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let b = arr2(&[[1.0, 0.5, -1.0], [2.0, 1.0, 0.0]]);
        let direct = mat_mul_tr(&a, &b);
        let explicit = a.dot(&b.t().to_owned());
        for i in 0..2 {
            for j in 0..2 {
                assert!((direct[[i, j]] - explicit[[i, j]]).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_symmetrize_produces_symmetric() {
        let mut a = arr2(&[[1.0, 2.0, 3.0], [0.0, 1.0, 4.0], [1.0, 0.0, 1.0]]);
        symmetrize(&mut a);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(a[[i, j]], a[[j, i]]);
            }
        }
        assert!(relative_asymmetry(&a) < 1e-15);
    }

    #[test]
    fn test_symmetrize_preserves_symmetric_input() {
        let original = arr2(&[[2.0, -1.0], [-1.0, 3.0]]);
        let mut a = original.clone();
        symmetrize(&mut a);
        assert_eq!(a, original);
    }

    #[test]
    fn test_norms() {
        let v = ndarray::arr1(&[3.0, 4.0]);
        assert!((norm(&v) - 5.0).abs() < 1e-15);
        let w = ndarray::arr1(&[0.0, 0.0]);
        assert!((norm_diff(&v, &w) - 5.0).abs() < 1e-15);
        let a = arr2(&[[3.0, 0.0], [0.0, 4.0]]);
        assert!((frobenius_norm(&a) - 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_relative_asymmetry_zero_matrix() {
        let a = Array2::zeros((4, 4));
        assert_eq!(relative_asymmetry(&a), 0.0);
    }
}
