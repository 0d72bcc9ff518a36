// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Model Matrix
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Implicit-Euler inverse model operator on an extended subdomain.
//!
//! One time step reads x_{t+1} = B⁻¹ · x_t with B assembled here. B
//! acts on the extended subdomain (interior plus one-cell halo),
//! unrolled row-major with the inner index along y. Halo rows are
//! identity rows: border values pass through the step unchanged and
//! act as Dirichlet data for the interior stencil.

use ndarray::Array2;

/// Extended extent of a layer axis.
pub fn ext_extent(nodes: usize) -> usize {
    nodes + 2
}

/// Problem size of the extended subdomain (sx, sy are interior extents).
pub fn ext_size(sx: usize, sy: usize) -> usize {
    ext_extent(sx) * ext_extent(sy)
}

/// Flat index of an extended point (x, y), 0 ≤ x < sx+2, 0 ≤ y < sy+2.
pub fn ext_index(x: usize, y: usize, sy: usize) -> usize {
    x * ext_extent(sy) + y
}

/// Assemble the inverse implicit-Euler operator B for the current flow.
///
/// `b` must be square of order [`ext_size`]`(sx, sy)`; it is rewritten
/// in place. `dt` is the effective time step of the caller's branch.
/// With the stable `dt` bound the interior rows are strictly diagonally
/// dominant, so B is non-singular.
pub fn build_inverse_model(
    b: &mut Array2<f64>,
    sx: usize,
    sy: usize,
    flow: (f64, f64),
    diffusion: f64,
    dx: f64,
    dy: f64,
    dt: f64,
) {
    let n = ext_size(sx, sy);
    debug_assert_eq!(b.nrows(), n);
    debug_assert_eq!(b.ncols(), n);

    let rho_x = diffusion * dt / (dx * dx);
    let rho_y = diffusion * dt / (dy * dy);
    let alpha_x = flow.0 * dt / (2.0 * dx);
    let alpha_y = flow.1 * dt / (2.0 * dy);

    b.fill(0.0);

    for x in 0..ext_extent(sx) {
        for y in 0..ext_extent(sy) {
            let i = ext_index(x, y, sy);
            let on_halo = x == 0 || x == sx + 1 || y == 0 || y == sy + 1;
            if on_halo {
                b[[i, i]] = 1.0;
                continue;
            }
            b[[i, i]] = 1.0 + 2.0 * (rho_x + rho_y);
            b[[i, ext_index(x - 1, y, sy)]] = -alpha_x - rho_x;
            b[[i, ext_index(x + 1, y, sy)]] = alpha_x - rho_x;
            b[[i, ext_index(x, y - 1, sy)]] = -alpha_y - rho_y;
            b[[i, ext_index(x, y + 1, sy)]] = alpha_y - rho_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const SX: usize = 4;
    const SY: usize = 3;

    fn build(flow: (f64, f64), dt: f64) -> Array2<f64> {
        let n = ext_size(SX, SY);
        let mut b = Array2::zeros((n, n));
        build_inverse_model(&mut b, SX, SY, flow, 1.0, 0.5, 0.5, dt);
        b
    }

    fn is_halo(x: usize, y: usize) -> bool {
        x == 0 || x == SX + 1 || y == 0 || y == SY + 1
    }

    #[test]
    fn test_halo_rows_are_identity() {
        let b = build((1.0, -0.5), 0.05);
        let n = ext_size(SX, SY);
        for x in 0..ext_extent(SX) {
            for y in 0..ext_extent(SY) {
                if !is_halo(x, y) {
                    continue;
                }
                let i = ext_index(x, y, SY);
                for j in 0..n {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_eq!(b[[i, j]], expected, "halo row {i} not identity at {j}");
                }
            }
        }
    }

    #[test]
    fn test_interior_stencil_coefficients() {
        let (vx, vy) = (1.0, -0.5);
        let (d, dx, dy, dt) = (1.0, 0.5, 0.5, 0.05);
        let b = build((vx, vy), dt);
        let rho_x = d * dt / (dx * dx);
        let rho_y = d * dt / (dy * dy);
        let alpha_x = vx * dt / (2.0 * dx);
        let alpha_y = vy * dt / (2.0 * dy);

        let (x, y) = (2, 2); // interior point with interior neighbors
        let i = ext_index(x, y, SY);
        assert!((b[[i, i]] - (1.0 + 2.0 * (rho_x + rho_y))).abs() < 1e-15);
        assert!((b[[i, ext_index(x - 1, y, SY)]] - (-alpha_x - rho_x)).abs() < 1e-15);
        assert!((b[[i, ext_index(x + 1, y, SY)]] - (alpha_x - rho_x)).abs() < 1e-15);
        assert!((b[[i, ext_index(x, y - 1, SY)]] - (-alpha_y - rho_y)).abs() < 1e-15);
        assert!((b[[i, ext_index(x, y + 1, SY)]] - (alpha_y - rho_y)).abs() < 1e-15);
    }

    #[test]
    fn test_strict_diagonal_dominance_under_cfl() {
        // dt at the CFL bound for |v| = 1 on dx = dy = 0.5.
        let b = build((1.0, 1.0), 0.25);
        let n = ext_size(SX, SY);
        for i in 0..n {
            let off: f64 = (0..n).filter(|&j| j != i).map(|j| b[[i, j]].abs()).sum();
            assert!(
                b[[i, i]].abs() > off,
                "row {i} not strictly dominant: diag {} vs off {off}",
                b[[i, i]]
            );
        }
    }

    #[test]
    fn test_zero_flow_row_sums() {
        // Without advection every interior row sums to 1: the operator
        // preserves a constant extended field exactly.
        let b = build((0.0, 0.0), 0.05);
        let n = ext_size(SX, SY);
        for i in 0..n {
            let sum: f64 = (0..n).map(|j| b[[i, j]]).sum();
            assert!((sum - 1.0).abs() < 1e-12, "row {i} sums to {sum}");
        }
    }
}
