// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Border Exchange
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Flow-aware Schwarz border exchange on the extended field.
//!
//! Each side of a subdomain is classified per step: outer sides keep a
//! zero (Dirichlet) halo, inflow sides copy the neighbor's interior
//! strip, and outflow sides close the stencil from the subdomain's own
//! interior per the configured policy. The L1 mismatch between the old
//! and incoming strips is cached as a diagnostic, never as a
//! convergence criterion.

use crate::cell::{CellGrid, Layer};
use ndarray::Array2;
use plume_types::config::OutflowHalo;
use plume_types::geometry::{Lattice, Side, SubdomainIdx, NSIDES};

/// Floor for the mismatch denominator.
const TINY: f64 = 1e-30;

/// Per-subdomain boundary bookkeeping for one step.
#[derive(Debug, Clone)]
pub struct BoundaryState {
    pub outer: [bool; NSIDES],
    pub inflow: [bool; NSIDES],
    /// Numerator and denominator of the Schwarz mismatch ratio.
    pub mismatch_numer: f64,
    pub mismatch_denom: f64,
    pub rel_diff: f64,
}

impl BoundaryState {
    pub fn new(lattice: Lattice, idx: SubdomainIdx) -> Self {
        let mut outer = [false; NSIDES];
        for side in Side::ALL {
            outer[side.index()] = lattice.is_outer(idx, side);
        }
        BoundaryState {
            outer,
            inflow: [false; NSIDES],
            mismatch_numer: 0.0,
            mismatch_denom: 0.0,
            rel_diff: 0.0,
        }
    }

    pub fn is_outer_subdomain(&self) -> bool {
        self.outer.iter().any(|&o| o)
    }
}

/// Interior extents (sx, sy) of an extended field.
fn interior_extents(ext: &Array2<f64>) -> (usize, usize) {
    (ext.nrows() - 2, ext.ncols() - 2)
}

/// Copy a layer's values into the interior of the extended field.
pub fn load_interior(ext: &mut Array2<f64>, layer: &Array2<f64>) {
    let (sx, sy) = interior_extents(ext);
    debug_assert_eq!(layer.dim(), (sx, sy));
    for x in 0..sx {
        for y in 0..sy {
            ext[[x + 1, y + 1]] = layer[[x, y]];
        }
    }
}

/// Copy the interior of the extended field back into a layer.
pub fn store_interior(layer: &mut Array2<f64>, ext: &Array2<f64>) {
    let (sx, sy) = interior_extents(ext);
    debug_assert_eq!(layer.dim(), (sx, sy));
    for x in 0..sx {
        for y in 0..sy {
            layer[[x, y]] = ext[[x + 1, y + 1]];
        }
    }
}

/// Halo strip of a side, corners excluded.
pub fn halo_strip(ext: &Array2<f64>, side: Side) -> Vec<f64> {
    let (sx, sy) = interior_extents(ext);
    match side {
        Side::Down => (1..=sx).map(|x| ext[[x, 0]]).collect(),
        Side::Up => (1..=sx).map(|x| ext[[x, sy + 1]]).collect(),
        Side::Left => (1..=sy).map(|y| ext[[0, y]]).collect(),
        Side::Right => (1..=sy).map(|y| ext[[sx + 1, y]]).collect(),
    }
}

/// Overwrite the halo strip of a side, corners untouched.
pub fn set_halo_strip(ext: &mut Array2<f64>, side: Side, strip: &[f64]) {
    let (sx, sy) = interior_extents(ext);
    match side {
        Side::Down => {
            debug_assert_eq!(strip.len(), sx);
            for (k, &v) in strip.iter().enumerate() {
                ext[[k + 1, 0]] = v;
            }
        }
        Side::Up => {
            debug_assert_eq!(strip.len(), sx);
            for (k, &v) in strip.iter().enumerate() {
                ext[[k + 1, sy + 1]] = v;
            }
        }
        Side::Left => {
            debug_assert_eq!(strip.len(), sy);
            for (k, &v) in strip.iter().enumerate() {
                ext[[0, k + 1]] = v;
            }
        }
        Side::Right => {
            debug_assert_eq!(strip.len(), sy);
            for (k, &v) in strip.iter().enumerate() {
                ext[[sx + 1, k + 1]] = v;
            }
        }
    }
}

/// Interior strip at a given depth from a side (depth 1 borders the halo).
fn interior_strip(ext: &Array2<f64>, side: Side, depth: usize) -> Vec<f64> {
    let (sx, sy) = interior_extents(ext);
    debug_assert!(depth >= 1 && depth <= sx.min(sy));
    match side {
        Side::Down => (1..=sx).map(|x| ext[[x, depth]]).collect(),
        Side::Up => (1..=sx).map(|x| ext[[x, sy + 1 - depth]]).collect(),
        Side::Left => (1..=sy).map(|y| ext[[depth, y]]).collect(),
        Side::Right => (1..=sy).map(|y| ext[[sx + 1 - depth, y]]).collect(),
    }
}

/// One flow-aware Schwarz update of a subdomain's halos.
///
/// Neighbor strips are read from `grid` (the state snapshot of the
/// current step) at the caller's own resolution `layer`. Returns the
/// aggregated relative mismatch over the inflow sides.
pub fn schwarz_update(
    bounds: &mut BoundaryState,
    ext: &mut Array2<f64>,
    idx: SubdomainIdx,
    layer: Layer,
    grid: &CellGrid,
    flow: (f64, f64),
    policy: OutflowHalo,
) -> f64 {
    let mut numer = 0.0;
    let mut remote_sum = 0.0;
    let mut myself_sum = 0.0;

    for side in Side::ALL {
        let s = side.index();
        bounds.inflow[s] = false;
        if bounds.outer[s] {
            // Flow never enters across the outer boundary; the Dirichlet
            // clamp owns these strips.
            continue;
        }

        let (nx, ny) = side.outward_normal();
        if nx * flow.0 + ny * flow.1 < 0.0 {
            bounds.inflow[s] = true;
            let myself = halo_strip(ext, side);
            let peer = grid
                .lattice
                .neighbor(idx, side)
                .expect("non-outer side always has a neighbor");
            let remote = grid.cell(peer).boundary_at(layer, side.opposite());
            debug_assert_eq!(myself.len(), remote.len());
            for (m, r) in myself.iter().zip(remote.iter()) {
                numer += (r - m).abs();
                remote_sum += r.abs();
                myself_sum += m.abs();
            }
            set_halo_strip(ext, side, &remote);
        } else {
            let depth = match policy {
                OutflowHalo::Reflect => 2,
                OutflowHalo::ZeroGradient => 1,
            };
            let strip = interior_strip(ext, side, depth);
            set_halo_strip(ext, side, &strip);
        }
    }

    bounds.mismatch_numer = numer;
    bounds.mismatch_denom = remote_sum.max(myself_sum);
    bounds.rel_diff = numer / bounds.mismatch_denom.max(TINY);
    bounds.rel_diff
}

/// Pin the outer-domain strips of the extended field to zero: both the
/// halo row and the interior border row of every outer side.
pub fn apply_dirichlet(ext: &mut Array2<f64>, bounds: &BoundaryState) {
    let (sx, sy) = interior_extents(ext);
    if bounds.outer[Side::Left.index()] {
        for y in 0..sy + 2 {
            ext[[0, y]] = 0.0;
            ext[[1, y]] = 0.0;
        }
    }
    if bounds.outer[Side::Right.index()] {
        for y in 0..sy + 2 {
            ext[[sx + 1, y]] = 0.0;
            ext[[sx, y]] = 0.0;
        }
    }
    if bounds.outer[Side::Down.index()] {
        for x in 0..sx + 2 {
            ext[[x, 0]] = 0.0;
            ext[[x, 1]] = 0.0;
        }
    }
    if bounds.outer[Side::Up.index()] {
        for x in 0..sx + 2 {
            ext[[x, sy + 1]] = 0.0;
            ext[[x, sy]] = 0.0;
        }
    }
}

/// Clamp the whole extended field to physical (non-negative) values.
pub fn clamp_non_negative(ext: &mut Array2<f64>) {
    ext.mapv_inplace(|v| v.max(0.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellGrid, SubdomainCell};
    use plume_types::geometry::{SUBDOMAIN_X, SUBDOMAIN_Y};

    fn fine_ext() -> Array2<f64> {
        Array2::zeros((SUBDOMAIN_X + 2, SUBDOMAIN_Y + 2))
    }

    fn two_by_one_grid() -> CellGrid {
        let lattice = Lattice::new(2, 1);
        let mut grid = CellGrid::new(lattice, |_| Layer::Fine);
        // Give the left cell a recognizable interior.
        let left = grid.cell_mut(SubdomainIdx::new(0, 0));
        let values = left.active_mut();
        for x in 0..SUBDOMAIN_X {
            for y in 0..SUBDOMAIN_Y {
                values[[x, y]] = (x * 100 + y) as f64;
            }
        }
        left.coarsen();
        grid
    }

    #[test]
    fn test_inflow_halo_matches_neighbor_interior_strip() {
        let grid = two_by_one_grid();
        let right_idx = SubdomainIdx::new(1, 0);
        let mut bounds = BoundaryState::new(grid.lattice, right_idx);
        let mut ext = fine_ext();

        // Constant flow along +x enters the right subdomain on its left side.
        let rel = schwarz_update(
            &mut bounds,
            &mut ext,
            right_idx,
            Layer::Fine,
            &grid,
            (1.0, 0.0),
            OutflowHalo::Reflect,
        );

        assert!(bounds.inflow[Side::Left.index()]);
        assert!(!bounds.inflow[Side::Right.index()]);
        let expected = grid.cell(SubdomainIdx::new(0, 0)).boundary(Side::Right);
        assert_eq!(halo_strip(&ext, Side::Left), expected);
        assert!(rel > 0.0, "non-trivial strips must register a mismatch");
    }

    #[test]
    fn test_outer_sides_are_never_inflow() {
        let grid = two_by_one_grid();
        let left_idx = SubdomainIdx::new(0, 0);
        let mut bounds = BoundaryState::new(grid.lattice, left_idx);
        let mut ext = fine_ext();

        schwarz_update(
            &mut bounds,
            &mut ext,
            left_idx,
            Layer::Fine,
            &grid,
            (-1.0, -1.0), // flows into the domain across Left/Down, but both are outer
            OutflowHalo::Reflect,
        );
        assert!(bounds.outer[Side::Left.index()]);
        assert!(!bounds.inflow[Side::Left.index()]);
        assert!(bounds.outer[Side::Down.index()]);
        assert!(!bounds.inflow[Side::Down.index()]);
    }

    #[test]
    fn test_outflow_halo_policies() {
        let grid = two_by_one_grid();
        let left_idx = SubdomainIdx::new(0, 0);

        for (policy, depth) in [(OutflowHalo::Reflect, 2), (OutflowHalo::ZeroGradient, 1)] {
            let mut bounds = BoundaryState::new(grid.lattice, left_idx);
            let mut ext = fine_ext();
            for x in 0..SUBDOMAIN_X {
                for y in 0..SUBDOMAIN_Y {
                    ext[[x + 1, y + 1]] = (x * 10 + y) as f64;
                }
            }
            // Flow along +x leaves the left subdomain across its right side.
            schwarz_update(&mut bounds, &mut ext, left_idx, Layer::Fine, &grid, (1.0, 0.0), policy);
            assert!(!bounds.inflow[Side::Right.index()]);
            let expected = interior_strip(&ext, Side::Right, depth);
            assert_eq!(halo_strip(&ext, Side::Right), expected);
        }
    }

    #[test]
    fn test_mismatch_ratio_zero_for_identical_strips() {
        let lattice = Lattice::new(2, 1);
        let grid = CellGrid::new(lattice, |_| Layer::Fine); // all-zero cells
        let right_idx = SubdomainIdx::new(1, 0);
        let mut bounds = BoundaryState::new(lattice, right_idx);
        let mut ext = fine_ext();

        let rel = schwarz_update(
            &mut bounds,
            &mut ext,
            right_idx,
            Layer::Fine,
            &grid,
            (1.0, 0.0),
            OutflowHalo::Reflect,
        );
        assert_eq!(rel, 0.0);
        assert_eq!(bounds.mismatch_numer, 0.0);
    }

    #[test]
    fn test_dirichlet_pins_outer_strips() {
        let lattice = Lattice::new(1, 1);
        let idx = SubdomainIdx::new(0, 0);
        let bounds = BoundaryState::new(lattice, idx);
        assert!(bounds.is_outer_subdomain());

        let mut ext = fine_ext();
        ext.fill(7.0);
        apply_dirichlet(&mut ext, &bounds);

        let (sx, sy) = (SUBDOMAIN_X, SUBDOMAIN_Y);
        for y in 0..sy + 2 {
            assert_eq!(ext[[0, y]], 0.0);
            assert_eq!(ext[[1, y]], 0.0);
            assert_eq!(ext[[sx, y]], 0.0);
            assert_eq!(ext[[sx + 1, y]], 0.0);
        }
        for x in 0..sx + 2 {
            assert_eq!(ext[[x, 0]], 0.0);
            assert_eq!(ext[[x, 1]], 0.0);
            assert_eq!(ext[[x, sy]], 0.0);
            assert_eq!(ext[[x, sy + 1]], 0.0);
        }
        // Deep interior survives.
        assert_eq!(ext[[2, 2]], 7.0);
    }

    #[test]
    fn test_clamp_non_negative() {
        let mut ext = fine_ext();
        ext[[3, 3]] = -2.5;
        ext[[4, 4]] = 1.5;
        clamp_non_negative(&mut ext);
        assert_eq!(ext[[3, 3]], 0.0);
        assert_eq!(ext[[4, 4]], 1.5);
    }

    #[test]
    fn test_interior_load_store_roundtrip() {
        let mut ext = fine_ext();
        let mut layer = Array2::zeros((SUBDOMAIN_X, SUBDOMAIN_Y));
        for (k, v) in layer.iter_mut().enumerate() {
            *v = k as f64;
        }
        load_interior(&mut ext, &layer);
        let mut out = Array2::zeros((SUBDOMAIN_X, SUBDOMAIN_Y));
        store_interior(&mut out, &ext);
        assert_eq!(layer, out);
        // Halo untouched by the interior load.
        assert_eq!(ext[[0, 0]], 0.0);
        assert_eq!(ext[[SUBDOMAIN_X + 1, SUBDOMAIN_Y + 1]], 0.0);
    }
}
