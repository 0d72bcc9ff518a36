// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Subdomain Cell
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Resolution-aware subdomain data cell.
//!
//! Every subdomain carries two value layers of the same region: a fine
//! one at the compiled subdomain extents and a coarse one at half the
//! resolution. One layer is active; after each update the other is
//! refreshed by `refine`/`coarsen` so that a neighbor at either
//! resolution always reads a usable border strip.

use ndarray::Array2;
use plume_types::geometry::{Lattice, Side, SubdomainIdx, SUBDOMAIN_X, SUBDOMAIN_Y};

/// Resolution layer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Fine,
    Coarse,
}

impl Layer {
    /// Node extents (x, y) of this layer.
    pub fn extents(self) -> (usize, usize) {
        match self {
            Layer::Fine => (SUBDOMAIN_X, SUBDOMAIN_Y),
            Layer::Coarse => (SUBDOMAIN_X / 2, SUBDOMAIN_Y / 2),
        }
    }
}

/// Two-layer value cell of one subdomain.
#[derive(Debug, Clone)]
pub struct SubdomainCell {
    fine: Array2<f64>,
    coarse: Array2<f64>,
    active: Layer,
}

impl SubdomainCell {
    pub fn new(active: Layer) -> Self {
        let (fx, fy) = Layer::Fine.extents();
        let (cx, cy) = Layer::Coarse.extents();
        SubdomainCell {
            fine: Array2::zeros((fx, fy)),
            coarse: Array2::zeros((cx, cy)),
            active,
        }
    }

    pub fn active_layer(&self) -> Layer {
        self.active
    }

    pub fn set_active_layer(&mut self, layer: Layer) {
        self.active = layer;
    }

    /// Value array of a given layer.
    pub fn layer(&self, layer: Layer) -> &Array2<f64> {
        match layer {
            Layer::Fine => &self.fine,
            Layer::Coarse => &self.coarse,
        }
    }

    pub fn layer_mut(&mut self, layer: Layer) -> &mut Array2<f64> {
        match layer {
            Layer::Fine => &mut self.fine,
            Layer::Coarse => &mut self.coarse,
        }
    }

    /// Value array of the active layer.
    pub fn active(&self) -> &Array2<f64> {
        self.layer(self.active)
    }

    pub fn active_mut(&mut self) -> &mut Array2<f64> {
        self.layer_mut(self.active)
    }

    /// Visit every value cell of the active layer.
    pub fn for_all_active_nodes<F: FnMut(&mut f64)>(&mut self, mut f: F) {
        for value in self.active_mut().iter_mut() {
            f(value);
        }
    }

    /// Border strip of the active layer keyed by side.
    ///
    /// `Up`/`Down` strips have the layer's x extent, `Left`/`Right` the
    /// y extent.
    pub fn boundary(&self, side: Side) -> Vec<f64> {
        self.boundary_at(self.active, side)
    }

    /// Border strip of an explicit layer.
    pub fn boundary_at(&self, layer: Layer, side: Side) -> Vec<f64> {
        let values = self.layer(layer);
        let (sx, sy) = layer.extents();
        match side {
            Side::Down => (0..sx).map(|x| values[[x, 0]]).collect(),
            Side::Up => (0..sx).map(|x| values[[x, sy - 1]]).collect(),
            Side::Left => (0..sy).map(|y| values[[0, y]]).collect(),
            Side::Right => (0..sy).map(|y| values[[sx - 1, y]]).collect(),
        }
    }

    /// Inject a border strip on the active layer.
    pub fn set_boundary(&mut self, side: Side, strip: &[f64]) {
        let layer = self.active;
        let (sx, sy) = layer.extents();
        let values = self.active_mut();
        match side {
            Side::Down => {
                debug_assert_eq!(strip.len(), sx);
                for (x, &v) in strip.iter().enumerate() {
                    values[[x, 0]] = v;
                }
            }
            Side::Up => {
                debug_assert_eq!(strip.len(), sx);
                for (x, &v) in strip.iter().enumerate() {
                    values[[x, sy - 1]] = v;
                }
            }
            Side::Left => {
                debug_assert_eq!(strip.len(), sy);
                for (y, &v) in strip.iter().enumerate() {
                    values[[0, y]] = v;
                }
            }
            Side::Right => {
                debug_assert_eq!(strip.len(), sy);
                for (y, &v) in strip.iter().enumerate() {
                    values[[sx - 1, y]] = v;
                }
            }
        }
    }

    /// Refresh the fine layer from the coarse one by duplication,
    /// mapping every value through `f`.
    pub fn refine_with<F: Fn(f64) -> f64>(&mut self, f: F) {
        let (fx, fy) = Layer::Fine.extents();
        for x in 0..fx {
            for y in 0..fy {
                self.fine[[x, y]] = f(self.coarse[[x / 2, y / 2]]);
            }
        }
    }

    /// Refresh the fine layer from the coarse one (identity mapping).
    pub fn refine(&mut self) {
        self.refine_with(|v| v);
    }

    /// Refresh the coarse layer from the fine one by 2×2 averaging,
    /// mapping every value through `f`.
    pub fn coarsen_with<F: Fn(f64) -> f64>(&mut self, f: F) {
        let (cx, cy) = Layer::Coarse.extents();
        for i in 0..cx {
            for j in 0..cy {
                let sum = self.fine[[2 * i, 2 * j]]
                    + self.fine[[2 * i + 1, 2 * j]]
                    + self.fine[[2 * i, 2 * j + 1]]
                    + self.fine[[2 * i + 1, 2 * j + 1]];
                self.coarse[[i, j]] = f(0.25 * sum);
            }
        }
    }

    /// Refresh the coarse layer from the fine one (identity mapping).
    pub fn coarsen(&mut self) {
        self.coarsen_with(|v| v);
    }
}

/// All subdomain cells of one state grid, in lattice flat order.
#[derive(Debug, Clone)]
pub struct CellGrid {
    pub lattice: Lattice,
    pub cells: Vec<SubdomainCell>,
}

impl CellGrid {
    /// Allocate a grid, choosing each cell's active layer by position.
    pub fn new<F: Fn(SubdomainIdx) -> Layer>(lattice: Lattice, choose: F) -> Self {
        let cells = lattice.iter().map(|idx| SubdomainCell::new(choose(idx))).collect();
        CellGrid { lattice, cells }
    }

    pub fn cell(&self, idx: SubdomainIdx) -> &SubdomainCell {
        &self.cells[self.lattice.flat(idx)]
    }

    pub fn cell_mut(&mut self, idx: SubdomainIdx) -> &mut SubdomainCell {
        let flat = self.lattice.flat(idx);
        &mut self.cells[flat]
    }
}
