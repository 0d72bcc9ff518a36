// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Subdomain Context
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-subdomain working state, owned by one lattice slot for the
//! lifetime of a run and mutated in place every time step.

use crate::boundary::BoundaryState;
use crate::cell::Layer;
use crate::kalman::KalmanFilter;
use crate::model::ext_size;
use ndarray::{Array1, Array2};
use plume_math::LuSolver;
use plume_types::geometry::{Lattice, SubdomainIdx};

/// Frozen observation inputs of one subdomain: its sensors, the
/// observation operator they induce, and their measurement series.
#[derive(Debug, Clone)]
pub struct ObservationSet {
    /// Ordered local sensor coordinates, 0 ≤ x < Sx, 0 ≤ y < Sy.
    pub sensors: Vec<(usize, usize)>,
    /// Observation operator H, one row per sensor over the extended state.
    pub h: Array2<f64>,
    /// Measurement table, one row per outer time step.
    pub measurements: Array2<f64>,
}

/// Kalman state of a sensor-carrying subdomain.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub kalman: KalmanFilter,
    /// Process covariance.
    pub p: Array2<f64>,
    /// Process noise covariance, redrawn each outer step.
    pub q: Array2<f64>,
    /// Observation operator.
    pub h: Array2<f64>,
    /// Observation noise covariance, redrawn each outer step.
    pub r: Array2<f64>,
    /// Observation vector of the current outer step.
    pub z: Array1<f64>,
    pub sensors: Vec<(usize, usize)>,
    pub measurements: Array2<f64>,
}

/// Everything one subdomain task reads and writes during a step.
#[derive(Debug, Clone)]
pub struct SubdomainContext {
    pub idx: SubdomainIdx,
    /// Resolution this subdomain is solved at (fixed for the run).
    pub layer: Layer,
    /// Extended working field, interior plus one-cell halo.
    pub field: Array2<f64>,
    /// Inverse model matrix of the current step.
    pub b: Array2<f64>,
    /// Decomposition scratch for the direct-solve branch.
    pub lu: LuSolver,
    pub bounds: BoundaryState,
    /// Flow of the current step.
    pub flow: (f64, f64),
    /// Schedule constants snapshotted at start.
    pub nt: usize,
    pub nsub_iter: usize,
    /// Present exactly when the subdomain has sensors.
    pub filter: Option<FilterState>,
}

impl SubdomainContext {
    /// Context of a sensor-free subdomain (direct-solve branch, coarse).
    pub fn direct(lattice: Lattice, idx: SubdomainIdx, nt: usize, nsub_iter: usize) -> Self {
        Self::allocate(lattice, idx, Layer::Coarse, nt, nsub_iter, None)
    }

    /// Context of a sensor-carrying subdomain (Kalman branch, fine).
    pub fn filtered(
        lattice: Lattice,
        idx: SubdomainIdx,
        nt: usize,
        nsub_iter: usize,
        observations: ObservationSet,
        initial_p: Array2<f64>,
    ) -> Self {
        let m = observations.sensors.len();
        let filter = FilterState {
            kalman: KalmanFilter::new(),
            p: initial_p,
            q: Array2::zeros((0, 0)),
            h: observations.h,
            r: Array2::zeros((0, 0)),
            z: Array1::zeros(m),
            sensors: observations.sensors,
            measurements: observations.measurements,
        };
        Self::allocate(lattice, idx, Layer::Fine, nt, nsub_iter, Some(filter))
    }

    fn allocate(
        lattice: Lattice,
        idx: SubdomainIdx,
        layer: Layer,
        nt: usize,
        nsub_iter: usize,
        mut filter: Option<FilterState>,
    ) -> Self {
        let (sx, sy) = layer.extents();
        let n = ext_size(sx, sy);
        if let Some(state) = filter.as_mut() {
            state.q = Array2::zeros((n, n));
            let m = state.sensors.len();
            state.r = Array2::zeros((m, m));
        }
        SubdomainContext {
            idx,
            layer,
            field: Array2::zeros((sx + 2, sy + 2)),
            b: Array2::zeros((n, n)),
            lu: LuSolver::new(),
            bounds: BoundaryState::new(lattice, idx),
            flow: (0.0, 0.0),
            nt,
            nsub_iter,
            filter,
        }
    }

    pub fn has_sensors(&self) -> bool {
        self.filter.is_some()
    }
}
