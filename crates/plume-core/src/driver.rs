// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Stencil Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Nested time loop over the subdomain lattice.
//!
//! Logical time runs over `Nt · Nsub_iter` ticks. At every tick all
//! subdomains advance in parallel against a snapshot of the previous
//! state (`curr`), writing the new state (`next`); the grids swap at
//! the tick barrier. Subdomains with sensors run the Kalman branch on
//! the fine layer, the rest run a direct LU solve on the coarse layer.

use crate::boundary::{apply_dirichlet, clamp_non_negative, schwarz_update, store_interior};
use crate::cell::{CellGrid, Layer, SubdomainCell};
use crate::context::{ObservationSet, SubdomainContext};
use crate::flow::FlowModel;
use crate::kalman::{initial_covariance, refresh_noise_covariance};
use crate::model::{build_inverse_model, ext_size};
use crate::output::{FieldRecord, SnapshotSink};
use crate::stats::AverageProfile;
use ndarray::{Array1, Array2};
use plume_types::config::{DerivedParams, OutflowHalo, SimulationConfig};
use plume_types::error::{PlumeError, PlumeResult};
use plume_types::geometry::{Lattice, SubdomainIdx, SUBDOMAIN_X, SUBDOMAIN_Y};
use rayon::prelude::*;
use tracing::info;

/// Per-tick constants handed to every subdomain task.
#[derive(Debug, Clone, Copy)]
struct StepParams {
    diffusion: f64,
    dx: f64,
    dy: f64,
    dt: f64,
    noise_q: f64,
    noise_r: f64,
    outflow_halo: OutflowHalo,
}

/// Whether the snapshot observer fires after time step `t_step`.
///
/// Selects `nwrite` step indices spread uniformly over the run; the
/// comparison uses the mathematical floor so step 0 always emits.
pub fn snapshot_due(t_step: usize, nt: usize, nwrite: usize) -> bool {
    if nt <= 1 {
        return t_step == 0;
    }
    let num = (nwrite - 1) as i64;
    let den = (nt - 1) as i64;
    let prev = (num * (t_step as i64 - 1)).div_euclid(den);
    let cur = (num * t_step as i64).div_euclid(den);
    prev != cur
}

/// The simulation engine: lattice of contexts plus the two state grids.
pub struct Simulation {
    config: SimulationConfig,
    params: DerivedParams,
    flow_model: FlowModel,
    contexts: Vec<SubdomainContext>,
    curr: CellGrid,
    next: CellGrid,
    profile: AverageProfile,
}

impl Simulation {
    /// Build the engine from a validated configuration and the frozen
    /// per-subdomain observation inputs (flat lattice order; `None`
    /// for sensor-free subdomains).
    pub fn new(
        config: SimulationConfig,
        observations: Vec<Option<ObservationSet>>,
    ) -> PlumeResult<Self> {
        let params = config.derive()?;
        let lattice = params.lattice;
        if observations.len() != lattice.len() {
            return Err(PlumeError::InvalidInput(format!(
                "observation slots ({}) do not cover the lattice ({})",
                observations.len(),
                lattice.len()
            )));
        }

        let n_fine = ext_size(SUBDOMAIN_X, SUBDOMAIN_Y);
        let scale_x = config.model_ini_covar_radius / params.dx;
        let scale_y = config.model_ini_covar_radius / params.dy;
        let nsub_iter = config.schwarz_num_iters;

        let mut contexts = Vec::with_capacity(lattice.len());
        let mut fine_active = vec![false; lattice.len()];
        for (flat, slot) in observations.into_iter().enumerate() {
            let idx = lattice.position(flat);
            let slot = slot.filter(|o| !o.sensors.is_empty());
            match slot {
                Some(set) => {
                    validate_observation_set(&set, params.nt, n_fine)?;
                    let p0 = initial_covariance(
                        SUBDOMAIN_X,
                        SUBDOMAIN_Y,
                        config.model_ini_var,
                        scale_x,
                        scale_y,
                    );
                    contexts.push(SubdomainContext::filtered(
                        lattice, idx, params.nt, nsub_iter, set, p0,
                    ));
                    fine_active[flat] = true;
                }
                None => contexts.push(SubdomainContext::direct(lattice, idx, params.nt, nsub_iter)),
            }
        }

        let choose = |idx: SubdomainIdx| {
            if fine_active[lattice.flat(idx)] {
                Layer::Fine
            } else {
                Layer::Coarse
            }
        };
        let curr = CellGrid::new(lattice, choose);
        let next = curr.clone();

        Ok(Simulation {
            flow_model: FlowModel::from_config(&config),
            config,
            params,
            contexts,
            curr,
            next,
            profile: AverageProfile::new(),
        })
    }

    /// Replace the flow model (validation runs with a pinned flow).
    pub fn set_flow_model(&mut self, model: FlowModel) {
        self.flow_model = model;
    }

    pub fn nt(&self) -> usize {
        self.params.nt
    }

    pub fn dt(&self) -> f64 {
        self.params.dt
    }

    pub fn dx(&self) -> f64 {
        self.params.dx
    }

    pub fn dy(&self) -> f64 {
        self.params.dy
    }

    pub fn lattice(&self) -> Lattice {
        self.params.lattice
    }

    pub fn profile(&self) -> &AverageProfile {
        &self.profile
    }

    pub fn context(&self, idx: SubdomainIdx) -> &SubdomainContext {
        &self.contexts[self.params.lattice.flat(idx)]
    }

    /// Set every value to zero.
    pub fn init_zero(&mut self) {
        self.init_with(|_, _| 0.0);
    }

    /// Initialize the fine field from a function of global coordinates,
    /// then pin the outer border and refresh the coarse layers.
    pub fn init_with<F: Fn(usize, usize) -> f64>(&mut self, f: F) {
        let lattice = self.params.lattice;
        let gnx = lattice.global_nodes_x();
        let gny = lattice.global_nodes_y();

        for idx in lattice.iter() {
            let cell = self.curr.cell_mut(idx);
            {
                let fine = cell.layer_mut(Layer::Fine);
                for x in 0..SUBDOMAIN_X {
                    for y in 0..SUBDOMAIN_Y {
                        let gx = lattice.global_x(idx, x);
                        let gy = lattice.global_y(idx, y);
                        let on_border = gx == 0 || gx + 1 == gnx || gy == 0 || gy + 1 == gny;
                        fine[[x, y]] = if on_border { 0.0 } else { f(gx, gy).max(0.0) };
                    }
                }
            }
            cell.coarsen();
        }
        self.next = self.curr.clone();

        // Seed every working field from its active layer.
        for ctx in &mut self.contexts {
            let cell = self.curr.cell(ctx.idx);
            crate::boundary::load_interior(&mut ctx.field, cell.layer(ctx.layer));
            apply_dirichlet(&mut ctx.field, &ctx.bounds);
        }
    }

    /// Gaussian spike of the configured integral at the configured spot.
    pub fn init_gaussian(&mut self) -> PlumeResult<()> {
        let lattice = self.params.lattice;
        let cx = (self.config.spot_x / self.params.dx).round() as i64;
        let cy = (self.config.spot_y / self.params.dy).round() as i64;
        let inside = cx >= 0
            && cx < lattice.global_nodes_x() as i64
            && cy >= 0
            && cy < lattice.global_nodes_y() as i64;
        if !inside {
            return Err(PlumeError::InvalidInput(format!(
                "density spot ({}, {}) is outside the domain",
                self.config.spot_x, self.config.spot_y
            )));
        }

        let sigma = 1.0_f64; // node units; keeps the spike differentiable
        let amplitude = self.config.spot_density / (sigma * sigma * 2.0 * std::f64::consts::PI);
        let falloff = 1.0 / (2.0 * sigma * sigma);
        let reach = 4.0 * sigma;
        self.init_with(|gx, gy| {
            let ddx = gx as f64 - cx as f64;
            let ddy = gy as f64 - cy as f64;
            if ddx.abs() <= reach && ddy.abs() <= reach {
                amplitude * (-falloff * (ddx * ddx + ddy * ddy)).exp()
            } else {
                0.0
            }
        });
        Ok(())
    }

    /// Run the full schedule, emitting snapshots into `sink`.
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> PlumeResult<()> {
        let nt = self.params.nt;
        let nsub = self.config.schwarz_num_iters;
        info!(
            nt,
            nsub_iter = nsub,
            subdomains = self.params.lattice.len(),
            dt = self.params.dt,
            "starting simulation"
        );

        for t in 0..nt * nsub {
            let t_step = t / nsub;
            let sub = t % nsub;
            self.advance(t_step, sub)?;
            if sub == 0 && snapshot_due(t_step, nt, self.config.write_num_fields) {
                let records = self.snapshot_records(t_step);
                sink.emit(t_step, &records)?;
            }
        }

        info!(
            mean_rel_diff = self.profile.overall_mean(),
            "simulation finished"
        );
        Ok(())
    }

    /// One logical tick: parallel subdomain updates plus the grid swap.
    fn advance(&mut self, t_step: usize, sub: usize) -> PlumeResult<()> {
        let flow = self.flow_model.at(t_step, self.params.nt);
        let step = StepParams {
            diffusion: self.config.diffusion_coef,
            dx: self.params.dx,
            dy: self.params.dy,
            dt: self.params.dt,
            noise_q: self.config.model_noise_q,
            noise_r: self.config.model_noise_r,
            outflow_halo: self.config.schwarz_outflow_halo,
        };

        let curr = &self.curr;
        let rel_diffs = self
            .contexts
            .par_iter_mut()
            .zip(self.next.cells.par_iter_mut())
            .map(|(ctx, next_cell)| step_subdomain(ctx, next_cell, curr, step, flow, t_step, sub))
            .collect::<PlumeResult<Vec<f64>>>()?;

        let mean = rel_diffs.iter().sum::<f64>() / rel_diffs.len() as f64;
        self.profile.accumulate(t_step, mean);

        std::mem::swap(&mut self.curr, &mut self.next);
        Ok(())
    }

    /// Records of every global fine node of the current state.
    fn snapshot_records(&self, t_step: usize) -> Vec<FieldRecord> {
        let lattice = self.params.lattice;
        let mut records =
            Vec::with_capacity(lattice.global_nodes_x() * lattice.global_nodes_y());
        for idx in lattice.iter() {
            let fine = self.curr.cell(idx).layer(Layer::Fine);
            for x in 0..SUBDOMAIN_X {
                for y in 0..SUBDOMAIN_Y {
                    records.push(FieldRecord {
                        time_index: t_step,
                        x: lattice.global_x(idx, x),
                        y: lattice.global_y(idx, y),
                        value: fine[[x, y]],
                    });
                }
            }
        }
        records
    }

    /// Assemble the global fine field of the current state.
    pub fn global_fine_field(&self) -> Array2<f64> {
        let lattice = self.params.lattice;
        let mut field = Array2::zeros((lattice.global_nodes_x(), lattice.global_nodes_y()));
        for idx in lattice.iter() {
            let fine = self.curr.cell(idx).layer(Layer::Fine);
            for x in 0..SUBDOMAIN_X {
                for y in 0..SUBDOMAIN_Y {
                    field[[lattice.global_x(idx, x), lattice.global_y(idx, y)]] = fine[[x, y]];
                }
            }
        }
        field
    }
}

fn validate_observation_set(set: &ObservationSet, nt: usize, n_fine: usize) -> PlumeResult<()> {
    let m = set.sensors.len();
    for &(x, y) in &set.sensors {
        if x >= SUBDOMAIN_X || y >= SUBDOMAIN_Y {
            return Err(PlumeError::InvalidInput(format!(
                "sensor coordinate ({x}, {y}) outside the subdomain"
            )));
        }
    }
    if set.h.dim() != (m, n_fine) {
        return Err(PlumeError::InvalidInput(format!(
            "observation operator shape {:?} does not match {m} sensors over state size {n_fine}",
            set.h.dim()
        )));
    }
    if set.measurements.dim() != (nt, m) {
        return Err(PlumeError::InvalidInput(format!(
            "measurement table shape {:?} does not match {nt} steps × {m} sensors",
            set.measurements.dim()
        )));
    }
    Ok(())
}

fn flatten(ext: &Array2<f64>) -> Array1<f64> {
    Array1::from_iter(ext.iter().copied())
}

fn unflatten(ext: &mut Array2<f64>, x: &Array1<f64>) {
    debug_assert_eq!(ext.len(), x.len());
    for (dst, &src) in ext.iter_mut().zip(x.iter()) {
        *dst = src;
    }
}

/// Advance one subdomain by one logical tick. Returns the Schwarz
/// mismatch of its inflow sides.
fn step_subdomain(
    ctx: &mut SubdomainContext,
    next_cell: &mut SubdomainCell,
    curr: &CellGrid,
    step: StepParams,
    flow: (f64, f64),
    t_step: usize,
    sub: usize,
) -> PlumeResult<f64> {
    ctx.flow = flow;
    let idx = ctx.idx;
    let layer = ctx.layer;
    let nsub_iter = ctx.nsub_iter;
    let (sx, sy) = layer.extents();
    let field = &mut ctx.field;
    let b = &mut ctx.b;
    let bounds = &mut ctx.bounds;
    let lu = &mut ctx.lu;

    match ctx.filter.as_mut() {
        Some(filter) => {
            // Kalman branch: prior once per outer step, posterior every tick.
            if sub == 0 {
                filter.z.assign(&filter.measurements.row(t_step));
                let mut rng = rand::thread_rng();
                refresh_noise_covariance(&mut filter.q, step.noise_q, &mut rng);
                refresh_noise_covariance(&mut filter.r, step.noise_r, &mut rng);

                build_inverse_model(b, sx, sy, flow, step.diffusion, step.dx, step.dy, step.dt);
                let mut x = flatten(field);
                filter
                    .kalman
                    .propagate_state_inverse(&mut x, &mut filter.p, b, &filter.q)?;
                unflatten(field, &x);
                apply_dirichlet(field, bounds);
                clamp_non_negative(field);
            }

            let rel_diff =
                schwarz_update(bounds, field, idx, layer, curr, flow, step.outflow_halo);

            let mut x = flatten(field);
            filter
                .kalman
                .solve_filter(&mut x, &mut filter.p, &filter.h, &filter.r, &filter.z)?;
            unflatten(field, &x);
            apply_dirichlet(field, bounds);
            clamp_non_negative(field);

            store_interior(next_cell.layer_mut(Layer::Fine), field);
            next_cell.set_active_layer(Layer::Fine);
            next_cell.coarsen();
            Ok(rel_diff)
        }
        None => {
            // Direct branch: coarse layer, amortized time step.
            let dt_eff = step.dt / nsub_iter as f64;
            build_inverse_model(
                b,
                sx,
                sy,
                flow,
                step.diffusion,
                2.0 * step.dx,
                2.0 * step.dy,
                dt_eff,
            );
            lu.factor(b)?;
            let x = flatten(field);
            let solved = lu.solve(x.view());
            unflatten(field, &solved);

            let rel_diff =
                schwarz_update(bounds, field, idx, layer, curr, flow, step.outflow_halo);
            apply_dirichlet(field, bounds);
            clamp_non_negative(field);

            store_interior(next_cell.layer_mut(Layer::Coarse), field);
            next_cell.set_active_layer(Layer::Coarse);
            next_cell.refine();
            Ok(rel_diff)
        }
    }
}
