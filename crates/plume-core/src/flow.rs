//! Flow field driving the advection term.
//!
//! The production flow is the frozen sinusoidal model; a uniform
//! variant exists for validation runs with a pinned flow.

use plume_types::config::SimulationConfig;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowModel {
    /// vx(t) = −max_vx · sin(0.1 t / Nt − π), vy analogous with 0.2.
    Sinusoidal { max_vx: f64, max_vy: f64 },
    /// Constant flow, unchanged over the run.
    Uniform { vx: f64, vy: f64 },
}

impl FlowModel {
    pub fn from_config(config: &SimulationConfig) -> Self {
        FlowModel::Sinusoidal {
            max_vx: config.flow_model_max_vx,
            max_vy: config.flow_model_max_vy,
        }
    }

    /// Flow components at outer time step `t_step` of `nt`.
    pub fn at(&self, t_step: usize, nt: usize) -> (f64, f64) {
        match *self {
            FlowModel::Sinusoidal { max_vx, max_vy } => {
                let t = t_step as f64 / nt as f64;
                (
                    -max_vx * (0.1 * t - PI).sin(),
                    -max_vy * (0.2 * t - PI).sin(),
                )
            }
            FlowModel::Uniform { vx, vy } => (vx, vy),
        }
    }
}
