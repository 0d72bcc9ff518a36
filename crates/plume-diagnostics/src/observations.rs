// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Observations
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reference measurement series.
//!
//! The reference file carries, per time step, a header pair
//! `(t, physical_time)` followed by one `(global_x, global_y, value)`
//! triple per global node, x outer and y inner. The loader verifies
//! the step sequence, the coordinate ordering and the exact record
//! count; the series is the source of every sensor reading.

use crate::sensors::{observation_operator, SensorLayout};
use ndarray::{Array2, Array3};
use plume_core::context::ObservationSet;
use plume_types::error::{PlumeError, PlumeResult};
use plume_types::geometry::{Lattice, SubdomainIdx};
use std::path::Path;

/// Dense reference field over the whole run: (global_x, global_y, t).
#[derive(Debug, Clone)]
pub struct ReferenceSeries {
    data: Array3<f64>,
    nt: usize,
}

impl ReferenceSeries {
    /// Read and verify a reference series file.
    pub fn from_file<P: AsRef<Path>>(path: P, lattice: Lattice, nt: usize) -> PlumeResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents, lattice, nt)
    }

    /// Parse and verify reference series text.
    pub fn parse(contents: &str, lattice: Lattice, nt: usize) -> PlumeResult<Self> {
        let gnx = lattice.global_nodes_x();
        let gny = lattice.global_nodes_y();
        let mut tokens = contents.split_ascii_whitespace();
        let mut next_f64 = move |what: &str| -> PlumeResult<f64> {
            let token = tokens
                .next()
                .ok_or_else(|| PlumeError::InvalidInput(format!("reference series ended early at {what}")))?;
            token.parse::<f64>().map_err(|_| {
                PlumeError::InvalidInput(format!("malformed {what} token '{token}'"))
            })
        };

        let mut data = Array3::zeros((gnx, gny, nt));
        for t in 0..nt {
            let header_t = next_f64("step header")?;
            if header_t != t as f64 {
                return Err(PlumeError::InvalidInput(format!(
                    "reference series step header {header_t} where {t} was expected"
                )));
            }
            let _physical_time = next_f64("physical time")?;

            for x in 0..gnx {
                for y in 0..gny {
                    let i = next_f64("node abscissa")?;
                    let j = next_f64("node ordinate")?;
                    if i != x as f64 || j != y as f64 {
                        return Err(PlumeError::InvalidInput(format!(
                            "reference series node ({i}, {j}) out of order at step {t}, expected ({x}, {y})"
                        )));
                    }
                    data[[x, y, t]] = next_f64("node value")?;
                }
            }
        }
        if next_f64("trailing data").is_ok() {
            return Err(PlumeError::InvalidInput(
                "reference series holds more records than the schedule".to_string(),
            ));
        }
        Ok(ReferenceSeries { data, nt })
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Reference value of one global node at one time step.
    pub fn value(&self, gx: usize, gy: usize, t: usize) -> f64 {
        self.data[[gx, gy, t]]
    }

    /// Measurement table (nt × m) of one subdomain's sensor list.
    pub fn measurements_for(
        &self,
        lattice: Lattice,
        idx: SubdomainIdx,
        sensors: &[(usize, usize)],
    ) -> Array2<f64> {
        let mut table = Array2::zeros((self.nt, sensors.len()));
        for (k, &(x, y)) in sensors.iter().enumerate() {
            let gx = lattice.global_x(idx, x);
            let gy = lattice.global_y(idx, y);
            for t in 0..self.nt {
                table[[t, k]] = self.data[[gx, gy, t]];
            }
        }
        table
    }
}

/// Bind a sensor layout and reference series into per-subdomain
/// observation inputs, flat lattice order.
pub fn build_observation_sets(
    layout: &SensorLayout,
    series: &ReferenceSeries,
) -> Vec<Option<ObservationSet>> {
    let lattice = layout.lattice();
    lattice
        .iter()
        .map(|idx| {
            let sensors = layout.sensors(idx);
            if sensors.is_empty() {
                return None;
            }
            Some(ObservationSet {
                sensors: sensors.to_vec(),
                h: observation_operator(sensors),
                measurements: series.measurements_for(lattice, idx, sensors),
            })
        })
        .collect()
}
