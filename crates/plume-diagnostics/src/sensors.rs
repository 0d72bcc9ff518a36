// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Sensors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sensor placement input.
//!
//! The sensor file holds whitespace-separated records of
//! `(subdomain_ix, subdomain_iy, local_x, local_y)`. Record order is
//! preserved per subdomain; the measurement file assumes the same
//! order.

use ndarray::Array2;
use plume_core::model::{ext_index, ext_size};
use plume_types::error::{PlumeError, PlumeResult};
use plume_types::geometry::{Lattice, SubdomainIdx, SUBDOMAIN_X, SUBDOMAIN_Y};
use std::path::Path;

/// Frozen sensor placement over the whole lattice.
#[derive(Debug, Clone)]
pub struct SensorLayout {
    lattice: Lattice,
    by_subdomain: Vec<Vec<(usize, usize)>>,
}

impl SensorLayout {
    /// Read a sensor placement file.
    pub fn from_file<P: AsRef<Path>>(path: P, lattice: Lattice) -> PlumeResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents, lattice)
    }

    /// Parse sensor placement text.
    pub fn parse(contents: &str, lattice: Lattice) -> PlumeResult<Self> {
        let mut numbers = Vec::new();
        for token in contents.split_ascii_whitespace() {
            let value: usize = token.parse().map_err(|_| {
                PlumeError::InvalidInput(format!("malformed sensor token '{token}'"))
            })?;
            numbers.push(value);
        }
        if numbers.len() % 4 != 0 {
            return Err(PlumeError::InvalidInput(format!(
                "sensor file holds {} values, not a multiple of 4",
                numbers.len()
            )));
        }

        let mut by_subdomain = vec![Vec::new(); lattice.len()];
        for record in numbers.chunks_exact(4) {
            let (ix, iy, x, y) = (record[0], record[1], record[2], record[3]);
            if ix >= lattice.nx || iy >= lattice.ny {
                return Err(PlumeError::InvalidInput(format!(
                    "sensor subdomain ({ix}, {iy}) outside the {}×{} lattice",
                    lattice.nx, lattice.ny
                )));
            }
            if x >= SUBDOMAIN_X || y >= SUBDOMAIN_Y {
                return Err(PlumeError::InvalidInput(format!(
                    "sensor coordinate ({x}, {y}) outside the subdomain"
                )));
            }
            by_subdomain[lattice.flat(SubdomainIdx::new(ix, iy))].push((x, y));
        }
        Ok(SensorLayout { lattice, by_subdomain })
    }

    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    /// Ordered sensors of one subdomain.
    pub fn sensors(&self, idx: SubdomainIdx) -> &[(usize, usize)] {
        &self.by_subdomain[self.lattice.flat(idx)]
    }

    /// Total sensor count over the lattice.
    pub fn total(&self) -> usize {
        self.by_subdomain.iter().map(Vec::len).sum()
    }

    /// Number of subdomains carrying at least one sensor.
    pub fn covered_subdomains(&self) -> usize {
        self.by_subdomain.iter().filter(|s| !s.is_empty()).count()
    }
}

/// Observation operator of a sensor list: row k carries a single 1 at
/// the extended flat index of the k-th sensor, (x+1, y+1).
pub fn observation_operator(sensors: &[(usize, usize)]) -> Array2<f64> {
    let n = ext_size(SUBDOMAIN_X, SUBDOMAIN_Y);
    let mut h = Array2::zeros((sensors.len(), n));
    for (k, &(x, y)) in sensors.iter().enumerate() {
        h[[k, ext_index(x + 1, y + 1, SUBDOMAIN_Y)]] = 1.0;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_by_subdomain() {
        let lattice = Lattice::new(2, 2);
        let text = "0 0 3 4\n1 1 0 0\n0 0 5 6\n";
        let layout = SensorLayout::parse(text, lattice).unwrap();
        assert_eq!(layout.total(), 3);
        assert_eq!(layout.covered_subdomains(), 2);
        // Order within a subdomain follows the file.
        assert_eq!(layout.sensors(SubdomainIdx::new(0, 0)), &[(3, 4), (5, 6)]);
        assert_eq!(layout.sensors(SubdomainIdx::new(1, 1)), &[(0, 0)]);
        assert!(layout.sensors(SubdomainIdx::new(1, 0)).is_empty());
    }

    #[test]
    fn test_parse_rejects_out_of_lattice() {
        let lattice = Lattice::new(2, 2);
        let err = SensorLayout::parse("2 0 1 1", lattice).unwrap_err();
        assert!(matches!(err, PlumeError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_out_of_subdomain() {
        let lattice = Lattice::new(1, 1);
        let text = format!("0 0 {SUBDOMAIN_X} 0");
        let err = SensorLayout::parse(&text, lattice).unwrap_err();
        assert!(matches!(err, PlumeError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_ragged_records() {
        let lattice = Lattice::new(1, 1);
        let err = SensorLayout::parse("0 0 1", lattice).unwrap_err();
        assert!(matches!(err, PlumeError::InvalidInput(_)));
    }

    #[test]
    fn test_observation_operator_rows() {
        let sensors = vec![(0, 0), (3, 7)];
        let h = observation_operator(&sensors);
        assert_eq!(h.dim(), (2, ext_size(SUBDOMAIN_X, SUBDOMAIN_Y)));
        // Each row holds exactly one unit entry at the extended index.
        for (k, &(x, y)) in sensors.iter().enumerate() {
            let row = h.row(k);
            assert_eq!(row.iter().filter(|&&v| v != 0.0).count(), 1);
            assert_eq!(row[ext_index(x + 1, y + 1, SUBDOMAIN_Y)], 1.0);
        }
    }
}
