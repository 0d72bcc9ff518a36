// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Simulation configuration.
//!
//! The on-disk format is a plain key-value text file (`key value` per
//! line, `#` starts a comment). Derived step sizes are computed once at
//! startup; the subdomain extents must agree with the compiled constants.

use crate::error::{PlumeError, PlumeResult};
use crate::geometry::{Lattice, SUBDOMAIN_X, SUBDOMAIN_Y};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Guard against division by zero in the time-step bounds.
const TINY: f64 = 1e-30;

/// Halo fill policy on outflow sides of the Schwarz update.
///
/// Selected by the `schwarz_outflow_halo` configuration key; both
/// variants appear in the lineage of this solver, so the choice is a
/// runtime option rather than a build flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutflowHalo {
    /// Halo takes the second interior row: a reflection across the
    /// border row, giving a centered zero-gradient closure.
    #[default]
    Reflect,
    /// Halo copies the adjacent interior row (one-sided zero gradient).
    ZeroGradient,
}

impl FromStr for OutflowHalo {
    type Err = PlumeError;

    fn from_str(s: &str) -> PlumeResult<Self> {
        match s {
            "reflect" => Ok(OutflowHalo::Reflect),
            "zero_gradient" => Ok(OutflowHalo::ZeroGradient),
            other => Err(PlumeError::ConfigError(format!(
                "unknown schwarz_outflow_halo value: {other}"
            ))),
        }
    }
}

/// All user-facing parameters of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Diffusion coefficient D [m²/s], strictly positive.
    pub diffusion_coef: f64,
    pub num_subdomains_x: usize,
    pub num_subdomains_y: usize,
    /// Subdomain extents; must equal the compiled `SUBDOMAIN_X`/`SUBDOMAIN_Y`.
    pub subdomain_x: usize,
    pub subdomain_y: usize,
    /// Physical domain size [m].
    pub domain_size_x: f64,
    pub domain_size_y: f64,
    /// Integration period T [s] and the requested number of steps.
    pub integration_period: f64,
    pub integration_nsteps: usize,
    /// Peak flow components of the frozen flow model [m/s].
    pub flow_model_max_vx: f64,
    pub flow_model_max_vy: f64,
    /// Initial covariance variance and correlation radius [m].
    pub model_ini_var: f64,
    pub model_ini_covar_radius: f64,
    /// Process / observation noise amplitudes (diagonal boosts).
    pub model_noise_q: f64,
    pub model_noise_r: f64,
    /// Fixed number of inner Schwarz iterations per outer time step.
    pub schwarz_num_iters: usize,
    /// Number of snapshots written over the run, at least 2.
    pub write_num_fields: usize,
    pub output_dir: String,
    /// Initial density spot (used by the Gaussian initial field).
    pub spot_x: f64,
    pub spot_y: f64,
    pub spot_density: f64,
    pub schwarz_outflow_halo: OutflowHalo,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            diffusion_coef: 1.0,
            num_subdomains_x: 1,
            num_subdomains_y: 1,
            subdomain_x: SUBDOMAIN_X,
            subdomain_y: SUBDOMAIN_Y,
            domain_size_x: 1000.0,
            domain_size_y: 1000.0,
            integration_period: 3600.0,
            integration_nsteps: 100,
            flow_model_max_vx: 1.0,
            flow_model_max_vy: 1.0,
            model_ini_var: 1.0,
            model_ini_covar_radius: 1.0,
            model_noise_q: 1.0,
            model_noise_r: 1.0,
            schwarz_num_iters: 3,
            write_num_fields: 10,
            output_dir: "output".to_string(),
            spot_x: 0.0,
            spot_y: 0.0,
            spot_density: 0.0,
            schwarz_outflow_halo: OutflowHalo::default(),
        }
    }
}

/// Parameters derived from the configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedParams {
    /// Fine-level spatial steps [m].
    pub dx: f64,
    pub dy: f64,
    /// Stable time step [s].
    pub dt: f64,
    /// Number of outer time steps, ceil(T / dt).
    pub nt: usize,
    pub lattice: Lattice,
}

impl SimulationConfig {
    /// Read a key-value configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlumeResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_str_contents(&contents)
    }

    /// Parse configuration text (one `key value` pair per line).
    pub fn from_str_contents(contents: &str) -> PlumeResult<Self> {
        let mut entries: HashMap<&str, &str> = HashMap::new();
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next().unwrap_or("");
            let value = parts.next().map(str::trim).unwrap_or("");
            if value.is_empty() {
                return Err(PlumeError::ConfigError(format!(
                    "option '{key}' has no value"
                )));
            }
            entries.insert(key, value);
        }

        fn required<'a>(
            entries: &HashMap<&str, &'a str>,
            key: &str,
        ) -> PlumeResult<&'a str> {
            entries
                .get(key)
                .copied()
                .ok_or_else(|| PlumeError::ConfigError(format!("missing option '{key}'")))
        }

        fn parse<T: FromStr>(key: &str, raw: &str) -> PlumeResult<T> {
            raw.parse::<T>().map_err(|_| {
                PlumeError::ConfigError(format!("option '{key}' has malformed value '{raw}'"))
            })
        }

        fn get_f64(entries: &HashMap<&str, &str>, key: &str) -> PlumeResult<f64> {
            parse(key, required(entries, key)?)
        }

        fn get_usize(entries: &HashMap<&str, &str>, key: &str) -> PlumeResult<usize> {
            parse(key, required(entries, key)?)
        }

        fn get_f64_or(entries: &HashMap<&str, &str>, key: &str, default: f64) -> PlumeResult<f64> {
            match entries.get(key) {
                Some(raw) => parse(key, raw),
                None => Ok(default),
            }
        }

        let config = SimulationConfig {
            diffusion_coef: get_f64(&entries, "diffusion_coef")?,
            num_subdomains_x: get_usize(&entries, "num_subdomains_x")?,
            num_subdomains_y: get_usize(&entries, "num_subdomains_y")?,
            subdomain_x: get_usize(&entries, "subdomain_x")?,
            subdomain_y: get_usize(&entries, "subdomain_y")?,
            domain_size_x: get_f64(&entries, "domain_size_x")?,
            domain_size_y: get_f64(&entries, "domain_size_y")?,
            integration_period: get_f64(&entries, "integration_period")?,
            integration_nsteps: get_usize(&entries, "integration_nsteps")?,
            flow_model_max_vx: get_f64(&entries, "flow_model_max_vx")?,
            flow_model_max_vy: get_f64(&entries, "flow_model_max_vy")?,
            model_ini_var: get_f64(&entries, "model_ini_var")?,
            model_ini_covar_radius: get_f64(&entries, "model_ini_covar_radius")?,
            model_noise_q: get_f64(&entries, "model_noise_Q")?,
            model_noise_r: get_f64(&entries, "model_noise_R")?,
            schwarz_num_iters: get_usize(&entries, "schwarz_num_iters")?,
            write_num_fields: get_usize(&entries, "write_num_fields")?,
            output_dir: required(&entries, "output_dir")?.to_string(),
            spot_x: get_f64_or(&entries, "spot_x", 0.0)?,
            spot_y: get_f64_or(&entries, "spot_y", 0.0)?,
            spot_density: get_f64_or(&entries, "spot_density", 0.0)?,
            schwarz_outflow_halo: match entries.get("schwarz_outflow_halo") {
                Some(raw) => raw.parse()?,
                None => OutflowHalo::default(),
            },
        };
        Ok(config)
    }

    /// Validate the configuration and compute the derived parameters.
    pub fn derive(&self) -> PlumeResult<DerivedParams> {
        if self.subdomain_x != SUBDOMAIN_X {
            return Err(PlumeError::ConfigMismatch {
                key: "subdomain_x",
                expected: SUBDOMAIN_X,
                found: self.subdomain_x,
            });
        }
        if self.subdomain_y != SUBDOMAIN_Y {
            return Err(PlumeError::ConfigMismatch {
                key: "subdomain_y",
                expected: SUBDOMAIN_Y,
                found: self.subdomain_y,
            });
        }
        if self.num_subdomains_x < 1 || self.num_subdomains_y < 1 {
            return Err(PlumeError::InvalidInput(
                "at least one subdomain is required along each axis".to_string(),
            ));
        }
        if self.diffusion_coef <= 0.0 {
            return Err(PlumeError::InvalidInput(format!(
                "diffusion coefficient must be positive, got {}",
                self.diffusion_coef
            )));
        }
        if self.domain_size_x <= 0.0 || self.domain_size_y <= 0.0 {
            return Err(PlumeError::InvalidInput(
                "domain size must be positive".to_string(),
            ));
        }
        if self.integration_nsteps < 1 {
            return Err(PlumeError::InvalidInput(
                "integration_nsteps must be at least 1".to_string(),
            ));
        }
        if self.schwarz_num_iters < 1 {
            return Err(PlumeError::InvalidInput(
                "schwarz_num_iters must be at least 1".to_string(),
            ));
        }
        if self.write_num_fields < 2 {
            return Err(PlumeError::InvalidInput(
                "write_num_fields must be at least 2".to_string(),
            ));
        }
        if self.model_ini_var < 0.0
            || self.model_ini_covar_radius < 0.0
            || self.model_noise_q < 0.0
            || self.model_noise_r < 0.0
        {
            return Err(PlumeError::InvalidInput(
                "model variance and noise amplitudes must be non-negative".to_string(),
            ));
        }

        let lattice = Lattice::new(self.num_subdomains_x, self.num_subdomains_y);
        let dx = self.domain_size_x / (lattice.global_nodes_x() - 1) as f64;
        let dy = self.domain_size_y / (lattice.global_nodes_y() - 1) as f64;

        // Deduce the time step from the stability criteria: the requested
        // step, the diffusion bound and the advection (CFL) bound.
        let d = self.diffusion_coef;
        let dt_base = self.integration_period / self.integration_nsteps as f64;
        let dt_diffusion = dx.powi(2).min(dy.powi(2)) / (2.0 * d + TINY);
        let dt_advection = 1.0
            / (self.flow_model_max_vx.abs() / dx + self.flow_model_max_vy.abs() / dy + TINY);
        let dt = dt_base.min(dt_diffusion).min(dt_advection);
        if !(dt > 0.0) {
            return Err(PlumeError::StabilityViolation { dt });
        }
        let nt = (self.integration_period / dt).ceil() as usize;

        Ok(DerivedParams { dx, dy, dt, nt, lattice })
    }

    /// Global fine node counts implied by this configuration.
    fn global_nodes(&self) -> (usize, usize) {
        (
            self.num_subdomains_x * self.subdomain_x,
            self.num_subdomains_y * self.subdomain_y,
        )
    }

    /// Name of the sensor location file for this geometry.
    pub fn sensors_file_name(&self) -> String {
        let (nx, ny) = self.global_nodes();
        format!("sensors_Nx{nx}_Ny{ny}.txt")
    }

    /// Name of the reference ("analytic") observation file.
    pub fn analytic_file_name(&self, nt: usize) -> String {
        let (nx, ny) = self.global_nodes();
        format!("analytic_Nx{nx}_Ny{ny}_Nt{nt}.txt")
    }

    /// Name of the binary result file.
    pub fn field_file_name(&self, nt: usize) -> String {
        let (nx, ny) = self.global_nodes();
        format!("field_Nx{nx}_Ny{ny}_Nt{nt}.bin")
    }

    /// Path of a file inside the output directory.
    pub fn output_path(&self, name: &str) -> PathBuf {
        Path::new(&self.output_dir).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        format!(
            "# plume configuration\n\
             diffusion_coef      1.5\n\
             num_subdomains_x    4\n\
             num_subdomains_y    3\n\
             subdomain_x         {SUBDOMAIN_X}\n\
             subdomain_y         {SUBDOMAIN_Y}\n\
             domain_size_x       1000.0\n\
             domain_size_y       800.0   # meters\n\
             integration_period  3600.0\n\
             integration_nsteps  200\n\
             flow_model_max_vx   1.0\n\
             flow_model_max_vy   0.5\n\
             model_ini_var       1.0\n\
             model_ini_covar_radius 20.0\n\
             model_noise_Q       1.0\n\
             model_noise_R       1.0\n\
             schwarz_num_iters   3\n\
             write_num_fields    10\n\
             output_dir          out\n"
        )
    }

    #[test]
    fn test_parse_sample() {
        let config = SimulationConfig::from_str_contents(&sample_text()).unwrap();
        assert_eq!(config.num_subdomains_x, 4);
        assert_eq!(config.num_subdomains_y, 3);
        assert!((config.diffusion_coef - 1.5).abs() < 1e-15);
        assert!((config.domain_size_y - 800.0).abs() < 1e-15);
        assert_eq!(config.schwarz_outflow_halo, OutflowHalo::Reflect);
    }

    #[test]
    fn test_missing_option_rejected() {
        let text = sample_text().replace("diffusion_coef      1.5\n", "");
        let err = SimulationConfig::from_str_contents(&text).unwrap_err();
        match err {
            PlumeError::ConfigError(msg) => assert!(msg.contains("diffusion_coef")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_outflow_halo_parse() {
        let text = sample_text() + "schwarz_outflow_halo zero_gradient\n";
        let config = SimulationConfig::from_str_contents(&text).unwrap();
        assert_eq!(config.schwarz_outflow_halo, OutflowHalo::ZeroGradient);

        let text = sample_text() + "schwarz_outflow_halo bogus\n";
        assert!(SimulationConfig::from_str_contents(&text).is_err());
    }

    #[test]
    fn test_derive_spacing_and_steps() {
        let config = SimulationConfig::from_str_contents(&sample_text()).unwrap();
        let derived = config.derive().unwrap();
        let nx = (4 * SUBDOMAIN_X) as f64;
        let ny = (3 * SUBDOMAIN_Y) as f64;
        assert!((derived.dx - 1000.0 / (nx - 1.0)).abs() < 1e-12);
        assert!((derived.dy - 800.0 / (ny - 1.0)).abs() < 1e-12);
        assert!(derived.dt > 0.0);
        // dt obeys every bound.
        assert!(derived.dt <= 3600.0 / 200.0 + 1e-12);
        assert!(derived.dt <= derived.dx.powi(2).min(derived.dy.powi(2))
            / (2.0 * config.diffusion_coef));
        assert_eq!(
            derived.nt,
            (config.integration_period / derived.dt).ceil() as usize
        );
    }

    #[test]
    fn test_subdomain_mismatch_is_fatal() {
        let mut config = SimulationConfig::default();
        config.subdomain_x = SUBDOMAIN_X + 1;
        let err = config.derive().unwrap_err();
        match err {
            PlumeError::ConfigMismatch { key, expected, found } => {
                assert_eq!(key, "subdomain_x");
                assert_eq!(expected, SUBDOMAIN_X);
                assert_eq!(found, SUBDOMAIN_X + 1);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nonpositive_diffusion_rejected() {
        let mut config = SimulationConfig::default();
        config.diffusion_coef = -1.0;
        assert!(matches!(
            config.derive().unwrap_err(),
            PlumeError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_file_names() {
        let config = SimulationConfig {
            num_subdomains_x: 2,
            num_subdomains_y: 2,
            ..SimulationConfig::default()
        };
        let nx = 2 * SUBDOMAIN_X;
        let ny = 2 * SUBDOMAIN_Y;
        assert_eq!(config.sensors_file_name(), format!("sensors_Nx{nx}_Ny{ny}.txt"));
        assert_eq!(
            config.analytic_file_name(40),
            format!("analytic_Nx{nx}_Ny{ny}_Nt40.txt")
        );
        assert_eq!(
            config.field_file_name(40),
            format!("field_Nx{nx}_Ny{ny}_Nt40.bin")
        );
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = SimulationConfig::from_str_contents(&sample_text()).unwrap();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let config2: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.num_subdomains_x, config2.num_subdomains_x);
        assert_eq!(config.output_dir, config2.output_dir);
    }
}
