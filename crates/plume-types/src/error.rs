// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlumeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configured {key}={found} disagrees with the compiled value {expected}")]
    ConfigMismatch {
        key: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular operator: pivot {pivot:.3e} underflowed at row {row}")]
    SingularOperator { row: usize, pivot: f64 },

    #[error("Filter ill-conditioned: innovation covariance lost positive definiteness at row {row} ({diagonal:.3e})")]
    FilterIllConditioned { row: usize, diagonal: f64 },

    #[error("Stability violation: derived time step dt={dt:.3e} is not positive")]
    StabilityViolation { dt: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlumeResult<T> = Result<T, PlumeError>;
