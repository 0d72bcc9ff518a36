// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Plume Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Parallel stencil-plus-filter engine for the concentration estimate.
//!
//! The global grid is split into a lattice of fixed-size subdomains,
//! each advanced by an implicit Euler step of the advection-diffusion
//! equation and, where sensors exist, corrected by a Kalman filter.
//! Neighbors reconcile across shared borders with a flow-aware Schwarz
//! overlap scheme.

pub mod boundary;
pub mod cell;
pub mod context;
pub mod driver;
pub mod flow;
pub mod kalman;
pub mod model;
pub mod output;
pub mod stats;
