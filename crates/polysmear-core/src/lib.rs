//! # polysmear
//!
//! Resolution smearing and polydispersity averaging for small-angle scattering
//! models. The scattering formula itself is supplied by the caller through the
//! [`ScatteringModel`](engine::averaging::driver::ScatteringModel) trait.
//!
//! ## Architecture
//!
//! The library follows a three-layer structure.
//!
//! - **[`core`]: The Foundation.** Stateless data: parameters, dispersion
//!   shapes and their weight kernels, Q binning, and dense weight matrices.
//!
//! - **[`engine`]: The Logic Core.** The averaging driver that walks the
//!   Cartesian product of dispersed parameters, and the slit and Gaussian
//!   smearers with their lazily computed weight matrices.
//!
//! - **[`workflows`]: The Public API.** Picks a smearer for a data set and runs
//!   the full average-then-smear prediction.

pub mod core;
pub mod engine;
pub mod workflows;
