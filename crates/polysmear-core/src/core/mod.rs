//! # Core Module
//!
//! Stateless building blocks used by the evaluation engine.
//!
//! - **Parameters** ([`parameter`]) - Named model parameters with optional bounds and an attached dispersion
//! - **Dispersions** ([`dispersion`]) - Distribution shapes, their weight kernels, and TOML configuration
//! - **Resolution** ([`resolution`]) - Q binning, dense weight matrices, and Q-range extrapolation
//!
//! Nothing here holds shared state; the smearers and the averaging driver in
//! [`crate::engine`] combine these pieces.

pub mod dispersion;
pub mod parameter;
pub mod resolution;
