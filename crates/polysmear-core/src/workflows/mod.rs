//! # Workflows Module
//!
//! End-to-end entry points that tie the engine and the core together.
//!
//! - **Smearer Selection** ([`selection`]) - Chooses Q or slit smearing from the
//!   resolution information that accompanies a data set, with optional Q-range
//!   extrapolation.
//! - **Prediction** ([`predict`]) - Averages a scattering model over its
//!   parameter dispersions and smears the result onto the measured points.

pub mod predict;
pub mod selection;
