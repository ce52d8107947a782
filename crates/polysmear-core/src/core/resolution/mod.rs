//! Q-space bookkeeping shared by every smearer.
//!
//! - [`binning`] divides Q into bins and reports bin edges.
//! - [`matrix`] stores resolution weights and applies them to an intensity.
//! - [`extrapolate`] pads a measured Q grid beyond its edges.

pub mod binning;
pub mod extrapolate;
pub mod matrix;
