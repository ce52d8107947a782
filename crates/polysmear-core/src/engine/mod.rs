//! # Engine Module
//!
//! Stateful evaluation machinery built on top of [`crate::core`].
//!
//! - **Configuration** ([`config`]) - Limits for averaging and smearing, with a validating builder
//! - **Averaging** ([`averaging`]) - Cartesian-product polydispersity and orientation averaging of a model
//! - **Smearing** ([`smearing`]) - Slit and Gaussian resolution smearers with lazily built weight matrices
//! - **Progress Monitoring** ([`progress`]) - Callback hook for phase and task events
//! - **Error Handling** ([`error`]) - The umbrella error type for engine operations
//!
//! With the `parallel` feature enabled, weight-matrix rows and multi-Q
//! averages are computed with rayon.

pub mod averaging;
pub mod config;
pub mod error;
pub mod progress;
pub mod smearing;
