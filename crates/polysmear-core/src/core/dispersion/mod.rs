//! Distributions describing how a parameter is spread across a population.
//!
//! Every [`Dispersion`](model::Dispersion) turns the current value of a
//! [`Parameter`](crate::core::parameter::Parameter) into a list of
//! [`WeightPoint`](weight::WeightPoint)s. The [`config`] submodule converts
//! dispersions to and from their key-value form and loads whole tables from TOML.

pub mod config;
pub mod kernels;
pub mod model;
pub mod weight;
