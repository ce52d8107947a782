use super::kernels::{self, RECTANGLE_HALF_WIDTH};
use super::weight::WeightPoint;
use crate::core::parameter::Parameter;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_NPTS: usize = 100;
const DEFAULT_NSIGMAS: f64 = 10.0;

/// Identifies a member of the dispersion family.
///
/// The serialized names (`"flat"`, `"gaussian"`, ...) are the `type` keys of the
/// key-value dispersion configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispersionKind {
    Flat,
    Gaussian,
    Rectangle,
    LogNormal,
    Schulz,
    Array,
}

impl DispersionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Gaussian => "gaussian",
            Self::Rectangle => "rectangle",
            Self::LogNormal => "lognormal",
            Self::Schulz => "schulz",
            Self::Array => "array",
        }
    }

    /// Cutoff extent, in sigmas, used when a spread does not specify one.
    pub fn default_nsigmas(&self) -> f64 {
        match self {
            Self::Flat | Self::Rectangle => RECTANGLE_HALF_WIDTH,
            Self::Gaussian | Self::LogNormal | Self::Schulz | Self::Array => DEFAULT_NSIGMAS,
        }
    }
}

impl fmt::Display for DispersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sampling settings shared by every kernel-based dispersion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    /// Number of samples across the window.
    pub npts: usize,
    /// Absolute sigma for parameters without a lower bound, otherwise the
    /// polydispersity ratio sigma/value.
    pub width: f64,
    /// Half-extent of the sampling window in units of sigma.
    pub nsigmas: f64,
}

impl Spread {
    pub fn new(npts: usize, width: f64, nsigmas: f64) -> Self {
        Self {
            npts,
            width,
            nsigmas,
        }
    }

    fn defaults_for(kind: DispersionKind) -> Self {
        Self::new(DEFAULT_NPTS, 0.0, kind.default_nsigmas())
    }

    /// Absolute sigma of this spread around the current value of `parameter`.
    ///
    /// A parameter without a lower bound is treated as angle-like and takes
    /// `width` as-is; bounded (length-like) parameters scale it by |value|.
    pub fn sigma_for(&self, parameter: &Parameter) -> f64 {
        if parameter.has_min() {
            self.width * parameter.value().abs()
        } else {
            self.width
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispersionError {
    #[error(
        "Array dispersion needs matching values and weights, got {values} values and {weights} weights"
    )]
    MismatchedArrays { values: usize, weights: usize },

    #[error("{kind} dispersion requires a positive center value, got {value}")]
    NonPositiveCenter { kind: DispersionKind, value: f64 },

    #[error("Array dispersion cannot be built from spread settings; supply values and weights")]
    ArrayNeedsValues,
}

/// A distribution that turns a parameter's center value into weighted samples.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispersion {
    Flat(Spread),
    Gaussian(Spread),
    Rectangle(Spread),
    LogNormal(Spread),
    Schulz(Spread),
    Array { values: Vec<f64>, weights: Vec<f64> },
}

impl Default for Dispersion {
    fn default() -> Self {
        Self::gaussian()
    }
}

impl Dispersion {
    pub fn flat() -> Self {
        Self::Flat(Spread::defaults_for(DispersionKind::Flat))
    }

    pub fn gaussian() -> Self {
        Self::Gaussian(Spread::defaults_for(DispersionKind::Gaussian))
    }

    pub fn rectangle() -> Self {
        Self::Rectangle(Spread::defaults_for(DispersionKind::Rectangle))
    }

    pub fn lognormal() -> Self {
        Self::LogNormal(Spread::defaults_for(DispersionKind::LogNormal))
    }

    pub fn schulz() -> Self {
        Self::Schulz(Spread::defaults_for(DispersionKind::Schulz))
    }

    /// Builds an explicit sample set from parallel arrays.
    pub fn array(values: Vec<f64>, weights: Vec<f64>) -> Result<Self, DispersionError> {
        if values.len() != weights.len() {
            return Err(DispersionError::MismatchedArrays {
                values: values.len(),
                weights: weights.len(),
            });
        }
        Ok(Self::Array { values, weights })
    }

    pub fn with_spread(kind: DispersionKind, spread: Spread) -> Result<Self, DispersionError> {
        Ok(match kind {
            DispersionKind::Flat => Self::Flat(spread),
            DispersionKind::Gaussian => Self::Gaussian(spread),
            DispersionKind::Rectangle => Self::Rectangle(spread),
            DispersionKind::LogNormal => Self::LogNormal(spread),
            DispersionKind::Schulz => Self::Schulz(spread),
            DispersionKind::Array => return Err(DispersionError::ArrayNeedsValues),
        })
    }

    pub fn with_npts(mut self, npts: usize) -> Self {
        if let Some(spread) = self.spread_mut() {
            spread.npts = npts;
        }
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        if let Some(spread) = self.spread_mut() {
            spread.width = width;
        }
        self
    }

    pub fn with_nsigmas(mut self, nsigmas: f64) -> Self {
        if let Some(spread) = self.spread_mut() {
            spread.nsigmas = nsigmas;
        }
        self
    }

    pub fn kind(&self) -> DispersionKind {
        match self {
            Self::Flat(_) => DispersionKind::Flat,
            Self::Gaussian(_) => DispersionKind::Gaussian,
            Self::Rectangle(_) => DispersionKind::Rectangle,
            Self::LogNormal(_) => DispersionKind::LogNormal,
            Self::Schulz(_) => DispersionKind::Schulz,
            Self::Array { .. } => DispersionKind::Array,
        }
    }

    /// Spread settings, or `None` for the array variant.
    pub fn spread(&self) -> Option<&Spread> {
        match self {
            Self::Flat(s)
            | Self::Gaussian(s)
            | Self::Rectangle(s)
            | Self::LogNormal(s)
            | Self::Schulz(s) => Some(s),
            Self::Array { .. } => None,
        }
    }

    pub fn spread_mut(&mut self) -> Option<&mut Spread> {
        match self {
            Self::Flat(s)
            | Self::Gaussian(s)
            | Self::Rectangle(s)
            | Self::LogNormal(s)
            | Self::Schulz(s) => Some(s),
            Self::Array { .. } => None,
        }
    }

    /// Samples the distribution around the current value of `parameter`.
    ///
    /// A non-positive width, fewer than two points or a zero-length sampling
    /// window all produce the single point `(value, 1.0)`. Samples falling
    /// outside the parameter's bounds are dropped and the remaining weights are
    /// left as computed.
    ///
    /// # Errors
    ///
    /// Returns [`DispersionError::NonPositiveCenter`] when a log-normal or
    /// Schulz distribution with a real spread is centered at a value ≤ 0.
    pub fn generate(&self, parameter: &Parameter) -> Result<Vec<WeightPoint>, DispersionError> {
        let center = parameter.value();
        let spread = match self {
            Self::Array { values, weights } => {
                return Ok(array_points(parameter, values, weights));
            }
            Self::Flat(s)
            | Self::Gaussian(s)
            | Self::Rectangle(s)
            | Self::LogNormal(s)
            | Self::Schulz(s) => s,
        };

        let sigma = spread.sigma_for(parameter);
        let step = sigma * spread.nsigmas;
        if spread.width <= 0.0 || spread.npts < 2 || step == 0.0 || !step.is_finite() {
            return Ok(vec![WeightPoint::single(center)]);
        }

        let kind = self.kind();
        if matches!(kind, DispersionKind::LogNormal | DispersionKind::Schulz) && center <= 0.0 {
            return Err(DispersionError::NonPositiveCenter {
                kind,
                value: center,
            });
        }

        let last = (spread.npts - 1) as f64;
        let log_center = center.ln();
        let log_sigma = (sigma / center).abs();

        let points = (0..spread.npts)
            .map(|i| center + step * (2.0 * i as f64 / last - 1.0))
            .filter(|&x| parameter.admits(x))
            .map(|x| {
                let weight = match kind {
                    DispersionKind::Flat | DispersionKind::Array => 1.0,
                    DispersionKind::Rectangle => kernels::rectangle(center, sigma, x),
                    DispersionKind::Gaussian => kernels::gaussian(center, sigma, x),
                    DispersionKind::LogNormal => kernels::lognormal(log_center, log_sigma, x),
                    DispersionKind::Schulz => kernels::schulz(center, sigma, x),
                };
                WeightPoint::new(x, weight)
            })
            .collect();

        Ok(points)
    }
}

fn array_points(parameter: &Parameter, values: &[f64], weights: &[f64]) -> Vec<WeightPoint> {
    if values.len() < 2 {
        return vec![WeightPoint::single(parameter.value())];
    }
    values
        .iter()
        .zip(weights)
        .filter(|(value, _)| parameter.admits(**value))
        .map(|(&value, &weight)| WeightPoint::new(value, weight))
        .collect()
}
