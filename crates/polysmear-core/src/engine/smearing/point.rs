use super::{Smearer, check_bin_limit, clamped_ranges};
use crate::core::resolution::binning::{BinRange, BinningError, QBinning};
use crate::core::resolution::matrix::WeightMatrix;
use crate::engine::config::SmearingConfig;
use crate::engine::error::EngineError;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;
use std::sync::OnceLock;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Smearing by a Gaussian resolution function with one standard deviation
/// per Q bin.
#[derive(Debug)]
pub struct QSmearer {
    binning: QBinning,
    sigma: Vec<f64>,
    matrix: OnceLock<WeightMatrix>,
}

impl QSmearer {
    /// # Errors
    ///
    /// Fails unless `sigma` has exactly one entry per bin, or if the binning
    /// has more bins than `config.max_bins`.
    pub fn new(
        binning: QBinning,
        sigma: impl Into<Vec<f64>>,
        config: &SmearingConfig,
    ) -> Result<Self, EngineError> {
        let sigma = sigma.into();
        if sigma.len() != binning.nbins() {
            return Err(BinningError::LengthMismatch {
                q: binning.nbins(),
                values: sigma.len(),
            }
            .into());
        }
        check_bin_limit(&binning, config)?;
        Ok(Self {
            binning,
            sigma,
            matrix: OnceLock::new(),
        })
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    fn compute_matrix(&self) -> WeightMatrix {
        let ranges = clamped_ranges(&self.binning);
        let nbins = ranges.len();

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..nbins;

        #[cfg(feature = "parallel")]
        let iterator = (0..nbins).into_par_iter();

        let rows: Vec<Vec<f64>> = iterator
            .map(|i| gaussian_row(i, &ranges, self.sigma[i]))
            .collect();

        let deltas = self.sigma.iter().filter(|s| !is_resolved(**s)).count();
        debug!(nbins, deltas, "Computed Q smearing matrix.");
        WeightMatrix::from_rows(&rows)
    }
}

impl Smearer for QSmearer {
    fn binning(&self) -> &QBinning {
        &self.binning
    }

    fn matrix(&self) -> &WeightMatrix {
        self.matrix.get_or_init(|| self.compute_matrix())
    }

    fn has_matrix(&self) -> bool {
        self.matrix.get().is_some()
    }
}

#[inline]
fn is_resolved(sigma: f64) -> bool {
    sigma > 0.0 && sigma.is_finite()
}

/// Fraction of a Gaussian centred on bin `i` that falls inside each bin.
/// Without a usable width the resolution is a delta on bin `i` itself.
fn gaussian_row(i: usize, ranges: &[BinRange], sigma: f64) -> Vec<f64> {
    let mut row = vec![0.0; ranges.len()];
    let q = ranges[i].center;
    if q <= 0.0 {
        return row;
    }
    if !is_resolved(sigma) {
        row[i] = 1.0;
        return row;
    }
    let scale = SQRT_2 * sigma;
    for (weight, bin) in row.iter_mut().zip(ranges) {
        if bin.center <= 0.0 {
            continue;
        }
        *weight = erf((bin.high - q) / scale) - erf((bin.low - q) / scale);
    }
    row
}
