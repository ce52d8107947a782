//! Resolution smearers.
//!
//! A smearer owns a [`QBinning`] and a dense weight matrix that is computed
//! the first time it is needed and then reused. [`SlitSmearer`](slit::SlitSmearer)
//! models slit-collimated instruments; [`QSmearer`](point::QSmearer) models a
//! Gaussian resolution of known width at every Q point.

pub mod point;
pub mod slit;

use crate::core::resolution::binning::{BinRange, BinningError, QBinning};
use crate::core::resolution::matrix::WeightMatrix;
use crate::engine::config::SmearingConfig;
use crate::engine::error::EngineError;

pub trait Smearer {
    fn binning(&self) -> &QBinning;

    /// The weight matrix, computed on first access.
    fn matrix(&self) -> &WeightMatrix;

    fn has_matrix(&self) -> bool;

    fn nbins(&self) -> usize {
        self.binning().nbins()
    }

    fn bin_range(&self, index: usize) -> Result<BinRange, BinningError> {
        self.binning().bin_range(index)
    }

    /// First and last bins whose centres lie within `[q_min, q_max]`.
    fn bin_span(&self, q_min: f64, q_max: f64) -> Option<(usize, usize)> {
        self.binning().span(q_min, q_max)
    }

    /// Smears `iq_in` into `iq_out` for bins `first_bin..=last_bin`.
    ///
    /// Only bins inside the range contribute. Entries of `iq_out` outside
    /// the range are left as they were.
    fn smear(
        &self,
        iq_in: &[f64],
        iq_out: &mut [f64],
        first_bin: usize,
        last_bin: usize,
    ) -> Result<(), EngineError> {
        let nbins = self.nbins();
        check_length("iq_in", iq_in.len(), nbins)?;
        check_length("iq_out", iq_out.len(), nbins)?;
        if last_bin >= nbins {
            return Err(BinningError::OutOfRange {
                index: last_bin,
                nbins,
            }
            .into());
        }
        if first_bin > last_bin {
            return Err(EngineError::InvalidBinRange {
                first: first_bin,
                last: last_bin,
                nbins,
            });
        }
        self.matrix().apply_range(iq_in, iq_out, first_bin, last_bin);
        Ok(())
    }

    /// Smears the whole of `iq_in`.
    fn apply(&self, iq_in: &[f64]) -> Result<Vec<f64>, EngineError> {
        let mut iq_out = vec![0.0; self.nbins()];
        self.smear(iq_in, &mut iq_out, 0, self.nbins() - 1)?;
        Ok(iq_out)
    }
}

fn check_length(name: &'static str, len: usize, nbins: usize) -> Result<(), EngineError> {
    if len < nbins {
        return Err(EngineError::ArrayLength { name, len, nbins });
    }
    Ok(())
}

pub(crate) fn check_bin_limit(
    binning: &QBinning,
    config: &SmearingConfig,
) -> Result<(), EngineError> {
    let nbins = binning.nbins();
    if nbins > config.max_bins {
        return Err(EngineError::TooManyBins {
            nbins,
            limit: config.max_bins,
        });
    }
    Ok(())
}

/// Bin ranges with the lower edge clamped at `Q = 0`.
pub(crate) fn clamped_ranges(binning: &QBinning) -> Vec<BinRange> {
    binning
        .ranges()
        .into_iter()
        .map(|range| BinRange {
            low: range.low.max(0.0),
            ..range
        })
        .collect()
}
