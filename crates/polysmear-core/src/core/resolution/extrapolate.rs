use super::binning::BinningError;
use std::ops::Range;

/// How many resolution widths the grid is extended by on each side.
const EXTENSION_SIGMAS: usize = 3;
/// Extrapolated points per resolution width.
const STEPS_PER_SIGMA: usize = 10;

/// A data Q grid padded with extrapolated points below and above.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedGrid {
    pub q: Vec<f64>,
    pub sigma: Vec<f64>,
    pub nbins_low: usize,
    pub nbins_high: usize,
}

impl ExtendedGrid {
    /// Indices of the measured points within the extended grid.
    pub fn data_range(&self) -> Range<usize> {
        self.nbins_low..self.q.len() - self.nbins_high
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}

/// Extends `q` by three resolution widths on each side so that smearing
/// near the data edges sees intensity from beyond the measured range.
///
/// The step below the data is a tenth of `|sigma[0]|`, the step above a
/// tenth of `|sigma[last]|`. An edge with zero (or non-finite) width gets no
/// extra points, and extrapolated points at or below `Q = 0` are dropped.
/// New points carry the resolution width of the nearest data point.
pub fn extrapolate_q(q: &[f64], sigma: &[f64]) -> Result<ExtendedGrid, BinningError> {
    if q.len() != sigma.len() {
        return Err(BinningError::LengthMismatch {
            q: q.len(),
            values: sigma.len(),
        });
    }
    let (Some(&q_first), Some(&q_last)) = (q.first(), q.last()) else {
        return Err(BinningError::TooFewBins(0));
    };
    let sigma_low = sigma[0];
    let sigma_high = sigma[sigma.len() - 1];

    let n_extra = EXTENSION_SIGMAS * STEPS_PER_SIGMA;

    let low: Vec<f64> = match edge_step(sigma_low) {
        Some(step) => (1..=n_extra)
            .rev()
            .map(|k| q_first - step * k as f64)
            .filter(|&value| value > 0.0)
            .collect(),
        None => Vec::new(),
    };
    let high: Vec<f64> = match edge_step(sigma_high) {
        Some(step) => (1..=n_extra).map(|k| q_last + step * k as f64).collect(),
        None => Vec::new(),
    };

    let nbins_low = low.len();
    let nbins_high = high.len();

    let mut extended_q = Vec::with_capacity(nbins_low + q.len() + nbins_high);
    extended_q.extend(low);
    extended_q.extend_from_slice(q);
    extended_q.extend(high);

    let mut extended_sigma = Vec::with_capacity(extended_q.len());
    extended_sigma.extend(std::iter::repeat_n(sigma_low, nbins_low));
    extended_sigma.extend_from_slice(sigma);
    extended_sigma.extend(std::iter::repeat_n(sigma_high, nbins_high));

    Ok(ExtendedGrid {
        q: extended_q,
        sigma: extended_sigma,
        nbins_low,
        nbins_high,
    })
}

fn edge_step(sigma: f64) -> Option<f64> {
    let width = sigma.abs();
    (width > 0.0 && width.is_finite()).then(|| width / STEPS_PER_SIGMA as f64)
}
