use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BinningError {
    #[error("Bin index {index} is outside [0, {nbins})")]
    OutOfRange { index: usize, nbins: usize },

    #[error("At least two Q bins are required, got {0}")]
    TooFewBins(usize),

    #[error("Invalid Q range: qmin = {qmin}, qmax = {qmax}")]
    InvalidRange { qmin: f64, qmax: f64 },

    #[error("Q values must be strictly increasing, but q[{index}] does not exceed q[{}]", index - 1)]
    NotIncreasing { index: usize },

    #[error("Q value at index {index} is not finite")]
    NonFinite { index: usize },

    #[error("Expected one resolution value per Q point ({q} points), got {values}")]
    LengthMismatch { q: usize, values: usize },
}

/// Centre and edges of one Q bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinRange {
    pub center: f64,
    pub low: f64,
    pub high: f64,
}

impl BinRange {
    #[inline]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn contains(&self, q: f64) -> bool {
        q >= self.low && q < self.high
    }
}

/// How Q space is divided into bins.
///
/// Even binning spaces `nbins` centres uniformly from `qmin` to `qmax`, each
/// bin extending half a step on either side. Arbitrary binning takes the
/// centres as given and places bin edges halfway between neighbours; the
/// first and last bins borrow the width of their only neighbouring gap.
#[derive(Debug, Clone, PartialEq)]
pub enum QBinning {
    Even { qmin: f64, qmax: f64, nbins: usize },
    Arbitrary { q: Vec<f64> },
}

impl QBinning {
    pub fn even(qmin: f64, qmax: f64, nbins: usize) -> Result<Self, BinningError> {
        if nbins < 2 {
            return Err(BinningError::TooFewBins(nbins));
        }
        if !qmin.is_finite() || !qmax.is_finite() || qmax <= qmin {
            return Err(BinningError::InvalidRange { qmin, qmax });
        }
        Ok(Self::Even { qmin, qmax, nbins })
    }

    pub fn from_q(q: impl Into<Vec<f64>>) -> Result<Self, BinningError> {
        let q = q.into();
        if q.len() < 2 {
            return Err(BinningError::TooFewBins(q.len()));
        }
        if let Some(index) = q.iter().position(|v| !v.is_finite()) {
            return Err(BinningError::NonFinite { index });
        }
        if let Some((index, _)) = q
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b <= a)
        {
            return Err(BinningError::NotIncreasing { index: index + 1 });
        }
        Ok(Self::Arbitrary { q })
    }

    pub fn nbins(&self) -> usize {
        match self {
            Self::Even { nbins, .. } => *nbins,
            Self::Arbitrary { q } => q.len(),
        }
    }

    pub fn is_even(&self) -> bool {
        matches!(self, Self::Even { .. })
    }

    pub fn qmin(&self) -> f64 {
        match self {
            Self::Even { qmin, .. } => *qmin,
            Self::Arbitrary { q } => q[0],
        }
    }

    pub fn qmax(&self) -> f64 {
        match self {
            Self::Even { qmax, .. } => *qmax,
            Self::Arbitrary { q } => q[q.len() - 1],
        }
    }

    /// Centre and edges of bin `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BinningError::OutOfRange`] unless `index < nbins`.
    pub fn bin_range(&self, index: usize) -> Result<BinRange, BinningError> {
        let nbins = self.nbins();
        if index >= nbins {
            return Err(BinningError::OutOfRange { index, nbins });
        }
        Ok(self.range_of(index))
    }

    pub fn center(&self, index: usize) -> Result<f64, BinningError> {
        self.bin_range(index).map(|range| range.center)
    }

    pub fn ranges(&self) -> Vec<BinRange> {
        (0..self.nbins()).map(|i| self.range_of(i)).collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        match self {
            Self::Arbitrary { q } => q.clone(),
            Self::Even { .. } => (0..self.nbins()).map(|i| self.range_of(i).center).collect(),
        }
    }

    /// First and last bins whose centres fall inside `[q_min, q_max]`.
    pub fn span(&self, q_min: f64, q_max: f64) -> Option<(usize, usize)> {
        let inside = |i: &usize| {
            let q = self.range_of(*i).center;
            q >= q_min && q <= q_max
        };
        let first = (0..self.nbins()).find(inside)?;
        let last = (0..self.nbins()).rev().find(inside)?;
        Some((first, last))
    }

    fn range_of(&self, i: usize) -> BinRange {
        match self {
            Self::Even { qmin, qmax, nbins } => {
                let step = (qmax - qmin) / (*nbins as f64 - 1.0);
                let center = qmin + i as f64 * step;
                BinRange {
                    center,
                    low: center - 0.5 * step,
                    high: center + 0.5 * step,
                }
            }
            Self::Arbitrary { q } => {
                let n = q.len();
                let center = q[i];
                let (below, above) = if i == 0 {
                    let half = (q[1] - q[0]) / 2.0;
                    (half, half)
                } else if i == n - 1 {
                    let half = (q[i] - q[i - 1]) / 2.0;
                    (half, half)
                } else {
                    ((q[i] - q[i - 1]) / 2.0, (q[i + 1] - q[i]) / 2.0)
                };
                BinRange {
                    center,
                    low: center - below,
                    high: center + above,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn even_binning_center_and_half_step_edges() {
        let binning = QBinning::even(0.01, 0.05, 5).unwrap();
        let range = binning.bin_range(2).unwrap();
        assert!(f64_approx_equal(range.center, 0.03));
        assert!(f64_approx_equal(range.low, 0.025));
        assert!(f64_approx_equal(range.high, 0.035));
        assert!(f64_approx_equal(range.width(), 0.01));
    }

    #[test]
    fn even_binning_first_and_last_centres_are_the_limits() {
        let binning = QBinning::even(0.001, 0.01, 10).unwrap();
        assert_eq!(binning.center(0).unwrap(), 0.001);
        assert!(f64_approx_equal(binning.center(9).unwrap(), 0.01));
    }

    #[test]
    fn arbitrary_binning_uses_midpoints_between_neighbours() {
        let binning = QBinning::from_q(vec![1.0, 2.0, 4.0, 8.0]).unwrap();
        let inner = binning.bin_range(2).unwrap();
        assert_eq!(inner, BinRange { center: 4.0, low: 3.0, high: 6.0 });
    }

    #[test]
    fn arbitrary_binning_edges_use_single_adjacent_gap() {
        let binning = QBinning::from_q(vec![1.0, 2.0, 4.0, 8.0]).unwrap();
        assert_eq!(
            binning.bin_range(0).unwrap(),
            BinRange { center: 1.0, low: 0.5, high: 1.5 }
        );
        assert_eq!(
            binning.bin_range(3).unwrap(),
            BinRange { center: 8.0, low: 6.0, high: 10.0 }
        );
    }

    #[test]
    fn bin_range_outside_bins_is_an_error() {
        let arbitrary = QBinning::from_q(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            arbitrary.bin_range(3),
            Err(BinningError::OutOfRange { index: 3, nbins: 3 })
        );
        let even = QBinning::even(0.1, 0.2, 4).unwrap();
        assert_eq!(
            even.bin_range(7),
            Err(BinningError::OutOfRange { index: 7, nbins: 4 })
        );
    }

    #[test]
    fn even_requires_two_bins_and_increasing_limits() {
        assert_eq!(QBinning::even(0.1, 0.2, 1), Err(BinningError::TooFewBins(1)));
        assert!(matches!(
            QBinning::even(0.2, 0.1, 10),
            Err(BinningError::InvalidRange { .. })
        ));
        assert!(matches!(
            QBinning::even(0.1, f64::NAN, 10),
            Err(BinningError::InvalidRange { .. })
        ));
    }

    #[test]
    fn from_q_validates_values() {
        assert_eq!(QBinning::from_q(vec![0.1]), Err(BinningError::TooFewBins(1)));
        assert_eq!(
            QBinning::from_q(vec![0.1, f64::INFINITY]),
            Err(BinningError::NonFinite { index: 1 })
        );
        assert_eq!(
            QBinning::from_q(vec![0.1, 0.3, 0.3, 0.4]),
            Err(BinningError::NotIncreasing { index: 2 })
        );
    }

    #[test]
    fn centers_match_bin_ranges() {
        let binning = QBinning::even(0.0, 1.0, 11).unwrap();
        let centers = binning.centers();
        let ranges = binning.ranges();
        assert_eq!(centers.len(), 11);
        for (c, r) in centers.iter().zip(&ranges) {
            assert_eq!(*c, r.center);
        }
    }

    #[test]
    fn span_finds_first_and_last_bins_inside_window() {
        let binning = QBinning::from_q(vec![0.01, 0.02, 0.03, 0.04, 0.05]).unwrap();
        assert_eq!(binning.span(0.015, 0.045), Some((1, 3)));
        assert_eq!(binning.span(0.03, 0.03), Some((2, 2)));
        assert_eq!(binning.span(0.06, 0.07), None);
    }

    #[test]
    fn bin_range_contains_is_half_open() {
        let range = BinRange { center: 1.0, low: 0.5, high: 1.5 };
        assert!(range.contains(0.5));
        assert!(range.contains(1.0));
        assert!(!range.contains(1.5));
    }
}
