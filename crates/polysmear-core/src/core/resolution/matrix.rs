use nalgebra::DMatrix;

/// Weights whose magnitude falls below this are ignored when smearing.
pub const MIN_CONTRIBUTING_WEIGHT: f64 = 1.0e-3;

/// Dense `nbins × nbins` resolution weights. Row `i` describes how much each
/// input bin contributes to output bin `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    weights: DMatrix<f64>,
}

impl WeightMatrix {
    pub fn zeros(nbins: usize) -> Self {
        Self {
            weights: DMatrix::zeros(nbins, nbins),
        }
    }

    pub fn identity(nbins: usize) -> Self {
        Self {
            weights: DMatrix::identity(nbins, nbins),
        }
    }

    /// Assembles a matrix from independently computed rows.
    ///
    /// Rows shorter than the row count are padded with zeros.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let nbins = rows.len();
        Self {
            weights: DMatrix::from_fn(nbins, nbins, |i, j| {
                rows[i].get(j).copied().unwrap_or(0.0)
            }),
        }
    }

    #[inline]
    pub fn nbins(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.weights[(row, col)]
    }

    pub fn row_sum(&self, row: usize) -> f64 {
        self.weights.row(row).sum()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Smears `input` into `output` for the bins `first..=last`.
    ///
    /// Each output bin is the weighted mean of the input bins in the same
    /// range, ignoring weights smaller than [`MIN_CONTRIBUTING_WEIGHT`]. A
    /// bin with no contributing weight is set to `0.0`.
    ///
    /// # Panics
    ///
    /// Panics if `last` is not a valid bin or either slice is shorter than
    /// `last + 1`. Callers validate the range beforehand.
    pub fn apply_range(&self, input: &[f64], output: &mut [f64], first: usize, last: usize) {
        for i in first..=last {
            let (sum, counts) = (first..=last).fold((0.0, 0.0), |(sum, counts), k| {
                let w = self.weights[(i, k)];
                if w.abs() < MIN_CONTRIBUTING_WEIGHT {
                    (sum, counts)
                } else {
                    (sum + input[k] * w, counts + w)
                }
            });
            output[i] = if counts > 0.0 { sum / counts } else { 0.0 };
        }
    }
}
