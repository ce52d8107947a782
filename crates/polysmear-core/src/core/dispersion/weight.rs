/// A single `(value, weight)` sample of a dispersed parameter.
///
/// Weights are never normalized on creation. Anything combining weight points
/// must divide by the accumulated weight sum itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightPoint {
    pub value: f64,
    pub weight: f64,
}

impl WeightPoint {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }

    /// The degenerate distribution: all of the population sits at `value`.
    #[inline]
    pub fn single(value: f64) -> Self {
        Self { value, weight: 1.0 }
    }
}

/// Total weight of a sample set, as used for normalization.
pub fn total_weight(points: &[WeightPoint]) -> f64 {
    points.iter().map(|p| p.weight).sum()
}
