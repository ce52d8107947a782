use crate::core::dispersion::weight::WeightPoint;

/// Odometer over the Cartesian product of several weight-point sets.
///
/// The first axis turns fastest. A grid with no axes has exactly one (empty)
/// combination; a grid with any empty axis has none.
#[derive(Debug, Clone)]
pub struct WeightGrid<'a> {
    axes: Vec<&'a [WeightPoint]>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> WeightGrid<'a> {
    pub fn new(axes: Vec<&'a [WeightPoint]>) -> Self {
        let exhausted = axes.iter().any(|axis| axis.is_empty());
        let cursor = vec![0; axes.len()];
        Self {
            axes,
            cursor,
            exhausted,
        }
    }

    /// Total number of combinations, or `None` if it overflows `usize`.
    pub fn len(&self) -> Option<usize> {
        combination_count(self.axes.iter().map(|axis| axis.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.axes.iter().any(|axis| axis.is_empty())
    }

    pub fn arity(&self) -> usize {
        self.axes.len()
    }

    /// Whether the cursor points at a valid combination.
    pub fn is_valid(&self) -> bool {
        !self.exhausted
    }

    #[inline]
    pub fn point(&self, axis: usize) -> WeightPoint {
        self.axes[axis][self.cursor[axis]]
    }

    /// Product of the weights at the current position.
    pub fn weight(&self) -> f64 {
        (0..self.axes.len()).map(|axis| self.point(axis).weight).product()
    }

    /// Moves to the next combination. Returns `false` once every combination
    /// has been visited.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        for (index, axis) in self.cursor.iter_mut().zip(&self.axes) {
            *index += 1;
            if *index < axis.len() {
                return true;
            }
            *index = 0;
        }
        self.exhausted = true;
        false
    }
}

/// Size of the Cartesian product of axes with the given lengths.
pub fn combination_count(lengths: impl IntoIterator<Item = usize>) -> Option<usize> {
    lengths
        .into_iter()
        .try_fold(1usize, |acc, len| acc.checked_mul(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[f64]) -> Vec<WeightPoint> {
        values.iter().map(|&v| WeightPoint::new(v, v * 10.0)).collect()
    }

    fn visit(grid: &mut WeightGrid) -> Vec<Vec<f64>> {
        let mut seen = Vec::new();
        while grid.is_valid() {
            seen.push((0..grid.arity()).map(|a| grid.point(a).value).collect());
            grid.advance();
        }
        seen
    }

    #[test]
    fn visits_every_combination_first_axis_fastest() {
        let a = points(&[1.0, 2.0]);
        let b = points(&[3.0, 4.0, 5.0]);
        let mut grid = WeightGrid::new(vec![a.as_slice(), b.as_slice()]);
        assert_eq!(grid.len(), Some(6));

        let seen = visit(&mut grid);
        assert_eq!(
            seen,
            vec![
                vec![1.0, 3.0],
                vec![2.0, 3.0],
                vec![1.0, 4.0],
                vec![2.0, 4.0],
                vec![1.0, 5.0],
                vec![2.0, 5.0],
            ]
        );
        assert!(!grid.advance());
    }

    #[test]
    fn weight_is_product_of_axis_weights() {
        let a = points(&[1.0, 2.0]);
        let b = points(&[0.5]);
        let mut grid = WeightGrid::new(vec![a.as_slice(), b.as_slice()]);
        assert_eq!(grid.weight(), 10.0 * 5.0);
        grid.advance();
        assert_eq!(grid.weight(), 20.0 * 5.0);
    }

    #[test]
    fn grid_without_axes_has_single_combination() {
        let mut grid = WeightGrid::new(Vec::new());
        assert_eq!(grid.len(), Some(1));
        assert!(grid.is_valid());
        assert_eq!(grid.weight(), 1.0);
        assert!(!grid.advance());
        assert!(!grid.is_valid());
    }

    #[test]
    fn empty_axis_yields_no_combinations() {
        let a = points(&[1.0, 2.0]);
        let empty: Vec<WeightPoint> = Vec::new();
        let grid = WeightGrid::new(vec![a.as_slice(), empty.as_slice()]);
        assert!(grid.is_empty());
        assert!(!grid.is_valid());
        assert_eq!(grid.len(), Some(0));
    }

    #[test]
    fn combination_count_detects_overflow() {
        assert_eq!(combination_count([10, 20, 30]), Some(6000));
        assert_eq!(combination_count([usize::MAX, 2]), None);
        assert_eq!(combination_count(std::iter::empty()), Some(1));
    }
}
