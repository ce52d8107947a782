use super::grid::{WeightGrid, combination_count};
use crate::core::dispersion::weight::{WeightPoint, total_weight};
use crate::core::parameter::{ParameterError, ParameterSet, ParameterValues};
use crate::engine::config::AveragingConfig;
use crate::engine::error::EngineError;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The scattering-formula evaluator the averager drives.
///
/// Implementors only read the parameter snapshot they are handed; any closure
/// `Fn(&ParameterValues, f64) -> f64` is a model without a form volume.
pub trait ScatteringModel {
    fn evaluate(&self, parameters: &ParameterValues, q: f64) -> f64;

    /// 2D evaluation. Isotropic models depend only on `|q|`.
    fn evaluate_xy(&self, parameters: &ParameterValues, qx: f64, qy: f64) -> f64 {
        self.evaluate(parameters, qx.hypot(qy))
    }

    /// Particle volume used to volume-weight the average, if the model has one.
    fn form_volume(&self, _parameters: &ParameterValues) -> Option<f64> {
        None
    }
}

impl<F> ScatteringModel for F
where
    F: Fn(&ParameterValues, f64) -> f64,
{
    fn evaluate(&self, parameters: &ParameterValues, q: f64) -> f64 {
        self(parameters, q)
    }
}

#[derive(Debug, Clone)]
struct DispersedAxis {
    name: String,
    slot: usize,
    points: Vec<WeightPoint>,
}

/// Averages a model over the Cartesian product of every dispersed parameter.
///
/// Weights are generated once when the averager is built; each evaluation
/// walks the full product and writes sampled values into a private copy of
/// the parameter snapshot, so the caller's parameters are never touched.
#[derive(Debug, Clone)]
pub struct PolydisperseAverager {
    centers: ParameterValues,
    axes: Vec<DispersedAxis>,
    polar_axis: Option<usize>,
    combinations: usize,
}

impl PolydisperseAverager {
    /// Samples every dispersible parameter and checks the size of the product.
    ///
    /// A parameter whose dispersion collapses to a single point is not
    /// dispersed; its value is pinned to that point.
    ///
    /// # Errors
    ///
    /// Fails if a dispersion cannot be sampled, if the bounds of a parameter
    /// reject every sample, or if the number of combinations overflows or
    /// exceeds `config.max_combinations`.
    #[instrument(skip_all, name = "averager_setup")]
    pub fn new(parameters: &ParameterSet, config: &AveragingConfig) -> Result<Self, EngineError> {
        let mut centers = parameters.values();
        let mut axes = Vec::new();

        for (name, parameter) in parameters.dispersible() {
            let points = parameter
                .weights()
                .map_err(|source| ParameterError::Dispersion {
                    name: name.to_string(),
                    source,
                })?;
            let slot = centers.index_of(name).ok_or_else(|| {
                EngineError::InvalidConfiguration(format!(
                    "parameter '{name}' is missing from the value snapshot"
                ))
            })?;
            match points.as_slice() {
                [] => {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "every sample of parameter '{name}' lies outside its bounds"
                    )));
                }
                [single] => centers.set_at(slot, single.value),
                _ => {
                    if total_weight(&points) == 0.0 {
                        warn!(
                            parameter = name,
                            "Every sample of a dispersed parameter has zero weight."
                        );
                    }
                    axes.push(DispersedAxis {
                        name: name.to_string(),
                        slot,
                        points,
                    });
                }
            }
        }

        let limit = config.max_combinations;
        let combinations = combination_count(axes.iter().map(|axis| axis.points.len()))
            .filter(|&count| count <= limit)
            .ok_or_else(|| EngineError::TooManyCombinations {
                requested: axes
                    .iter()
                    .fold(1u128, |acc, axis| acc.saturating_mul(axis.points.len() as u128)),
                limit,
            })?;

        let polar_axis = config
            .polar_angle
            .as_deref()
            .and_then(|polar| axes.iter().position(|axis| axis.name == polar));

        debug!(
            dispersed = axes.len(),
            combinations,
            orientation_weighted = polar_axis.is_some(),
            "Prepared polydispersity averaging."
        );

        Ok(Self {
            centers,
            axes,
            polar_axis,
            combinations,
        })
    }

    /// Parameter values at the centre of every distribution.
    pub fn centers(&self) -> &ParameterValues {
        &self.centers
    }

    pub fn combinations(&self) -> usize {
        self.combinations
    }

    pub fn dispersed(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.name.as_str())
    }

    pub fn is_dispersed(&self) -> bool {
        !self.axes.is_empty()
    }

    /// Polydispersity-averaged `I(q)`.
    ///
    /// With volume weighting the result is `Σ w·I·V / Σ w·V`; otherwise
    /// `Σ w·I / Σ w`. A zero normalization yields `0.0`.
    pub fn evaluate<M: ScatteringModel + ?Sized>(&self, model: &M, q: f64) -> f64 {
        if !self.is_dispersed() {
            return model.evaluate(&self.centers, q);
        }
        self.accumulate(
            |values| model.evaluate(values, q),
            |values| model.form_volume(values).unwrap_or(1.0),
        )
    }

    pub fn evaluate_xy<M: ScatteringModel + ?Sized>(&self, model: &M, qx: f64, qy: f64) -> f64 {
        if !self.is_dispersed() {
            return model.evaluate_xy(&self.centers, qx, qy);
        }
        self.accumulate(
            |values| model.evaluate_xy(values, qx, qy),
            |values| model.form_volume(values).unwrap_or(1.0),
        )
    }

    /// Averaged intensity at every `q`.
    pub fn evaluate_many<M>(&self, model: &M, q: &[f64]) -> Vec<f64>
    where
        M: ScatteringModel + Sync + ?Sized,
    {
        self.evaluate_many_with(model, q, || {})
    }

    /// Like [`evaluate_many`](Self::evaluate_many), calling `on_point` once
    /// after each `q` is done. Under the `parallel` feature the calls come
    /// from worker threads in no particular order.
    pub fn evaluate_many_with<M, F>(&self, model: &M, q: &[f64], on_point: F) -> Vec<f64>
    where
        M: ScatteringModel + Sync + ?Sized,
        F: Fn() + Sync,
    {
        #[cfg(not(feature = "parallel"))]
        let iterator = q.iter();

        #[cfg(feature = "parallel")]
        let iterator = q.par_iter();

        iterator
            .map(|&q| {
                let value = self.evaluate(model, q);
                on_point();
                value
            })
            .collect()
    }

    /// Weighted mean of an arbitrary function of the parameters, such as an
    /// effective radius. No volume weighting is applied.
    pub fn weighted_mean(&self, f: impl Fn(&ParameterValues) -> f64) -> f64 {
        if !self.is_dispersed() {
            return f(&self.centers);
        }
        self.accumulate(f, |_| 1.0)
    }

    fn accumulate(
        &self,
        value_of: impl Fn(&ParameterValues) -> f64,
        volume_of: impl Fn(&ParameterValues) -> f64,
    ) -> f64 {
        let mut values = self.centers.clone();
        let axes = self.axes.iter().map(|axis| axis.points.as_slice()).collect();
        let mut grid = WeightGrid::new(axes);

        let mut sum = 0.0;
        let mut norm = 0.0;
        while grid.is_valid() {
            for (index, axis) in self.axes.iter().enumerate() {
                values.set_at(axis.slot, grid.point(index).value);
            }

            let mut weight = grid.weight();
            if let Some(polar) = self.polar_axis {
                weight *= grid.point(polar).value.to_radians().sin().abs();
            }

            if weight != 0.0 {
                let volume = volume_of(&values);
                sum += weight * value_of(&values) * volume;
                norm += weight * volume;
            }
            grid.advance();
        }

        if norm == 0.0 || !norm.is_finite() {
            warn!(
                norm,
                combinations = self.combinations,
                "Polydispersity normalization is zero; returning 0."
            );
            return 0.0;
        }
        sum / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispersion::model::Dispersion;
    use crate::core::parameter::Parameter;
    use std::cell::Cell;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    struct Sphere;

    impl ScatteringModel for Sphere {
        fn evaluate(&self, parameters: &ParameterValues, q: f64) -> f64 {
            let r = parameters.get_or("radius", 0.0);
            let qr = q * r;
            if qr == 0.0 {
                return 1.0;
            }
            let f = 3.0 * (qr.sin() - qr * qr.cos()) / qr.powi(3);
            f * f
        }

        fn form_volume(&self, parameters: &ParameterValues) -> Option<f64> {
            let r = parameters.get_or("radius", 0.0);
            Some(4.0 / 3.0 * std::f64::consts::PI * r.powi(3))
        }
    }

    fn radius_set(dispersion: Dispersion) -> ParameterSet {
        ParameterSet::new()
            .with("scale", Parameter::new(1.0))
            .with(
                "radius",
                Parameter::dispersible(60.0)
                    .with_min(0.0)
                    .with_dispersion(dispersion),
            )
    }

    #[test]
    fn no_dispersion_returns_model_value_exactly() {
        let set = radius_set(Dispersion::gaussian());
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        assert!(!averager.is_dispersed());
        assert_eq!(averager.combinations(), 1);

        for q in [0.001, 0.01, 0.05, 0.3] {
            let expected = Sphere.evaluate(&set.values(), q);
            assert_eq!(averager.evaluate(&Sphere, q), expected);
        }
    }

    #[test]
    fn closure_models_are_averaged_with_plain_weights() {
        let set = radius_set(Dispersion::array(vec![50.0, 70.0], vec![1.0, 3.0]).unwrap());
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let model = |p: &ParameterValues, _q: f64| p.get_or("radius", 0.0);
        let result = averager.evaluate(&model, 0.1);
        assert!(f64_approx_equal(result, (50.0 + 3.0 * 70.0) / 4.0));
    }

    #[test]
    fn form_volume_weights_the_average() {
        struct Linear;
        impl ScatteringModel for Linear {
            fn evaluate(&self, p: &ParameterValues, _q: f64) -> f64 {
                p.get_or("radius", 0.0)
            }
            fn form_volume(&self, p: &ParameterValues) -> Option<f64> {
                Some(p.get_or("radius", 0.0) * 2.0)
            }
        }
        let set = radius_set(Dispersion::array(vec![1.0, 3.0], vec![1.0, 1.0]).unwrap());
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        // (1·1·2 + 1·3·6) / (1·2 + 1·6)
        assert!(f64_approx_equal(averager.evaluate(&Linear, 0.0), 20.0 / 8.0));
    }

    #[test]
    fn two_dispersed_parameters_use_full_product() {
        let set = ParameterSet::new()
            .with(
                "a",
                Parameter::dispersible(1.0)
                    .with_dispersion(Dispersion::array(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap()),
            )
            .with(
                "b",
                Parameter::dispersible(10.0).with_dispersion(
                    Dispersion::array(vec![10.0, 20.0, 30.0], vec![1.0, 2.0, 1.0]).unwrap(),
                ),
            );
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        assert_eq!(averager.combinations(), 6);
        assert_eq!(averager.dispersed().collect::<Vec<_>>(), vec!["a", "b"]);

        let calls = Cell::new(0);
        let model = |p: &ParameterValues, _q: f64| {
            calls.set(calls.get() + 1);
            p.get_or("a", 0.0) * p.get_or("b", 0.0)
        };
        // E[a]·E[b] = 1.5 · 20
        assert!(f64_approx_equal(averager.evaluate(&model, 0.1), 30.0));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn averaging_leaves_parameter_set_untouched() {
        let set = radius_set(Dispersion::gaussian().with_width(0.2).with_npts(7));
        let before = set.values();
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let _ = averager.evaluate(&Sphere, 0.05);
        assert_eq!(set.values(), before);
        assert_eq!(averager.centers(), &before);
    }

    #[test]
    fn combination_limit_is_enforced_before_evaluation() {
        let set = ParameterSet::new()
            .with(
                "a",
                Parameter::dispersible(1.0).with_dispersion(Dispersion::gaussian().with_width(0.5)),
            )
            .with(
                "b",
                Parameter::dispersible(1.0).with_dispersion(Dispersion::gaussian().with_width(0.5)),
            );
        let config = AveragingConfig {
            max_combinations: 9_999,
            ..AveragingConfig::default()
        };
        let err = PolydisperseAverager::new(&set, &config).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TooManyCombinations {
                requested: 10_000,
                limit: 9_999
            }
        ));
    }

    #[test]
    fn polar_angle_is_weighted_by_sine() {
        let angles = Dispersion::array(vec![0.0, 30.0, 90.0], vec![1.0, 1.0, 1.0]).unwrap();
        let set = ParameterSet::new().with(
            "theta",
            Parameter::dispersible(45.0).with_dispersion(angles),
        );
        let config = AveragingConfig {
            polar_angle: Some("theta".to_string()),
            ..AveragingConfig::default()
        };
        let averager = PolydisperseAverager::new(&set, &config).unwrap();
        let model = |p: &ParameterValues, _q: f64| p.get_or("theta", 0.0);
        // Weights |sin θ|: 0, 0.5, 1.
        let expected = (30.0 * 0.5 + 90.0 * 1.0) / 1.5;
        assert!(f64_approx_equal(averager.evaluate(&model, 0.1), expected));

        let unweighted = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        assert!(f64_approx_equal(unweighted.evaluate(&model, 0.1), 40.0));
    }

    #[test]
    fn zero_total_weight_returns_zero() {
        let set = radius_set(Dispersion::array(vec![50.0, 70.0], vec![0.0, 0.0]).unwrap());
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let result = averager.evaluate(&Sphere, 0.1);
        assert_eq!(result, 0.0);
    }

    #[test]
    fn single_surviving_sample_pins_the_value() {
        let set = ParameterSet::new().with(
            "radius",
            Parameter::dispersible(5.0)
                .with_min(0.0)
                .with_dispersion(Dispersion::array(vec![-1.0, 4.0], vec![1.0, 1.0]).unwrap()),
        );
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        assert!(!averager.is_dispersed());
        assert_eq!(averager.centers().get("radius"), Some(4.0));
    }

    #[test]
    fn bounds_rejecting_every_sample_is_an_error() {
        let set = ParameterSet::new().with(
            "radius",
            Parameter::dispersible(5.0)
                .with_min(0.0)
                .with_dispersion(Dispersion::array(vec![-2.0, -1.0], vec![1.0, 1.0]).unwrap()),
        );
        let err = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(ref m) if m.contains("radius")));
    }

    #[test]
    fn weighted_mean_ignores_form_volume() {
        let set = radius_set(Dispersion::array(vec![40.0, 80.0], vec![3.0, 1.0]).unwrap());
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let mean_radius = averager.weighted_mean(|p| p.get_or("radius", 0.0));
        assert!(f64_approx_equal(mean_radius, 50.0));
    }

    #[test]
    fn evaluate_xy_defaults_to_modulus() {
        let set = radius_set(Dispersion::gaussian().with_width(0.1).with_npts(5));
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let via_xy = averager.evaluate_xy(&Sphere, 0.03, 0.04);
        let via_q = averager.evaluate(&Sphere, 0.05);
        assert!(f64_approx_equal(via_xy, via_q));
    }

    #[test]
    fn evaluate_many_matches_pointwise_evaluation() {
        let set = radius_set(Dispersion::schulz().with_width(0.1).with_npts(11));
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let q = [0.01, 0.02, 0.05];
        let many = averager.evaluate_many(&Sphere, &q);
        for (value, q) in many.iter().zip(q) {
            assert_eq!(*value, averager.evaluate(&Sphere, q));
        }
    }

    #[test]
    fn evaluate_many_with_calls_back_once_per_point() {
        let set = radius_set(Dispersion::gaussian().with_width(0.1).with_npts(5));
        let averager = PolydisperseAverager::new(&set, &AveragingConfig::default()).unwrap();
        let done = std::sync::atomic::AtomicUsize::new(0);
        let q = [0.01, 0.02, 0.03, 0.04];
        let values = averager.evaluate_many_with(&Sphere, &q, || {
            done.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
        assert_eq!(values, averager.evaluate_many(&Sphere, &q));
        assert_eq!(done.load(std::sync::atomic::Ordering::Relaxed), 4);
    }
}
