use super::dispersion::model::{Dispersion, DispersionError};
use super::dispersion::weight::WeightPoint;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Unknown parameter '{0}'")]
    Unknown(String),

    #[error("Parameter '{0}' does not support dispersion")]
    NotDispersible(String),

    #[error("Dispersion failed for parameter '{name}': {source}")]
    Dispersion {
        name: String,
        #[source]
        source: DispersionError,
    },
}

/// A model parameter: a scalar value, optional open bounds, and the single
/// dispersion that describes its spread across the sampled population.
///
/// Whether a lower bound is set doubles as the unit switch for the dispersion
/// width: unbounded parameters (angles) use it as an absolute sigma, bounded
/// ones (lengths) as a fraction of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    dispersible: bool,
    dispersion: Dispersion,
}

impl Parameter {
    /// A fixed parameter that averaging never disperses.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: None,
            max: None,
            dispersible: false,
            dispersion: Dispersion::default(),
        }
    }

    /// A parameter that averaging may disperse, starting with a zero-width
    /// Gaussian.
    pub fn dispersible(value: f64) -> Self {
        Self {
            dispersible: true,
            ..Self::new(value)
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.dispersion = dispersion;
        self
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    #[inline]
    pub fn has_min(&self) -> bool {
        self.min.is_some()
    }

    #[inline]
    pub fn has_max(&self) -> bool {
        self.max.is_some()
    }

    pub fn set_min(&mut self, min: f64) {
        self.min = Some(min);
    }

    pub fn set_max(&mut self, max: f64) {
        self.max = Some(max);
    }

    pub fn is_dispersible(&self) -> bool {
        self.dispersible
    }

    pub fn dispersion(&self) -> &Dispersion {
        &self.dispersion
    }

    pub fn dispersion_mut(&mut self) -> &mut Dispersion {
        &mut self.dispersion
    }

    /// Installs a new dispersion and hands the previous one back to the caller.
    pub fn set_dispersion(&mut self, dispersion: Dispersion) -> Dispersion {
        std::mem::replace(&mut self.dispersion, dispersion)
    }

    /// Whether `x` lies strictly inside the configured bounds.
    #[inline]
    pub fn admits(&self, x: f64) -> bool {
        self.min.is_none_or(|min| x > min) && self.max.is_none_or(|max| x < max)
    }

    pub fn weights(&self) -> Result<Vec<WeightPoint>, DispersionError> {
        self.dispersion.generate(self)
    }
}

/// Named parameters of a scattering model, kept in name order so that
/// averaging enumerates combinations deterministically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, parameter: Parameter) -> Self {
        self.parameters.insert(name.into(), parameter);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(name.into(), parameter)
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).map(Parameter::value)
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        let parameter = self.parameter_mut(name)?;
        parameter.set_value(value);
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Result<&mut Parameter, ParameterError> {
        self.parameters
            .get_mut(name)
            .ok_or_else(|| ParameterError::Unknown(name.to_string()))
    }

    /// Replaces the dispersion of a dispersible parameter, returning the old one.
    pub fn set_dispersion(
        &mut self,
        name: &str,
        dispersion: Dispersion,
    ) -> Result<Dispersion, ParameterError> {
        let parameter = self.parameter_mut(name)?;
        if !parameter.is_dispersible() {
            return Err(ParameterError::NotDispersible(name.to_string()));
        }
        Ok(parameter.set_dispersion(dispersion))
    }

    pub fn weights(&self, name: &str) -> Result<Vec<WeightPoint>, ParameterError> {
        let parameter = self
            .parameters
            .get(name)
            .ok_or_else(|| ParameterError::Unknown(name.to_string()))?;
        parameter
            .weights()
            .map_err(|source| ParameterError::Dispersion {
                name: name.to_string(),
                source,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn dispersible(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.iter().filter(|(_, p)| p.is_dispersible())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Snapshot of every parameter's current value.
    pub fn values(&self) -> ParameterValues {
        ParameterValues {
            entries: self
                .parameters
                .iter()
                .map(|(name, p)| (name.clone(), p.value()))
                .collect(),
        }
    }
}

/// An immutable name → value snapshot handed to a model for one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    entries: Vec<(String, f64)>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        match self.search(&name) {
            Ok(index) => self.entries[index].1 = value,
            Err(index) => self.entries.insert(index, (name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.search(name).ok().map(|index| self.entries[index].1)
    }

    /// Value of `name`, or `default` when the model asks for something the
    /// parameter set does not define.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.search(name).ok()
    }

    #[inline]
    pub(crate) fn set_at(&mut self, index: usize, value: f64) {
        self.entries[index].1 = value;
    }

    #[inline]
    pub(crate) fn value_at(&self, index: usize) -> f64 {
        self.entries[index].1
    }

    fn search(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(entry, _)| entry.as_str().cmp(name))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |values, (name, value)| values.with(name, value))
    }
}
