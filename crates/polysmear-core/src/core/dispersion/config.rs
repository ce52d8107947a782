use super::model::{DEFAULT_NPTS, Dispersion, DispersionError, DispersionKind, Spread};
use crate::core::parameter::{ParameterError, ParameterSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Key-value form of a single dispersion: `{type, npts, width, nsigmas?}`,
/// plus `values`/`weights` for the array variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispersionConfig {
    #[serde(rename = "type")]
    pub kind: DispersionKind,
    #[serde(default = "default_npts")]
    pub npts: usize,
    #[serde(default)]
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsigmas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

fn default_npts() -> usize {
    DEFAULT_NPTS
}

impl From<&Dispersion> for DispersionConfig {
    fn from(dispersion: &Dispersion) -> Self {
        match dispersion {
            Dispersion::Array { values, weights } => Self {
                kind: DispersionKind::Array,
                npts: values.len(),
                width: 0.0,
                nsigmas: None,
                values: Some(values.clone()),
                weights: Some(weights.clone()),
            },
            Dispersion::Flat(spread)
            | Dispersion::Gaussian(spread)
            | Dispersion::Rectangle(spread)
            | Dispersion::LogNormal(spread)
            | Dispersion::Schulz(spread) => Self {
                kind: dispersion.kind(),
                npts: spread.npts,
                width: spread.width,
                nsigmas: Some(spread.nsigmas),
                values: None,
                weights: None,
            },
        }
    }
}

impl TryFrom<DispersionConfig> for Dispersion {
    type Error = DispersionError;

    fn try_from(config: DispersionConfig) -> Result<Self, Self::Error> {
        match config.kind {
            DispersionKind::Array => Dispersion::array(
                config.values.unwrap_or_default(),
                config.weights.unwrap_or_default(),
            ),
            kind => Dispersion::with_spread(
                kind,
                Spread::new(
                    config.npts,
                    config.width,
                    config.nsigmas.unwrap_or_else(|| kind.default_nsigmas()),
                ),
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispersionLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid dispersion for parameter '{name}': {source}")]
    Dispersion {
        name: String,
        source: DispersionError,
    },
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Dispersion settings for a whole model, keyed by parameter name.
///
/// ```toml
/// [radius]
/// type = "gaussian"
/// npts = 35
/// width = 0.1
/// nsigmas = 3.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispersionTable {
    entries: BTreeMap<String, DispersionConfig>,
}

impl DispersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, DispersionLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| DispersionLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let table: Self = toml::from_str(&content).map_err(|e| DispersionLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        debug!(
            entries = table.len(),
            "Loaded dispersion table from '{}'.",
            path.display()
        );
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<(), DispersionLoadError> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| DispersionLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, DispersionLoadError> {
        Ok(toml::to_string(self)?)
    }

    /// Exports the dispersion of every dispersible parameter.
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        Self {
            entries: parameters
                .dispersible()
                .map(|(name, p)| (name.to_string(), DispersionConfig::from(p.dispersion())))
                .collect(),
        }
    }

    /// Installs every entry on the matching parameter.
    ///
    /// Every entry is resolved and converted before anything is applied, so
    /// an invalid table, an unknown name or a fixed parameter leaves
    /// `parameters` untouched.
    pub fn apply_to(&self, parameters: &mut ParameterSet) -> Result<(), DispersionLoadError> {
        let dispersions = self
            .entries
            .iter()
            .map(|(name, config)| -> Result<_, DispersionLoadError> {
                let parameter = parameters
                    .parameter(name)
                    .ok_or_else(|| ParameterError::Unknown(name.clone()))?;
                if !parameter.is_dispersible() {
                    return Err(ParameterError::NotDispersible(name.clone()).into());
                }
                let dispersion = Dispersion::try_from(config.clone()).map_err(|source| {
                    DispersionLoadError::Dispersion {
                        name: name.clone(),
                        source,
                    }
                })?;
                Ok((name, dispersion))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (name, dispersion) in dispersions {
            parameters.set_dispersion(name, dispersion)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, config: DispersionConfig) {
        self.entries.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&DispersionConfig> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
