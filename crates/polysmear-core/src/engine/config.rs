use thiserror::Error;

pub const DEFAULT_MAX_COMBINATIONS: usize = 1_000_000;
pub const DEFAULT_MAX_BINS: usize = 10_000;
pub const DEFAULT_SLIT_POINTS: usize = 3000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AveragingConfig {
    /// Upper bound on the size of the Cartesian product of dispersed samples.
    pub max_combinations: usize,
    /// Name of the polar orientation angle (in degrees). When this parameter
    /// is dispersed, each sample is additionally weighted by `|sin θ|`.
    ///
    /// The factor enters both the weighted sum and its normalization, so it
    /// reshapes the angular distribution instead of scaling the sum by `|sin θ|`
    /// and dividing by a fixed `π/2`; the two schemes give different values.
    pub polar_angle: Option<String>,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            polar_angle: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmearingConfig {
    pub max_bins: usize,
    /// Sample count per side of the slit-width integration.
    pub slit_points: usize,
    /// Pad measured Q grids beyond their edges before smearing.
    pub extrapolate: bool,
}

impl Default for SmearingConfig {
    fn default() -> Self {
        Self {
            max_bins: DEFAULT_MAX_BINS,
            slit_points: DEFAULT_SLIT_POINTS,
            extrapolate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub averaging: AveragingConfig,
    pub smearing: SmearingConfig,
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    max_combinations: Option<usize>,
    polar_angle: Option<String>,
    max_bins: Option<usize>,
    slit_points: Option<usize>,
    extrapolate: Option<bool>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_combinations(mut self, limit: usize) -> Self {
        self.max_combinations = Some(limit);
        self
    }
    pub fn polar_angle(mut self, name: impl Into<String>) -> Self {
        self.polar_angle = Some(name.into());
        self
    }
    pub fn max_bins(mut self, limit: usize) -> Self {
        self.max_bins = Some(limit);
        self
    }
    pub fn slit_points(mut self, npts: usize) -> Self {
        self.slit_points = Some(npts);
        self
    }
    pub fn extrapolate(mut self, enabled: bool) -> Self {
        self.extrapolate = Some(enabled);
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let max_combinations = self.max_combinations.unwrap_or(DEFAULT_MAX_COMBINATIONS);
        if max_combinations == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_combinations",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(name) = &self.polar_angle {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: "polar_angle",
                    reason: "parameter name must not be empty".to_string(),
                });
            }
        }
        let max_bins = self.max_bins.unwrap_or(DEFAULT_MAX_BINS);
        if max_bins < 2 {
            return Err(ConfigError::InvalidValue {
                name: "max_bins",
                reason: format!("must allow at least 2 bins, got {max_bins}"),
            });
        }
        let slit_points = self.slit_points.unwrap_or(DEFAULT_SLIT_POINTS);
        if slit_points < 2 {
            return Err(ConfigError::InvalidValue {
                name: "slit_points",
                reason: format!("slit integration needs at least 2 points, got {slit_points}"),
            });
        }

        Ok(EngineConfig {
            averaging: AveragingConfig {
                max_combinations,
                polar_angle: self.polar_angle,
            },
            smearing: SmearingConfig {
                max_bins,
                slit_points,
                extrapolate: self.extrapolate.unwrap_or(true),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_settings_matches_defaults() {
        let config = EngineConfigBuilder::new().build().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.averaging.max_combinations, 1_000_000);
        assert_eq!(config.smearing.max_bins, 10_000);
        assert_eq!(config.smearing.slit_points, 3000);
        assert!(config.averaging.polar_angle.is_none());
        assert!(config.smearing.extrapolate);
    }

    #[test]
    fn builder_applies_every_setting() {
        let config = EngineConfigBuilder::new()
            .max_combinations(500)
            .polar_angle("cyl_theta")
            .max_bins(64)
            .slit_points(40)
            .extrapolate(false)
            .build()
            .unwrap();
        assert_eq!(config.averaging.max_combinations, 500);
        assert_eq!(config.averaging.polar_angle.as_deref(), Some("cyl_theta"));
        assert_eq!(config.smearing.max_bins, 64);
        assert_eq!(config.smearing.slit_points, 40);
        assert!(!config.smearing.extrapolate);
    }

    #[test]
    fn builder_rejects_degenerate_limits() {
        let err = EngineConfigBuilder::new()
            .max_combinations(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "max_combinations",
                ..
            }
        ));

        let err = EngineConfigBuilder::new().slit_points(1).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "slit_points", .. }));

        let err = EngineConfigBuilder::new().max_bins(1).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "max_bins", .. }));
    }

    #[test]
    fn builder_rejects_blank_polar_angle_name() {
        let err = EngineConfigBuilder::new()
            .polar_angle("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "polar_angle", .. }));
    }
}
