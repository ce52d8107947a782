use super::config::ConfigError;
use crate::core::dispersion::model::DispersionError;
use crate::core::parameter::ParameterError;
use crate::core::resolution::binning::BinningError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Q binning error: {source}")]
    Binning {
        #[from]
        source: BinningError,
    },

    #[error("Parameter error: {source}")]
    Parameter {
        #[from]
        source: ParameterError,
    },

    #[error("Dispersion error: {source}")]
    Dispersion {
        #[from]
        source: DispersionError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Averaging would evaluate {requested} parameter combinations, above the limit of {limit}")]
    TooManyCombinations { requested: u128, limit: usize },

    #[error("Intensity array '{name}' has {len} entries but the smearer has {nbins} bins")]
    ArrayLength {
        name: &'static str,
        len: usize,
        nbins: usize,
    },

    #[error("Invalid bin range {first}..={last} for {nbins} bins")]
    InvalidBinRange {
        first: usize,
        last: usize,
        nbins: usize,
    },

    #[error("Smearer with {nbins} bins exceeds the limit of {limit}")]
    TooManyBins { nbins: usize, limit: usize },
}
