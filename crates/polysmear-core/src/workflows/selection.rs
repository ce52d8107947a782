use crate::core::resolution::binning::QBinning;
use crate::core::resolution::extrapolate::extrapolate_q;
use crate::engine::config::SmearingConfig;
use crate::engine::error::EngineError;
use crate::engine::smearing::Smearer;
use crate::engine::smearing::point::QSmearer;
use crate::engine::smearing::slit::SlitSmearer;
use std::ops::Range;
use tracing::{debug, info, instrument};

/// Measured Q values with whatever resolution information accompanies them.
///
/// `dq` is the Gaussian resolution width at each point; `slit_height` and
/// `slit_width` describe a slit-collimated measurement and must be the same
/// at every point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolutionData {
    pub q: Vec<f64>,
    pub dq: Option<Vec<f64>>,
    pub slit_height: Option<Vec<f64>>,
    pub slit_width: Option<Vec<f64>>,
}

impl ResolutionData {
    pub fn new(q: Vec<f64>) -> Self {
        Self {
            q,
            ..Self::default()
        }
    }

    pub fn with_dq(mut self, dq: Vec<f64>) -> Self {
        self.dq = Some(dq);
        self
    }

    pub fn with_slit(mut self, height: Vec<f64>, width: Vec<f64>) -> Self {
        self.slit_height = Some(height);
        self.slit_width = Some(width);
        self
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// The array if it has one entry per data point.
    fn per_point<'a>(&self, values: &'a Option<Vec<f64>>) -> Option<&'a [f64]> {
        values
            .as_deref()
            .filter(|values| !values.is_empty() && values.len() == self.q.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmearerKind {
    Point,
    Slit,
}

/// A smearer chosen to match a data set, covering the data Q grid and any
/// extrapolated points around it.
pub struct DataSmearer {
    kind: SmearerKind,
    smearer: Box<dyn Smearer + Send + Sync>,
    q: Vec<f64>,
    data_range: Range<usize>,
}

impl std::fmt::Debug for DataSmearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSmearer")
            .field("kind", &self.kind)
            .field("nbins", &self.q.len())
            .field("data_range", &self.data_range)
            .finish()
    }
}

impl DataSmearer {
    /// Picks the smearer that matches the resolution information in `data`.
    ///
    /// Gaussian resolution is preferred when `dq` has one entry per point and
    /// a positive first entry. Otherwise slit smearing is used when either
    /// slit array has one entry per point and a positive first entry. Returns
    /// `None` when no usable resolution is present.
    ///
    /// With `extrapolate`, the smearer covers a Q grid padded by three
    /// resolution widths on each side; for slits the width used is half of
    /// the larger slit dimension.
    ///
    /// # Errors
    ///
    /// Fails if the data Q values are not strictly increasing, if slit values
    /// vary between points, or if the smearer cannot be built.
    #[instrument(skip_all, name = "smearer_selection", fields(points = data.len()))]
    pub fn select(
        data: &ResolutionData,
        extrapolate: bool,
        config: &SmearingConfig,
    ) -> Result<Option<Self>, EngineError> {
        if let Some(dq) = data.per_point(&data.dq).filter(|dq| dq[0] > 0.0) {
            let (q, sigma, data_range) = if extrapolate {
                let grid = extrapolate_q(&data.q, dq)?;
                let range = grid.data_range();
                (grid.q, grid.sigma, range)
            } else {
                (data.q.clone(), dq.to_vec(), 0..data.q.len())
            };
            let binning = QBinning::from_q(q.clone())?;
            let smearer = QSmearer::new(binning, sigma, config)?;
            info!(nbins = q.len(), "Selected Gaussian Q smearing.");
            return Ok(Some(Self {
                kind: SmearerKind::Point,
                smearer: Box::new(smearer),
                q,
                data_range,
            }));
        }

        let height = data.per_point(&data.slit_height);
        let width = data.per_point(&data.slit_width);
        let found_slit = [height, width]
            .into_iter()
            .flatten()
            .any(|values| values[0] > 0.0);
        if !found_slit {
            debug!("No usable resolution information; smearing disabled.");
            return Ok(None);
        }

        let height = constant_slit_value("slit_height", height)?;
        let width = constant_slit_value("slit_width", width)?;

        let (q, data_range) = if extrapolate {
            let sigma = if height > width {
                height / 2.0
            } else {
                width / 2.0
            };
            let grid = extrapolate_q(&data.q, &vec![sigma; data.q.len()])?;
            let range = grid.data_range();
            (grid.q, range)
        } else {
            (data.q.clone(), 0..data.q.len())
        };
        let binning = QBinning::from_q(q.clone())?;
        let smearer = SlitSmearer::new(binning, width, height, config)?;
        info!(nbins = q.len(), width, height, "Selected slit smearing.");
        Ok(Some(Self {
            kind: SmearerKind::Slit,
            smearer: Box::new(smearer),
            q,
            data_range,
        }))
    }

    pub fn kind(&self) -> SmearerKind {
        self.kind
    }

    pub fn smearer(&self) -> &(dyn Smearer + Send + Sync) {
        self.smearer.as_ref()
    }

    /// Q values the model has to be evaluated at, extrapolated points included.
    pub fn q_values(&self) -> &[f64] {
        &self.q
    }

    /// Position of the measured points within [`q_values`](Self::q_values).
    pub fn data_range(&self) -> Range<usize> {
        self.data_range.clone()
    }

    /// Smears an intensity computed at every [`q_values`](Self::q_values)
    /// entry and returns the values at the measured points.
    pub fn smear(&self, iq_full: &[f64]) -> Result<Vec<f64>, EngineError> {
        if iq_full.len() != self.q.len() {
            return Err(EngineError::ArrayLength {
                name: "iq_full",
                len: iq_full.len(),
                nbins: self.q.len(),
            });
        }
        let smeared = self.smearer.apply(iq_full)?;
        Ok(smeared[self.data_range.clone()].to_vec())
    }
}

fn constant_slit_value(name: &str, values: Option<&[f64]>) -> Result<f64, EngineError> {
    let Some(values) = values else {
        return Ok(0.0);
    };
    let first = values[0];
    if values.iter().any(|&v| v != first) {
        return Err(EngineError::InvalidConfiguration(format!(
            "{name} must be the same for every data point"
        )));
    }
    if !first.is_finite() || first < 0.0 {
        return Err(EngineError::InvalidConfiguration(format!(
            "{name} must be a finite non-negative number, got {first}"
        )));
    }
    Ok(first)
}
