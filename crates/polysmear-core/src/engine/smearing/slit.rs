use super::{Smearer, check_bin_limit, clamped_ranges};
use crate::core::resolution::binning::{BinRange, QBinning};
use crate::core::resolution::matrix::WeightMatrix;
use crate::engine::config::SmearingConfig;
use crate::engine::error::EngineError;
use std::sync::OnceLock;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Above this aspect ratio the smaller slit dimension is ignored.
const DOMINANCE_RATIO: f64 = 100.0;

/// Smearing by a rectangular slit of the given width and height (Q units).
#[derive(Debug)]
pub struct SlitSmearer {
    binning: QBinning,
    width: f64,
    height: f64,
    npts: usize,
    matrix: OnceLock<WeightMatrix>,
}

#[derive(Debug, Clone, PartialEq)]
enum SlitRule {
    /// Zero-size slit.
    Identity,
    /// Every bin within `±width` of Q contributes its own width.
    Width { width: f64 },
    /// Height integrated analytically at each sampled width offset.
    Integrated { offsets: Vec<f64>, height: f64 },
}

impl SlitSmearer {
    /// # Errors
    ///
    /// Fails if either dimension is negative or not finite, or if the
    /// binning has more bins than `config.max_bins`.
    pub fn new(
        binning: QBinning,
        width: f64,
        height: f64,
        config: &SmearingConfig,
    ) -> Result<Self, EngineError> {
        for (name, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "slit {name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        check_bin_limit(&binning, config)?;
        if config.slit_points < 2 {
            return Err(EngineError::InvalidConfiguration(format!(
                "slit integration needs at least 2 points, got {}",
                config.slit_points
            )));
        }
        Ok(Self {
            binning,
            width,
            height,
            npts: config.slit_points,
            matrix: OnceLock::new(),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn npts(&self) -> usize {
        self.npts
    }

    fn rule(&self) -> SlitRule {
        let (width, height) = (self.width, self.height);
        if width == 0.0 && height == 0.0 {
            SlitRule::Identity
        } else if width > 0.0 && (height == 0.0 || width / height > DOMINANCE_RATIO) {
            SlitRule::Width { width }
        } else if width == 0.0 || height / width > DOMINANCE_RATIO {
            SlitRule::Integrated {
                offsets: vec![0.0],
                height,
            }
        } else {
            let steps = self.npts as isize - 1;
            let step = width / steps as f64;
            SlitRule::Integrated {
                offsets: (-steps..=steps).map(|k| step * k as f64).collect(),
                height,
            }
        }
    }

    fn compute_matrix(&self) -> WeightMatrix {
        let rule = self.rule();
        let ranges = clamped_ranges(&self.binning);
        let nbins = ranges.len();

        // Weights are scaled by the first positive Q; `smear` renormalizes.
        let Some(q0) = ranges.iter().map(|r| r.center).find(|&q| q > 0.0) else {
            return WeightMatrix::zeros(nbins);
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..nbins;

        #[cfg(feature = "parallel")]
        let iterator = (0..nbins).into_par_iter();

        let rows: Vec<Vec<f64>> = iterator
            .map(|i| slit_row(i, &ranges, q0, &rule))
            .collect();

        debug!(
            nbins,
            width = self.width,
            height = self.height,
            "Computed slit smearing matrix."
        );
        WeightMatrix::from_rows(&rows)
    }
}

impl Smearer for SlitSmearer {
    fn binning(&self) -> &QBinning {
        &self.binning
    }

    fn matrix(&self) -> &WeightMatrix {
        self.matrix.get_or_init(|| self.compute_matrix())
    }

    fn has_matrix(&self) -> bool {
        self.matrix.get().is_some()
    }
}

fn slit_row(i: usize, ranges: &[BinRange], q0: f64, rule: &SlitRule) -> Vec<f64> {
    let mut row = vec![0.0; ranges.len()];
    let q = ranges[i].center;
    if q <= 0.0 {
        return row;
    }
    for (j, bin) in ranges.iter().enumerate() {
        if bin.center <= 0.0 {
            continue;
        }
        row[j] = match rule {
            SlitRule::Identity => {
                if i == j {
                    1.0
                } else {
                    0.0
                }
            }
            SlitRule::Width { width } => {
                if bin.center >= q - width && bin.center <= q + width {
                    (bin.high - bin.low) / q0
                } else {
                    0.0
                }
            }
            SlitRule::Integrated { offsets, height } => offsets
                .iter()
                .map(|&shift| height_weight(q + shift, *height, bin) / q0)
                .sum(),
        };
    }
    row
}

/// Contribution of `bin` to a slit of the given height centred on `q_shift`.
///
/// Along the height the observed Q is `sqrt(q_shift² + h²)`, so a bin
/// `[q_low, q_high]` covers the height interval between `sqrt(q_low² − q_shift²)`
/// and `sqrt(q_high² − q_shift²)`.
fn height_weight(q_shift: f64, height: f64, bin: &BinRange) -> f64 {
    let q_shift = q_shift.max(0.0);
    let q_top = (q_shift * q_shift + height * height).sqrt();
    if bin.center < q_shift || bin.center > q_top {
        return 0.0;
    }
    let upper = (bin.high * bin.high - q_shift * q_shift).abs().sqrt();
    if bin.low <= q_shift && bin.high > q_shift {
        upper
    } else {
        upper - (bin.low * bin.low - q_shift * q_shift).abs().sqrt()
    }
}
