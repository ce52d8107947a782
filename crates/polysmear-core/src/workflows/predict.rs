use super::selection::{DataSmearer, ResolutionData};
use crate::core::parameter::ParameterSet;
use crate::engine::averaging::driver::{PolydisperseAverager, ScatteringModel};
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// Predicts the measured intensity at every data point.
///
/// The model is averaged over the dispersions in `parameters`, evaluated on
/// the grid the selected smearer needs (extrapolated points included), then
/// smeared and restricted to the measured points. Without resolution
/// information the averaged intensity is returned as is.
#[instrument(skip_all, name = "predict_intensity_workflow", fields(points = data.len()))]
pub fn predict_intensity<M>(
    model: &M,
    parameters: &ParameterSet,
    data: &ResolutionData,
    config: &EngineConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<f64>, EngineError>
where
    M: ScatteringModel + Sync + ?Sized,
{
    info!("Starting intensity prediction.");

    let (averager, smearer) = reporter.phase("Preparation", || {
        let averager = PolydisperseAverager::new(parameters, &config.averaging)?;
        let smearer = if data.is_empty() {
            None
        } else {
            DataSmearer::select(data, config.smearing.extrapolate, &config.smearing)?
        };
        Ok::<_, EngineError>((averager, smearer))
    })?;

    let q = smearer
        .as_ref()
        .map_or(data.q.as_slice(), |smearer| smearer.q_values());

    reporter.report(Progress::Message(format!(
        "Averaging over {} parameter combination(s) at {} Q point(s)",
        averager.combinations(),
        q.len()
    )));

    let intensity = reporter.phase("Averaging", || {
        reporter.report(Progress::TaskStart {
            total_steps: q.len() as u64,
        });
        let intensity = averager.evaluate_many_with(model, q, || {
            reporter.report(Progress::TaskIncrement);
        });
        reporter.report(Progress::TaskFinish);
        Ok::<_, EngineError>(intensity)
    })?;

    info!(
        evaluated_points = q.len(),
        combinations = averager.combinations(),
        "Polydispersity averaging complete."
    );

    let Some(smearer) = smearer else {
        info!("No resolution information; returning unsmeared intensity.");
        return Ok(intensity);
    };

    let smeared = reporter.phase("Smearing", || smearer.smear(&intensity))?;
    info!(kind = ?smearer.kind(), "Resolution smearing complete.");
    Ok(smeared)
}
