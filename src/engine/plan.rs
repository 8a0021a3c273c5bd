// Configuration -> geometry -> audio -> capture plan

use thiserror::Error;

use super::audio::{AudioError, AudioRequest, AudioServer, DeviceChooser, resolve_audio};
use super::core::{CapturePlan, RecordingConfig};
use super::region::{RegionError, RegionResolver};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl PlanError {
    /// Operator backed out of the selection; not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Region(RegionError::SelectionCancelled))
    }
}

/// Resolve everything the encoder needs before anything is launched
pub fn build_plan(
    config: &RecordingConfig,
    resolver: &RegionResolver<'_>,
    audio_server: &dyn AudioServer,
    chooser: &dyn DeviceChooser,
) -> Result<CapturePlan, PlanError> {
    let rect = resolver.resolve(&config.mode)?;
    tracing::info!("Capture area: {} ({})", rect, config.mode.label());

    let audio = if config.wants_audio() {
        let request = AudioRequest {
            system: config.system_audio,
            microphone: config.mic_audio,
            mute: config.mute,
        };
        resolve_audio(request, audio_server, chooser)?
    } else {
        Vec::new()
    };

    Ok(CapturePlan {
        rect,
        display: config.display.clone(),
        quality: config.quality.clone(),
        audio,
        output_path: config.output_path.clone(),
        extra_args: config.extra_args.clone(),
    })
}
