//! Fallback backend for platforms without a system mixer integration

use super::{AudioControl, ThreadScope};
use crate::error::AudioError;
use crate::normalize::{BooleanFlag, ProcessTarget, VolumeValue};

/// Backend that reports every endpoint as unavailable.
///
/// Lets the listener run (and answer `/ping`) off Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedAudio;

impl UnsupportedAudio {
    fn unavailable() -> AudioError {
        AudioError::DeviceUnavailable(format!(
            "system audio control is not supported on {}",
            std::env::consts::OS
        ))
    }
}

impl AudioControl for UnsupportedAudio {
    fn enter_thread(&self) -> Result<ThreadScope, AudioError> {
        Ok(ThreadScope::noop())
    }

    fn set_master_volume(&self, _volume: VolumeValue) -> Result<(), AudioError> {
        Err(Self::unavailable())
    }

    fn set_master_mute(&self, _muted: BooleanFlag) -> Result<(), AudioError> {
        Err(Self::unavailable())
    }

    fn set_mic_volume(&self, _volume: VolumeValue) -> Result<(), AudioError> {
        Err(Self::unavailable())
    }

    fn set_mic_mute(&self, _muted: BooleanFlag) -> Result<(), AudioError> {
        Err(Self::unavailable())
    }

    fn set_app_volume(
        &self,
        _target: &ProcessTarget,
        _volume: VolumeValue,
    ) -> Result<bool, AudioError> {
        Err(Self::unavailable())
    }
}
