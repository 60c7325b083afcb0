//! Route handlers
//!
//! Each handler normalizes its arguments first and only then touches the
//! audio gateway, so a malformed message never causes a partial effect.

use std::fmt;

use crate::audio::AudioControl;
use crate::error::{ArgumentError, Result};
use crate::normalize::{
    normalize_boolean, normalize_process_target, normalize_volume, BooleanFlag, ProcessTarget,
    VolumeValue,
};
use crate::osc::OscValue;

/// Signature shared by every route handler
pub type Handler = fn(&Request<'_>, &dyn AudioControl) -> Result<Effect>;

/// A matched message as seen by its handler
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub address: &'a str,
    /// Segment bound by a wildcard route
    pub captured: Option<&'a str>,
    pub args: &'a [OscValue],
}

impl<'a> Request<'a> {
    pub fn arg(&self, index: usize) -> std::result::Result<&'a OscValue, ArgumentError> {
        self.args.get(index).ok_or(ArgumentError::Missing { index })
    }
}

/// What a handled message did
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Pong,
    MasterVolume(VolumeValue),
    MasterMute(BooleanFlag),
    MicVolume(VolumeValue),
    MicMute(BooleanFlag),
    AppVolume {
        target: ProcessTarget,
        volume: VolumeValue,
        matched: bool,
    },
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Pong => write!(f, "pong"),
            Effect::MasterVolume(v) => write!(f, "master volume set to {}%", v.percent()),
            Effect::MasterMute(m) => write!(f, "master mute {}", m),
            Effect::MicVolume(v) => write!(f, "microphone volume set to {}%", v.percent()),
            Effect::MicMute(m) => write!(f, "microphone mute {}", m),
            Effect::AppVolume {
                target,
                volume,
                matched: true,
            } => write!(f, "volume of '{}' set to {}%", target, volume.percent()),
            Effect::AppVolume { target, .. } => {
                write!(f, "no active audio session for '{}'", target)
            }
        }
    }
}

pub fn ping(_request: &Request<'_>, _audio: &dyn AudioControl) -> Result<Effect> {
    Ok(Effect::Pong)
}

pub fn master_volume(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    let volume = normalize_volume(request.arg(0)?)?;
    audio.set_master_volume(volume)?;
    Ok(Effect::MasterVolume(volume))
}

pub fn master_mute(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    let muted = normalize_boolean(request.arg(0)?);
    audio.set_master_mute(muted)?;
    Ok(Effect::MasterMute(muted))
}

pub fn mic_volume(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    let volume = normalize_volume(request.arg(0)?)?;
    audio.set_mic_volume(volume)?;
    Ok(Effect::MicVolume(volume))
}

pub fn mic_mute(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    let muted = normalize_boolean(request.arg(0)?);
    audio.set_mic_mute(muted)?;
    Ok(Effect::MicMute(muted))
}

/// `/app/volume <process> <volume>`
pub fn app_volume(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    if request.args.len() < 2 {
        return Err(ArgumentError::InvalidUsage(
            "expected /app/volume <process> <volume> or /app/volume/<process> <volume>".into(),
        )
        .into());
    }
    let name = match request.arg(0)? {
        OscValue::Str(name) => name.as_str(),
        other => {
            return Err(ArgumentError::InvalidUsage(format!(
                "process name must be a string, got {}",
                other.type_name()
            ))
            .into())
        }
    };
    let target = normalize_process_target(name)?;
    let volume = normalize_volume(request.arg(1)?)?;
    set_app_volume(audio, target, volume)
}

/// `/app/volume/<process> <volume>`
pub fn app_volume_named(request: &Request<'_>, audio: &dyn AudioControl) -> Result<Effect> {
    let name = request
        .captured
        .ok_or_else(|| ArgumentError::InvalidUsage("missing process name in address".into()))?;
    let target = normalize_process_target(name)?;
    let volume = normalize_volume(request.arg(0)?)?;
    set_app_volume(audio, target, volume)
}

fn set_app_volume(
    audio: &dyn AudioControl,
    target: ProcessTarget,
    volume: VolumeValue,
) -> Result<Effect> {
    let matched = audio.set_app_volume(&target, volume)?;
    Ok(Effect::AppVolume {
        target,
        volume,
        matched,
    })
}
