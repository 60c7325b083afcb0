//! Audio control gateway
//!
//! [`AudioControl`] is the seam between OSC dispatch and the host audio
//! subsystem. Implementations hold no device or session handles between
//! calls: the default endpoint and the session list are re-resolved on every
//! request because both change underneath us at any time.
//!
//! The platform API needs per-thread initialization (a COM apartment on
//! Windows). Callers obtain a [`ThreadScope`] with
//! [`AudioControl::enter_thread`] before touching the gateway and drop it
//! afterwards; the guard releases the context on every exit path, including
//! unwinding.

pub mod mock;
pub mod unsupported;

#[cfg(windows)]
pub mod wasapi;

use std::sync::Arc;

use tracing::debug;

use crate::error::AudioError;
use crate::normalize::{BooleanFlag, ProcessTarget, VolumeValue};

pub use mock::{AudioCall, MockAudio};
pub use unsupported::UnsupportedAudio;

#[cfg(windows)]
pub use wasapi::WasapiAudio;

/// Operations the dispatcher can perform on system audio
pub trait AudioControl: Send + Sync {
    /// Prepare the calling thread for audio API calls
    fn enter_thread(&self) -> Result<ThreadScope, AudioError>;

    /// Set the default render endpoint's scalar volume
    fn set_master_volume(&self, volume: VolumeValue) -> Result<(), AudioError>;

    /// Mute or unmute the default render endpoint
    fn set_master_mute(&self, muted: BooleanFlag) -> Result<(), AudioError>;

    /// Set the default capture endpoint's scalar volume
    fn set_mic_volume(&self, volume: VolumeValue) -> Result<(), AudioError>;

    /// Mute or unmute the default capture endpoint
    fn set_mic_mute(&self, muted: BooleanFlag) -> Result<(), AudioError>;

    /// Set the volume of every live session owned by `target`.
    ///
    /// Returns `Ok(false)` when no session matched, which is the normal
    /// outcome for a process that is not currently playing audio.
    fn set_app_volume(&self, target: &ProcessTarget, volume: VolumeValue)
        -> Result<bool, AudioError>;
}

/// Per-thread platform context, released on drop
#[must_use = "the thread context is released as soon as the scope is dropped"]
pub struct ThreadScope {
    release: Option<Box<dyn FnOnce()>>,
}

impl ThreadScope {
    /// A scope with nothing to release
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// A scope that runs `release` when dropped
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for ThreadScope {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Apply a volume update to every session owned by `target`.
///
/// Each item is either a session's executable name paired with its deferred
/// update, or the error hit while looking the session up. Errors on one
/// session are logged and skipped; the walk always visits every entry.
/// Returns whether at least one matching session was updated.
pub fn apply_to_sessions<I, F>(sessions: I, target: &ProcessTarget) -> bool
where
    I: IntoIterator<Item = Result<(String, F), AudioError>>,
    F: FnOnce() -> Result<(), AudioError>,
{
    let mut matched = false;
    for (index, entry) in sessions.into_iter().enumerate() {
        let (executable, update) = match entry {
            Ok(session) => session,
            Err(e) => {
                debug!("Skipping audio session {}: {}", index, e);
                continue;
            }
        };
        if !target.matches(&executable) {
            continue;
        }
        match update() {
            Ok(()) => {
                debug!("Updated audio session {} ({})", index, executable);
                matched = true;
            }
            Err(e) => debug!("Failed to update audio session {} ({}): {}", index, executable, e),
        }
    }
    matched
}

/// The audio backend for the current platform
pub fn system_backend() -> Arc<dyn AudioControl> {
    #[cfg(windows)]
    {
        Arc::new(WasapiAudio::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedAudio)
    }
}
