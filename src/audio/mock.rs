//! Recording audio backend for tests.
//!
//! `MockAudio` performs no OS calls. Every gateway call is appended to an
//! in-memory log that tests inspect, and the live "sessions" are a fixed list
//! of executable names supplied up front.
//!
//! ```ignore
//! let audio = Arc::new(MockAudio::new().with_sessions(&["firefox.exe"]));
//! let dispatcher = Dispatcher::new(audio.clone());
//! dispatcher.dispatch(&InboundMessage::new("/app/volume/firefox", vec![72.into()]));
//! assert_eq!(audio.calls()[0], AudioCall::AppVolume { .. });
//! ```
//!
//! `failing` makes every call return the given error; `panicking` makes
//! every call panic, for exercising the dispatcher's failure boundary.
//! `with_broken_session` adds a session whose volume update always fails.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{apply_to_sessions, AudioControl, ThreadScope};
use crate::error::AudioError;
use crate::normalize::{BooleanFlag, ProcessTarget, VolumeValue};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    MasterVolume(f32),
    MasterMute(bool),
    MicVolume(f32),
    MicMute(bool),
    AppVolume {
        target: String,
        volume: f32,
        matched: bool,
    },
}

#[derive(Debug, Clone)]
struct MockSession {
    executable: String,
    broken: bool,
}

/// A mock backend that records calls instead of changing system audio
#[derive(Default)]
pub struct MockAudio {
    calls: Mutex<Vec<AudioCall>>,
    sessions: Vec<MockSession>,
    failure: Option<AudioError>,
    panics: bool,
    scopes_entered: Arc<AtomicUsize>,
    scopes_released: Arc<AtomicUsize>,
}

impl MockAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executable names of the sessions considered live
    pub fn with_sessions(mut self, executables: &[&str]) -> Self {
        self.sessions.extend(executables.iter().map(|s| MockSession {
            executable: s.to_string(),
            broken: false,
        }));
        self
    }

    /// Add a live session whose volume update fails
    pub fn with_broken_session(mut self, executable: &str) -> Self {
        self.sessions.push(MockSession {
            executable: executable.to_string(),
            broken: true,
        });
        self
    }

    /// Fail every call with `error`
    pub fn failing(mut self, error: AudioError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Panic on every call
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Calls recorded so far
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().clone()
    }

    /// Poll until at least `count` calls are recorded or `timeout` elapses
    pub fn wait_for_calls(&self, count: usize, timeout: Duration) -> Vec<AudioCall> {
        let deadline = Instant::now() + timeout;
        loop {
            let calls = self.calls();
            if calls.len() >= count || Instant::now() >= deadline {
                return calls;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Thread scopes entered and not yet released
    pub fn open_scopes(&self) -> usize {
        self.scopes_entered.load(Ordering::SeqCst) - self.scopes_released.load(Ordering::SeqCst)
    }

    /// Total thread scopes entered
    pub fn scopes_entered(&self) -> usize {
        self.scopes_entered.load(Ordering::SeqCst)
    }

    fn record(&self, call: AudioCall) -> Result<(), AudioError> {
        if self.panics {
            panic!("mock audio backend panicked on {:?}", call);
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl AudioControl for MockAudio {
    fn enter_thread(&self) -> Result<ThreadScope, AudioError> {
        self.scopes_entered.fetch_add(1, Ordering::SeqCst);
        let released = self.scopes_released.clone();
        Ok(ThreadScope::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn set_master_volume(&self, volume: VolumeValue) -> Result<(), AudioError> {
        self.record(AudioCall::MasterVolume(volume.fraction()))
    }

    fn set_master_mute(&self, muted: BooleanFlag) -> Result<(), AudioError> {
        self.record(AudioCall::MasterMute(muted.get()))
    }

    fn set_mic_volume(&self, volume: VolumeValue) -> Result<(), AudioError> {
        self.record(AudioCall::MicVolume(volume.fraction()))
    }

    fn set_mic_mute(&self, muted: BooleanFlag) -> Result<(), AudioError> {
        self.record(AudioCall::MicMute(muted.get()))
    }

    fn set_app_volume(
        &self,
        target: &ProcessTarget,
        volume: VolumeValue,
    ) -> Result<bool, AudioError> {
        let entries = self.sessions.iter().map(|session| {
            let broken = session.broken;
            let update = move || {
                if broken {
                    Err(AudioError::Backend("session update failed".into()))
                } else {
                    Ok(())
                }
            };
            Ok::<_, AudioError>((session.executable.clone(), update))
        });
        let matched = apply_to_sessions(entries, target);
        self.record(AudioCall::AppVolume {
            target: target.as_str().to_string(),
            volume: volume.fraction(),
            matched,
        })?;
        Ok(matched)
    }
}
