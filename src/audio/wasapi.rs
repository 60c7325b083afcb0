//! Windows Core Audio backend
//!
//! Master and microphone control go through `IAudioEndpointVolume` on the
//! default render/capture endpoint. Per-application volume walks the
//! sessions of the default render endpoint and matches each session's
//! owning executable against the requested process.

#![cfg(windows)]

use windows::core::{ComInterface, HRESULT, PWSTR};
use windows::Win32::Foundation::{CloseHandle, BOOL, FALSE, RPC_E_CHANGED_MODE};
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{
    eCapture, eConsole, eRender, EDataFlow, IAudioSessionControl2, IAudioSessionEnumerator,
    IAudioSessionManager2, IMMDevice, IMMDeviceEnumerator, ISimpleAudioVolume,
    MMDeviceEnumerator,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

use super::{apply_to_sessions, AudioControl, ThreadScope};
use crate::error::AudioError;
use crate::normalize::{BooleanFlag, ProcessTarget, VolumeValue};

/// HRESULT_FROM_WIN32(ERROR_NOT_FOUND), returned when no default endpoint exists
const E_NOTFOUND: HRESULT = HRESULT(0x8007_0490_u32 as i32);

/// Core Audio implementation of [`AudioControl`]
pub struct WasapiAudio;

impl WasapiAudio {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WasapiAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioControl for WasapiAudio {
    fn enter_thread(&self) -> Result<ThreadScope, AudioError> {
        // SAFETY: paired with CoUninitialize in the returned scope, on this thread
        match unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) } {
            Ok(()) => Ok(ThreadScope::new(|| unsafe { CoUninitialize() })),
            // Thread already has an apartment of another kind; it is usable
            // as-is and is not ours to release.
            Err(e) if e.code() == RPC_E_CHANGED_MODE => Ok(ThreadScope::noop()),
            Err(e) => Err(e.into()),
        }
    }

    fn set_master_volume(&self, volume: VolumeValue) -> Result<(), AudioError> {
        let endpoint = endpoint_volume(eRender)?;
        // SAFETY: endpoint is a live COM interface; null event context is allowed
        unsafe { endpoint.SetMasterVolumeLevelScalar(volume.fraction(), std::ptr::null()) }?;
        Ok(())
    }

    fn set_master_mute(&self, muted: BooleanFlag) -> Result<(), AudioError> {
        let endpoint = endpoint_volume(eRender)?;
        unsafe { endpoint.SetMute(BOOL::from(muted.get()), std::ptr::null()) }?;
        Ok(())
    }

    fn set_mic_volume(&self, volume: VolumeValue) -> Result<(), AudioError> {
        let endpoint = endpoint_volume(eCapture)?;
        unsafe { endpoint.SetMasterVolumeLevelScalar(volume.fraction(), std::ptr::null()) }?;
        Ok(())
    }

    fn set_mic_mute(&self, muted: BooleanFlag) -> Result<(), AudioError> {
        let endpoint = endpoint_volume(eCapture)?;
        unsafe { endpoint.SetMute(BOOL::from(muted.get()), std::ptr::null()) }?;
        Ok(())
    }

    fn set_app_volume(
        &self,
        target: &ProcessTarget,
        volume: VolumeValue,
    ) -> Result<bool, AudioError> {
        let device = default_endpoint(eRender)?;
        let manager: IAudioSessionManager2 = unsafe { device.Activate(CLSCTX_ALL, None) }?;
        let sessions = unsafe { manager.GetSessionEnumerator() }?;
        let count = unsafe { sessions.GetCount() }?;

        let entries = (0..count)
            .filter_map(|index| session_entry(&sessions, index, volume).transpose());
        Ok(apply_to_sessions(entries, target))
    }
}

fn default_endpoint(flow: EDataFlow) -> Result<IMMDevice, AudioError> {
    let enumerator: IMMDeviceEnumerator =
        unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }?;

    unsafe { enumerator.GetDefaultAudioEndpoint(flow, eConsole) }.map_err(|e| {
        if e.code() == E_NOTFOUND {
            let kind = if flow == eCapture { "capture" } else { "render" };
            AudioError::DeviceUnavailable(format!("no default {} device", kind))
        } else {
            e.into()
        }
    })
}

fn endpoint_volume(flow: EDataFlow) -> Result<IAudioEndpointVolume, AudioError> {
    let device = default_endpoint(flow)?;
    let endpoint = unsafe { device.Activate(CLSCTX_ALL, None) }?;
    Ok(endpoint)
}

/// Owning executable and a deferred volume update for one session.
/// `None` for the system sounds session (pid 0).
fn session_entry(
    sessions: &IAudioSessionEnumerator,
    index: i32,
    volume: VolumeValue,
) -> Result<Option<(String, impl FnOnce() -> Result<(), AudioError>)>, AudioError> {
    let control = unsafe { sessions.GetSession(index) }?;
    let control: IAudioSessionControl2 = control.cast()?;
    let pid = unsafe { control.GetProcessId() }?;

    if pid == 0 {
        return Ok(None);
    }

    let executable = process_executable(pid)?;
    let set_volume = move || {
        let simple: ISimpleAudioVolume = control.cast()?;
        unsafe { simple.SetMasterVolume(volume.fraction(), std::ptr::null()) }?;
        Ok(())
    };
    Ok(Some((executable, set_volume)))
}

/// File name of the executable backing `pid`
fn process_executable(pid: u32) -> Result<String, AudioError> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid) }?;

    let mut buffer = [0u16; 1024];
    let mut len = buffer.len() as u32;
    let queried = unsafe {
        QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut len,
        )
    };
    let _ = unsafe { CloseHandle(handle) };
    queried?;

    let path = String::from_utf16_lossy(&buffer[..len as usize]);
    let name = path
        .rsplit(|c| c == '\\' || c == '/')
        .next()
        .unwrap_or(path.as_str());
    Ok(name.to_string())
}
