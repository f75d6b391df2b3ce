use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_ulong, c_void};
use std::path::Path;
use std::rc::Rc;

use crate::engine::{Engine, Session, SessionInfo};

#[repr(C)]
struct WMInfo {
    #[allow(dead_code)]
    copyright: *const c_char,
    current_sample: u32,
    approx_total_samples: u32,
    mixer_options: u16,
    total_midi_time: u32,
}

#[link(name = "WildMidi")]
extern "C" {
    fn WildMidi_Init(config: *const c_char, rate: u16, options: u16) -> c_int;
    fn WildMidi_MasterVolume(volume: u8) -> c_int;
    fn WildMidi_Open(path: *const c_char) -> *mut c_void;
    fn WildMidi_OpenBuffer(data: *const u8, size: c_ulong) -> *mut c_void;
    fn WildMidi_GetOutput(handle: *mut c_void, buffer: *mut c_char, size: c_ulong) -> c_int;
    fn WildMidi_GetInfo(handle: *mut c_void) -> *mut WMInfo;
    fn WildMidi_FastSeek(handle: *mut c_void, sample: *mut c_ulong) -> c_int;
    fn WildMidi_SetOption(handle: *mut c_void, options: u16, setting: u16) -> c_int;
    fn WildMidi_ConvertBufferToMidi(
        data: *const u8,
        size: u32,
        out: *mut *mut u8,
        out_size: *mut u32,
    ) -> c_int;
    fn WildMidi_Close(handle: *mut c_void) -> c_int;
    fn WildMidi_Shutdown() -> c_int;
    fn WildMidi_GetError() -> *mut c_char;
    fn WildMidi_ClearError();
}

fn last_error() -> String {
    unsafe {
        let msg = WildMidi_GetError();
        if msg.is_null() {
            "unknown synthesizer error".to_owned()
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}

const CONFIG_PATHS: [&str; 2] = ["/etc/wildmidi/wildmidi.cfg", "/etc/wildmidi.cfg"];

/// Handle on the initialized libWildMidi synthesizer. The library is a
/// process-wide singleton; keep a single instance. Open sessions hold the
/// shutdown guard, so the library outlives them even if the engine handle
/// is dropped first.
pub struct WildMidi {
    guard: Rc<Guard>,
}

struct Guard;

impl Drop for Guard {
    fn drop(&mut self) {
        unsafe {
            if WildMidi_Shutdown() != 0 {
                eprintln!("failure shutting down synthesizer: {}", last_error());
                WildMidi_ClearError();
            }
        }
    }
}

impl WildMidi {
    /// Initialize with an explicit patch configuration, or probe the usual
    /// locations when `config` is `None`.
    pub fn init(config: Option<&Path>, rate: u32, options: u16) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => path.to_owned(),
            None => CONFIG_PATHS
                .iter()
                .map(|p| Path::new(p))
                .find(|p| p.exists())
                .ok_or_else(|| anyhow::anyhow!("no wildmidi configuration file found"))?
                .to_owned(),
        };
        anyhow::ensure!(
            (11025..=65535).contains(&rate),
            "sample rate {} out of range 11025..=65535",
            rate
        );
        let cfg = CString::new(config.to_string_lossy().as_bytes())?;
        unsafe {
            if WildMidi_Init(cfg.as_ptr(), rate as u16, options) != 0 {
                anyhow::bail!("synthesizer init failed: {}", last_error());
            }
        }
        Ok(WildMidi { guard: Rc::new(Guard) })
    }
}

impl Engine for WildMidi {
    fn open_file(&self, path: &Path) -> anyhow::Result<Box<dyn Session>> {
        let cpath = CString::new(path.to_string_lossy().as_bytes())?;
        let handle = unsafe { WildMidi_Open(cpath.as_ptr()) };
        if handle.is_null() {
            anyhow::bail!("error opening {}: {}", path.display(), last_error());
        }
        Ok(Box::new(WildMidiSession { handle, _engine: self.guard.clone() }))
    }

    fn open_bytes(&self, data: &[u8]) -> anyhow::Result<Box<dyn Session>> {
        let handle = unsafe { WildMidi_OpenBuffer(data.as_ptr(), data.len() as c_ulong) };
        if handle.is_null() {
            anyhow::bail!("error opening midi buffer: {}", last_error());
        }
        Ok(Box::new(WildMidiSession { handle, _engine: self.guard.clone() }))
    }

    fn convert_to_midi(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut out: *mut u8 = std::ptr::null_mut();
        let mut out_size: u32 = 0;
        unsafe {
            if WildMidi_ConvertBufferToMidi(data.as_ptr(), data.len() as u32, &mut out, &mut out_size)
                != 0
                || out.is_null()
            {
                anyhow::bail!("midi conversion failed: {}", last_error());
            }
            let converted = std::slice::from_raw_parts(out, out_size as usize).to_vec();
            libc::free(out as *mut c_void);
            Ok(converted)
        }
    }

    fn master_volume(&self, volume: u8) -> anyhow::Result<()> {
        unsafe {
            if WildMidi_MasterVolume(volume) != 0 {
                anyhow::bail!("cannot set master volume: {}", last_error());
            }
        }
        Ok(())
    }
}

struct WildMidiSession {
    handle: *mut c_void,
    _engine: Rc<Guard>,
}

impl Drop for WildMidiSession {
    fn drop(&mut self) {
        unsafe {
            if WildMidi_Close(self.handle) != 0 {
                eprintln!("failed closing midi handle: {}", last_error());
                WildMidi_ClearError();
            }
        }
    }
}

impl Session for WildMidiSession {
    fn info(&self) -> SessionInfo {
        unsafe {
            let info = WildMidi_GetInfo(self.handle);
            if info.is_null() {
                return SessionInfo::default();
            }
            SessionInfo {
                current_sample: (*info).current_sample,
                approx_total_samples: (*info).approx_total_samples,
                mixer_options: (*info).mixer_options,
                total_midi_time: (*info).total_midi_time,
            }
        }
    }

    fn render(&mut self, buffer: &mut [u8]) -> anyhow::Result<usize> {
        let got = unsafe {
            WildMidi_GetOutput(
                self.handle,
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len() as c_ulong,
            )
        };
        // the library reports both end of stream and internal errors as a
        // non-positive count; either way the session is over
        Ok(got.max(0) as usize)
    }

    fn seek(&mut self, sample: u32) -> anyhow::Result<()> {
        let mut pos = sample as c_ulong;
        unsafe {
            if WildMidi_FastSeek(self.handle, &mut pos) != 0 {
                anyhow::bail!("seek failed: {}", last_error());
            }
        }
        Ok(())
    }

    fn set_options(&mut self, mask: u16, values: u16) -> anyhow::Result<()> {
        unsafe {
            if WildMidi_SetOption(self.handle, mask, values) != 0 {
                anyhow::bail!("cannot set mixer options: {}", last_error());
            }
        }
        Ok(())
    }
}
