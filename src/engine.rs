use std::path::Path;

/// Mixer option bits, matching the libWildMidi mask layout.
pub mod mixer {
    pub const LOG_VOLUME: u16 = 0x0001;
    pub const ENHANCED_RESAMPLING: u16 = 0x0002;
    pub const REVERB: u16 = 0x0004;
    pub const STRIP_SILENCE: u16 = 0x0080;
    pub const TEXT_AS_LYRIC: u16 = 0x0100;
    pub const ROUND_TEMPO: u16 = 0x2000;
    pub const WHOLE_TEMPO: u16 = 0x8000;
}

/// Snapshot of an open session, refreshed once per loop iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionInfo {
    pub current_sample: u32,
    pub approx_total_samples: u32,
    pub mixer_options: u16,
    /// total length in milliseconds, as estimated by the synthesizer
    pub total_midi_time: u32,
}

impl SessionInfo {
    pub fn remaining(&self) -> u32 {
        self.approx_total_samples.saturating_sub(self.current_sample)
    }
}

/// One open MIDI file inside the synthesizer.
///
/// `render` fills interleaved 16-bit stereo PCM in host byte order and returns
/// the number of bytes produced. `Ok(0)` means the synthesizer has stopped,
/// either at end of stream or after an internal error it already reported;
/// the caller must end the session and not retry.
pub trait Session {
    fn info(&self) -> SessionInfo;
    fn render(&mut self, buffer: &mut [u8]) -> anyhow::Result<usize>;
    fn seek(&mut self, sample: u32) -> anyhow::Result<()>;
    fn set_options(&mut self, mask: u16, values: u16) -> anyhow::Result<()>;

    /// Next pending lyric or caption fragment, if the file carries any.
    fn lyric(&mut self) -> Option<String> {
        None
    }
}

/// The synthesizer itself. Non-reentrant: one session at a time.
pub trait Engine {
    fn open_file(&self, path: &Path) -> anyhow::Result<Box<dyn Session>>;
    fn open_bytes(&self, data: &[u8]) -> anyhow::Result<Box<dyn Session>>;

    /// Convert an XMI/MUS-family buffer to plain SMF bytes. Used by dump
    /// mode only, never by the streaming loop.
    fn convert_to_midi(&self, data: &[u8]) -> anyhow::Result<Vec<u8>>;

    fn master_volume(&self, volume: u8) -> anyhow::Result<()>;
}
