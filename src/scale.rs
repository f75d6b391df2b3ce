use crate::engine::{Session, SessionInfo};

/// The self-test sequence as a format-0 SMF: eight quarter notes walking up
/// the C major scale. Fed to the real synthesizer when one is linked, and
/// used as convert/dump-mode fodder in tests.
pub static TEST_MIDI: [u8; 93] = [
    0x4D, 0x54, 0x68, 0x64, /* "MThd" */
    0x00, 0x00, 0x00, 0x06, /* header length: 6 */
    0x00, 0x00, /* format 0 */
    0x00, 0x01, /* one track */
    0x00, 0x60, /* 96 ticks per quarter */
    0x4D, 0x54, 0x72, 0x6B, /* "MTrk" */
    0x00, 0x00, 0x00, 0x47, /* track length: 71 */
    0x00, 0xC0, 0x00, /* program 0 (piano) on channel 0 */
    0x00, 0x90, 0x3C, 0x64, 0x60, 0x80, 0x3C, 0x00, /* C4 */
    0x00, 0x90, 0x3E, 0x64, 0x60, 0x80, 0x3E, 0x00, /* D4 */
    0x00, 0x90, 0x40, 0x64, 0x60, 0x80, 0x40, 0x00, /* E4 */
    0x00, 0x90, 0x41, 0x64, 0x60, 0x80, 0x41, 0x00, /* F4 */
    0x00, 0x90, 0x43, 0x64, 0x60, 0x80, 0x43, 0x00, /* G4 */
    0x00, 0x90, 0x45, 0x64, 0x60, 0x80, 0x45, 0x00, /* A4 */
    0x00, 0x90, 0x47, 0x64, 0x60, 0x80, 0x47, 0x00, /* B4 */
    0x00, 0x90, 0x48, 0x64, 0x60, 0x80, 0x48, 0x00, /* C5 */
    0x00, 0xFF, 0x2F, 0x00, /* end of track */
];

const FREQS: [f32; 8] = [261.63, 293.66, 329.63, 349.23, 392.00, 440.00, 493.88, 523.25];
const NAMES: [&str; 8] = ["C ", "D ", "E ", "F ", "G ", "A ", "B ", "C "];

/// Pure-Rust stand-in session rendering the same scale as sine tones, so
/// self-test mode works without the native synthesizer. Half a second per
/// note, 16-bit stereo at the configured rate.
pub struct ScaleSession {
    rate: u32,
    amplitude: f32,
    current: u32,
    total: u32,
    note_len: u32,
    mixer_options: u16,
    last_note: Option<u32>,
}

impl ScaleSession {
    pub fn new(rate: u32, volume: u8) -> Self {
        let note_len = rate / 2;
        Self {
            rate,
            amplitude: 0.5 * volume as f32 / 127.0,
            current: 0,
            total: note_len * FREQS.len() as u32,
            note_len,
            mixer_options: 0,
            last_note: None,
        }
    }

    fn sample(&self, at: u32) -> i16 {
        let note = (at / self.note_len) as usize;
        let offset = at % self.note_len;

        // short linear attack and release to avoid clicks at note edges
        let attack = self.rate / 100;
        let release = self.rate / 20;
        let mut env = 1.0;
        if offset < attack {
            env = offset as f32 / attack as f32;
        }
        let left = self.note_len - offset;
        if left < release {
            env = env.min(left as f32 / release as f32);
        }

        let omega = 2.0 * std::f32::consts::PI * FREQS[note];
        let v = (omega * offset as f32 / self.rate as f32).sin();
        (v * env * self.amplitude * i16::MAX as f32) as i16
    }
}

impl Session for ScaleSession {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            current_sample: self.current,
            approx_total_samples: self.total,
            mixer_options: self.mixer_options,
            total_midi_time: (self.total as u64 * 1000 / self.rate as u64) as u32,
        }
    }

    fn render(&mut self, buffer: &mut [u8]) -> anyhow::Result<usize> {
        let remaining = self.total - self.current;
        let frames = (buffer.len() / 4).min(remaining as usize);
        if frames == 0 {
            return Ok(0);
        }
        for i in 0..frames {
            let v = self.sample(self.current + i as u32).to_ne_bytes();
            let frame = &mut buffer[i * 4..i * 4 + 4];
            frame[0..2].copy_from_slice(&v);
            frame[2..4].copy_from_slice(&v);
        }
        self.current += frames as u32;
        Ok(frames * 4)
    }

    fn seek(&mut self, sample: u32) -> anyhow::Result<()> {
        self.current = sample.min(self.total);
        self.last_note = None;
        Ok(())
    }

    fn set_options(&mut self, mask: u16, values: u16) -> anyhow::Result<()> {
        self.mixer_options = (self.mixer_options & !mask) | (values & mask);
        Ok(())
    }

    fn lyric(&mut self) -> Option<String> {
        let note = self.current / self.note_len;
        if note >= FREQS.len() as u32 || self.last_note == Some(note) {
            return None;
        }
        self.last_note = Some(note);
        Some(NAMES[note as usize].to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smf_shape() {
        assert_eq!(&TEST_MIDI[0..4], b"MThd");
        assert_eq!(&TEST_MIDI[14..18], b"MTrk");
        let track = u32::from_be_bytes(TEST_MIDI[18..22].try_into().unwrap());
        assert_eq!(track as usize, TEST_MIDI.len() - 22);
        assert_eq!(&TEST_MIDI[TEST_MIDI.len() - 4..], &[0x00, 0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn renders_full_scale_then_ends() {
        let mut scale = ScaleSession::new(8000, 100);
        let total = scale.info().approx_total_samples;
        assert_eq!(total, 8000 / 2 * 8);

        let mut buffer = vec![0u8; 16384];
        let mut rendered = 0usize;
        loop {
            let got = scale.render(&mut buffer).unwrap();
            if got == 0 {
                break;
            }
            assert_eq!(got % 4, 0);
            rendered += got;
        }
        assert_eq!(rendered, total as usize * 4);
        assert_eq!(scale.info().remaining(), 0);
    }

    #[test]
    fn short_request_bounds_the_chunk() {
        let mut scale = ScaleSession::new(44100, 100);
        let mut buffer = vec![0u8; 16384];
        // 3 frames left before the end
        scale.seek(scale.info().approx_total_samples - 3).unwrap();
        assert_eq!(scale.render(&mut buffer[..12]).unwrap(), 12);
        assert_eq!(scale.render(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn lyric_once_per_note() {
        let mut scale = ScaleSession::new(1000, 100);
        let mut buffer = vec![0u8; 500 * 4];
        assert_eq!(scale.lyric().as_deref(), Some("C "));
        assert_eq!(scale.lyric(), None);
        scale.render(&mut buffer).unwrap();
        assert_eq!(scale.lyric().as_deref(), Some("D "));
        assert_eq!(scale.lyric(), None);
    }

    #[test]
    fn mixer_options_masked() {
        use crate::engine::mixer;
        let mut scale = ScaleSession::new(44100, 100);
        scale.set_options(mixer::REVERB | mixer::LOG_VOLUME, mixer::REVERB).unwrap();
        assert_eq!(scale.info().mixer_options, mixer::REVERB);
        scale.set_options(mixer::REVERB, 0).unwrap();
        assert_eq!(scale.info().mixer_options, 0);
    }
}
