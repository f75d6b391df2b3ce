use anyhow::Context;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// RIFF/WAVE container around raw 16-bit stereo PCM.
///
/// The header goes out immediately with both size fields zeroed; `close`
/// seeks back and patches them. A process killed mid-stream therefore
/// leaves a structurally valid but size-inconsistent file.
pub struct Wav<F> {
    inner: Option<F>,
    data_bytes: u32,
    #[cfg(target_endian = "big")]
    swapped: Vec<u8>,
}

impl Wav<std::fs::File> {
    /// Create `path` exclusively and write the header. Refuses to overwrite
    /// an existing file.
    pub fn create<P>(path: P, rate: u32) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())
            .with_context(|| format!("unable to open {} for writing", path.as_ref().display()))?;
        Self::new(file, rate)
    }
}

impl<F> Wav<F>
where
    F: Write + Seek,
{
    pub fn new(mut inner: F, rate: u32) -> anyhow::Result<Self> {
        inner.write_all(&header(rate))?;
        Ok(Self {
            inner: Some(inner),
            data_bytes: 0,
            #[cfg(target_endian = "big")]
            swapped: Vec::new(),
        })
    }

    /// Patch the size fields and hand the writer back.
    pub fn finish(&mut self) -> anyhow::Result<Option<F>> {
        let mut inner = match self.inner.take() {
            Some(inner) => inner,
            None => return Ok(None),
        };
        inner.seek(SeekFrom::Start(40))?;
        inner.write_all(&self.data_bytes.to_le_bytes())?;
        inner.seek(SeekFrom::Start(4))?;
        inner.write_all(&(self.data_bytes + 36).to_le_bytes())?;
        inner.flush()?;
        Ok(Some(inner))
    }
}

/// Fixed 44-byte header. The riff size (offset 4) and data size (offset 40)
/// stay zero until close.
fn header(rate: u32) -> [u8; 44] {
    let mut hdr = [0u8; 44];
    hdr[0..4].copy_from_slice(b"RIFF");
    hdr[8..12].copy_from_slice(b"WAVE");
    hdr[12..16].copy_from_slice(b"fmt ");
    hdr[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt block length
    hdr[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    hdr[22..24].copy_from_slice(&2u16.to_le_bytes()); // stereo
    hdr[24..28].copy_from_slice(&rate.to_le_bytes());
    hdr[28..32].copy_from_slice(&(rate * 4).to_le_bytes()); // bytes per second
    hdr[32..34].copy_from_slice(&4u16.to_le_bytes()); // block alignment
    hdr[34..36].copy_from_slice(&16u16.to_le_bytes()); // bits per sample
    hdr[36..40].copy_from_slice(b"data");
    hdr
}

impl<F> super::Sink for Wav<F>
where
    F: Write + Seek,
{
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("wav output already closed"))?;

        // samples on disk are little-endian no matter the host
        #[cfg(target_endian = "big")]
        let pcm = {
            self.swapped.clear();
            self.swapped.extend(pcm.chunks_exact(2).flat_map(|s| [s[1], s[0]]));
            &self.swapped[..]
        };

        if let Err(e) = inner.write_all(pcm) {
            eprintln!("error writing wav data: {}", e);
            return Err(e.into());
        }
        self.data_bytes += pcm.len() as u32;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.finish().map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use crate::Sink;
    use std::io::Cursor;

    #[test]
    fn header_fields() {
        let mut wav = super::Wav::new(Cursor::new(Vec::new()), 44100).unwrap();
        let out = wav.finish().unwrap().unwrap().into_inner();
        assert_eq!(out.len(), 44);
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WAVE");
        assert_eq!(&out[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes(out[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(out[20..22].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(out[22..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(out[24..28].try_into().unwrap()), 44100);
        assert_eq!(u32::from_le_bytes(out[28..32].try_into().unwrap()), 176400);
        assert_eq!(u16::from_le_bytes(out[32..34].try_into().unwrap()), 4);
        assert_eq!(u16::from_le_bytes(out[34..36].try_into().unwrap()), 16);
        assert_eq!(&out[36..40], b"data");
    }

    #[test]
    fn sizes_patched_on_close() {
        let mut wav = super::Wav::new(Cursor::new(Vec::new()), 32072).unwrap();
        wav.write(&[0u8; 1000]).unwrap();
        wav.write(&[0u8; 24]).unwrap();
        let out = wav.finish().unwrap().unwrap().into_inner();
        assert_eq!(out.len(), 44 + 1024);
        let riff = u32::from_le_bytes(out[4..8].try_into().unwrap());
        let data = u32::from_le_bytes(out[40..44].try_into().unwrap());
        assert_eq!(riff, out.len() as u32 - 8);
        assert_eq!(data, out.len() as u32 - 44);
    }

    #[test]
    fn sizes_zero_before_close() {
        let mut wav = super::Wav::new(Cursor::new(Vec::new()), 44100).unwrap();
        wav.write(&[1u8; 512]).unwrap();
        // peek at the buffer without finishing
        let out = wav.inner.as_ref().unwrap().get_ref().clone();
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
        assert_eq!(&out[40..44], &[0, 0, 0, 0]);
    }

    #[test]
    fn close_twice_is_harmless() {
        let mut wav = super::Wav::new(Cursor::new(Vec::new()), 44100).unwrap();
        wav.write(&[0u8; 16]).unwrap();
        wav.close().unwrap();
        wav.close().unwrap();
        assert!(wav.write(&[0u8; 4]).is_err());
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn pcm_kept_verbatim_little_endian() {
        let mut wav = super::Wav::new(Cursor::new(Vec::new()), 44100).unwrap();
        let samples: Vec<u8> = [-32768i16, -1, 0, 1, 32767, 256]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        wav.write(&samples).unwrap();
        let out = wav.finish().unwrap().unwrap().into_inner();
        assert_eq!(&out[44..], &samples[..]);
    }
}
