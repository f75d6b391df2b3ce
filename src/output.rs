use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Sink;

/// Where decoded PCM goes. Exactly one destination per session; the
/// variants are mutually exclusive by construction.
#[derive(Debug, Clone)]
pub enum Output {
    System,
    Null,
    Wav(PathBuf),
}

impl Output {
    pub fn from_str(spec: &str) -> anyhow::Result<Self> {
        if let Some(pos) = spec.find(':') {
            let (p1, p2) = spec.split_at(pos);
            Self::from_type_arg(p1, Some(&p2[1..]))
        } else {
            Self::from_type_arg(spec, None).or_else(|_| Self::from_type_arg("wav", Some(spec)))
        }
    }

    fn from_type_arg(typ: &str, arg: Option<&str>) -> anyhow::Result<Self> {
        Ok(match typ {
            "play" => Output::System,
            "system" => Output::System,
            "null" => Output::Null,
            "wav" => {
                let fname = arg.ok_or_else(|| anyhow::anyhow!("wav output expects a path"))?;
                Output::Wav(fname.into())
            }
            _ => anyhow::bail!("bad output value"),
        })
    }

    pub fn to_sink(&self, rate: u32) -> anyhow::Result<Box<dyn Sink>> {
        match *self {
            Output::System => Ok(Box::new(crate::sink::System::new(rate)?)),
            Output::Null => Ok(Box::new(crate::sink::Null)),
            Output::Wav(ref fname) => Ok(Box::new(crate::sink::Wav::create(fname, rate)?)),
        }
    }
}

/// Single-shot raw-MIDI dump for convert mode: the engine already produced
/// the whole SMF buffer, this just lands it on disk. Refuses to overwrite.
pub fn write_midi_dump<P>(path: P, data: &[u8]) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("unable to open {} for writing", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed writing midi to {}", path.display()))?;
    Ok(())
}
