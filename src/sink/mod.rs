mod bridge;
mod null;
mod system;
mod wav;

pub use bridge::Bridge;
pub use null::Null;
pub use system::System;
pub use wav::Wav;

/// A destination for decoded PCM. Chunks are interleaved 16-bit stereo
/// sample data; exactly one sink is active per playback session.
pub trait Sink {
    /// Accept one PCM chunk. An error here ends the session, not the process.
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()>;

    /// Backpressure: false while the downstream buffer cannot take a full
    /// chunk. Sinks that accept writes unconditionally leave the default.
    fn ready(&self) -> bool {
        true
    }

    fn pause(&mut self) {}
    fn resume(&mut self) {}

    /// Finalize the destination. Must be safe to call more than once.
    fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Sink for Box<dyn Sink> {
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        (**self).write(pcm)
    }

    fn ready(&self) -> bool {
        (**self).ready()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn close(&mut self) -> anyhow::Result<()> {
        (**self).close()
    }
}
