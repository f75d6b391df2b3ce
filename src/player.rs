use std::time::{Duration, Instant};

use crate::engine::{Session, SessionInfo};
use crate::progress::Progress;
use crate::Sink;

/// Frame buffer size in bytes, reused across iterations. At 16-bit stereo
/// this is 4096 sample frames per chunk.
pub const CHUNK: usize = 16384;

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Playing { current: u32, total: u32 },
    /// Downstream buffer full; nothing was consumed.
    Waiting,
    Paused,
    Finished,
}

/// Drives one playback session: pulls bounded PCM chunks from the
/// synthesizer session and pushes them to the sink.
///
/// `advance` is a single iteration, so an embedding host can run the loop at
/// its own cadence; `run` is the blocking CLI driver around it. Pause, stop
/// and seek requests take effect at iteration boundaries, never mid-write,
/// and a seek is consumed exactly once.
pub struct Player<S> {
    session: Box<dyn Session>,
    sink: S,
    buffer: Vec<u8>,
    paused: bool,
    stopped: bool,
    finished: bool,
    seek_to: Option<u32>,
    progress: Option<Box<dyn Progress>>,
    rate: u32,
    started: Instant,
    /// sleep between playing iterations; lets a shared scheduler breathe
    pub yield_delay: Option<Duration>,
    /// sleep while the downstream buffer reports full
    pub poll_delay: Duration,
}

impl<S> Player<S>
where
    S: Sink,
{
    pub fn new(session: Box<dyn Session>, sink: S, rate: u32) -> Self {
        Self {
            session,
            sink,
            buffer: vec![0; CHUNK],
            paused: false,
            stopped: false,
            finished: false,
            seek_to: None,
            progress: None,
            rate,
            started: Instant::now(),
            yield_delay: None,
            poll_delay: Duration::from_millis(10),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.sink.pause();
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.sink.resume();
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Request a seek to an absolute sample offset. Applied once, on the
    /// next iteration the sink accepts data, even while paused.
    pub fn request_seek(&mut self, sample: u32) {
        self.seek_to = Some(sample);
    }

    /// Request a cooperative stop; honored at the next iteration boundary.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn info(&self) -> SessionInfo {
        self.session.info()
    }

    /// One loop iteration.
    pub fn advance(&mut self) -> anyhow::Result<Step> {
        if self.finished {
            return Ok(Step::Finished);
        }
        if self.stopped {
            return self.finish().map(|_| Step::Finished);
        }

        let info = self.session.info();
        let remaining = info.remaining();
        if remaining == 0 {
            return self.finish().map(|_| Step::Finished);
        }

        if !self.sink.ready() {
            return Ok(Step::Waiting);
        }

        if let Some(sample) = self.seek_to.take() {
            if let Err(e) = self.session.seek(sample) {
                return self.fail(e);
            }
        }

        if self.paused {
            return Ok(Step::Paused);
        }

        let want = CHUNK.min(remaining as usize * 4);
        let got = match self.session.render(&mut self.buffer[..want]) {
            Ok(got) => got,
            Err(e) => return self.fail(e),
        };
        if got == 0 {
            // engine-side stop; the chunk is empty and must not go out
            return self.finish().map(|_| Step::Finished);
        }

        if let Err(e) = self.sink.write(&self.buffer[..got]) {
            // the sink reported its own diagnostic; end the session
            return self.fail(e);
        }

        let info = self.session.info();
        if let Some(ref mut progress) = self.progress {
            progress.update(&info, self.rate, self.started.elapsed());
            if let Some(text) = self.session.lyric() {
                progress.lyric(&text);
            }
        }

        Ok(Step::Playing {
            current: info.current_sample,
            total: info.approx_total_samples,
        })
    }

    /// Drive `advance` to completion, sleeping at the suspension points.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match self.advance()? {
                Step::Finished => return Ok(()),
                Step::Waiting => std::thread::sleep(self.poll_delay),
                Step::Paused => std::thread::sleep(Duration::from_millis(5)),
                Step::Playing { .. } => {
                    if let Some(delay) = self.yield_delay {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }

    /// End the session on an error from the engine or the sink. The sink is
    /// still closed so file containers get their sizes patched.
    fn fail(&mut self, err: anyhow::Error) -> anyhow::Result<Step> {
        self.finished = true;
        let _ = self.sink.close();
        Err(err)
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.finished = true;
        // one silent chunk drains whatever latency the device still holds;
        // file sinks just grow by a moment of silence at the tail
        self.buffer.iter_mut().for_each(|v| *v = 0);
        let flushed = self.sink.write(&self.buffer);
        self.sink.close()?;
        flushed
    }

    /// Tear down and hand the sink back, for hosts that reuse it.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
