use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{OutputCallbackInfo, Sample, SampleFormat, SampleRate, Stream, StreamConfig};
use rb::{RbConsumer, RbInspector, RbProducer, RB};

use crate::player::CHUNK;

// chunks queued before playback starts, to cover a cold-start underrun
const PREQUEUE: usize = 4;

/// Default output device, fed through a ring buffer to the cpal callback.
pub struct System {
    stream: Option<Stream>,
    started: bool,
    queued: usize,
    ring: rb::SpscRb<f32>,
    tx: rb::Producer<f32>,
    staging: Vec<f32>,
}

struct AudioThread {
    rx: rb::Consumer<f32>,
    buffer: Vec<f32>,
}

impl Drop for System {
    fn drop(&mut self) {
        // dropping the cpal stream hangs forever on some hosts; leaking it
        // at process end is the lesser evil
        std::mem::forget(self.stream.take());
    }
}

impl System {
    pub fn new(rate: u32) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("could not find default output device"))?;
        let supported = device.supported_output_configs()?;
        let config = supported
            .filter(|c| c.channels() == 2)
            .find(|c| c.min_sample_rate().0 <= rate && rate <= c.max_sample_rate().0)
            .ok_or_else(|| anyhow::anyhow!("output device does not support {} Hz stereo", rate))?
            .with_sample_rate(SampleRate(rate));
        let err_fn = |err| eprintln!("audio stream error: {}", err);
        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();

        let ring = rb::SpscRb::new(PREQUEUE * CHUNK / 2);
        let tx = ring.producer();
        let rx = ring.consumer();
        let mut thread = AudioThread { rx, buffer: vec![] };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |d, cb| thread.callback::<f32>(d, cb),
                err_fn,
            ),
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |d, cb| thread.callback::<i16>(d, cb),
                err_fn,
            ),
            SampleFormat::U16 => device.build_output_stream(
                &config,
                move |d, cb| thread.callback::<u16>(d, cb),
                err_fn,
            ),
        }?;
        Ok(Self {
            stream: Some(stream),
            started: false,
            queued: 0,
            ring,
            tx,
            staging: Vec::new(),
        })
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if !self.started {
            if let Some(ref stream) = self.stream {
                stream.play()?;
            }
            self.started = true;
        }
        Ok(())
    }
}

impl AudioThread {
    pub fn callback<T>(&mut self, mut data: &mut [T], _: &OutputCallbackInfo)
    where
        T: Sample,
    {
        if self.buffer.len() < data.len() {
            self.buffer.resize(data.len(), 0.0);
        }
        while data.len() > 0 {
            if let Some(cnt) = self.rx.read_blocking(&mut self.buffer[..data.len()]) {
                for (i, sample) in self.buffer[..cnt].iter().enumerate() {
                    data[i] = Sample::from(sample);
                }
                data = &mut data[cnt..];
            } else {
                break;
            }
        }
    }
}

impl super::Sink for System {
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        self.staging.clear();
        for sample in pcm.chunks_exact(2) {
            let v = i16::from_ne_bytes([sample[0], sample[1]]);
            self.staging.push(Sample::from(&v));
        }

        // blocks until the callback has freed enough ring space, so the
        // hardware queue can never be overrun
        let mut buffer = &self.staging[..];
        while buffer.len() > 0 {
            if let Some(cnt) = self.tx.write_blocking(buffer) {
                buffer = &buffer[cnt..];
            } else {
                break;
            }
        }

        if !self.started {
            self.queued += 1;
            if self.queued >= PREQUEUE {
                self.start()?;
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(ref stream) = self.stream {
            let _ = stream.pause();
        }
    }

    fn resume(&mut self) {
        if self.started {
            if let Some(ref stream) = self.stream {
                let _ = stream.play();
            }
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        // a short session may end before the prequeue fills
        self.start()?;
        while self.ring.count() > 0 {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        Ok(())
    }
}
