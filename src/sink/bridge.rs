use rb::{RbInspector, RbProducer, RB};

use crate::player::CHUNK;

/// Hands PCM to an embedding host through a ring the host drains at its own
/// cadence (a web audio callback, typically). The loop checks `ready` before
/// rendering, so `write` never has to block; backpressure is the ring
/// running out of room for one full chunk.
pub struct Bridge {
    ring: rb::SpscRb<i16>,
    tx: rb::Producer<i16>,
    staging: Vec<i16>,
}

impl Bridge {
    /// `slots` is the queue depth in whole chunks. Returns the consumer half
    /// for the host; resetting the queue on seek is the host's business.
    pub fn new(slots: usize) -> (Self, rb::Consumer<i16>) {
        let ring = rb::SpscRb::new(slots * CHUNK / 2);
        let tx = ring.producer();
        let rx = ring.consumer();
        (
            Self {
                ring,
                tx,
                staging: Vec::new(),
            },
            rx,
        )
    }
}

impl super::Sink for Bridge {
    fn ready(&self) -> bool {
        self.ring.slots_free() >= CHUNK / 2
    }

    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        self.staging.clear();
        for sample in pcm.chunks_exact(2) {
            self.staging.push(i16::from_ne_bytes([sample[0], sample[1]]));
        }
        let mut buffer = &self.staging[..];
        while buffer.len() > 0 {
            match self.tx.write(buffer) {
                Ok(cnt) => buffer = &buffer[cnt..],
                // host stopped draining mid-chunk; drop the remainder
                // rather than stall the loop
                Err(_) => break,
            }
        }
        Ok(())
    }

    // pausing and resuming are host-side operations on the drain end
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Sink;
    use rb::RbConsumer;

    #[test]
    fn backpressure_reflects_ring_space() {
        let (mut bridge, rx) = Bridge::new(2);
        assert!(bridge.ready());

        bridge.write(&vec![0u8; CHUNK]).unwrap();
        assert!(bridge.ready());
        bridge.write(&vec![0u8; CHUNK]).unwrap();
        assert!(!bridge.ready());

        // draining one chunk frees one slot
        let mut out = vec![0i16; CHUNK / 2];
        assert_eq!(rx.read(&mut out).unwrap(), CHUNK / 2);
        assert!(bridge.ready());
    }

    #[test]
    fn samples_cross_intact() {
        let (mut bridge, rx) = Bridge::new(1);
        let samples = [-32768i16, -1, 0, 1, 32767, 12345];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
        bridge.write(&bytes).unwrap();

        let mut out = vec![0i16; samples.len()];
        assert_eq!(rx.read(&mut out).unwrap(), samples.len());
        assert_eq!(out, samples);
    }
}
