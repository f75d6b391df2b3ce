use std::io::Write;
use std::time::Duration;

use crate::engine::SessionInfo;

/// Observer for per-iteration playback state and lyric fragments.
pub trait Progress {
    fn update(&mut self, info: &SessionInfo, rate: u32, elapsed: Duration);

    fn lyric(&mut self, _text: &str) {}
}

/// Carriage-return status line on stderr, like the original player's.
pub struct Console {
    last_second: u32,
}

impl Console {
    pub fn new(info: &SessionInfo, rate: u32) -> Self {
        let (mins, secs) = clock(info.approx_total_samples, rate);
        println!("[Duration of midi approx {:2}m {:2}s total]", mins, secs);
        Self { last_second: u32::MAX }
    }
}

impl Progress for Console {
    fn update(&mut self, info: &SessionInfo, rate: u32, _elapsed: Duration) {
        // once per playback second is plenty for a terminal
        let second = info.current_sample / rate.max(1);
        if second == self.last_second {
            return;
        }
        self.last_second = second;

        let (mins, secs) = clock(info.current_sample, rate);
        let percent = if info.approx_total_samples > 0 {
            (info.current_sample as u64 * 100 / info.approx_total_samples as u64) as u32
        } else {
            0
        };
        eprint!("\r[{:2}m {:2}s processed] [{:3}%] ", mins, secs, percent);
        let _ = std::io::stderr().flush();
    }

    fn lyric(&mut self, text: &str) {
        eprint!("{}", text);
        let _ = std::io::stderr().flush();
    }
}

/// Discards everything; for hosts that render their own UI.
pub struct Silent;

impl Progress for Silent {
    fn update(&mut self, _info: &SessionInfo, _rate: u32, _elapsed: Duration) {}
}

fn clock(samples: u32, rate: u32) -> (u32, u32) {
    let rate = rate.max(1);
    (samples / (rate * 60), (samples % (rate * 60)) / rate)
}

#[cfg(test)]
mod test {
    #[test]
    fn clock_splits_minutes() {
        assert_eq!(super::clock(0, 44100), (0, 0));
        assert_eq!(super::clock(44100 * 59, 44100), (0, 59));
        assert_eq!(super::clock(44100 * 61, 44100), (1, 1));
    }
}
