use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Sample {
    bytes: u64,
    at: Instant,
}

/// Transfer speed over a sliding window of samples.
pub struct ThroughputMeter {
    samples: VecDeque<Sample>,
    max_samples: usize,
    window: Duration,
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 100)
    }
}

impl ThroughputMeter {
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: max_samples.max(2),
            window,
        }
    }

    /// Records `bytes` sent just now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(bytes, Instant::now());
    }

    fn record_at(&mut self, bytes: u64, at: Instant) {
        self.samples.push_back(Sample { bytes, at });

        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.front().is_some_and(|s| s.at < cutoff) {
                self.samples.pop_front();
            }
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Average bytes/second inside the window; 0.0 with fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.at.duration_since(first.at);
        if elapsed.is_zero() {
            return 0.0;
        }
        // The first sample only marks the start of the interval.
        let bytes: u64 = self.samples.iter().skip(1).map(|s| s.bytes).sum();
        bytes as f64 / elapsed.as_secs_f64()
    }

    /// Estimated time to send `remaining` more bytes.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        (speed > 0.0).then(|| Duration::from_secs_f64(remaining as f64 / speed))
    }
}
