use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Snapshot of an upload's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    /// Bytes acknowledged by the server.
    pub offset: u64,
    /// Total file size in bytes.
    pub size: u64,
    /// Recent throughput in bytes per second.
    pub bytes_per_second: f64,
}

impl UploadProgress {
    /// Fraction of the file acknowledged, in `0.0..=1.0`.
    ///
    /// An empty file counts as fully uploaded.
    pub fn fraction(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        self.offset as f64 / self.size as f64
    }

    pub fn is_complete(&self) -> bool {
        self.offset == self.size
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
pub struct SpeedCalculator {
    samples: VecDeque<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window_size`: time window for speed calculation (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: max_samples.unwrap_or(100).max(2),
            window_size: window_size.unwrap_or(Duration::from_secs(5)),
        }
    }

    /// Records `bytes` acknowledged at the current instant.
    pub fn add_sample(&mut self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&mut self, bytes: u64, timestamp: Instant) {
        self.samples.push_back(SpeedSample { bytes, timestamp });

        while let Some(oldest) = self.samples.front() {
            let expired = timestamp.duration_since(oldest.timestamp) > self.window_size;
            if expired || self.samples.len() > self.max_samples {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Average speed in bytes/second within the window.
    ///
    /// The first sample only marks the start of the window. Returns 0.0 with
    /// fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if self.samples.len() < 2 || elapsed.is_zero() {
            return 0.0;
        }

        let total: u64 = self.samples.iter().skip(1).map(|s| s.bytes).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    /// Clears all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_fraction() {
        let p = UploadProgress {
            offset: 25,
            size: 100,
            bytes_per_second: 0.0,
        };
        assert!((p.fraction() - 0.25).abs() < f64::EPSILON);
        assert!(!p.is_complete());

        let empty = UploadProgress {
            offset: 0,
            size: 0,
            bytes_per_second: 0.0,
        };
        assert!((empty.fraction() - 1.0).abs() < f64::EPSILON);
        assert!(empty.is_complete());
    }

    #[test]
    fn speed_needs_two_samples() {
        let mut calc = SpeedCalculator::default();
        assert_eq!(calc.bytes_per_second(), 0.0);
        calc.add_sample(1000);
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn speed_over_window() {
        let mut calc = SpeedCalculator::default();
        let start = Instant::now();
        calc.add_sample_at(0, start);
        calc.add_sample_at(500, start + Duration::from_millis(500));
        calc.add_sample_at(500, start + Duration::from_secs(1));

        assert!((calc.bytes_per_second() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn old_samples_fall_out_of_window() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(1)), None);
        let start = Instant::now();
        calc.add_sample_at(1_000_000, start);
        calc.add_sample_at(100, start + Duration::from_secs(10));
        calc.add_sample_at(100, start + Duration::from_millis(10_500));

        // Only the last two samples remain: 100 bytes over 0.5 s.
        assert!((calc.bytes_per_second() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn sample_count_is_capped() {
        let mut calc = SpeedCalculator::new(None, Some(3));
        let start = Instant::now();
        for i in 0..10u64 {
            calc.add_sample_at(10, start + Duration::from_millis(i * 100));
        }
        assert_eq!(calc.samples.len(), 3);

        calc.reset();
        assert_eq!(calc.bytes_per_second(), 0.0);
    }
}
