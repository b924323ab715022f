use core::fmt;
use std::time::{Duration, Instant};

/// Runs `f` and measures it with the monotonic clock.
pub fn timed<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

/// One measured run.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingRecord {
    kernel: &'static str,
    variant: &'static str,
    threads: usize,
    elapsed: Duration,
}

impl TimingRecord {
    pub fn new(kernel: &'static str, variant: &'static str, threads: usize, elapsed: Duration) -> Self {
        TimingRecord {
            kernel,
            variant,
            threads,
            elapsed,
        }
    }

    pub fn kernel(&self) -> &'static str {
        self.kernel
    }

    /// Strategy or granularity the run used.
    pub fn variant(&self) -> &'static str {
        self.variant
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn speedup_over(&self, baseline: &TimingRecord) -> Speedup {
        Speedup::between(baseline.elapsed, self.elapsed)
    }
}

/// `baseline / measured`, or nothing when the measured run was too short to
/// time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Speedup {
    Ratio(f64),
    Unavailable,
}

impl Speedup {
    pub fn between(baseline: Duration, measured: Duration) -> Self {
        if measured.is_zero() {
            return Speedup::Unavailable;
        }
        let ratio = baseline.as_secs_f64() / measured.as_secs_f64();
        if ratio.is_finite() {
            Speedup::Ratio(ratio)
        } else {
            Speedup::Unavailable
        }
    }

    pub fn ratio(self) -> Option<f64> {
        match self {
            Speedup::Ratio(r) => Some(r),
            Speedup::Unavailable => None,
        }
    }
}

impl fmt::Display for Speedup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speedup::Ratio(r) => write!(f, "{r:.6}"),
            Speedup::Unavailable => f.write_str("no timing available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_has_no_speedup() {
        let s = Speedup::between(Duration::from_millis(5), Duration::ZERO);
        assert_eq!(s, Speedup::Unavailable);
        assert_eq!(s.to_string(), "no timing available");
        assert_eq!(s.ratio(), None);
    }

    #[test]
    fn test_speedup_ratio() {
        let base = TimingRecord::new("mul", "sequential", 1, Duration::from_millis(400));
        let run = TimingRecord::new("mul", "outer-loop", 4, Duration::from_millis(100));
        assert_eq!(run.speedup_over(&base), Speedup::Ratio(4.0));
        assert_eq!(run.speedup_over(&base).to_string(), "4.000000");
        assert_eq!((run.kernel(), run.variant(), run.threads()), ("mul", "outer-loop", 4));
    }

    #[test]
    fn test_zero_baseline_is_zero_ratio() {
        let s = Speedup::between(Duration::ZERO, Duration::from_millis(1));
        assert_eq!(s, Speedup::Ratio(0.0));
    }

    #[test]
    fn test_timed_measures() {
        let (v, elapsed) = timed(|| {
            std::thread::sleep(Duration::from_millis(2));
            7
        });
        assert_eq!(v, 7);
        assert!(elapsed >= Duration::from_millis(2));
    }
}
