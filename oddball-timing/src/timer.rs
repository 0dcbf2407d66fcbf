use std::time::{Duration, Instant};

/// Trait for monotonic session clocks
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    /// Resets the zero point; used when the first scanner pulse arrives.
    fn restart(&mut self);
    /// Seconds since the zero point.
    fn seconds(&self) -> f64;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    pub fn from_samples(frame_times: &[Duration]) -> Self {
        if frame_times.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn restart(&mut self) {
        self.start = Instant::now();
    }
    fn seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // clock_nanosleep returns the error number directly; resume on EINTR.
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != EINTR {
                break;
            }
            req = rem;
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_empty_buffer_are_zero() {
        let timer = HighPrecisionTimer::new();
        assert_eq!(timer.calibration_stats(), CalibrationStats::default());
    }

    #[test]
    fn stats_track_min_max_and_rate() {
        let mut timer = HighPrecisionTimer::new();
        timer.record_frame(Duration::from_millis(10));
        timer.record_frame(Duration::from_millis(20));
        let stats = timer.calibration_stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.min_frame_time_ns, 10_000_000.0);
        assert_eq!(stats.max_frame_time_ns, 20_000_000.0);
        assert!((stats.effective_fps - 1e9 / 15_000_000.0).abs() < 1e-9);
        assert!((stats.jitter_ns - 5_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 3;
        for ms in 1..=5 {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(timer.frame_times.len(), 3);
        assert_eq!(timer.frame_times[0], Duration::from_millis(3));
    }

    #[test]
    fn restart_moves_zero_point_and_sleep_waits() {
        let mut timer = HighPrecisionTimer::new();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.seconds() >= 0.005);
        timer.restart();
        assert!(timer.seconds() < 0.005);
        let t = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.elapsed(t) >= Duration::from_millis(2));
    }
}
