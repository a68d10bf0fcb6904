use std::time::{Duration, Instant};

/// Frame rate over fixed windows of frame notifications
pub struct FpsMeter {
    report_every: u64,
    window_start: Option<Instant>,
    window_frames: u64,
}

impl FpsMeter {
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every: report_every.max(1),
            window_start: None,
            window_frames: 0,
        }
    }

    /// Record a frame now; returns the rate once per window
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.window_frames += 1;
        if self.window_frames < self.report_every {
            return None;
        }

        let elapsed = now.saturating_duration_since(start);
        let frames = self.window_frames;
        self.window_start = Some(now);
        self.window_frames = 0;

        if elapsed == Duration::ZERO {
            return None;
        }
        Some(frames as f64 / elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_window() {
        let mut meter = FpsMeter::new(3);
        let start = Instant::now();
        let at = |ms: u64| start + Duration::from_millis(ms);

        assert_eq!(meter.tick_at(at(0)), None);
        assert_eq!(meter.tick_at(at(100)), None);
        assert_eq!(meter.tick_at(at(200)), None);

        let fps = meter.tick_at(at(300)).unwrap();
        assert!((fps - 10.0).abs() < 1e-9);

        assert_eq!(meter.tick_at(at(350)), None);
    }

    #[test]
    fn test_zero_elapsed_is_not_reported() {
        let mut meter = FpsMeter::new(1);
        let now = Instant::now();
        assert_eq!(meter.tick_at(now), None);
        assert_eq!(meter.tick_at(now), None);
    }
}
