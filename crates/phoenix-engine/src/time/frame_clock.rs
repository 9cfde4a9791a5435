use std::time::{Duration, Instant};

/// Timing snapshot taken at the start of a frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp of this tick.
    pub now: Instant,

    /// Frames ticked before this one.
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots for one render loop.
///
/// Delta time is clamped so a stall (debugger, minimized window) does not
/// surface as a huge `dt`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,

    /// Start of the current reporting window (see `take_report`).
    report_start: Instant,
    report_frames: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
            report_start: now,
            report_frames: 0,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.report_frames = self.report_frames.saturating_add(1);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Returns the average frame rate once at least `window` has passed since
    /// the previous report, then starts a new window.
    pub fn take_report(&mut self, window: Duration) -> Option<f32> {
        let elapsed = self.last.saturating_duration_since(self.report_start);
        if elapsed < window || elapsed.is_zero() {
            return None;
        }

        let fps = self.report_frames as f32 / elapsed.as_secs_f32();
        self.report_start = self.last;
        self.report_frames = 0;
        Some(fps)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_from_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
    }

    #[test]
    fn dt_is_clamped_to_minimum() {
        let mut clock = FrameClock::with_clamps(Duration::from_secs(1), Duration::from_secs(2));
        assert!(clock.tick().dt >= 1.0);
    }

    #[test]
    fn dt_is_clamped_to_maximum() {
        let mut clock = FrameClock::with_clamps(Duration::ZERO, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.tick().dt <= 0.001 + f32::EPSILON);
    }

    #[test]
    fn report_waits_for_window() {
        let mut clock = FrameClock::new();
        clock.tick();
        assert!(clock.take_report(Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn report_resets_after_firing() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(2));
        clock.tick();
        assert!(clock.take_report(Duration::from_millis(1)).is_some());
        assert!(clock.take_report(Duration::from_millis(1)).is_none());
    }
}
