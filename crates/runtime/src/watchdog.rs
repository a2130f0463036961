use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WatchdogConfig {
    /// Frames rendered below this rate count as slow.
    pub min_fps: f64,
    /// The watchdog trips once the slow streak exceeds this many frames.
    pub max_slow_frames: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            min_fps: 10.0,
            max_slow_frames: 10,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WatchdogVerdict {
    Healthy,
    Slow { consecutive: u32 },
    /// Terminal: every later observation also reports `Tripped`.
    Tripped,
}

/// Frame-rate circuit breaker for the render loop.
///
/// A fast frame resets the streak. Tripping is not retryable; the owner is
/// expected to shut the loop down.
#[derive(Debug, Clone)]
pub struct FrameWatchdog {
    config: WatchdogConfig,
    slow_streak: u32,
    tripped: bool,
}

impl FrameWatchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            slow_streak: 0,
            tripped: false,
        }
    }

    pub fn config(&self) -> WatchdogConfig {
        self.config
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn observe(&mut self, frame: &Frame) -> WatchdogVerdict {
        if self.tripped {
            return WatchdogVerdict::Tripped;
        }

        let Some(fps) = frame.fps() else {
            return WatchdogVerdict::Healthy;
        };

        if fps >= self.config.min_fps {
            self.slow_streak = 0;
            return WatchdogVerdict::Healthy;
        }

        self.slow_streak = self.slow_streak.saturating_add(1);
        if self.slow_streak > self.config.max_slow_frames {
            self.tripped = true;
            return WatchdogVerdict::Tripped;
        }
        WatchdogVerdict::Slow {
            consecutive: self.slow_streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameWatchdog, WatchdogConfig, WatchdogVerdict};
    use crate::frame::FrameClock;

    fn watchdog(max_slow_frames: u32) -> FrameWatchdog {
        FrameWatchdog::new(WatchdogConfig {
            min_fps: 10.0,
            max_slow_frames,
        })
    }

    #[test]
    fn first_frame_is_always_healthy() {
        let mut clock = FrameClock::new();
        let mut wd = watchdog(0);
        assert_eq!(wd.observe(&clock.tick(0.0)), WatchdogVerdict::Healthy);
    }

    #[test]
    fn trips_after_streak_exceeds_limit() {
        let mut clock = FrameClock::new();
        let mut wd = watchdog(2);
        let mut now = 0.0;
        wd.observe(&clock.tick(now));

        let mut verdicts = Vec::new();
        for _ in 0..3 {
            now += 250.0; // 4 fps
            verdicts.push(wd.observe(&clock.tick(now)));
        }
        assert_eq!(
            verdicts,
            vec![
                WatchdogVerdict::Slow { consecutive: 1 },
                WatchdogVerdict::Slow { consecutive: 2 },
                WatchdogVerdict::Tripped,
            ]
        );
        assert!(wd.is_tripped());

        // Terminal even if frames become fast again.
        assert_eq!(wd.observe(&clock.tick(now + 16.0)), WatchdogVerdict::Tripped);
    }

    #[test]
    fn fast_frame_resets_streak() {
        let mut clock = FrameClock::new();
        let mut wd = watchdog(2);
        wd.observe(&clock.tick(0.0));
        wd.observe(&clock.tick(250.0));
        wd.observe(&clock.tick(500.0));
        assert_eq!(wd.observe(&clock.tick(516.0)), WatchdogVerdict::Healthy);
        assert_eq!(
            wd.observe(&clock.tick(766.0)),
            WatchdogVerdict::Slow { consecutive: 1 }
        );
        assert!(!wd.is_tripped());
    }
}
