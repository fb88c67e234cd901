//! Clock and timing utilities.
//!
//! Narration playback time is the single time base of a lecture view. This
//! module provides the pieces that sit around it:
//! - A wall-clock anchor for a compilation session
//! - Frame-interval gating for fixed-rate capture
//! - Conversions between seconds and milliseconds

use std::time::{Duration, Instant};

/// A wall clock anchored to the start of a compilation session.
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the session started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Convert seconds to whole milliseconds (negative input clamps to zero).
pub fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0) as u64
}

/// Convert milliseconds to seconds.
pub fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Frame-interval gate for fixed-rate capture.
///
/// Display refresh callbacks arrive faster (or more irregularly) than the
/// capture rate. Accepted ticks sit on a fixed grid anchored at the first
/// call, so coarse polling still yields exactly one tick per interval. A
/// caller that falls more than one interval behind is re-anchored at `now`.
#[derive(Debug)]
pub struct RateController {
    target_interval: Duration,
    last_tick: Option<Duration>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval: Duration::from_nanos(1_000_000_000 / target_hz.max(1) as u64),
            last_tick: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now: Duration) -> bool {
        match self.last_tick {
            None => {
                self.last_tick = Some(now);
                true
            }
            Some(last) if now >= last + self.target_interval => {
                let next = last + self.target_interval;
                if now >= next + self.target_interval {
                    self.last_tick = Some(now);
                } else {
                    self.last_tick = Some(next);
                }
                true
            }
            _ => false,
        }
    }

    /// Target interval between accepted ticks.
    pub fn interval(&self) -> Duration {
        self.target_interval
    }

    /// Forget the last accepted tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_clock_elapsed() {
        let clock = SessionClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_ms_conversions() {
        assert_eq!(secs_to_ms(1.5), 1500);
        assert_eq!(secs_to_ms(-2.0), 0);
        assert!((ms_to_secs(250) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_rate_controller_gates_to_thirty_fps() {
        let mut ctrl = RateController::new(30);
        assert!(ctrl.should_tick(Duration::ZERO));
        // 60 Hz refresh: every other callback is accepted
        assert!(!ctrl.should_tick(Duration::from_micros(16_667)));
        assert!(ctrl.should_tick(Duration::from_micros(33_334)));
        assert!(!ctrl.should_tick(Duration::from_micros(50_000)));
        assert!(ctrl.should_tick(Duration::from_micros(66_668)));
    }

    #[test]
    fn test_rate_controller_holds_grid_with_coarse_polling() {
        let mut ctrl = RateController::new(30);
        let mut ticks = 0;
        // Poll every 4 ms for ten seconds
        for ms in (0..10_000u64).step_by(4) {
            if ctrl.should_tick(Duration::from_millis(ms)) {
                ticks += 1;
            }
        }
        assert!((299..=301).contains(&ticks), "ticks = {ticks}");
    }

    #[test]
    fn test_rate_controller_reanchors_after_long_gap() {
        let mut ctrl = RateController::new(30);
        assert!(ctrl.should_tick(Duration::ZERO));
        // A half-second stall yields one tick, not a burst of catch-up ticks
        assert!(ctrl.should_tick(Duration::from_millis(500)));
        assert!(!ctrl.should_tick(Duration::from_millis(504)));
        assert!(!ctrl.should_tick(Duration::from_millis(520)));
        assert!(ctrl.should_tick(Duration::from_millis(534)));
    }

    #[test]
    fn test_rate_controller_reset() {
        let mut ctrl = RateController::new(30);
        assert!(ctrl.should_tick(Duration::from_millis(10)));
        assert!(!ctrl.should_tick(Duration::from_millis(11)));
        ctrl.reset();
        assert!(ctrl.should_tick(Duration::from_millis(12)));
    }
}
