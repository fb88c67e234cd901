//! Narration playback clock.

use tokio::time::Instant;

/// Media position that advances in real time while playing.
///
/// Built on `tokio::time::Instant` so paused-time tests drive it without
/// sleeping.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    /// Position accumulated before the current run.
    offset_secs: f64,

    /// When the current run started, if playing.
    running_since: Option<Instant>,

    /// Media duration, once known.
    duration_secs: Option<f64>,
}

impl PlaybackClock {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs,
            ..Self::default()
        }
    }

    pub fn set_duration(&mut self, duration_secs: Option<f64>) {
        self.duration_secs = duration_secs.filter(|d| d.is_finite() && *d > 0.0);
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Start or continue advancing. Restarts from zero once ended.
    pub fn play(&mut self) {
        if self.has_ended() {
            self.offset_secs = 0.0;
        }
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Freeze the position.
    pub fn pause(&mut self) {
        self.offset_secs = self.position();
        self.running_since = None;
    }

    /// Jump to `secs`, keeping the play/pause state.
    pub fn seek(&mut self, secs: f64) {
        self.offset_secs = self.clamp(secs);
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Current position in seconds, clamped to `[0, duration]`.
    pub fn position(&self) -> f64 {
        let running = self
            .running_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.clamp(self.offset_secs + running)
    }

    /// Whether the clock is advancing (it may still have reached the end).
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn has_ended(&self) -> bool {
        self.duration_secs
            .is_some_and(|duration| self.position() >= duration)
    }

    fn clamp(&self, secs: f64) -> f64 {
        let secs = secs.max(0.0);
        match self.duration_secs {
            Some(duration) => secs.min(duration),
            None => secs,
        }
    }
}
