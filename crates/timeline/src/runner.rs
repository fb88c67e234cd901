//! The tokio task that owns the composition state.
//!
//! The runner is the only writer of [`CompositionState`]. Commands arrive over
//! an mpsc channel and snapshots leave over a watch channel, so the
//! compositor and the recorder always read a consistent frame.

use std::sync::Arc;
use std::time::Duration;

use lectern_lecture_model::state::CompositionState;
use lectern_media_core::narration::NarrationSource;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::driver::{DriverMode, TimelineDriver};

/// Cadence of reveal updates while playing.
pub const TICK_INTERVAL: Duration = Duration::from_millis(8);

/// Control messages for the timeline task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineCommand {
    /// Narration started or resumed.
    Play { muted: bool },
    /// Narration paused; the partial reveal is kept.
    Pause,
    /// Rewind the reveal to the first paragraph.
    Replay,
    /// The narration duration became known.
    DurationKnown(f64),
}

/// Accumulates time spent playing.
#[derive(Debug, Default)]
struct ActiveTime {
    banked: Duration,
    running_since: Option<Instant>,
}

impl ActiveTime {
    fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.banked += since.elapsed();
        }
    }

    fn restart(&mut self) {
        self.banked = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    fn millis(&self) -> u64 {
        let running = self
            .running_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        (self.banked + running).as_millis() as u64
    }
}

/// Handle to a running timeline task. Dropping it stops the task.
pub struct TimelineHandle {
    commands: mpsc::UnboundedSender<TimelineCommand>,
    state: watch::Receiver<CompositionState>,
    done: watch::Receiver<bool>,
    mode: DriverMode,
    task: JoinHandle<()>,
}

impl TimelineHandle {
    pub fn send(&self, command: TimelineCommand) {
        if self.commands.send(command).is_err() {
            debug!(?command, "Timeline task already stopped");
        }
    }

    pub fn play(&self, muted: bool) {
        self.send(TimelineCommand::Play { muted });
    }

    pub fn pause(&self) {
        self.send(TimelineCommand::Pause);
    }

    pub fn replay(&self) {
        self.send(TimelineCommand::Replay);
    }

    pub fn set_duration(&self, secs: f64) {
        self.send(TimelineCommand::DurationKnown(secs));
    }

    /// A receiver of composition state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<CompositionState> {
        self.state.clone()
    }

    /// The latest composition state.
    pub fn snapshot(&self) -> CompositionState {
        self.state.borrow().clone()
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Resolve once the reveal has nothing left to show.
    pub async fn wait_done(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|done| *done).await;
    }
}

impl Drop for TimelineHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the timeline task for one lecture view.
pub fn spawn_timeline(
    driver: TimelineDriver,
    narration: Arc<dyn NarrationSource>,
) -> TimelineHandle {
    let initial = CompositionState {
        narration_duration_secs: narration.duration(),
        ..CompositionState::default()
    };
    let (state_tx, state_rx) = watch::channel(initial);
    let (done_tx, done_rx) = watch::channel(false);
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let mode = driver.mode();

    let task = tokio::spawn(run_timeline(driver, narration, commands_rx, state_tx, done_tx));

    TimelineHandle {
        commands: commands_tx,
        state: state_rx,
        done: done_rx,
        mode,
        task,
    }
}

async fn run_timeline(
    mut driver: TimelineDriver,
    narration: Arc<dyn NarrationSource>,
    mut commands: mpsc::UnboundedReceiver<TimelineCommand>,
    state: watch::Sender<CompositionState>,
    done: watch::Sender<bool>,
) {
    if let Some(secs) = narration.duration() {
        driver.set_narration_duration(Some(secs));
    }

    let mut active = ActiveTime::default();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("Timeline handle dropped, stopping");
                    return;
                };
                match command {
                    TimelineCommand::Play { muted } => {
                        active.start();
                        state.send_if_modified(|s| {
                            let changed = !s.is_playing || s.is_muted != muted;
                            s.is_playing = true;
                            s.is_muted = muted;
                            changed
                        });
                    }
                    TimelineCommand::Pause => {
                        active.stop();
                        state.send_if_modified(|s| std::mem::replace(&mut s.is_playing, false));
                    }
                    TimelineCommand::Replay => {
                        active.restart();
                        driver.reset();
                        state.send_modify(CompositionState::rewind);
                        done.send_replace(false);
                    }
                    TimelineCommand::DurationKnown(secs) => {
                        driver.set_narration_duration(Some(secs));
                        state.send_modify(|s| s.narration_duration_secs = Some(secs));
                    }
                }
            }
            _ = ticker.tick(), if active.is_running() => {
                let playback_secs = narration.current_time();
                let active_ms = active.millis();
                state.send_if_modified(|s| driver.tick(active_ms, playback_secs, s));
                if driver.is_done(playback_secs) {
                    done.send_if_modified(|d| !std::mem::replace(d, true));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_lecture_model::lecture::{LectureContent, SectionKey};
    use lectern_media_core::testing::ScriptedNarration;

    fn lecture() -> Arc<LectureContent> {
        Arc::new(LectureContent {
            topic: "t".to_string(),
            introduction: "Hello".to_string(),
            main_body: "World".to_string(),
            conclusion: String::new(),
            visualizations: Vec::new(),
            video_path: "v.mp4".to_string(),
            captions_url: None,
        })
    }

    fn spawn(narration: Arc<ScriptedNarration>) -> TimelineHandle {
        let driver = TimelineDriver::new(lecture(), None, narration.duration());
        spawn_timeline(driver, narration)
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_is_revealed_until_play() {
        let handle = spawn(Arc::new(ScriptedNarration::new(None)));
        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = handle.snapshot();
        assert!(state.revealed_text.is_empty());
        assert!(!state.is_playing);
        assert!(state.is_muted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_partial_reveal() {
        let handle = spawn(Arc::new(ScriptedNarration::new(None)));
        handle.play(false);
        // 18 ms per character: three characters by 60 ms
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.pause();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let paused = handle.snapshot();
        assert!(!paused.is_playing);
        assert!(!paused.is_muted);
        assert_eq!(paused.revealed_text, "Hel");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().revealed_text, "Hel");

        handle.play(false);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.snapshot().revealed_text, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_done_and_replays() {
        let handle = spawn(Arc::new(ScriptedNarration::new(Some(2.0))));
        handle.play(true);
        tokio::time::timeout(Duration::from_secs(30), handle.wait_done())
            .await
            .unwrap();

        let finished = handle.snapshot();
        assert_eq!(finished.current_section, SectionKey::MainBody);
        assert_eq!(finished.revealed_text, "World");

        handle.replay();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_done());
        assert_eq!(handle.snapshot().current_section, SectionKey::Introduction);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_is_published() {
        let handle = spawn(Arc::new(ScriptedNarration::new(None)));
        handle.set_duration(42.0);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(handle.snapshot().narration_duration_secs, Some(42.0));
    }
}
