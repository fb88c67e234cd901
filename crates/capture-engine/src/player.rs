//! One lecture view: narration transport, the timeline task, the compositor,
//! and the recorder, wired together.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lectern_lecture_model::caption::CaptionTrack;
use lectern_lecture_model::lecture::LectureContent;
use lectern_lecture_model::session::{RecordingSession, RecordingStatus};
use lectern_lecture_model::state::CompositionState;
use lectern_media_core::narration::{NarrationSource, PlaybackEvent};
use lectern_render_engine::{Compositor, VisualAssetBinder};
use lectern_timeline::{spawn_timeline, DriverMode, TimelineDriver, TimelineHandle};
use tiny_skia::Pixmap;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::encoder::EncoderFactory;
use crate::recorder::{CompileOptions, RecorderController, RecorderParts, RecorderSettings};
use crate::transport::play_with_fallback;

/// Playing within this distance of the end starts over.
pub const REPLAY_THRESHOLD_SECS: f64 = 0.05;

/// Stall events in a row without progress before a warning is logged.
const PERSISTENT_STALL_EVENTS: u32 = 5;

/// Progress that counts as recovery from a stall.
const STALL_PROGRESS_SECS: f64 = 0.5;

/// What a lecture view is built from.
pub struct PlayerInputs {
    pub lecture: Arc<LectureContent>,
    pub narration: Arc<dyn NarrationSource>,
    /// Caption track for caption-driven reveal; `None` reveals on a
    /// simulated pace.
    pub captions: Option<CaptionTrack>,
    pub images: Arc<VisualAssetBinder>,
    pub compositor: Compositor,
}

/// Result of a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadAction {
    /// The compiled file is ready.
    Ready { path: PathBuf, filename: String },
    /// A compilation was started for the download.
    Started,
    /// A compilation is already running.
    InProgress,
}

/// A running lecture view. Dropping it stops every task it owns.
pub struct PlayerSession {
    lecture: Arc<LectureContent>,
    narration: Arc<dyn NarrationSource>,
    timeline: Arc<TimelineHandle>,
    images: Arc<VisualAssetBinder>,
    compositor: Arc<Mutex<Compositor>>,
    recorder: RecorderController,
    watchers: Vec<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlayerSession {
    /// Spawn the timeline and transport watchers for a lecture.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        inputs: PlayerInputs,
        encoders: Arc<dyn EncoderFactory>,
        settings: RecorderSettings,
    ) -> Self {
        let PlayerInputs {
            lecture,
            narration,
            captions,
            images,
            compositor,
        } = inputs;

        let driver = TimelineDriver::new(lecture.clone(), captions, narration.duration());
        let mode = driver.mode();
        let timeline = Arc::new(spawn_timeline(driver, narration.clone()));
        let compositor = Arc::new(Mutex::new(compositor));

        let recorder = RecorderController::new(RecorderParts {
            lecture: lecture.clone(),
            narration: narration.clone(),
            timeline: timeline.clone(),
            images: images.clone(),
            compositor: compositor.clone(),
            encoders,
            settings,
        });

        let watchers = vec![
            tokio::spawn(watch_duration(narration.clone(), timeline.clone())),
            tokio::spawn(watch_transport(
                narration.clone(),
                narration.subscribe(),
                timeline.clone(),
            )),
        ];

        info!(
            topic = %lecture.topic,
            narration = narration.label(),
            %mode,
            images = images.len(),
            "Lecture view opened"
        );

        Self {
            lecture,
            narration,
            timeline,
            images,
            compositor,
            recorder,
            watchers,
        }
    }

    /// Start or resume playback.
    ///
    /// Starts over when the narration is at its end, and kicks off a
    /// background compilation on the first play. Returns `false` when the
    /// narration would not play.
    pub fn play(&self) -> bool {
        let near_end = self
            .narration
            .duration()
            .is_some_and(|d| self.narration.current_time() >= d - REPLAY_THRESHOLD_SECS);
        if near_end {
            debug!("Narration at its end, starting over");
            self.narration.seek(0.0);
            self.timeline.replay();
        }

        let Some(muted) = play_with_fallback(self.narration.as_ref()) else {
            return false;
        };
        self.timeline.play(muted);

        if self.recorder.session().status == RecordingStatus::Idle {
            let options = CompileOptions {
                initiated_by_download: false,
                already_playing: true,
            };
            if let Err(e) = self.recorder.start_compilation(options) {
                debug!(reason = %e, "Background compilation not started");
            }
        }
        true
    }

    pub fn pause(&self) {
        self.narration.pause();
        self.timeline.pause();
    }

    /// Toggle play/pause. Returns whether the view is now playing.
    pub fn toggle(&self) -> bool {
        if self.is_playing() {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.timeline.snapshot().is_playing
    }

    /// Hand out the compiled file, or start compiling it.
    pub fn download(&self) -> DownloadAction {
        let session = self.recorder.session();
        if let Some(artifact) = session.artifact.as_ref().filter(|_| session.is_ready()) {
            return DownloadAction::Ready {
                path: artifact.path.clone(),
                filename: self.lecture.download_filename(&artifact.container),
            };
        }
        if session.is_compiling() {
            return DownloadAction::InProgress;
        }

        let options = CompileOptions {
            initiated_by_download: true,
            already_playing: self.is_playing(),
        };
        match self.recorder.start_compilation(options) {
            Ok(()) => DownloadAction::Started,
            Err(e) => {
                debug!(reason = %e, "Download compilation not started");
                DownloadAction::InProgress
            }
        }
    }

    /// Draw the current frame onto a fresh canvas.
    pub fn draw_frame(&self) -> Option<Pixmap> {
        let mut compositor = lock(&self.compositor);
        let mut canvas = compositor.new_canvas()?;
        let state = self.timeline.snapshot();
        compositor.draw(&mut canvas, &state, &self.images, self.narration.as_ref());
        Some(canvas)
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CompositionState> {
        self.timeline.subscribe()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<RecordingSession> {
        self.recorder.subscribe()
    }

    pub fn recorder(&self) -> &RecorderController {
        &self.recorder
    }

    pub fn mode(&self) -> DriverMode {
        self.timeline.mode()
    }

    pub fn lecture(&self) -> &LectureContent {
        &self.lecture
    }

    /// Resolve once the reveal has nothing left to show.
    pub async fn wait_done(&self) {
        self.timeline.wait_done().await
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
    }
}

async fn watch_duration(narration: Arc<dyn NarrationSource>, timeline: Arc<TimelineHandle>) {
    match narration.wait_for_duration().await {
        Ok(secs) => timeline.set_duration(secs),
        Err(e) => warn!(error = %e, "Narration duration never became known"),
    }
}

/// Resume playback after transport interruptions while the view is playing,
/// and stop the view when the narration ends.
async fn watch_transport(
    narration: Arc<dyn NarrationSource>,
    mut events: broadcast::Receiver<PlaybackEvent>,
    timeline: Arc<TimelineHandle>,
) {
    let mut stalls = 0u32;
    let mut last_position = narration.current_time();

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Transport events lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        if event == PlaybackEvent::Ended {
            debug!("Narration ended");
            timeline.pause();
            stalls = 0;
            continue;
        }

        let state = timeline.snapshot();
        if !state.is_playing {
            continue;
        }

        let position = narration.current_time();
        if position - last_position > STALL_PROGRESS_SECS {
            stalls = 0;
        }
        last_position = position;
        stalls += 1;
        if stalls == PERSISTENT_STALL_EVENTS {
            warn!(?event, position_secs = position, "Narration keeps stalling");
        }

        debug!(?event, position_secs = position, "Resuming interrupted narration");
        if let Err(e) = narration.play(state.is_muted) {
            debug!(error = %e, "Resume after stall failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use lectern_media_core::testing::ScriptedNarration;

    use crate::test_support::{lecture, FakeOutput, MemoryEncoderFactory};

    struct Rig {
        player: PlayerSession,
        narration: Arc<ScriptedNarration>,
        encoders: Arc<MemoryEncoderFactory>,
        _dir: tempfile::TempDir,
    }

    fn rig(narration: ScriptedNarration) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let narration = Arc::new(narration);
        let encoders = MemoryEncoderFactory::new(FakeOutput::Bytes);
        let player = PlayerSession::open(
            PlayerInputs {
                lecture: lecture(),
                narration: narration.clone(),
                captions: None,
                images: Arc::new(VisualAssetBinder::default()),
                compositor: Compositor::new(640, 360, None),
            },
            encoders.clone(),
            RecorderSettings {
                fps: 30,
                video_bitrate_kbps: 5000,
                output_dir: dir.path().to_path_buf(),
            },
        );
        Rig {
            player,
            narration,
            encoders,
            _dir: dir,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_play_starts_background_compilation() {
        let rig = rig(ScriptedNarration::new(Some(0.5)));
        assert_eq!(rig.player.mode(), DriverMode::Simulated);
        assert!(rig.player.play());
        assert!(rig.player.recorder().session().is_compiling());

        let session = rig.player.recorder().wait_finished().await;
        assert!(session.is_ready());
        // the recorder reuses the viewer's playback
        assert_eq!(rig.narration.play_requests(), vec![false]);
        assert_eq!(rig.encoders.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_while_playing_resumes() {
        let rig = rig(ScriptedNarration::new(Some(10.0)));
        rig.player.play();
        settle().await;
        assert!(rig.player.is_playing());

        // the backend stalls and stops its clock
        rig.narration.pause();
        rig.narration.emit(PlaybackEvent::Stalled);
        settle().await;

        assert!(!rig.narration.is_paused());
        assert_eq!(rig.narration.play_requests(), vec![false, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_while_paused_is_ignored() {
        let rig = rig(ScriptedNarration::new(Some(10.0)));
        rig.player.play();
        settle().await;
        assert!(!rig.player.toggle());
        settle().await;

        rig.narration.emit(PlaybackEvent::Waiting);
        settle().await;
        assert!(rig.narration.is_paused());
        assert_eq!(rig.narration.play_requests(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_stops_view_and_play_starts_over() {
        let rig = rig(ScriptedNarration::new(Some(1.0)));
        rig.player.play();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        rig.narration.emit(PlaybackEvent::Ended);
        settle().await;
        assert!(!rig.player.is_playing());
        assert!(rig.player.recorder().session().is_ready());

        assert!(rig.player.play());
        assert_eq!(rig.narration.current_time(), 0.0);
        settle().await;
        let state = rig.player.subscribe_state().borrow().clone();
        assert!(state.is_playing);
        assert_eq!(state.current_paragraph_index, 0);
        // a finished compilation is not repeated
        assert_eq!(rig.encoders.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_compiles_then_hands_out_file() {
        let rig = rig(ScriptedNarration::new(Some(0.5)));
        assert_eq!(rig.player.download(), DownloadAction::Started);
        assert_eq!(rig.player.download(), DownloadAction::InProgress);

        rig.player.recorder().wait_finished().await;
        settle().await;
        match rig.player.download() {
            DownloadAction::Ready { path, filename } => {
                assert_eq!(filename, "Photosynthesis_101_lecture.webm");
                assert!(path.ends_with(&filename));
                assert!(path.exists());
            }
            other => panic!("expected a ready download, got {other:?}"),
        }
        assert!(!rig.player.is_playing());
        assert!(rig.narration.is_paused());
        assert_eq!(rig.narration.current_time(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_frame_matches_compositor_size() {
        let rig = rig(ScriptedNarration::new(Some(3.0)));
        let frame = rig.player.draw_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 360));
        assert_eq!(rig.player.lecture().topic, "Photosynthesis 101");
    }
}
