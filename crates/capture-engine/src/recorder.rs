//! Recorder/encoder controller.
//!
//! A compilation plays the narration from where it is, draws the composed
//! presentation at a fixed frame rate into an encoder, and stops shortly
//! after the narration reaches its end:
//!
//! ```text
//! wait for duration ──► attach audio ──► start encoder ──► force playback
//!                                                              │
//!        ┌─────────────────────────────────────────────────────┘
//!        ▼
//!   capture loop (frame gate @ fps) ◄─┐
//!   progress poll (120 ms)  ──────────┘  t ≥ duration − 80 ms ⇒ settle 350 ms
//!        │
//!        ▼
//!   finalize ──► Ready (bytes > 0) | Error
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lectern_common::clock::{RateController, SessionClock};
use lectern_common::config::PlayerDefaults;
use lectern_common::error::{LecternError, LecternResult};
use lectern_lecture_model::lecture::LectureContent;
use lectern_lecture_model::session::{EncodedArtifact, RecordingSession, SessionError};
use lectern_media_core::narration::NarrationSource;
use lectern_render_engine::{Compositor, VisualAssetBinder};
use lectern_timeline::TimelineHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::audio::{attach_audio, RenderedAudioFile};
use crate::encoder::{EncoderFactory, EncoderSettings};
use crate::transport::play_with_fallback;

/// How often the capture loop checks whether a frame is due.
pub const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(4);

/// Cadence of progress updates and the end-of-narration check.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(120);

/// Recording stops once playback is this close to the end.
pub const STOP_LEAD_SECS: f64 = 0.08;

/// Frames keep being captured this long after the end is reached.
pub const SETTLE_DELAY: Duration = Duration::from_millis(350);

/// Frame rate, bitrate and output location of compilations.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    /// Directory the compiled file is written to.
    pub output_dir: PathBuf,
}

impl RecorderSettings {
    pub fn from_player(player: &PlayerDefaults, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fps: player.fps.max(1),
            video_bitrate_kbps: player.video_bitrate_kbps,
            output_dir: output_dir.into(),
        }
    }
}

/// How a compilation was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// The viewer asked for the file; pause and rewind once it is ready.
    pub initiated_by_download: bool,

    /// The narration is already playing for the viewer.
    pub already_playing: bool,
}

/// What a recorder works with.
pub struct RecorderParts {
    pub lecture: Arc<LectureContent>,
    pub narration: Arc<dyn NarrationSource>,
    pub timeline: Arc<TimelineHandle>,
    pub images: Arc<VisualAssetBinder>,
    pub compositor: Arc<Mutex<Compositor>>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub settings: RecorderSettings,
}

struct Shared {
    parts: RecorderParts,
    session: watch::Sender<RecordingSession>,
}

/// Runs compilations for one lecture view.
///
/// At most one compilation runs at a time and a successful one is never
/// repeated. Dropping the controller cancels a running compilation.
pub struct RecorderController {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecorderController {
    pub fn new(parts: RecorderParts) -> Self {
        let (session, _) = watch::channel(RecordingSession::new());
        Self {
            shared: Arc::new(Shared { parts, session }),
            task: Mutex::new(None),
        }
    }

    /// The latest session state.
    pub fn session(&self) -> RecordingSession {
        self.shared.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingSession> {
        self.shared.session.subscribe()
    }

    /// Begin a compilation in the background.
    ///
    /// Refused while another compilation runs or after one succeeded. Must be
    /// called from within a tokio runtime.
    pub fn start_compilation(&self, options: CompileOptions) -> Result<(), SessionError> {
        let duration = self.shared.parts.narration.duration();
        let mut refused = None;
        self.shared.session.send_if_modified(|session| match session.begin(duration) {
            Ok(()) => true,
            Err(e) => {
                refused = Some(e);
                false
            }
        });
        if let Some(e) = refused {
            debug!(reason = %e, "Compilation not started");
            return Err(e);
        }

        info!(
            download = options.initiated_by_download,
            already_playing = options.already_playing,
            encoder = self.shared.parts.encoders.name(),
            "Compilation started"
        );
        let shared = self.shared.clone();
        let task = tokio::spawn(run_compilation(shared, options));
        if let Some(previous) = lock(&self.task).replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Resolve once no compilation is running, with the final session.
    pub async fn wait_finished(&self) -> RecordingSession {
        let mut rx = self.subscribe();
        let finished = match rx.wait_for(|session| !session.is_compiling()).await {
            Ok(session) => Some(session.clone()),
            Err(_) => None,
        };
        finished.unwrap_or_else(|| self.session())
    }

    /// Stop a running compilation; the session ends in `Error`.
    pub fn cancel(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        self.shared.session.send_if_modified(|session| {
            if !session.is_compiling() {
                return false;
            }
            session.fail("Compilation cancelled");
            true
        });
    }
}

impl Drop for RecorderController {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

async fn run_compilation(shared: Arc<Shared>, options: CompileOptions) {
    let clock = SessionClock::start();
    match record(&shared, options).await {
        Ok(artifact) => shared.session.send_modify(|session| session.finish(artifact)),
        Err(e) => {
            warn!(error = %e, "Compilation failed");
            shared.session.send_modify(|session| session.fail(e.to_string()));
        }
    }

    let session = shared.session.borrow().clone();
    info!(
        status = ?session.status,
        bytes = session.artifact.as_ref().map(|a| a.bytes),
        started_at = clock.epoch_wall(),
        elapsed_secs = clock.elapsed_secs(),
        "Compilation finished"
    );

    if options.initiated_by_download && session.is_ready() {
        let parts = &shared.parts;
        parts.narration.pause();
        parts.narration.seek(0.0);
        parts.timeline.pause();
        parts.timeline.replay();
    }
}

async fn record(shared: &Shared, options: CompileOptions) -> LecternResult<EncodedArtifact> {
    let parts = &shared.parts;
    let narration = parts.narration.as_ref();

    let duration = narration.wait_for_duration().await?;
    shared
        .session
        .send_modify(|session| session.estimated_secs_remaining = Some(duration));
    debug!(duration_secs = duration, "Narration duration known");

    let codec = parts.encoders.select_codec()?;
    let audio = attach_audio(narration).await.map(|(_, tap)| tap);
    let _audio_file = audio.as_ref().and_then(RenderedAudioFile::for_tap);
    let (width, height) = lock(&parts.compositor).size();
    let mut canvas = lock(&parts.compositor)
        .new_canvas()
        .ok_or_else(|| LecternError::render(format!("Unusable canvas size {width}x{height}")))?;

    let settings = EncoderSettings {
        width,
        height,
        fps: parts.settings.fps,
        video_bitrate_kbps: parts.settings.video_bitrate_kbps,
        codec,
        audio,
        audio_start_secs: narration.current_time(),
        output: parts
            .settings
            .output_dir
            .join(parts.lecture.download_filename(codec.container)),
    };
    let mut encoder = parts
        .encoders
        .start(settings)
        .map_err(|e| LecternError::capture(format!("Recording has no video track: {e}")))?;

    if !options.already_playing || narration.is_paused() {
        match play_with_fallback(narration) {
            Some(muted) => parts.timeline.play(muted),
            None => warn!("Recording while the narration is not playing"),
        }
    }

    let state = parts.timeline.subscribe();
    let mut rate = RateController::new(parts.settings.fps);
    let mut frame_tick = tokio::time::interval(FRAME_POLL_INTERVAL);
    frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut progress_tick = tokio::time::interval(PROGRESS_INTERVAL);
    progress_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stop_secs = (duration - STOP_LEAD_SECS).max(0.0);
    let started = Instant::now();
    let mut stop_at: Option<Instant> = None;
    info!(fps = parts.settings.fps, width, height, "Capture loop started");

    loop {
        tokio::select! {
            _ = frame_tick.tick() => {
                let now = Instant::now();
                if stop_at.is_some_and(|at| now >= at) {
                    break;
                }
                if !rate.should_tick(now - started) {
                    continue;
                }
                let snapshot = state.borrow().clone();
                lock(&parts.compositor).draw(&mut canvas, &snapshot, &parts.images, narration);
                // The canvas is opaque, so its premultiplied pixels are
                // already straight RGBA.
                encoder.push_frame(canvas.data())?;
            }
            _ = progress_tick.tick() => {
                let t = narration.current_time();
                shared.session.send_modify(|session| session.report_progress(t, duration));
                if stop_at.is_none() && t >= stop_secs {
                    debug!(position_secs = t, duration_secs = duration, "Narration reached the end");
                    stop_at = Some(Instant::now() + SETTLE_DELAY);
                }
            }
        }
    }

    let stats = encoder.stats();
    info!(
        frames = stats.frames_captured,
        repeated = stats.frames_repeated,
        "Capture loop stopped, finalizing"
    );
    if stats.frames_captured == 0 {
        return Err(LecternError::capture("Recording captured no video frames"));
    }

    tokio::task::spawn_blocking(move || encoder.finish())
        .await
        .map_err(|e| LecternError::encode(format!("encoder task failed: {e}")))?
}
