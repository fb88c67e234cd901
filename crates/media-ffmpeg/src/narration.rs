//! Software-decoded narration.
//!
//! ffprobe supplies metadata in the background; ffmpeg decodes the video
//! stream to raw RGBA frames on a worker thread. Frames are released against
//! the playback clock, so the clock (not the decoder) is the time base.
//! Audio is never played to an output device; the recorder attaches it
//! straight from the source.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use lectern_captions::parse::parse_caption_file;
use lectern_common::error::{LecternError, LecternResult};
use lectern_media_core::clock::PlaybackClock;
use lectern_media_core::narration::{
    AudioTap, NarrationSource, PlayError, PlaybackEvent, ReadyState, TextTrackCue, VideoFrame,
};
use tokio::sync::{broadcast, watch};

use crate::probe::{probe_media, MediaInfo};

/// Decoder lag after which a `Waiting` event is broadcast.
const STALL_THRESHOLD_SECS: f64 = 1.0;

/// Longest sleep while waiting for a frame's presentation time.
const MAX_PACING_SLEEP: Duration = Duration::from_millis(10);

/// Decode settings.
#[derive(Debug, Clone)]
pub struct NarrationOptions {
    /// Decoded frame rate.
    pub fps: u32,

    /// Longest edge of decoded frames; larger sources are downscaled.
    pub max_frame_edge: u32,
}

impl Default for NarrationOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            max_frame_edge: 640,
        }
    }
}

/// Metadata loading progress.
#[derive(Debug, Clone, PartialEq)]
enum Metadata {
    Loading,
    Loaded(MediaInfo),
    Failed(String),
}

struct Shared {
    location: String,
    clock: Mutex<PlaybackClock>,
    metadata: watch::Sender<Metadata>,
    frame: Mutex<Option<VideoFrame>>,
    ready: Mutex<ReadyState>,
    events: broadcast::Sender<PlaybackEvent>,
}

struct Decoder {
    stop: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
    thread: Option<JoinHandle<()>>,
}

/// Narration backed by ffprobe + ffmpeg.
pub struct FfmpegNarration {
    shared: Arc<Shared>,
    options: NarrationOptions,
    muted: AtomicBool,
    decoder: Mutex<Option<Decoder>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

static ROUTED_AUDIO_COUNTER: AtomicU64 = AtomicU64::new(0);

impl FfmpegNarration {
    /// Open a narration at a local path or URL.
    ///
    /// Returns immediately; metadata is probed in the background. Must be
    /// called from within a tokio runtime.
    pub fn open(location: impl Into<String>, options: NarrationOptions) -> Arc<Self> {
        let location = location.into();
        let (metadata, _) = watch::channel(Metadata::Loading);
        let (events, _) = broadcast::channel(32);
        let narration = Arc::new(Self {
            shared: Arc::new(Shared {
                location: location.clone(),
                clock: Mutex::new(PlaybackClock::new(None)),
                metadata,
                frame: Mutex::new(None),
                ready: Mutex::new(ReadyState::HaveNothing),
                events,
            }),
            options,
            muted: AtomicBool::new(true),
            decoder: Mutex::new(None),
        });

        let shared = Arc::downgrade(&narration.shared);
        tokio::spawn(async move {
            let probe_location = location.clone();
            let result = tokio::task::spawn_blocking(move || probe_media(&probe_location)).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let metadata = match result {
                Ok(Ok(info)) => {
                    tracing::info!(
                        location = %location,
                        duration_secs = ?info.duration_secs,
                        video_size = ?info.video_size,
                        audio_stream = ?info.audio_stream,
                        "Narration metadata loaded"
                    );
                    lock(&shared.clock).set_duration(info.duration_secs);
                    let mut ready = lock(&shared.ready);
                    if *ready < ReadyState::HaveMetadata {
                        *ready = ReadyState::HaveMetadata;
                    }
                    Metadata::Loaded(info)
                }
                Ok(Err(e)) => {
                    tracing::warn!(location = %location, error = %e, "Narration probe failed");
                    let _ = shared.events.send(PlaybackEvent::Errored(e.to_string()));
                    Metadata::Failed(e.to_string())
                }
                Err(e) => Metadata::Failed(format!("probe task failed: {e}")),
            };
            shared.metadata.send_replace(metadata);
        });

        narration
    }

    /// Media facts once the background probe has settled; `None` if it failed.
    async fn loaded_info(&self) -> Option<MediaInfo> {
        let mut rx = self.shared.metadata.subscribe();
        let metadata = rx
            .wait_for(|m| !matches!(m, Metadata::Loading))
            .await
            .ok()?
            .clone();
        match metadata {
            Metadata::Loaded(info) => Some(info),
            _ => None,
        }
    }

    fn media_info(&self) -> Option<MediaInfo> {
        match &*self.shared.metadata.borrow() {
            Metadata::Loaded(info) => Some(info.clone()),
            _ => None,
        }
    }

    fn start_decoder(&self) {
        let mut slot = lock(&self.decoder);
        if slot.is_some() {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let child = Arc::new(Mutex::new(None));
        let start_secs = lock(&self.shared.clock).position();
        let worker = DecoderWorker {
            shared: self.shared.clone(),
            stop: stop.clone(),
            child: child.clone(),
            start_secs,
            options: self.options.clone(),
        };
        let thread = std::thread::Builder::new()
            .name("narration-decoder".to_string())
            .spawn(move || worker.run());

        match thread {
            Ok(handle) => {
                *slot = Some(Decoder {
                    stop,
                    child,
                    thread: Some(handle),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to spawn narration decoder thread");
                let _ = self
                    .shared
                    .events
                    .send(PlaybackEvent::Errored(e.to_string()));
            }
        }
    }

    fn stop_decoder(&self) {
        let decoder = lock(&self.decoder).take();
        if let Some(mut decoder) = decoder {
            decoder.stop.store(true, Ordering::SeqCst);
            if let Some(mut child) = lock(&decoder.child).take() {
                let _ = child.kill();
                let _ = child.wait();
            }
            if let Some(thread) = decoder.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for FfmpegNarration {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}

#[async_trait::async_trait]
impl NarrationSource for FfmpegNarration {
    fn label(&self) -> &str {
        &self.shared.location
    }

    fn current_time(&self) -> f64 {
        lock(&self.shared.clock).position()
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.shared.clock).duration()
    }

    async fn wait_for_duration(&self) -> LecternResult<f64> {
        let mut rx = self.shared.metadata.subscribe();
        let metadata = rx
            .wait_for(|m| !matches!(m, Metadata::Loading))
            .await
            .map_err(|_| LecternError::playback("narration closed before metadata loaded"))?
            .clone();
        match metadata {
            Metadata::Loaded(MediaInfo {
                duration_secs: Some(duration),
                ..
            }) => Ok(duration),
            Metadata::Loaded(_) => Err(LecternError::playback(format!(
                "{} has no known duration",
                self.shared.location
            ))),
            Metadata::Failed(reason) => Err(LecternError::playback(reason)),
            Metadata::Loading => Err(LecternError::playback("narration metadata unavailable")),
        }
    }

    fn play(&self, muted: bool) -> Result<(), PlayError> {
        if let Metadata::Failed(reason) = &*self.shared.metadata.borrow() {
            return Err(PlayError::Backend(reason.clone()));
        }
        self.muted.store(muted, Ordering::SeqCst);
        lock(&self.shared.clock).play();
        self.start_decoder();
        Ok(())
    }

    fn pause(&self) {
        lock(&self.shared.clock).pause();
        self.stop_decoder();
    }

    fn seek(&self, secs: f64) {
        let restart = lock(&self.decoder).is_some();
        self.stop_decoder();
        lock(&self.shared.clock).seek(secs);
        if restart {
            self.start_decoder();
        }
    }

    fn is_paused(&self) -> bool {
        let clock = lock(&self.shared.clock);
        !clock.is_running() || clock.has_ended()
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn ready_state(&self) -> ReadyState {
        *lock(&self.shared.ready)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        lock(&self.shared.frame).clone()
    }

    async fn text_track(&self) -> Option<Vec<TextTrackCue>> {
        if !self.loaded_info().await?.has_subtitles {
            return None;
        }
        let location = self.shared.location.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_subtitles(&location))
            .await
            .ok()?;
        match extracted {
            Ok(cues) => Some(cues),
            Err(e) => {
                tracing::debug!(error = %e, "Embedded subtitle extraction failed");
                None
            }
        }
    }

    fn direct_audio(&self) -> Option<AudioTap> {
        self.media_info()?
            .audio_stream
            .map(|stream_index| AudioTap::Stream {
                input: self.shared.location.clone(),
                stream_index,
            })
    }

    async fn route_audio(&self) -> LecternResult<AudioTap> {
        let location = self.shared.location.clone();
        let path = std::env::temp_dir().join(format!(
            "lectern-narration-{}-{}.wav",
            std::process::id(),
            ROUTED_AUDIO_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let out = path.clone();
        let rendered = tokio::task::spawn_blocking(move || render_audio(&location, &out))
            .await
            .map_err(|e| LecternError::capture(format!("audio render task failed: {e}")))?;
        if let Err(e) = rendered {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(AudioTap::Rendered { path })
    }

    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }
}

struct DecoderWorker {
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
    start_secs: f64,
    options: NarrationOptions,
}

impl DecoderWorker {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn emit(&self, event: PlaybackEvent) {
        if !self.stopped() {
            let _ = self.shared.events.send(event);
        }
    }

    fn run(self) {
        let Some(info) = self.wait_for_metadata() else {
            return;
        };
        let Some((src_w, src_h)) = info.video_size else {
            tracing::warn!(location = %self.shared.location, "Narration has no video stream");
            self.emit(PlaybackEvent::Errored("no video stream".to_string()));
            return;
        };
        let (width, height) = decoded_frame_size(src_w, src_h, self.options.max_frame_edge);
        let fps = self.options.fps.max(1);

        let spawned = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-ss"])
            .arg(format!("{:.3}", self.start_secs))
            .arg("-i")
            .arg(&self.shared.location)
            .args(["-an", "-sn", "-vf"])
            .arg(format!("fps={fps},scale={width}:{height}"))
            .args(["-pix_fmt", "rgba", "-f", "rawvideo", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start narration decoder");
                self.emit(PlaybackEvent::Errored(format!("failed to start ffmpeg: {e}")));
                return;
            }
        };
        let Some(mut stdout) = child.stdout.take() else {
            self.emit(PlaybackEvent::Errored("decoder stdout unavailable".to_string()));
            return;
        };
        {
            let mut slot = lock(&self.child);
            if self.stopped() {
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            *slot = Some(child);
        }

        tracing::debug!(width, height, fps, start_secs = self.start_secs, "Narration decoder started");

        let frame_len = width as usize * height as usize * 4;
        let mut buffer = vec![0u8; frame_len];
        let mut index: u64 = 0;
        let mut stalled = false;

        loop {
            if let Err(e) = stdout.read_exact(&mut buffer) {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    tracing::debug!(frames = index, "Narration decoder reached end of stream");
                    self.emit(PlaybackEvent::Ended);
                } else {
                    self.emit(PlaybackEvent::Errored(e.to_string()));
                }
                break;
            }

            let presentation = self.start_secs + index as f64 / fps as f64;
            index += 1;

            // Hold the frame until its presentation time.
            loop {
                if self.stopped() {
                    return;
                }
                let position = lock(&self.shared.clock).position();
                let ahead = presentation - position;
                if ahead <= 0.0 {
                    if -ahead > STALL_THRESHOLD_SECS && !stalled {
                        stalled = true;
                        tracing::debug!(lag_secs = -ahead, "Narration decoder behind clock");
                        self.emit(PlaybackEvent::Waiting);
                    } else if -ahead <= STALL_THRESHOLD_SECS {
                        stalled = false;
                    }
                    break;
                }
                std::thread::sleep(Duration::from_secs_f64(ahead).min(MAX_PACING_SLEEP));
            }

            if let Some(frame) = VideoFrame::new(width, height, buffer.clone()) {
                *lock(&self.shared.frame) = Some(frame);
                *lock(&self.shared.ready) = ReadyState::HaveEnoughData;
            }
        }

        if let Some(mut child) = lock(&self.child).take() {
            let _ = child.wait();
        }
    }

    fn wait_for_metadata(&self) -> Option<MediaInfo> {
        loop {
            if self.stopped() {
                return None;
            }
            match &*self.shared.metadata.borrow() {
                Metadata::Loaded(info) => return Some(info.clone()),
                Metadata::Failed(_) => return None,
                Metadata::Loading => {}
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Scale `(w, h)` so the longest edge is at most `max_edge`, keeping aspect
/// and rounding to even dimensions.
pub fn decoded_frame_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height).max(1);
    let scale = if longest > max_edge {
        max_edge as f64 / longest as f64
    } else {
        1.0
    };
    let even = |v: f64| ((v.round() as u32) / 2 * 2).max(2);
    (even(width as f64 * scale), even(height as f64 * scale))
}

fn extract_subtitles(location: &str) -> LecternResult<Vec<TextTrackCue>> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-nostdin", "-i"])
        .arg(location)
        .args(["-map", "0:s:0", "-f", "webvtt", "pipe:1"])
        .output()
        .map_err(|e| LecternError::caption(format!("Failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(LecternError::caption(format!(
            "subtitle extraction failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_caption_file(&String::from_utf8_lossy(&output.stdout))
        .into_iter()
        .map(|cue| TextTrackCue {
            start: cue.start,
            end: cue.end,
            text: cue.text,
        })
        .collect())
}

fn render_audio(location: &str, out: &Path) -> LecternResult<()> {
    let output = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-nostdin", "-i"])
        .arg(location)
        .args([
            "-vn", "-map", "0:a:0", "-ac", "2", "-ar", "48000", "-c:a", "pcm_s16le",
        ])
        .arg(out)
        .output()
        .map_err(|e| LecternError::capture(format!("Failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(LecternError::capture(format!(
            "audio routing failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    tracing::debug!(path = %out.display(), "Narration audio rendered");
    Ok(())
}
