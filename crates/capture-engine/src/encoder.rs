//! Frame encoders.
//!
//! The recorder hands composed RGBA frames to a [`FrameEncoder`] at a fixed
//! rate. The ffmpeg implementation pipes them as raw video into an ffmpeg
//! child process and muxes the narration audio alongside.

use std::collections::BTreeSet;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use lectern_common::error::{LecternError, LecternResult};
use lectern_lecture_model::session::EncodedArtifact;
use lectern_media_core::narration::AudioTap;
use lectern_media_ffmpeg::probe::available_encoders;
use tracing::{debug, info, warn};

/// Frames buffered between the capture loop and the ffmpeg writer thread.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Audio bitrate for the muxed narration track.
const AUDIO_BITRATE: &str = "128k";

/// A container plus video/audio encoder pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecChoice {
    /// Container and file extension (`webm`, `mp4`).
    pub container: &'static str,
    /// ffmpeg video encoder name.
    pub video_encoder: &'static str,
    /// ffmpeg audio encoder name.
    pub audio_encoder: &'static str,
    /// Codec pair as advertised in the MIME type.
    pub codecs: &'static str,
    pub mime_type: &'static str,
}

impl CodecChoice {
    pub const VP9_OPUS: CodecChoice = CodecChoice {
        container: "webm",
        video_encoder: "libvpx-vp9",
        audio_encoder: "libopus",
        codecs: "vp9,opus",
        mime_type: "video/webm",
    };

    pub const VP8_OPUS: CodecChoice = CodecChoice {
        container: "webm",
        video_encoder: "libvpx",
        audio_encoder: "libopus",
        codecs: "vp8,opus",
        mime_type: "video/webm",
    };

    pub const H264_AAC: CodecChoice = CodecChoice {
        container: "mp4",
        video_encoder: "libx264",
        audio_encoder: "aac",
        codecs: "avc1,mp4a",
        mime_type: "video/mp4",
    };

    fn codec_args(&self, bitrate_kbps: u32) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_encoder.to_string(),
            "-b:v".to_string(),
            format!("{bitrate_kbps}k"),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ];
        match self.video_encoder {
            "libvpx-vp9" => args.extend(
                ["-deadline", "realtime", "-cpu-used", "8", "-row-mt", "1"].map(String::from),
            ),
            "libvpx" => args.extend(["-deadline", "realtime", "-cpu-used", "8"].map(String::from)),
            _ => args.extend(["-preset", "veryfast", "-movflags", "+faststart"].map(String::from)),
        }
        args
    }
}

/// Container/codec pairs in order of preference.
pub const CODEC_LADDER: [CodecChoice; 3] = [
    CodecChoice::VP9_OPUS,
    CodecChoice::VP8_OPUS,
    CodecChoice::H264_AAC,
];

/// The first pair of the ladder whose encoders are all available.
pub fn select_codec(available: &BTreeSet<String>) -> Option<CodecChoice> {
    CODEC_LADDER.into_iter().find(|choice| {
        available.contains(choice.video_encoder) && available.contains(choice.audio_encoder)
    })
}

/// Everything an encoder needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub codec: CodecChoice,
    /// Narration audio to mux in; `None` records video only.
    pub audio: Option<AudioTap>,
    /// Narration position at the first captured frame; the audio input is
    /// read from here so sound and picture line up.
    pub audio_start_secs: f64,
    pub output: PathBuf,
}

impl EncoderSettings {
    /// Bytes in one RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Runtime statistics of an encoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderStats {
    /// Frames accepted for encoding.
    pub frames_captured: u64,

    /// Frames written as a repeat of the previous one because the encoder
    /// fell behind. The output keeps one frame per capture tick.
    pub frames_repeated: u64,

    /// Size of the finalized output, once known.
    pub bytes_written: u64,
}

impl EncoderStats {
    /// Share of output frames that were repeats, as a percentage.
    pub fn repeat_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_repeated;
        if total == 0 {
            return 0.0;
        }
        self.frames_repeated as f64 / total as f64 * 100.0
    }
}

/// A running encoder session.
pub trait FrameEncoder: Send {
    /// Queue one straight-alpha RGBA frame of the configured size.
    fn push_frame(&mut self, rgba: &[u8]) -> LecternResult<()>;

    fn stats(&self) -> EncoderStats;

    /// Flush, wait for the output to be written and describe it. Blocks.
    fn finish(self: Box<Self>) -> LecternResult<EncodedArtifact>;
}

/// Creates encoders.
pub trait EncoderFactory: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// The preferred container/codec pair this backend can produce.
    fn select_codec(&self) -> LecternResult<CodecChoice>;

    fn start(&self, settings: EncoderSettings) -> LecternResult<Box<dyn FrameEncoder>>;
}

/// Encodes through the system `ffmpeg`.
#[derive(Debug, Default)]
pub struct FfmpegEncoderFactory {
    encoders: OnceLock<BTreeSet<String>>,
}

impl FfmpegEncoderFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn select_codec(&self) -> LecternResult<CodecChoice> {
        let encoders = match self.encoders.get() {
            Some(encoders) => encoders,
            None => {
                let listed = available_encoders()?;
                self.encoders.get_or_init(|| listed)
            }
        };
        select_codec(encoders).ok_or_else(|| {
            LecternError::encode(
                "ffmpeg provides none of libvpx-vp9, libvpx or libx264 with a matching audio encoder",
            )
        })
    }

    fn start(&self, settings: EncoderSettings) -> LecternResult<Box<dyn FrameEncoder>> {
        Ok(Box::new(FfmpegEncoder::spawn(settings)?))
    }
}

/// ffmpeg arguments for an encoder session.
pub fn encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s:v",
    ]
    .map(String::from)
    .to_vec();
    args.push(format!("{}x{}", settings.width, settings.height));
    args.push("-r".to_string());
    args.push(settings.fps.max(1).to_string());
    args.extend(["-i", "-"].map(String::from));

    if settings.audio.is_some() && settings.audio_start_secs > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{:.3}", settings.audio_start_secs));
    }
    match &settings.audio {
        Some(AudioTap::Stream {
            input,
            stream_index,
        }) => {
            args.extend(["-i".to_string(), input.clone()]);
            args.extend(["-map", "0:v:0", "-map"].map(String::from));
            args.push(format!("1:{stream_index}"));
        }
        Some(AudioTap::Rendered { path }) => {
            args.extend(["-i".to_string(), path.display().to_string()]);
            args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(String::from));
        }
        None => args.push("-an".to_string()),
    }

    args.extend(settings.codec.codec_args(settings.video_bitrate_kbps));
    if settings.audio.is_some() {
        args.extend([
            "-c:a".to_string(),
            settings.codec.audio_encoder.to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            "-shortest".to_string(),
        ]);
    }
    args.push(settings.output.display().to_string());
    args
}

/// Streams raw frames into an ffmpeg child process.
///
/// Frames are handed to a writer thread through a bounded queue so a slow
/// encoder never blocks the capture loop. A frame that does not fit is
/// replaced by a repeat of the previously written one, so the constant-rate
/// stream keeps its length.
pub struct FfmpegEncoder {
    settings: EncoderSettings,
    child: Option<Child>,
    frames: Option<SyncSender<Vec<u8>>>,
    repeats: Arc<AtomicU64>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<String>>,
    stats: EncoderStats,
}

impl FfmpegEncoder {
    pub fn spawn(settings: EncoderSettings) -> LecternResult<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(LecternError::encode("encoder frame size must be non-zero"));
        }
        if settings.width % 2 != 0 || settings.height % 2 != 0 {
            return Err(LecternError::encode(format!(
                "encoder frame size must be even, got {}x{}",
                settings.width, settings.height
            )));
        }
        if let Some(parent) = settings.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = encoder_args(&settings);
        debug!(?args, "Spawning ffmpeg encoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    LecternError::encode(
                        "ffmpeg was not found on PATH. Install ffmpeg and verify `ffmpeg -version` works",
                    )
                } else {
                    LecternError::encode(format!("Failed to start ffmpeg: {e}"))
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LecternError::encode("Failed to capture ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LecternError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_drain = std::thread::spawn(move || {
            let mut output = String::new();
            match stderr.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let (frames, queue) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let repeats = Arc::new(AtomicU64::new(0));
        let pending = repeats.clone();
        let writer = std::thread::Builder::new()
            .name("encoder-writer".to_string())
            .spawn(move || write_frames(stdin, queue, &pending))
            .map_err(|e| LecternError::encode(format!("Failed to spawn encoder writer: {e}")))?;

        info!(
            pid = child.id(),
            codec = settings.codec.codecs,
            size = %format!("{}x{}", settings.width, settings.height),
            fps = settings.fps,
            audio = settings.audio.is_some(),
            output = %settings.output.display(),
            "ffmpeg encoder started"
        );

        Ok(Self {
            settings,
            child: Some(child),
            frames: Some(frames),
            repeats,
            writer: Some(writer),
            stderr_drain: Some(stderr_drain),
            stats: EncoderStats::default(),
        })
    }
}

/// Write queued frames, following each with as many copies as were requested
/// through `repeats` while it was queued or being written.
fn write_frames<W: Write>(
    mut out: W,
    queue: Receiver<Vec<u8>>,
    repeats: &AtomicU64,
) -> std::io::Result<()> {
    let mut last: Option<Vec<u8>> = None;
    for frame in queue {
        out.write_all(&frame)?;
        for _ in 0..repeats.swap(0, Ordering::SeqCst) {
            out.write_all(&frame)?;
        }
        last = Some(frame);
    }
    if let Some(frame) = last {
        for _ in 0..repeats.swap(0, Ordering::SeqCst) {
            out.write_all(&frame)?;
        }
    }
    out.flush()
}

impl FrameEncoder for FfmpegEncoder {
    fn push_frame(&mut self, rgba: &[u8]) -> LecternResult<()> {
        let expected = self.settings.frame_len();
        if rgba.len() != expected {
            return Err(LecternError::encode(format!(
                "frame size mismatch: expected {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| LecternError::encode("encoder already finished"))?;
        match frames.try_send(rgba.to_vec()) {
            Ok(()) => self.stats.frames_captured += 1,
            Err(TrySendError::Full(_)) => {
                self.repeats.fetch_add(1, Ordering::SeqCst);
                self.stats.frames_repeated += 1;
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(LecternError::encode("ffmpeg stopped accepting frames"));
            }
        }
        Ok(())
    }

    fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }

    fn finish(mut self: Box<Self>) -> LecternResult<EncodedArtifact> {
        drop(self.frames.take());
        let written = match self.writer.take().map(JoinHandle::join) {
            Some(Ok(result)) => result.map_err(|e| e.to_string()),
            Some(Err(_)) => Err("encoder writer thread panicked".to_string()),
            None => Ok(()),
        };

        let mut child = self
            .child
            .take()
            .ok_or_else(|| LecternError::encode("encoder already finished"))?;
        let status = child
            .wait()
            .map_err(|e| LecternError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_drain
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(LecternError::encode(format!(
                "ffmpeg encode failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        if let Err(e) = written {
            return Err(LecternError::encode(format!(
                "Failed writing frames to ffmpeg: {e}"
            )));
        }

        let bytes = output_len(&self.settings.output);
        self.stats.bytes_written = bytes;
        if self.stats.frames_repeated > 0 {
            warn!(
                repeated = self.stats.frames_repeated,
                repeat_rate = self.stats.repeat_rate(),
                "Encoder fell behind and repeated frames"
            );
        }
        info!(
            frames = self.stats.frames_captured,
            bytes,
            output = %self.settings.output.display(),
            "ffmpeg encoder finished"
        );

        Ok(EncodedArtifact {
            path: self.settings.output.clone(),
            bytes,
            container: self.settings.codec.container.to_string(),
            codec: self.settings.codec.codecs.to_string(),
            mime_type: self.settings.codec.mime_type.to_string(),
        })
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.frames.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("ffmpeg encoder killed before finishing");
        }
    }
}

/// Size of a written output file; a missing file counts as empty.
pub fn output_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
