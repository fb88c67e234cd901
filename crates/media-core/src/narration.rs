//! Narration source capability.
//!
//! The narration is the avatar video with its audio track. It is the single
//! time base of a lecture view: the timeline driver samples its position, the
//! compositor draws its current frame, and the recorder captures its audio.
//! Everything here is read-only apart from the transport controls.

use std::path::PathBuf;
use std::sync::Arc;

use lectern_common::error::LecternResult;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// How much media data the source can currently present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// Nothing is known about the media yet.
    HaveNothing,
    /// Duration and dimensions are known.
    HaveMetadata,
    /// A frame for the current position is available.
    HaveCurrentData,
    /// Frames beyond the current position are buffered.
    HaveFutureData,
    /// Enough is buffered to play through.
    HaveEnoughData,
}

impl ReadyState {
    /// Whether a frame for the current position can be drawn.
    pub fn can_draw(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// A decoded RGBA video frame (straight alpha, row-major, no padding).
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl VideoFrame {
    /// Wrap a pixel buffer. Returns `None` when the size does not match.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba: Arc::new(rgba),
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }
}

/// Transport events worth reacting to during playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback is waiting for more data.
    Waiting,
    /// The source stopped delivering data.
    Stalled,
    /// Loading was suspended by the backend.
    Suspended,
    /// Decoding failed.
    Errored(String),
    /// Playback reached the end of the media.
    Ended,
}

impl PlaybackEvent {
    /// Whether this event interrupts playback that should keep going.
    pub fn is_stall(&self) -> bool {
        !matches!(self, PlaybackEvent::Ended)
    }
}

/// One cue of a text track carried inside the narration container.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTrackCue {
    pub start: f64,
    pub end: f64,
    /// Raw cue text, possibly containing markup.
    pub text: String,
}

/// An audio source the encoder can attach to the captured video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioTap {
    /// An audio stream mapped straight out of a media input.
    Stream { input: String, stream_index: usize },
    /// Audio rendered through an audio graph into a capturable file.
    Rendered { path: PathBuf },
}

/// Why a play request did not start playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// Unmuted playback is not permitted; retry muted.
    #[error("Unmuted playback was rejected")]
    AutoplayRejected,

    #[error("Playback failed: {0}")]
    Backend(String),
}

/// The narration (avatar video + audio) as seen by the rest of the system.
#[async_trait::async_trait]
pub trait NarrationSource: Send + Sync {
    /// Human-readable label for logs (path or URL).
    fn label(&self) -> &str;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Media duration, once metadata has loaded.
    fn duration(&self) -> Option<f64>;

    /// Resolve once the duration is known.
    async fn wait_for_duration(&self) -> LecternResult<f64>;

    /// Start or resume playback.
    fn play(&self, muted: bool) -> Result<(), PlayError>;

    fn pause(&self);

    /// Seek to `secs` from the start.
    fn seek(&self, secs: f64);

    fn is_paused(&self) -> bool;

    fn is_muted(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// The frame for the current position, if one has been decoded.
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Cues of the container's embedded text track, if it has one.
    async fn text_track(&self) -> Option<Vec<TextTrackCue>>;

    /// The narration's own audio track, if it exposes one directly.
    fn direct_audio(&self) -> Option<AudioTap>;

    /// Route the narration audio through an audio graph into a capturable
    /// destination.
    async fn route_audio(&self) -> LecternResult<AudioTap>;

    /// Subscribe to transport events.
    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent>;

    /// Whether the position has reached the end of the media.
    fn has_ended(&self) -> bool {
        self.duration()
            .is_some_and(|duration| self.current_time() >= duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_ordering() {
        assert!(!ReadyState::HaveMetadata.can_draw());
        assert!(ReadyState::HaveCurrentData.can_draw());
        assert!(ReadyState::HaveEnoughData.can_draw());
    }

    #[test]
    fn test_video_frame_size_checked() {
        assert!(VideoFrame::new(2, 2, vec![0; 16]).is_some());
        assert!(VideoFrame::new(2, 2, vec![0; 15]).is_none());
        assert!(VideoFrame::new(0, 2, Vec::new()).is_none());

        let frame = VideoFrame::solid(3, 1, [1, 2, 3, 255]).unwrap();
        assert_eq!(&frame.rgba[4..8], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_ended_is_not_a_stall() {
        assert!(PlaybackEvent::Waiting.is_stall());
        assert!(PlaybackEvent::Errored("decode".into()).is_stall());
        assert!(!PlaybackEvent::Ended.is_stall());
    }
}
