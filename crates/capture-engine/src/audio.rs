//! Audio attachment for recordings.
//!
//! Strategies are tried in order and the first that yields a tap wins:
//! the narration's own audio stream, then narration audio routed through an
//! audio graph into a capturable file. When neither works the recording is
//! made without sound.

use std::fmt;
use std::path::PathBuf;

use lectern_media_core::narration::{AudioTap, NarrationSource};
use tracing::{debug, info, warn};

/// How the recording's audio was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStrategy {
    /// The narration's audio stream, muxed directly.
    Direct,
    /// Narration audio rendered through an audio graph.
    Routed,
}

impl fmt::Display for AudioStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioStrategy::Direct => write!(f, "direct"),
            AudioStrategy::Routed => write!(f, "routed"),
        }
    }
}

/// Deletes a rendered narration audio file when dropped.
///
/// Held for the whole compilation so the file outlives the encoder and is
/// removed on success, failure and cancellation alike.
#[derive(Debug)]
pub struct RenderedAudioFile {
    path: PathBuf,
}

impl RenderedAudioFile {
    /// Take ownership of the file behind a rendered tap. Stream taps point
    /// into the narration itself and are left alone.
    pub fn for_tap(tap: &AudioTap) -> Option<Self> {
        match tap {
            AudioTap::Rendered { path } => Some(Self { path: path.clone() }),
            AudioTap::Stream { .. } => None,
        }
    }
}

impl Drop for RenderedAudioFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed rendered narration audio"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove rendered narration audio");
            }
        }
    }
}

/// Find an audio source for the recording.
pub async fn attach_audio(narration: &dyn NarrationSource) -> Option<(AudioStrategy, AudioTap)> {
    if let Some(tap) = narration.direct_audio() {
        info!(strategy = %AudioStrategy::Direct, ?tap, "Recording audio attached");
        return Some((AudioStrategy::Direct, tap));
    }
    debug!(narration = narration.label(), "Narration exposes no direct audio track");

    match narration.route_audio().await {
        Ok(tap) => {
            info!(strategy = %AudioStrategy::Routed, ?tap, "Recording audio attached");
            Some((AudioStrategy::Routed, tap))
        }
        Err(e) => {
            warn!(error = %e, "No recording audio available; recording video only");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lectern_media_core::testing::ScriptedNarration;

    fn stream() -> AudioTap {
        AudioTap::Stream {
            input: "narration.mp4".to_string(),
            stream_index: 1,
        }
    }

    fn rendered() -> AudioTap {
        AudioTap::Rendered {
            path: PathBuf::from("/tmp/narration.wav"),
        }
    }

    #[tokio::test]
    async fn test_direct_audio_preferred() {
        let narration = ScriptedNarration::new(Some(3.0))
            .with_direct_audio(stream())
            .with_routed_audio(rendered());
        assert_eq!(
            attach_audio(&narration).await,
            Some((AudioStrategy::Direct, stream()))
        );
    }

    #[tokio::test]
    async fn test_routed_audio_fallback() {
        let narration = ScriptedNarration::new(Some(3.0)).with_routed_audio(rendered());
        assert_eq!(
            attach_audio(&narration).await,
            Some((AudioStrategy::Routed, rendered()))
        );
    }

    #[tokio::test]
    async fn test_no_audio_records_video_only() {
        let narration = ScriptedNarration::new(Some(3.0));
        assert_eq!(attach_audio(&narration).await, None);
    }

    #[test]
    fn test_rendered_audio_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narration.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let file = RenderedAudioFile::for_tap(&AudioTap::Rendered { path: path.clone() });
        assert!(file.is_some());
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_stream_tap_has_no_file_to_remove() {
        assert!(RenderedAudioFile::for_tap(&stream()).is_none());
    }
}
