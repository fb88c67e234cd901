//! Narration transport helpers shared by the player and the recorder.

use lectern_media_core::narration::{NarrationSource, PlayError};
use tracing::{debug, warn};

/// Start the narration unmuted, retrying muted when that is refused.
///
/// Returns the muted flag playback started with, or `None` when the
/// narration would not play at all.
pub fn play_with_fallback(narration: &dyn NarrationSource) -> Option<bool> {
    match narration.play(false) {
        Ok(()) => return Some(false),
        Err(PlayError::AutoplayRejected) => {
            debug!(narration = narration.label(), "Unmuted playback rejected, retrying muted");
        }
        Err(e) => debug!(error = %e, "Unmuted playback failed, retrying muted"),
    }
    match narration.play(true) {
        Ok(()) => Some(true),
        Err(e) => {
            warn!(narration = narration.label(), error = %e, "Narration would not play");
            None
        }
    }
}
