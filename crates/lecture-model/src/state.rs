//! Per-frame composition state.

use serde::{Deserialize, Serialize};

use crate::lecture::{SectionKey, VisualizationCue};

/// Everything the compositor needs to know about "now".
///
/// Exactly one timeline driver writes this value; the compositor and the
/// recorder only read snapshots of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionState {
    pub current_section: SectionKey,
    pub current_paragraph_index: usize,
    pub revealed_text: String,
    pub active_visualization: Option<VisualizationCue>,
    pub is_playing: bool,
    pub is_muted: bool,
    pub narration_duration_secs: Option<f64>,
}

impl Default for CompositionState {
    fn default() -> Self {
        Self {
            current_section: SectionKey::Introduction,
            current_paragraph_index: 0,
            revealed_text: String::new(),
            active_visualization: None,
            is_playing: false,
            is_muted: true,
            narration_duration_secs: None,
        }
    }
}

impl CompositionState {
    /// Rewind the reveal position to the beginning of the lecture.
    ///
    /// Playback flags and the known narration duration are kept.
    pub fn rewind(&mut self) {
        self.current_section = SectionKey::Introduction;
        self.current_paragraph_index = 0;
        self.revealed_text.clear();
        self.active_visualization = None;
    }

    /// Whether the active visualization carries an image.
    pub fn has_image(&self) -> bool {
        self.active_visualization
            .as_ref()
            .is_some_and(VisualizationCue::has_image)
    }
}
