//! Mode selection for a lecture view.

use std::fmt;
use std::sync::Arc;

use lectern_lecture_model::caption::CaptionTrack;
use lectern_lecture_model::lecture::LectureContent;
use lectern_lecture_model::state::CompositionState;
use tracing::info;

use crate::caption_sync::CaptionSampler;
use crate::segment::ParagraphIndex;
use crate::simulated::SimulatedPacer;

/// Which source decides the visible text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// Character-by-character reveal paced from text length.
    Simulated,
    /// Word reveal following caption cue timing.
    CaptionDriven,
}

impl fmt::Display for DriverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverMode::Simulated => f.write_str("simulated"),
            DriverMode::CaptionDriven => f.write_str("caption-driven"),
        }
    }
}

/// The single writer of reveal progress for one lecture view.
///
/// The mode is chosen once, at construction, and never switches.
#[derive(Debug, Clone)]
pub enum TimelineDriver {
    Simulated(SimulatedPacer),
    CaptionDriven(CaptionSampler),
}

impl TimelineDriver {
    /// Caption-driven when a track is available, simulated otherwise.
    pub fn new(
        lecture: Arc<LectureContent>,
        captions: Option<CaptionTrack>,
        narration_secs: Option<f64>,
    ) -> Self {
        let index = Arc::new(ParagraphIndex::build(&lecture));
        let driver = match captions {
            Some(track) => {
                TimelineDriver::CaptionDriven(CaptionSampler::new(Arc::new(track), lecture, index))
            }
            None => TimelineDriver::Simulated(SimulatedPacer::new(lecture, index, narration_secs)),
        };
        info!(mode = %driver.mode(), "Timeline driver selected");
        driver
    }

    pub fn mode(&self) -> DriverMode {
        match self {
            TimelineDriver::Simulated(_) => DriverMode::Simulated,
            TimelineDriver::CaptionDriven(_) => DriverMode::CaptionDriven,
        }
    }

    /// Advance the reveal.
    ///
    /// `active_ms` is the accumulated time spent playing and paces simulated
    /// mode. `playback_secs` is the narration position and drives caption
    /// mode. Returns whether `state` changed.
    pub fn tick(&mut self, active_ms: u64, playback_secs: f64, state: &mut CompositionState) -> bool {
        match self {
            TimelineDriver::Simulated(pacer) => pacer.tick(active_ms, state),
            TimelineDriver::CaptionDriven(sampler) => sampler.tick(playback_secs, state),
        }
    }

    /// Return to the start of the lecture.
    pub fn reset(&mut self) {
        match self {
            TimelineDriver::Simulated(pacer) => pacer.reset(),
            TimelineDriver::CaptionDriven(sampler) => sampler.reset(),
        }
    }

    pub fn set_narration_duration(&mut self, secs: Option<f64>) {
        if let TimelineDriver::Simulated(pacer) = self {
            pacer.set_narration_duration(secs);
        }
    }

    /// Whether the reveal has nothing left to show at `playback_secs`.
    pub fn is_done(&self, playback_secs: f64) -> bool {
        match self {
            TimelineDriver::Simulated(pacer) => pacer.is_done(),
            TimelineDriver::CaptionDriven(sampler) => sampler.is_done_at(playback_secs),
        }
    }
}
