//! Caption-driven reveal.
//!
//! Visible words follow narration time through the caption cues. Inside a
//! cue, words appear in proportion to how far playback is through it. In a
//! gap between two cues the upcoming cue is previewed, never fully. Past the
//! last cue its words stay on screen.

use std::sync::Arc;

use lectern_lecture_model::caption::{CaptionCue, CaptionTrack};
use lectern_lecture_model::lecture::LectureContent;
use lectern_lecture_model::state::CompositionState;
use tracing::trace;

use crate::segment::ParagraphIndex;

/// Largest fraction of the next cue shown while still in the gap before it.
const GAP_PREVIEW_CAP: f64 = 0.9;

/// Words visible at one playback instant.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reveal<'a> {
    cue: &'a CaptionCue,
    words: usize,
}

impl Reveal<'_> {
    /// Transcript words shown so far, counted from the start of the track.
    fn cumulative(&self) -> usize {
        self.cue.cumulative_start_words + self.words
    }
}

/// Samples the caption track at narration time and writes the reveal into
/// the composition state.
#[derive(Debug, Clone)]
pub struct CaptionSampler {
    track: Arc<CaptionTrack>,
    lecture: Arc<LectureContent>,
    index: Arc<ParagraphIndex>,
    last_applied: Option<usize>,
}

impl CaptionSampler {
    pub fn new(
        track: Arc<CaptionTrack>,
        lecture: Arc<LectureContent>,
        index: Arc<ParagraphIndex>,
    ) -> Self {
        Self {
            track,
            lecture,
            index,
            last_applied: None,
        }
    }

    pub fn track(&self) -> &CaptionTrack {
        &self.track
    }

    /// Forget the last applied word count.
    pub fn reset(&mut self) {
        self.last_applied = None;
    }

    /// Whether playback has reached the end of the last cue.
    pub fn is_done_at(&self, playback_secs: f64) -> bool {
        playback_secs >= self.track.end_secs()
    }

    /// Apply the reveal for `playback_secs`. Returns whether `state` changed.
    pub fn tick(&mut self, playback_secs: f64, state: &mut CompositionState) -> bool {
        let Some(reveal) = reveal_at(&self.track, playback_secs) else {
            return false;
        };
        let cumulative = reveal.cumulative();
        if self.last_applied == Some(cumulative) {
            return false;
        }
        self.last_applied = Some(cumulative);

        state.revealed_text = reveal.cue.prefix(reveal.words);
        if let Some((section, paragraph)) = self.index.locate_word(cumulative - 1) {
            state.current_section = section;
            state.current_paragraph_index = paragraph;
            state.active_visualization = self.lecture.visualization_at(section, paragraph).cloned();
        }
        trace!(
            t = playback_secs,
            words = reveal.words,
            cumulative,
            "Caption reveal"
        );
        true
    }
}

fn reveal_at(track: &CaptionTrack, t: f64) -> Option<Reveal<'_>> {
    if let Some(cue) = track.containing(t) {
        let len = cue.words.len();
        let ratio = if cue.duration() > 0.0 {
            ((t - cue.start) / cue.duration()).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let words = ((len as f64 * ratio).round() as usize).clamp(1, len);
        return Some(Reveal { cue, words });
    }

    let prev = track.preceding(t);
    match (prev, track.following(t)) {
        (Some(prev), Some(next)) => {
            let gap = next.start - prev.end;
            if gap <= 0.0 {
                return Some(Reveal {
                    cue: prev,
                    words: prev.words.len(),
                });
            }
            let len = next.words.len();
            let progress = ((t - prev.end) / gap).clamp(0.0, GAP_PREVIEW_CAP);
            let words = ((len as f64 * progress).round() as usize)
                .min(len.saturating_sub(1))
                .max(1);
            Some(Reveal { cue: next, words })
        }
        (Some(prev), None) => Some(Reveal {
            cue: prev,
            words: prev.words.len(),
        }),
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_lecture_model::lecture::{SectionKey, VisualizationCue};
    use proptest::prelude::*;

    fn track(cues: &[(f64, f64, &str)]) -> Arc<CaptionTrack> {
        let cues = cues
            .iter()
            .filter_map(|(s, e, text)| CaptionCue::new(*s, *e, text))
            .collect();
        Arc::new(CaptionTrack::new(cues).unwrap())
    }

    fn sampler(track: Arc<CaptionTrack>) -> CaptionSampler {
        let lecture = Arc::new(LectureContent {
            topic: "t".to_string(),
            introduction: "Hello world again".to_string(),
            main_body: "This is the body".to_string(),
            conclusion: "Bye".to_string(),
            visualizations: vec![VisualizationCue {
                section: SectionKey::MainBody,
                paragraph_index: Some(0),
                prompt: "body".to_string(),
                image_path: Some("img/body.png".to_string()),
                snippet: None,
            }],
            video_path: "v.mp4".to_string(),
            captions_url: None,
        });
        let index = Arc::new(ParagraphIndex::build(&lecture));
        CaptionSampler::new(track, lecture, index)
    }

    #[test]
    fn test_single_word_cue() {
        let mut sampler = sampler(track(&[(0.0, 2.0, "Hello")]));
        let mut state = CompositionState::default();
        assert!(sampler.tick(1.0, &mut state));
        assert_eq!(state.revealed_text, "Hello");
    }

    #[test]
    fn test_reveal_is_proportional_inside_cue() {
        let mut sampler = sampler(track(&[(0.0, 4.0, "Hello world again friend")]));
        let mut state = CompositionState::default();

        sampler.tick(0.0, &mut state);
        assert_eq!(state.revealed_text, "Hello");
        sampler.tick(2.0, &mut state);
        assert_eq!(state.revealed_text, "Hello world");
        sampler.tick(4.0, &mut state);
        assert_eq!(state.revealed_text, "Hello world again friend");
    }

    #[test]
    fn test_unchanged_count_is_not_reapplied() {
        let mut sampler = sampler(track(&[(0.0, 4.0, "one two")]));
        let mut state = CompositionState::default();
        assert!(sampler.tick(0.1, &mut state));
        assert!(!sampler.tick(0.2, &mut state));
        sampler.reset();
        assert!(sampler.tick(0.2, &mut state));
    }

    #[test]
    fn test_gap_previews_next_cue_without_finishing_it() {
        let mut sampler = sampler(track(&[
            (0.0, 1.0, "Hello world again"),
            (3.0, 4.0, "This is the body"),
        ]));
        let mut state = CompositionState::default();

        sampler.tick(1.5, &mut state);
        assert_eq!(state.revealed_text, "This");
        sampler.tick(2.99, &mut state);
        assert_eq!(state.revealed_text, "This is the");
    }

    #[test]
    fn test_one_word_next_cue_in_gap_shows_its_word() {
        let mut sampler = sampler(track(&[(0.0, 1.0, "Hello"), (3.0, 4.0, "Bye")]));
        let mut state = CompositionState::default();
        sampler.tick(2.0, &mut state);
        assert_eq!(state.revealed_text, "Bye");
    }

    #[test]
    fn test_before_first_cue_and_after_last() {
        let mut sampler = sampler(track(&[(1.0, 2.0, "Hello world")]));
        let mut state = CompositionState::default();
        assert!(!sampler.tick(0.5, &mut state));
        assert_eq!(state.revealed_text, "");

        sampler.tick(10.0, &mut state);
        assert_eq!(state.revealed_text, "Hello world");
        assert!(sampler.is_done_at(10.0));
    }

    #[test]
    fn test_zero_length_cue_reveals_everything() {
        let mut sampler = sampler(track(&[(1.0, 1.0, "instant cue")]));
        let mut state = CompositionState::default();
        sampler.tick(1.0, &mut state);
        assert_eq!(state.revealed_text, "instant cue");
    }

    #[test]
    fn test_section_follows_transcript_position() {
        let mut sampler = sampler(track(&[
            (0.0, 1.0, "Hello world again"),
            (1.0, 2.0, "This is the body"),
            (2.0, 3.0, "Bye"),
        ]));
        let mut state = CompositionState::default();

        sampler.tick(0.5, &mut state);
        assert_eq!(state.current_section, SectionKey::Introduction);
        assert!(!state.has_image());

        sampler.tick(1.5, &mut state);
        assert_eq!(state.current_section, SectionKey::MainBody);
        assert!(state.has_image());

        sampler.tick(2.5, &mut state);
        assert_eq!(state.current_section, SectionKey::Conclusion);
    }

    proptest! {
        #[test]
        fn words_never_decrease_within_cue(
            len in 1usize..30,
            duration in 0.1f64..20.0,
            times in proptest::collection::vec(0.0f64..1.0, 1..40),
        ) {
            let text = vec!["w"; len].join(" ");
            let track = track(&[(0.0, duration, text.as_str())]);
            let mut times = times;
            times.sort_by(|a, b| a.total_cmp(b));

            let mut last = 0;
            for fraction in times {
                let reveal = reveal_at(&track, fraction * duration).unwrap();
                prop_assert!(reveal.words >= 1 && reveal.words <= len);
                prop_assert!(reveal.words >= last);
                last = reveal.words;
            }
        }
    }
}
