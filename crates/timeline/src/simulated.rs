//! Simulated typing: the fallback driver when no captions exist.
//!
//! Paragraphs are revealed one character at a time. After the last character
//! the paragraph stays on screen for [`PARAGRAPH_SETTLE_MS`] before the next
//! one starts. Time is virtual: callers pass the milliseconds of active
//! playback and the pacer catches up on everything that became due.

use std::sync::Arc;

use lectern_lecture_model::lecture::{LectureContent, SectionKey};
use lectern_lecture_model::state::CompositionState;
use tracing::debug;

use crate::pacing::{char_interval_ms, PARAGRAPH_SETTLE_MS};
use crate::segment::ParagraphIndex;

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    NotStarted,
    Typing {
        section: SectionKey,
        paragraph: usize,
        chars: Vec<char>,
        revealed: usize,
        interval_ms: u64,
        next_char_at: u64,
    },
    Settling {
        section: SectionKey,
        paragraph: usize,
        advance_at: u64,
    },
    Done,
}

/// Character-by-character reveal paced by each paragraph's share of the
/// narration.
#[derive(Debug, Clone)]
pub struct SimulatedPacer {
    lecture: Arc<LectureContent>,
    index: Arc<ParagraphIndex>,
    narration_secs: Option<f64>,
    phase: Phase,
}

impl SimulatedPacer {
    pub fn new(
        lecture: Arc<LectureContent>,
        index: Arc<ParagraphIndex>,
        narration_secs: Option<f64>,
    ) -> Self {
        Self {
            lecture,
            index,
            narration_secs,
            phase: Phase::NotStarted,
        }
    }

    /// Update the narration duration. Takes effect at the next paragraph.
    pub fn set_narration_duration(&mut self, secs: Option<f64>) {
        self.narration_secs = secs;
    }

    /// Return to the first paragraph. The next tick starts typing afresh.
    pub fn reset(&mut self) {
        self.phase = Phase::NotStarted;
    }

    /// Whether the last paragraph has been revealed and settled.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Advance to `now_ms` of active playback, applying every character and
    /// paragraph change that became due. Returns whether `state` changed.
    pub fn tick(&mut self, now_ms: u64, state: &mut CompositionState) -> bool {
        let mut changed = false;
        loop {
            match &mut self.phase {
                Phase::NotStarted => match self.index.first_position() {
                    Some((section, paragraph)) => {
                        self.enter(section, paragraph, 0, state);
                        changed = true;
                    }
                    None => {
                        self.phase = Phase::Done;
                        return changed;
                    }
                },
                Phase::Typing {
                    section,
                    paragraph,
                    chars,
                    revealed,
                    interval_ms,
                    next_char_at,
                } => {
                    while *revealed < chars.len() && *next_char_at <= now_ms {
                        state.revealed_text.push(chars[*revealed]);
                        *revealed += 1;
                        *next_char_at += *interval_ms;
                        changed = true;
                    }
                    if *revealed < chars.len() {
                        return changed;
                    }
                    let typed_at = *next_char_at - *interval_ms;
                    self.phase = Phase::Settling {
                        section: *section,
                        paragraph: *paragraph,
                        advance_at: typed_at + PARAGRAPH_SETTLE_MS,
                    };
                }
                Phase::Settling {
                    section,
                    paragraph,
                    advance_at,
                } => {
                    if *advance_at > now_ms {
                        return changed;
                    }
                    let at = *advance_at;
                    match self.index.next_position(*section, *paragraph) {
                        Some((next_section, next_paragraph)) => {
                            self.enter(next_section, next_paragraph, at, state);
                            changed = true;
                        }
                        None => {
                            debug!("Simulated reveal finished");
                            self.phase = Phase::Done;
                            return changed;
                        }
                    }
                }
                Phase::Done => return changed,
            }
        }
    }

    fn enter(
        &mut self,
        section: SectionKey,
        paragraph: usize,
        started_at: u64,
        state: &mut CompositionState,
    ) {
        let text = self.index.paragraph(section, paragraph).unwrap_or_default();
        let chars: Vec<char> = text.chars().collect();
        let interval_ms = char_interval_ms(
            self.narration_secs,
            chars.len(),
            self.index.total_chars(),
        );
        debug!(
            section = %section,
            paragraph,
            chars = chars.len(),
            interval_ms,
            "Typing paragraph"
        );

        state.current_section = section;
        state.current_paragraph_index = paragraph;
        state.revealed_text.clear();
        state.active_visualization = self.lecture.visualization_at(section, paragraph).cloned();

        self.phase = Phase::Typing {
            section,
            paragraph,
            chars,
            revealed: 0,
            interval_ms,
            next_char_at: started_at + interval_ms,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_lecture_model::lecture::VisualizationCue;
    use proptest::prelude::*;

    fn lecture(intro: &str, body: &str, conclusion: &str) -> Arc<LectureContent> {
        Arc::new(LectureContent {
            topic: "Photosynthesis".to_string(),
            introduction: intro.to_string(),
            main_body: body.to_string(),
            conclusion: conclusion.to_string(),
            visualizations: vec![VisualizationCue {
                section: SectionKey::MainBody,
                paragraph_index: Some(0),
                prompt: "leaf".to_string(),
                image_path: Some("img/leaf.png".to_string()),
                snippet: None,
            }],
            video_path: "v.mp4".to_string(),
            captions_url: None,
        })
    }

    fn pacer(lecture: Arc<LectureContent>, secs: Option<f64>) -> SimulatedPacer {
        let index = Arc::new(ParagraphIndex::build(&lecture));
        SimulatedPacer::new(lecture, index, secs)
    }

    #[test]
    fn test_types_one_character_per_interval() {
        let mut pacer = pacer(lecture("Hi", "", ""), None);
        let mut state = CompositionState::default();

        assert!(pacer.tick(0, &mut state));
        assert_eq!(state.revealed_text, "");
        pacer.tick(17, &mut state);
        assert_eq!(state.revealed_text, "");
        pacer.tick(18, &mut state);
        assert_eq!(state.revealed_text, "H");
        pacer.tick(36, &mut state);
        assert_eq!(state.revealed_text, "Hi");
    }

    #[test]
    fn test_settles_then_advances_across_sections() {
        let mut pacer = pacer(lecture("A.\n\nB.", "Body.", ""), None);
        let mut state = CompositionState::default();

        pacer.tick(0, &mut state);
        // "A." fully typed at 36, next paragraph starts at 36 + 650
        pacer.tick(685, &mut state);
        assert_eq!(state.current_paragraph_index, 0);
        assert_eq!(state.revealed_text, "A.");
        pacer.tick(686, &mut state);
        assert_eq!(state.current_paragraph_index, 1);
        assert_eq!(state.revealed_text, "");

        pacer.tick(2000, &mut state);
        assert_eq!(state.current_section, SectionKey::MainBody);
        assert_eq!(state.revealed_text, "Body.");
        assert!(state.has_image());
    }

    #[test]
    fn test_done_keeps_last_paragraph() {
        let mut pacer = pacer(lecture("", "", "End."), Some(1.0));
        let mut state = CompositionState::default();

        pacer.tick(0, &mut state);
        assert_eq!(state.current_section, SectionKey::Conclusion);
        pacer.tick(60_000, &mut state);
        assert!(pacer.is_done());
        assert_eq!(state.revealed_text, "End.");
        assert!(!pacer.tick(120_000, &mut state));
    }

    #[test]
    fn test_empty_lecture_finishes_immediately() {
        let mut pacer = pacer(lecture("", " ", ""), None);
        let mut state = CompositionState::default();
        assert!(!pacer.tick(0, &mut state));
        assert!(pacer.is_done());
    }

    #[test]
    fn test_duration_known_later_applies_to_next_paragraph() {
        // two paragraphs of 10 chars each
        let mut pacer = pacer(lecture("0123456789\nabcdefghij", "", ""), None);
        let mut state = CompositionState::default();

        pacer.tick(0, &mut state);
        pacer.set_narration_duration(Some(20.0));
        pacer.tick(180, &mut state);
        assert_eq!(state.revealed_text.len(), 10);

        // second paragraph starts at 830 with 10_000 / 10 = 1000 ms per char
        pacer.tick(1829, &mut state);
        assert_eq!(state.current_paragraph_index, 1);
        assert_eq!(state.revealed_text, "");
        pacer.tick(1830, &mut state);
        assert_eq!(state.revealed_text, "a");
    }

    #[test]
    fn test_reset_restarts_from_first_paragraph() {
        let mut pacer = pacer(lecture("Intro", "Body", ""), None);
        let mut state = CompositionState::default();
        pacer.tick(10_000, &mut state);
        assert!(pacer.is_done());

        pacer.reset();
        state.rewind();
        pacer.tick(0, &mut state);
        assert_eq!(state.current_section, SectionKey::Introduction);
        assert!(!pacer.is_done());
    }

    proptest! {
        #[test]
        fn catch_up_matches_fine_grained_ticks(
            step in 1u64..200,
            end in 0u64..20_000,
        ) {
            let lec = lecture("One two.\n\nThree four five.", "Six.", "Seven eight.");
            let mut coarse = pacer(lec.clone(), Some(12.0));
            let mut fine = pacer(lec, Some(12.0));
            let mut coarse_state = CompositionState::default();
            let mut fine_state = CompositionState::default();

            let mut t = 0;
            while t < end {
                fine.tick(t, &mut fine_state);
                t += step;
            }
            fine.tick(end, &mut fine_state);
            coarse.tick(end, &mut coarse_state);

            prop_assert_eq!(coarse_state, fine_state);
        }
    }
}
