//! Cues from a text track embedded in the narration container.

use lectern_lecture_model::caption::CaptionCue;
use lectern_media_core::narration::TextTrackCue;

use crate::parse::strip_markup;

/// Convert embedded text-track cues, dropping cues that are empty once
/// markup is removed.
pub fn cues_from_text_track(raw: &[TextTrackCue]) -> Vec<CaptionCue> {
    raw.iter()
        .filter_map(|cue| CaptionCue::new(cue.start, cue.end, &strip_markup(&cue.text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(start: f64, end: f64, text: &str) -> TextTrackCue {
        TextTrackCue {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_markup_stripped_and_empties_skipped() {
        let cues = cues_from_text_track(&[
            raw(0.0, 1.0, "<c.yellow>Hello</c> world"),
            raw(1.0, 2.0, "  <br>  "),
            raw(2.0, 3.0, "again"),
        ]);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].words, vec!["Hello", "world"]);
        assert_eq!(cues[1].start, 2.0);
    }
}
