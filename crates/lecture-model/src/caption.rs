//! Time-coded transcript cues.

use serde::{Deserialize, Serialize};

/// A time-bounded unit of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// Start time in seconds.
    pub start: f64,

    /// End time in seconds (never before `start`).
    pub end: f64,

    /// Cue text with markup removed.
    pub text: String,

    /// Whitespace-separated words of `text` (never empty).
    pub words: Vec<String>,

    /// Number of transcript words that precede this cue.
    pub cumulative_start_words: usize,
}

impl CaptionCue {
    /// Build a cue from plain text. Returns `None` when the text has no words.
    ///
    /// An end time before the start is clamped to the start.
    pub fn new(start: f64, end: f64, text: &str) -> Option<Self> {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() || !start.is_finite() || !end.is_finite() {
            return None;
        }
        let words = text.split(' ').map(str::to_string).collect();
        let start = start.max(0.0);
        Some(Self {
            start,
            end: end.max(start),
            text,
            words,
            cumulative_start_words: 0,
        })
    }

    /// Cue length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` lies inside `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// The first `count` words joined by single spaces.
    pub fn prefix(&self, count: usize) -> String {
        self.words[..count.min(self.words.len())].join(" ")
    }
}

/// An ordered, non-empty cue list with cumulative word offsets assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    cues: Vec<CaptionCue>,
}

impl CaptionTrack {
    /// Sort cues by start time and assign cumulative word offsets.
    ///
    /// Returns `None` when there are no cues with words.
    pub fn new(mut cues: Vec<CaptionCue>) -> Option<Self> {
        cues.retain(|cue| !cue.words.is_empty());
        if cues.is_empty() {
            return None;
        }
        cues.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut cumulative = 0;
        for cue in &mut cues {
            cue.cumulative_start_words = cumulative;
            cumulative += cue.words.len();
        }
        Some(Self { cues })
    }

    /// Cues in ascending start order.
    pub fn cues(&self) -> &[CaptionCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Total number of words across all cues.
    pub fn total_words(&self) -> usize {
        self.cues
            .last()
            .map(|cue| cue.cumulative_start_words + cue.words.len())
            .unwrap_or(0)
    }

    /// Time of the last cue end.
    pub fn end_secs(&self) -> f64 {
        self.cues.iter().map(|cue| cue.end).fold(0.0, f64::max)
    }

    /// First cue whose `[start, end]` contains `t`.
    pub fn containing(&self, t: f64) -> Option<&CaptionCue> {
        self.cues.iter().find(|cue| cue.contains(t))
    }

    /// Latest-starting cue with `start <= t`.
    pub fn preceding(&self, t: f64) -> Option<&CaptionCue> {
        let idx = self.cues.partition_point(|cue| cue.start <= t);
        idx.checked_sub(1).map(|i| &self.cues[i])
    }

    /// Earliest-starting cue with `start > t`.
    pub fn following(&self, t: f64) -> Option<&CaptionCue> {
        let idx = self.cues.partition_point(|cue| cue.start <= t);
        self.cues.get(idx)
    }
}
