//! Typing-speed calculation for simulated reveal.
//!
//! Each paragraph gets a share of the narration proportional to its
//! character count, never less than [`MIN_PARAGRAPH_DURATION_MS`]. The
//! per-character interval spreads that share evenly.

use lectern_common::clock::secs_to_ms;

/// Shortest time any paragraph is allowed to take.
pub const MIN_PARAGRAPH_DURATION_MS: u64 = 1200;

/// Fastest allowed typing interval.
pub const MIN_CHAR_INTERVAL_MS: u64 = 8;

/// Interval used before the narration duration is known.
pub const DEFAULT_CHAR_INTERVAL_MS: u64 = 18;

/// Pause after a paragraph is fully revealed.
pub const PARAGRAPH_SETTLE_MS: u64 = 650;

/// Time budget for a paragraph of `paragraph_chars` characters.
pub fn paragraph_duration_ms(
    narration_secs: f64,
    paragraph_chars: usize,
    total_chars: usize,
) -> u64 {
    let share = paragraph_chars as f64 / total_chars.max(1) as f64;
    let budget = secs_to_ms(narration_secs * share);
    budget.max(MIN_PARAGRAPH_DURATION_MS)
}

/// Milliseconds between revealed characters.
///
/// Without a usable narration duration the default interval applies.
pub fn char_interval_ms(
    narration_secs: Option<f64>,
    paragraph_chars: usize,
    total_chars: usize,
) -> u64 {
    let Some(secs) = narration_secs.filter(|d| d.is_finite() && *d > 0.0) else {
        return DEFAULT_CHAR_INTERVAL_MS;
    };
    let budget = paragraph_duration_ms(secs, paragraph_chars, total_chars);
    (budget / paragraph_chars.max(1) as u64).max(MIN_CHAR_INTERVAL_MS)
}
