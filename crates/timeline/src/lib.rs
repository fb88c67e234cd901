//! Lectern Timeline Driver
//!
//! Decides what text is visible at every moment of a lecture:
//! - **Segmenter:** splits section text into paragraphs and measures it
//! - **Simulated pacing:** reveals one character per interval, with the
//!   interval derived from the paragraph's share of the narration
//! - **Caption sync:** reveals words in step with caption cue timing
//! - **Runner:** the tokio task that owns the composition state
//!
//! The drivers are pure state machines over virtual time. Only the runner
//! touches real timers.

pub mod caption_sync;
pub mod driver;
pub mod pacing;
pub mod runner;
pub mod segment;
pub mod simulated;

pub use caption_sync::CaptionSampler;
pub use driver::{DriverMode, TimelineDriver};
pub use runner::{spawn_timeline, TimelineCommand, TimelineHandle};
pub use segment::{segment, ParagraphIndex};
pub use simulated::SimulatedPacer;
