//! Lectern Lecture Model
//!
//! Defines the core data contracts for a lecture view:
//! - **Lecture:** Immutable generated content (sections, visualizations, narration)
//! - **Captions:** Time-coded transcript cues with cumulative word offsets
//! - **Composition state:** What is visible right now (single writer, many readers)
//! - **Recording session:** Status and progress of one compilation attempt
//!
//! This crate is pure data: no timers, no I/O beyond loading a lecture file.

pub mod caption;
pub mod lecture;
pub mod session;
pub mod state;

pub use caption::*;
pub use lecture::*;
pub use session::*;
pub use state::*;
