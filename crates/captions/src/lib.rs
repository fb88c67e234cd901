//! Lectern Caption Resolver
//!
//! Obtains a time-coded transcript for a lecture's narration:
//! - **Parsing:** WebVTT and SRT files into ordered caption cues
//! - **Embedded tracks:** cues carried inside the narration container
//! - **Resolution:** ordered candidate sources, first success wins
//! - **Export:** writing a resolved track back out as SRT or WebVTT
//!
//! Failing to find captions is an expected outcome. Callers fall back to
//! simulated pacing.

pub mod embedded;
pub mod export;
pub mod parse;
pub mod resolver;

pub use embedded::*;
pub use export::*;
pub use parse::*;
pub use resolver::*;
