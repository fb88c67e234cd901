//! Lectern media contracts.
//!
//! This crate contains the backend-agnostic media capabilities used by the
//! timeline, render and capture crates without coupling them to a concrete
//! decoder or transport:
//! - **Narration:** the avatar video + audio track as a read-only capability
//! - **Playback clock:** the narration position that every component reads
//! - **Assets:** URL resolution and fetching of images and transcripts

pub mod asset;
pub mod clock;
pub mod narration;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use asset::*;
pub use clock::*;
pub use narration::*;
