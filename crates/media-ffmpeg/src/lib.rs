//! Lectern FFmpeg media backend
//!
//! Concrete implementations of the media contracts:
//! - **Narration:** ffprobe metadata plus an ffmpeg software decoder paced
//!   against the playback clock
//! - **Fetching:** filesystem and HTTP asset fetchers behind one router
//! - **Capabilities:** tool and encoder detection with user guidance

pub mod capabilities;
pub mod fetch;
pub mod narration;
pub mod probe;

pub use fetch::*;
pub use narration::*;
pub use probe::*;
