//! Lectern Capture Engine
//!
//! Runs a lecture view and compiles it into a downloadable video.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── PlayerSession ────────────────────────────┐
//! │                                                                       │
//! │  NarrationSource ──events──► transport watcher (stall recovery, end)  │
//! │        │                                                              │
//! │        ▼                                                              │
//! │  timeline task ──watch<CompositionState>──► Compositor ──► frames     │
//! │                                                  │                    │
//! │  RecorderController ◄────────────────────────────┘                    │
//! │    fixed-rate capture ─► FrameEncoder (ffmpeg) ◄─ AudioTap            │
//! │                                  │                                    │
//! │                                  ▼                                    │
//! │                       <Topic>_lecture.webm                            │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod encoder;
pub mod player;
pub mod recorder;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use audio::{attach_audio, AudioStrategy};
pub use encoder::{
    select_codec, CodecChoice, EncoderFactory, EncoderSettings, EncoderStats,
    FfmpegEncoderFactory, FrameEncoder,
};
pub use player::{DownloadAction, PlayerInputs, PlayerSession};
pub use recorder::{CompileOptions, RecorderController, RecorderParts, RecorderSettings};
pub use transport::play_with_fallback;
