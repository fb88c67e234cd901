//! Lectern Render Engine
//!
//! Draws one presentation frame from a composition state snapshot.
//!
//! # Frame Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Section title                     ┌──────────────────┐  │
//! │  revealed text, wrapped to the     │ visualization    │  │
//! │  text column, newest 16 lines      │ (contain-fit)    │  │
//! │                                    └──────────────────┘  │
//! │                                          ┌────────────┐  │
//! │                                          │   avatar   │  │
//! │                                          └────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Without an image the media column shrinks to a stripe that only holds
//! the avatar tile.

pub mod binder;
pub mod compositor;
pub mod layout;
pub mod paint;
pub mod text;

pub use binder::{decode_image, VisualAssetBinder};
pub use compositor::Compositor;
pub use layout::FrameLayout;
pub use text::{wrap_lines, FontSet, TextPainter, TextStyle};
