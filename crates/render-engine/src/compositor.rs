//! Frame compositor: title, revealed text, visualization and avatar tile.
//!
//! Drawing never fails. Anything that cannot be drawn (no font, an image that
//! was not preloaded, a narration without a frame) is left out of the frame.

use std::sync::Arc;

use lectern_common::config::PlayerDefaults;
use lectern_lecture_model::state::CompositionState;
use lectern_media_core::narration::{NarrationSource, VideoFrame};
use tiny_skia::Pixmap;
use tracing::warn;

use crate::binder::VisualAssetBinder;
use crate::layout::{FrameLayout, Rect, BODY_SIZE, MARGIN, MAX_BODY_LINES, TITLE_SIZE};
use crate::paint::{
    self, BACKGROUND, BODY_COLOR, FRAME_BORDER, PLACEHOLDER_FILL, PLACEHOLDER_LABEL, TITLE_COLOR,
};
use crate::text::{wrap_lines, FontSet, TextPainter, TextStyle};

const TITLE_STYLE: TextStyle = TextStyle {
    size: TITLE_SIZE,
    bold: true,
    color: TITLE_COLOR,
};

const BODY_STYLE: TextStyle = TextStyle {
    size: BODY_SIZE,
    bold: false,
    color: BODY_COLOR,
};

const PLACEHOLDER_STYLE: TextStyle = TextStyle {
    size: 24.0,
    bold: true,
    color: PLACEHOLDER_LABEL,
};

const IMAGE_FRAME_PADDING: f32 = 6.0;
const IMAGE_FRAME_RADIUS: f32 = 18.0;
const AVATAR_RADIUS: f32 = 24.0;

/// Draws presentation frames.
pub struct Compositor {
    width: u32,
    height: u32,
    painter: Option<TextPainter>,
    /// Last narration frame converted to a pixmap, reused while the
    /// narration keeps presenting the same buffer.
    avatar: Option<(Arc<Vec<u8>>, Pixmap)>,
}

impl Compositor {
    pub fn new(width: u32, height: u32, painter: Option<TextPainter>) -> Self {
        Self {
            width,
            height,
            painter,
            avatar: None,
        }
    }

    /// Build from player defaults. Without a usable font, frames are drawn
    /// without text.
    pub fn from_config(player: &PlayerDefaults) -> Self {
        let painter = match FontSet::load(player.font_path.as_deref()) {
            Ok(fonts) => Some(TextPainter::new(fonts)),
            Err(e) => {
                warn!(error = %e, "Drawing frames without text");
                None
            }
        };
        Self::new(player.width, player.height, painter)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_text(&self) -> bool {
        self.painter.is_some()
    }

    /// A blank canvas of the output size.
    pub fn new_canvas(&self) -> Option<Pixmap> {
        Pixmap::new(self.width, self.height)
    }

    /// Draw the frame for `state` onto `canvas`.
    pub fn draw(
        &mut self,
        canvas: &mut Pixmap,
        state: &CompositionState,
        images: &VisualAssetBinder,
        narration: &dyn NarrationSource,
    ) {
        let layout = FrameLayout::compute(canvas.width(), canvas.height(), state.has_image());
        paint::clear(canvas, BACKGROUND);

        self.draw_text(canvas, &layout, state);
        if let Some(panel) = layout.image_panel {
            let image = state
                .active_visualization
                .as_ref()
                .and_then(|cue| images.image_for(cue));
            if let Some(image) = image {
                draw_image(canvas, panel, image);
            }
        }
        self.draw_avatar(canvas, layout.avatar, narration);
    }

    fn draw_text(&mut self, canvas: &mut Pixmap, layout: &FrameLayout, state: &CompositionState) {
        let Some(painter) = self.painter.as_mut() else {
            return;
        };
        painter.draw_line(
            canvas,
            state.current_section.title(),
            MARGIN,
            layout.title_baseline,
            &TITLE_STYLE,
        );

        let lines = wrap_lines(&state.revealed_text, layout.text_width, |line| {
            painter.measure(line, &BODY_STYLE)
        });
        let visible = &lines[lines.len().saturating_sub(MAX_BODY_LINES)..];
        for (i, line) in visible.iter().enumerate() {
            painter.draw_line(
                canvas,
                line,
                MARGIN,
                layout.body_line_baseline(i),
                &BODY_STYLE,
            );
        }
    }

    fn draw_avatar(&mut self, canvas: &mut Pixmap, tile: Rect, narration: &dyn NarrationSource) {
        paint::drop_shadow(canvas, tile, AVATAR_RADIUS, 6.0, 24.0);
        paint::fill_rounded_rect(canvas, tile, AVATAR_RADIUS, BACKGROUND);

        let live = narration.ready_state().can_draw() && !narration.is_paused();
        if let Some(frame) = live.then(|| narration.current_frame()).flatten() {
            if self.draw_frame(canvas, tile, &frame) {
                return;
            }
        }

        paint::fill_rounded_rect(canvas, tile, AVATAR_RADIUS, PLACEHOLDER_FILL);
        if let Some(painter) = self.painter.as_mut() {
            painter.draw_line(
                canvas,
                "Avatar",
                tile.x + 18.0,
                tile.y + 36.0,
                &PLACEHOLDER_STYLE,
            );
        }
    }

    fn draw_frame(&mut self, canvas: &mut Pixmap, tile: Rect, frame: &VideoFrame) -> bool {
        let Some(mask) = paint::rounded_clip(canvas, tile, AVATAR_RADIUS) else {
            return false;
        };
        let Some(pixmap) = self.avatar_pixmap(frame) else {
            return false;
        };
        paint::draw_cover(canvas, pixmap.as_ref(), tile, Some(&mask));
        true
    }

    fn avatar_pixmap(&mut self, frame: &VideoFrame) -> Option<&Pixmap> {
        let stale = match &self.avatar {
            Some((buffer, _)) => !Arc::ptr_eq(buffer, &frame.rgba),
            None => true,
        };
        if stale {
            let pixmap = paint::pixmap_from_rgba(frame.width, frame.height, frame.rgba.to_vec())?;
            self.avatar = Some((frame.rgba.clone(), pixmap));
        }
        self.avatar.as_ref().map(|(_, pixmap)| pixmap)
    }
}

fn draw_image(canvas: &mut Pixmap, panel: Rect, image: &Pixmap) {
    let dest = panel.contain(image.width() as f32, image.height() as f32);
    if dest.w <= 0.0 || dest.h <= 0.0 {
        return;
    }
    let frame = dest.inflate(IMAGE_FRAME_PADDING);
    paint::fill_rounded_rect(canvas, frame, IMAGE_FRAME_RADIUS, BACKGROUND);
    paint::draw_scaled(canvas, image.as_ref(), dest, None);
    paint::stroke_rounded_rect(canvas, frame, IMAGE_FRAME_RADIUS, 2.0, FRAME_BORDER);
}
