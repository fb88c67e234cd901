//! Frame geometry.

/// Outer margin on every side.
pub const MARGIN: f32 = 64.0;

/// Space between the text column and the media column.
pub const GUTTER: f32 = 40.0;

/// Edge length of the square avatar tile.
pub const AVATAR_SIZE: f32 = 320.0;

/// Vertical space between the image panel and the avatar tile.
pub const AVATAR_GAP: f32 = 28.0;

/// Share of the canvas width given to text when an image is shown.
pub const TEXT_COLUMN_SHARE: f32 = 0.56;

pub const TITLE_SIZE: f32 = 46.0;
pub const TITLE_BASELINE_OFFSET: f32 = 52.0;
pub const BODY_SIZE: f32 = 34.0;
pub const BODY_LINE_HEIGHT: f32 = 52.0;
pub const BODY_BASELINE_OFFSET: f32 = TITLE_BASELINE_OFFSET + 36.0;

/// Only the newest wrapped lines are drawn.
pub const MAX_BODY_LINES: usize = 16;

/// The image panel is skipped when it would be this short or shorter.
pub const MIN_IMAGE_PANEL_HEIGHT: f32 = 40.0;

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grow on every side by `by` pixels.
    pub fn inflate(&self, by: f32) -> Self {
        Self::new(self.x - by, self.y - by, self.w + 2.0 * by, self.h + 2.0 * by)
    }

    /// The largest rectangle with the given aspect ratio that fits inside
    /// this one, centered.
    pub fn contain(&self, content_w: f32, content_h: f32) -> Self {
        if content_w <= 0.0 || content_h <= 0.0 || self.w <= 0.0 || self.h <= 0.0 {
            return Self::new(self.x, self.y, 0.0, 0.0);
        }
        let content_ar = content_w / content_h;
        let box_ar = self.w / self.h;
        let (w, h) = if content_ar > box_ar {
            (self.w, self.w / content_ar)
        } else {
            (self.h * content_ar, self.h)
        };
        Self::new(self.x + (self.w - w) / 2.0, self.y + (self.h - h) / 2.0, w, h)
    }
}

/// Where everything goes on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    pub canvas_w: f32,
    pub canvas_h: f32,
    /// Width available to wrapped body text.
    pub text_width: f32,
    pub title_baseline: f32,
    pub body_baseline: f32,
    /// The image panel, when an image is active and there is room for it.
    pub image_panel: Option<Rect>,
    pub avatar: Rect,
}

impl FrameLayout {
    pub fn compute(canvas_w: u32, canvas_h: u32, has_image: bool) -> Self {
        let canvas_w = canvas_w as f32;
        let canvas_h = canvas_h as f32;

        let (text_width, media_width) = if has_image {
            let text = (canvas_w * TEXT_COLUMN_SHARE).floor();
            (text, canvas_w - MARGIN - text - GUTTER - MARGIN)
        } else {
            let stripe = AVATAR_SIZE + 64.0;
            (canvas_w - MARGIN - MARGIN - stripe, stripe)
        };

        let media = Rect::new(
            MARGIN + text_width + GUTTER,
            MARGIN,
            media_width,
            canvas_h - MARGIN - MARGIN,
        );
        let avatar = Rect::new(
            media.right() - AVATAR_SIZE,
            media.bottom() - AVATAR_SIZE,
            AVATAR_SIZE,
            AVATAR_SIZE,
        );
        let panel_height = (media.h - AVATAR_SIZE - AVATAR_GAP).max(0.0);
        let image_panel = (has_image && panel_height > MIN_IMAGE_PANEL_HEIGHT)
            .then(|| Rect::new(media.x, media.y, media.w, panel_height));

        Self {
            canvas_w,
            canvas_h,
            text_width,
            title_baseline: MARGIN + TITLE_BASELINE_OFFSET,
            body_baseline: MARGIN + BODY_BASELINE_OFFSET,
            image_panel,
            avatar,
        }
    }

    /// Baseline of the `line`-th drawn body line.
    pub fn body_line_baseline(&self, line: usize) -> f32 {
        self.body_baseline + line as f32 * BODY_LINE_HEIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_layout_at_1080p() {
        let layout = FrameLayout::compute(1920, 1080, true);
        assert_eq!(layout.text_width, 1075.0);
        let panel = layout.image_panel.unwrap();
        assert_eq!(panel.x, 64.0 + 1075.0 + 40.0);
        assert_eq!(panel.w, 1920.0 - 64.0 - 1075.0 - 40.0 - 64.0);
        assert_eq!(panel.h, 1080.0 - 128.0 - 320.0 - 28.0);
        assert_eq!(layout.avatar, Rect::new(1856.0 - 320.0, 1016.0 - 320.0, 320.0, 320.0));
        assert_eq!(layout.title_baseline, 116.0);
        assert_eq!(layout.body_line_baseline(1), 204.0);
    }

    #[test]
    fn test_no_image_layout_uses_avatar_stripe() {
        let layout = FrameLayout::compute(1920, 1080, false);
        assert!(layout.image_panel.is_none());
        assert_eq!(layout.text_width, 1920.0 - 128.0 - 384.0);
        assert_eq!(layout.avatar.right(), 1856.0);
        assert_eq!(layout.avatar.bottom(), 1016.0);
    }

    #[test]
    fn test_short_canvas_drops_image_panel() {
        let layout = FrameLayout::compute(1920, 128 + 320 + 28 + 40, true);
        assert!(layout.image_panel.is_none());
    }

    #[test]
    fn test_contain_fit() {
        let panel = Rect::new(0.0, 0.0, 400.0, 200.0);
        let wide = panel.contain(800.0, 200.0);
        assert_eq!(wide, Rect::new(0.0, 50.0, 400.0, 100.0));
        let tall = panel.contain(100.0, 200.0);
        assert_eq!(tall, Rect::new(150.0, 0.0, 100.0, 200.0));
        assert_eq!(panel.contain(0.0, 10.0).w, 0.0);
    }
}
