//! tiny-skia drawing helpers.

use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint,
    PixmapRef, Stroke, Transform,
};

use crate::layout::Rect;

pub const BACKGROUND: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
pub const TITLE_COLOR: [u8; 4] = [0x11, 0x18, 0x27, 0xff];
pub const BODY_COLOR: [u8; 4] = [0x37, 0x41, 0x51, 0xff];
pub const FRAME_BORDER: [u8; 4] = [0xe5, 0xe7, 0xeb, 0xff];
pub const PLACEHOLDER_FILL: [u8; 4] = [0xf3, 0xf4, 0xf6, 0xff];
pub const PLACEHOLDER_LABEL: [u8; 4] = [0x9c, 0xa3, 0xaf, 0xff];

fn color(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn solid_paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color(rgba));
    paint.anti_alias = true;
    paint
}

/// A rounded rectangle outline. The radius is clamped to half the shorter
/// side.
pub fn rounded_rect(rect: Rect, radius: f32) -> Option<Path> {
    if rect.w <= 0.0 || rect.h <= 0.0 {
        return None;
    }
    let r = radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0);
    // cubic approximation of a quarter circle
    let k = r * 0.552_284_8;
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());

    let mut pb = PathBuilder::new();
    pb.move_to(x0 + r, y0);
    pb.line_to(x1 - r, y0);
    pb.cubic_to(x1 - r + k, y0, x1, y0 + r - k, x1, y0 + r);
    pb.line_to(x1, y1 - r);
    pb.cubic_to(x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1);
    pb.line_to(x0 + r, y1);
    pb.cubic_to(x0 + r - k, y1, x0, y1 - r + k, x0, y1 - r);
    pb.line_to(x0, y0 + r);
    pb.cubic_to(x0, y0 + r - k, x0 + r - k, y0, x0 + r, y0);
    pb.close();
    pb.finish()
}

pub fn clear(canvas: &mut Pixmap, rgba: [u8; 4]) {
    canvas.fill(color(rgba));
}

pub fn fill_rect(canvas: &mut Pixmap, rect: Rect, rgba: [u8; 4]) {
    if let Some(r) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) {
        canvas.fill_rect(r, &solid_paint(rgba), Transform::identity(), None);
    }
}

pub fn fill_rounded_rect(canvas: &mut Pixmap, rect: Rect, radius: f32, rgba: [u8; 4]) {
    if let Some(path) = rounded_rect(rect, radius) {
        canvas.fill_path(
            &path,
            &solid_paint(rgba),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

pub fn stroke_rounded_rect(canvas: &mut Pixmap, rect: Rect, radius: f32, width: f32, rgba: [u8; 4]) {
    if let Some(path) = rounded_rect(rect, radius) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        canvas.stroke_path(&path, &solid_paint(rgba), &stroke, Transform::identity(), None);
    }
}

/// A soft shadow under `rect`, approximated by stacked translucent rounded
/// rectangles that grow towards `blur`.
pub fn drop_shadow(canvas: &mut Pixmap, rect: Rect, radius: f32, offset_y: f32, blur: f32) {
    const LAYERS: u8 = 8;
    // 0.18 opacity spread across the layers
    let alpha_per_layer = (0.18 * 255.0 / LAYERS as f32).round() as u8;
    let shifted = Rect::new(rect.x, rect.y + offset_y, rect.w, rect.h);
    for layer in (1..=LAYERS).rev() {
        let spread = blur * layer as f32 / LAYERS as f32 / 2.0;
        fill_rounded_rect(
            canvas,
            shifted.inflate(spread),
            radius + spread,
            [0, 0, 0, alpha_per_layer],
        );
    }
}

/// A mask that admits only the inside of a rounded rectangle.
pub fn rounded_clip(canvas: &Pixmap, rect: Rect, radius: f32) -> Option<Mask> {
    let path = rounded_rect(rect, radius)?;
    let mut mask = Mask::new(canvas.width(), canvas.height())?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
    Some(mask)
}

/// Draw `source` scaled to exactly cover `dest`.
pub fn draw_scaled(canvas: &mut Pixmap, source: PixmapRef<'_>, dest: Rect, mask: Option<&Mask>) {
    if source.width() == 0 || source.height() == 0 || dest.w <= 0.0 || dest.h <= 0.0 {
        return;
    }
    let sx = dest.w / source.width() as f32;
    let sy = dest.h / source.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(
        0,
        0,
        source,
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, dest.x, dest.y),
        mask,
    );
}

/// Draw `source` scaled to fill `dest` while keeping its aspect ratio; the
/// overflow is cut by `mask`.
pub fn draw_cover(canvas: &mut Pixmap, source: PixmapRef<'_>, dest: Rect, mask: Option<&Mask>) {
    let (w, h) = (source.width() as f32, source.height() as f32);
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let scale = (dest.w / w).max(dest.h / h);
    let (cw, ch) = (w * scale, h * scale);
    let (cx, cy) = dest.center();
    draw_scaled(
        canvas,
        source,
        Rect::new(cx - cw / 2.0, cy - ch / 2.0, cw, ch),
        mask,
    );
}

/// Wrap straight-alpha RGBA bytes as a premultiplied pixmap.
pub fn pixmap_from_rgba(width: u32, height: u32, mut rgba: Vec<u8>) -> Option<Pixmap> {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * a + 127) / 255) as u8;
            }
        }
    }
    Pixmap::from_vec(rgba, IntSize::from_wh(width, height)?)
}

/// Source-over blend of one coverage-weighted color into a pixel.
pub fn blend_pixel(canvas: &mut Pixmap, x: i32, y: i32, rgba: [u8; 4], coverage: u8) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = (u16::from(coverage) * u16::from(rgba[3]) + 127) / 255;
    if alpha == 0 {
        return;
    }
    let inv = 255 - alpha;
    let idx = ((y as u32 * canvas.width() + x as u32) * 4) as usize;
    let data = canvas.data_mut();
    for c in 0..3 {
        let src = u16::from(rgba[c]) * alpha;
        let dst = u16::from(data[idx + c]) * inv;
        data[idx + c] = ((src + dst + 127) / 255) as u8;
    }
    let dst_a = u16::from(data[idx + 3]);
    data[idx + 3] = (alpha + (dst_a * inv + 127) / 255).min(255) as u8;
}

/// Straight RGBA of one pixel, for tests and diagnostics.
pub fn pixel_at(canvas: &Pixmap, x: u32, y: u32) -> Option<[u8; 4]> {
    let px = canvas.pixel(x, y)?.demultiply();
    Some([px.red(), px.green(), px.blue(), px.alpha()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_rect_rejects_empty() {
        assert!(rounded_rect(Rect::new(0.0, 0.0, 0.0, 10.0), 4.0).is_none());
        assert!(rounded_rect(Rect::new(0.0, 0.0, 10.0, 10.0), 40.0).is_some());
    }

    #[test]
    fn test_fill_and_blend() {
        let mut canvas = Pixmap::new(20, 20).unwrap();
        clear(&mut canvas, BACKGROUND);
        fill_rect(&mut canvas, Rect::new(0.0, 0.0, 10.0, 10.0), PLACEHOLDER_FILL);
        assert_eq!(pixel_at(&canvas, 5, 5), Some(PLACEHOLDER_FILL));
        assert_eq!(pixel_at(&canvas, 15, 15), Some(BACKGROUND));

        blend_pixel(&mut canvas, 15, 15, [0, 0, 0, 255], 255);
        assert_eq!(pixel_at(&canvas, 15, 15), Some([0, 0, 0, 255]));
        blend_pixel(&mut canvas, -1, 40, [0, 0, 0, 255], 255);
    }

    #[test]
    fn test_clip_mask_limits_drawing() {
        let mut canvas = Pixmap::new(40, 40).unwrap();
        clear(&mut canvas, BACKGROUND);
        let source = pixmap_from_rgba(2, 2, vec![255, 0, 0, 255].repeat(4)).unwrap();
        let tile = Rect::new(10.0, 10.0, 20.0, 20.0);
        let mask = rounded_clip(&canvas, tile, 8.0).unwrap();

        draw_cover(&mut canvas, source.as_ref(), tile, Some(&mask));
        assert_eq!(pixel_at(&canvas, 20, 20), Some([255, 0, 0, 255]));
        assert_eq!(pixel_at(&canvas, 10, 10), Some(BACKGROUND));
        assert_eq!(pixel_at(&canvas, 35, 35), Some(BACKGROUND));
    }

    #[test]
    fn test_premultiply_on_wrap() {
        let pixmap = pixmap_from_rgba(1, 1, vec![200, 100, 0, 128]).unwrap();
        let raw = pixmap.data();
        assert_eq!(raw[3], 128);
        assert!(raw[0] <= 128);
        assert!(pixmap_from_rgba(2, 2, vec![0; 4]).is_none());
    }
}
