//! Font loading, measurement, wrapping and glyph drawing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings, Metrics};
use lectern_common::error::{LecternError, LecternResult};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::paint::blend_pixel;

/// Regular and bold faces probed when no font is configured.
const SYSTEM_FONTS: [(&str, &str); 4] = [
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    ),
];

/// Break `text` into lines no wider than `max_width`.
///
/// Words are separated by single spaces. A word wider than the column on its
/// own still gets a line of its own.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn load_font(path: &Path) -> LecternResult<Font> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LecternError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => e.into(),
    })?;
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|e| LecternError::render(format!("Failed to parse font {}: {e}", path.display())))
}

/// The faces used to draw a frame.
pub struct FontSet {
    regular: Font,
    bold: Option<Font>,
}

impl FontSet {
    pub fn new(regular: Font, bold: Option<Font>) -> Self {
        Self { regular, bold }
    }

    /// Load a configured font, or the first system font found.
    ///
    /// A configured `Foo.ttf` picks up `Foo-Bold.ttf` next to it when present.
    pub fn load(configured: Option<&Path>) -> LecternResult<Self> {
        if let Some(path) = configured {
            let regular = load_font(path)?;
            let bold = bold_sibling(path)
                .filter(|p| p.exists())
                .and_then(|p| load_font(&p).ok());
            info!(path = %path.display(), bold = bold.is_some(), "Loaded configured font");
            return Ok(Self::new(regular, bold));
        }

        for (regular, bold) in SYSTEM_FONTS {
            let regular_path = Path::new(regular);
            if !regular_path.exists() {
                continue;
            }
            match load_font(regular_path) {
                Ok(font) => {
                    let bold = load_font(Path::new(bold)).ok();
                    info!(path = regular, bold = bold.is_some(), "Loaded system font");
                    return Ok(Self::new(font, bold));
                }
                Err(e) => debug!(path = regular, error = %e, "Skipping unusable system font"),
            }
        }
        Err(LecternError::render(
            "No usable font found; set player.font_path in the Lectern config",
        ))
    }

    fn face(&self, bold: bool) -> &Font {
        match (&self.bold, bold) {
            (Some(face), true) => face,
            _ => &self.regular,
        }
    }
}

fn bold_sibling(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let base = stem.strip_suffix("-Regular").unwrap_or(stem);
    Some(path.with_file_name(format!("{base}-Bold.{ext}")))
}

/// Size, weight and color of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GlyphKey {
    ch: char,
    size_bits: u32,
    bold: bool,
}

struct GlyphBitmap {
    metrics: Metrics,
    coverage: Vec<u8>,
}

/// Draws single lines of text onto a pixmap, caching rasterized glyphs.
pub struct TextPainter {
    fonts: FontSet,
    glyph_cache: HashMap<GlyphKey, GlyphBitmap>,
}

impl TextPainter {
    pub fn new(fonts: FontSet) -> Self {
        Self {
            fonts,
            glyph_cache: HashMap::new(),
        }
    }

    /// Advance width of `text` in pixels.
    pub fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        let face = self.fonts.face(style.bold);
        text.chars()
            .map(|ch| face.metrics(ch, style.size).advance_width)
            .sum()
    }

    /// Draw `text` with its baseline at `baseline_y`.
    pub fn draw_line(
        &mut self,
        canvas: &mut Pixmap,
        text: &str,
        x: f32,
        baseline_y: f32,
        style: &TextStyle,
    ) {
        let mut pen_x = x;
        for ch in text.chars() {
            let key = GlyphKey {
                ch,
                size_bits: style.size.to_bits(),
                bold: style.bold,
            };
            let fonts = &self.fonts;
            let glyph = self.glyph_cache.entry(key).or_insert_with(|| {
                let (metrics, coverage) = fonts.face(style.bold).rasterize(ch, style.size);
                GlyphBitmap { metrics, coverage }
            });

            let m = glyph.metrics;
            let left = (pen_x + m.xmin as f32).round() as i32;
            let top = (baseline_y - m.ymin as f32 - m.height as f32).round() as i32;
            for row in 0..m.height {
                for col in 0..m.width {
                    let coverage = glyph.coverage[row * m.width + col];
                    if coverage > 0 {
                        blend_pixel(
                            canvas,
                            left + col as i32,
                            top + row as i32,
                            style.color,
                            coverage,
                        );
                    }
                }
            }
            pen_x += m.advance_width;
        }
    }
}
