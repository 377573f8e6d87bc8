//! Text measurement and drawing on RGBA canvases.
//!
//! DejaVu Sans and DejaVu Sans Bold are compiled in, so text renders with
//! no setup. `base.font` / `base.bold_font` replace either face. A
//! [`FontSet`] without faces still measures text (from an average glyph
//! width) but draws nothing.

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error reading font {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid font file: {0}")]
    Invalid(String),
}

const EMBEDDED_REGULAR: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const EMBEDDED_BOLD: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Average advance of a proportional glyph, in percent of the pixel size.
const FALLBACK_ADVANCE_PERCENT: u32 = 55;

/// Load a font from disk.
pub fn load_font(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.display().to_string(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid(path.display().to_string()))
}

fn embedded_face(data: &'static [u8], name: &str) -> Option<FontArc> {
    FontArc::try_from_slice(data)
        .inspect_err(|_| warn!(font = name, "embedded font failed to parse"))
        .ok()
}

/// Regular and bold faces. Bold falls back to regular.
#[derive(Clone, Default)]
pub struct FontSet {
    regular: Option<FontArc>,
    bold: Option<FontArc>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("regular", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

impl FontSet {
    /// The compiled-in DejaVu Sans faces.
    pub fn embedded() -> Self {
        Self {
            regular: embedded_face(EMBEDDED_REGULAR, "DejaVuSans"),
            bold: embedded_face(EMBEDDED_BOLD, "DejaVuSans-Bold"),
        }
    }

    /// Replace the regular and/or bold face, keeping the other one.
    pub fn with_overrides(self, regular: Option<FontArc>, bold: Option<FontArc>) -> Self {
        Self {
            regular: regular.or(self.regular),
            bold: bold.or(self.bold),
        }
    }

    /// True when glyphs can actually be drawn.
    pub fn can_draw(&self) -> bool {
        self.regular.is_some() || self.bold.is_some()
    }

    fn face(&self, bold: bool) -> Option<&FontArc> {
        let preferred = if bold { &self.bold } else { &self.regular };
        preferred
            .as_ref()
            .or(self.regular.as_ref())
            .or(self.bold.as_ref())
    }

    /// Width and height of `text` at `px`.
    pub fn measure(&self, text: &str, px: u32, bold: bool) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        match self.face(bold) {
            Some(font) => text_size(PxScale::from(px as f32), font, text),
            None => {
                let units = text.chars().count() as u32 * px * FALLBACK_ADVANCE_PERCENT;
                (units.div_ceil(100), px)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. A no-op without fonts.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        (x, y): (i32, i32),
        px: u32,
        color: Rgba<u8>,
        bold: bool,
    ) {
        if text.is_empty() {
            return;
        }
        if let Some(font) = self.face(bold) {
            draw_text_mut(canvas, color, x, y, PxScale::from(px as f32), font, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_font_set_cannot_draw() {
        assert!(!FontSet::default().can_draw());
    }

    #[test]
    fn fallback_measure_scales_with_length() {
        let fonts = FontSet::default();
        let (short, h) = fonts.measure("ab", 20, false);
        let (long, _) = fonts.measure("abcd", 20, false);
        assert_eq!(h, 20);
        assert_eq!(short, 22);
        assert_eq!(long, 44);
    }

    #[test]
    fn measure_empty_is_zero() {
        assert_eq!(FontSet::default().measure("", 40, true), (0, 0));
    }

    #[test]
    fn draw_without_font_leaves_canvas() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        FontSet::default().draw(&mut canvas, "x", (0, 0), 8, Rgba([0, 0, 0, 255]), false);
        assert!(canvas.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    fn ink(canvas: &RgbaImage, background: Rgba<u8>) -> usize {
        canvas.pixels().filter(|p| **p != background).count()
    }

    #[test]
    fn embedded_faces_draw_glyphs() {
        let fonts = FontSet::embedded();
        assert!(fonts.can_draw());

        let white = Rgba([255, 255, 255, 255]);
        let mut canvas = RgbaImage::from_pixel(200, 40, white);
        fonts.draw(&mut canvas, "ILCE-7M4", (2, 2), 24, Rgba([0, 0, 0, 255]), false);
        assert!(ink(&canvas, white) > 50);
    }

    #[test]
    fn bold_face_is_wider() {
        let fonts = FontSet::embedded();
        let (regular, _) = fonts.measure("Nikon Z 8", 32, false);
        let (bold, _) = fonts.measure("Nikon Z 8", 32, true);
        assert!(bold > regular);
    }

    #[test]
    fn overrides_keep_the_other_face() {
        let only_regular = FontSet::embedded().with_overrides(None, None);
        assert_eq!(
            only_regular.measure("abc", 20, true),
            FontSet::embedded().measure("abc", 20, true)
        );
        let replaced = FontSet::default().with_overrides(FontSet::embedded().regular, None);
        assert!(replaced.can_draw());
        assert!(replaced.bold.is_none());
    }

    #[test]
    fn load_font_missing_file() {
        let result = load_font(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(FontError::Io { .. })));
    }

    #[test]
    fn load_font_garbage_is_invalid() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(load_font(&path), Err(FontError::Invalid(_))));
    }
}
