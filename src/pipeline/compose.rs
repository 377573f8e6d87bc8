//! Pixel compositing for the chain components.
//!
//! Every function takes the current RGBA frame and returns a new canvas.
//! Geometry comes from [`calculations`](crate::imaging::calculations), so the
//! functions here only paint.

use super::assets::Assets;
use crate::imaging::calculations::{
    ShadowGeometry, bounded_long_edge, fit_height, margin_width, padding_to_ratio,
    shadow_geometry, square_padding, strip_metrics,
};
use crate::imaging::{Color, Dimensions};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Blank canvas with `photo` pasted at `(x, y)`.
fn framed(photo: &RgbaImage, size: (u32, u32), at: (u32, u32), background: Color) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(size.0, size.1, background.rgba());
    imageops::replace(&mut canvas, photo, at.0 as i64, at.1 as i64);
    canvas
}

/// Pad to a square, centered.
pub fn square(photo: &RgbaImage, background: Color) -> RgbaImage {
    let (pad_x, pad_y, side) = square_padding(photo.dimensions());
    framed(photo, (side, side), (pad_x, pad_y), background)
}

/// Uniform border of `percent` of the short edge.
pub fn margin(photo: &RgbaImage, percent: u32, background: Color) -> RgbaImage {
    let m = margin_width(photo.dimensions(), percent);
    let (w, h) = photo.dimensions();
    framed(photo, (w + 2 * m, h + 2 * m), (m, m), background)
}

/// Grow the canvas back to `original`'s aspect ratio, photo centered.
pub fn pad_to_ratio(photo: &RgbaImage, original: Dimensions, background: Color) -> RgbaImage {
    let (w, h) = photo.dimensions();
    let (cw, ch) = padding_to_ratio((original.width, original.height), (w, h));
    if (cw, ch) == (w, h) {
        return photo.clone();
    }
    framed(photo, (cw, ch), ((cw - w) / 2, (ch - h) / 2), background)
}

/// Blur sigma the shadow layer is actually filtered at. Larger shadows are
/// blurred on a downscaled layer and scaled back up.
const SHADOW_WORKING_SIGMA: u32 = 4;

/// Soft drop shadow offset down and to the right.
pub fn shadow(photo: &RgbaImage, background: Color) -> RgbaImage {
    let (w, h) = photo.dimensions();
    let g = shadow_geometry((w, h));
    let size = (w + 2 * g.border, h + 2 * g.border);

    let mut canvas = shadow_layer(size, (w, h), g, background);
    imageops::replace(&mut canvas, photo, g.border as i64, g.border as i64);
    canvas
}

/// The blurred shadow on its own, at full canvas size.
fn shadow_layer(
    size: (u32, u32),
    photo: (u32, u32),
    g: ShadowGeometry,
    background: Color,
) -> RgbaImage {
    let scale = (g.blur / SHADOW_WORKING_SIGMA).max(1);
    let down = |v: u32| v.div_ceil(scale).max(1);

    let mut layer = RgbaImage::from_pixel(down(size.0), down(size.1), background.rgba());
    let offset = ((g.border + g.offset) / scale) as i32;
    draw_filled_rect_mut(
        &mut layer,
        Rect::at(offset, offset).of_size(down(photo.0), down(photo.1)),
        shade(background),
    );
    let layer = imageops::blur(&layer, g.blur as f32 / scale as f32);
    if scale == 1 {
        return layer;
    }
    imageops::resize(&layer, size.0, size.1, FilterType::Triangle)
}

/// Shadow tone: the background darkened to 55%.
fn shade(background: Color) -> Rgba<u8> {
    let dim = |c: u8| (c as u16 * 55 / 100) as u8;
    Rgba([dim(background.r), dim(background.g), dim(background.b), 255])
}

/// Downscale so the long edge fits `max_long_edge`, if set.
pub fn normalize(photo: &RgbaImage, max_long_edge: Option<u32>) -> RgbaImage {
    match max_long_edge.and_then(|max| bounded_long_edge(photo.dimensions(), max)) {
        Some((w, h)) => imageops::resize(photo, w, h, FilterType::Lanczos3),
        None => photo.clone(),
    }
}

/// Where the manufacturer logo goes in a watermark strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoPosition {
    Left,
    Right,
}

/// Resolved content of one watermark strip.
pub struct Strip<'a> {
    /// Text for left-top, right-top, left-bottom, right-bottom.
    pub texts: [&'a str; 4],
    pub colors: [Color; 4],
    pub bold: [bool; 4],
    pub logo: Option<(&'a RgbaImage, LogoPosition)>,
    pub background: Color,
}

/// Append a strip under the photo with two text lines on each side.
///
/// The strip geometry only depends on the photo size, so output dimensions
/// are the same whether or not fonts are available.
pub fn watermark(photo: &RgbaImage, strip: &Strip<'_>, assets: &Assets) -> RgbaImage {
    let (w, h) = photo.dimensions();
    let m = strip_metrics((w, h));
    let mut canvas = framed(photo, (w, h + m.height), (0, 0), strip.background);

    let line = |top: bool| {
        if top {
            (h + m.primary_y, m.primary_px)
        } else {
            (h + m.secondary_y, m.secondary_px)
        }
    };

    let mut left_x = m.padding;
    let right_edge = w.saturating_sub(m.padding);

    if let Some((logo, position)) = strip.logo {
        let (lw, lh) = fit_height(logo.dimensions(), m.logo_height);
        let scaled = imageops::resize(logo, lw, lh, FilterType::Lanczos3);
        let y = h + (m.height - lh) / 2;
        match position {
            LogoPosition::Left => {
                imageops::overlay(&mut canvas, &scaled, left_x as i64, y as i64);
                left_x += lw + m.padding;
            }
            LogoPosition::Right => {
                // Logo and a hairline separator sit left of the right text block
                let block = [1, 3]
                    .iter()
                    .map(|&i| {
                        let (_, px) = line(i == 1);
                        assets.fonts.measure(strip.texts[i], px, strip.bold[i]).0
                    })
                    .max()
                    .unwrap_or(0);
                let separator_x = right_edge.saturating_sub(block + m.padding / 2);
                let logo_x = separator_x.saturating_sub(m.padding / 2 + lw);
                imageops::overlay(&mut canvas, &scaled, logo_x as i64, y as i64);
                draw_filled_rect_mut(
                    &mut canvas,
                    Rect::at(separator_x as i32, y as i32).of_size(1.max(w / 1000), lh),
                    Rgba([200, 200, 200, 255]),
                );
            }
        }
    }

    for (i, text) in strip.texts.iter().enumerate() {
        let top = i < 2;
        let (y, px) = line(top);
        let color = strip.colors[i].rgba();
        let x = if i % 2 == 0 {
            left_x
        } else {
            let (tw, _) = assets.fonts.measure(text, px, strip.bold[i]);
            right_edge.saturating_sub(tw)
        };
        assets
            .fonts
            .draw(&mut canvas, text, (x as i32, y as i32), px, color, strip.bold[i]);
    }

    canvas
}
