//! Pure calculation functions for layout geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Sizes scale with the photo so a 24MP frame and a 2MP preview get the
//! same proportions.

/// Padding added on each side so the image becomes square.
///
/// Returns `(pad_x, pad_y, side)`: horizontal offset, vertical offset, and
/// the side length of the square canvas.
///
/// # Examples
/// ```
/// # use exifmark::imaging::calculations::square_padding;
/// assert_eq!(square_padding((600, 400)), (0, 100, 600));
/// assert_eq!(square_padding((300, 500)), (100, 0, 500));
/// ```
pub fn square_padding(dims: (u32, u32)) -> (u32, u32, u32) {
    let (w, h) = dims;
    let side = w.max(h);
    ((side - w) / 2, (side - h) / 2, side)
}

/// Canvas size that restores `original`'s aspect ratio around `current`.
///
/// The current image is never cropped: the shorter axis (relative to the
/// target ratio) grows. Returns `(canvas_w, canvas_h)`.
///
/// # Examples
/// ```
/// # use exifmark::imaging::calculations::padding_to_ratio;
/// // 3:2 photo that became taller after adding a bottom strip
/// assert_eq!(padding_to_ratio((600, 400), (600, 460)), (690, 460));
/// ```
pub fn padding_to_ratio(original: (u32, u32), current: (u32, u32)) -> (u32, u32) {
    let (ow, oh) = original;
    let (cw, ch) = current;
    if ow == 0 || oh == 0 || cw == 0 || ch == 0 {
        return current;
    }

    let target = ow as f64 / oh as f64;
    let actual = cw as f64 / ch as f64;

    if actual < target {
        // Too narrow: widen
        let w = (ch as f64 * target).round() as u32;
        (w.max(cw), ch)
    } else {
        // Too wide (or exact): heighten
        let h = (cw as f64 / target).round() as u32;
        (cw, h.max(ch))
    }
}

/// Uniform border width for the white margin.
///
/// `percent` is a percentage of the short edge; at least one pixel when
/// the percentage is non-zero.
pub fn margin_width(dims: (u32, u32), percent: u32) -> u32 {
    if percent == 0 {
        return 0;
    }
    let short = dims.0.min(dims.1) as f64;
    ((short * percent as f64 / 100.0).round() as u32).max(1)
}

/// Drop-shadow geometry for an image of `dims`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowGeometry {
    /// Border added on every side of the photo.
    pub border: u32,
    /// Downward/rightward offset of the shadow relative to the photo.
    pub offset: u32,
    /// Blur sigma, in pixels of the full-size canvas.
    pub blur: u32,
}

/// Shadow border is 6% of the short edge, offset a third of that.
pub fn shadow_geometry(dims: (u32, u32)) -> ShadowGeometry {
    let short = dims.0.min(dims.1) as f64;
    let border = ((short * 0.06).round() as u32).max(2);
    ShadowGeometry {
        border,
        offset: (border / 3).max(1),
        blur: (border / 3).max(1),
    }
}

/// Positions inside a watermark strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripMetrics {
    /// Height of the strip appended under the photo.
    pub height: u32,
    /// Horizontal padding from the strip edges to the text/logo.
    pub padding: u32,
    /// Pixel size of the top (primary) line.
    pub primary_px: u32,
    /// Pixel size of the bottom (secondary) line.
    pub secondary_px: u32,
    /// Y of the top line relative to the strip.
    pub primary_y: u32,
    /// Y of the bottom line relative to the strip.
    pub secondary_y: u32,
    /// Logo box height.
    pub logo_height: u32,
}

/// Strip height is 12% of the short edge; text lines use 28% / 22% of it.
pub fn strip_metrics(dims: (u32, u32)) -> StripMetrics {
    let short = dims.0.min(dims.1) as f64;
    let height = ((short * 0.12).round() as u32).max(8);
    let h = height as f64;
    let primary_px = ((h * 0.28).round() as u32).max(1);
    let secondary_px = ((h * 0.22).round() as u32).max(1);
    StripMetrics {
        height,
        padding: (h * 0.35).round() as u32,
        primary_px,
        secondary_px,
        primary_y: (h * 0.20).round() as u32,
        secondary_y: (h * 0.56).round() as u32,
        logo_height: ((h * 0.5).round() as u32).max(1),
    }
}

/// Size that fits `source` into a box of `max_height` height, preserving
/// aspect ratio.
pub fn fit_height(source: (u32, u32), max_height: u32) -> (u32, u32) {
    let (w, h) = source;
    if h == 0 {
        return (0, 0);
    }
    let scale = max_height as f64 / h as f64;
    (((w as f64 * scale).round() as u32).max(1), max_height)
}

/// Downscaled size so the longer edge is at most `max_long_edge`.
///
/// Returns `None` when the image already fits.
pub fn bounded_long_edge(dims: (u32, u32), max_long_edge: u32) -> Option<(u32, u32)> {
    let (w, h) = dims;
    let long = w.max(h);
    if long <= max_long_edge || max_long_edge == 0 {
        return None;
    }
    let ratio = max_long_edge as f64 / long as f64;
    if w >= h {
        Some((max_long_edge, ((h as f64 * ratio).round() as u32).max(1)))
    } else {
        Some((((w as f64 * ratio).round() as u32).max(1), max_long_edge))
    }
}

/// Round `width * height` to whole megapixels.
pub fn megapixels(dims: (u32, u32)) -> u64 {
    let total = dims.0 as u64 * dims.1 as u64;
    (total as f64 / 1_000_000.0).round() as u64
}
