//! Image I/O and pixel helpers: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **EXIF** | `kamadak-exif` |
//! | **Encode** | `image` encoders behind an atomic temp-file rename |
//! | **Text** | `imageproc::drawing` + `ab_glyph` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for layout geometry (unit testable)
//! - **Parameters**: Quality and color value types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **EXIF**: tag extraction into [`ExifData`]
//! - **Text**: [`FontSet`] measurement and drawing

pub mod backend;
pub mod calculations;
pub mod exif_reader;
mod params;
pub mod rust_backend;
pub mod text;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use exif_reader::{ExifData, MetadataError};
pub use params::{Color, ColorParseError, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use text::{FontError, FontSet};
