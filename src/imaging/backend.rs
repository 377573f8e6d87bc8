//! Codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode, read_exif, and encode. Everything between decode and
//! encode is pure pixel work on an in-memory [`DynamicImage`] and lives in
//! the pipeline, not here.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests use `MockBackend` to inject failures and delays.

use super::exif_reader::{ExifData, MetadataError};
use super::params::Quality;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image codec backends.
///
/// Backends are shared by every worker in a run, so they must be `Sync`
/// and must not keep per-image state.
pub trait ImageBackend: Send + Sync {
    /// Decode the pixel data of a source file.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Read embedded EXIF metadata.
    fn read_exif(&self, path: &Path) -> Result<ExifData, MetadataError>;

    /// Encode `image` to `path`. The format is chosen from the extension.
    ///
    /// Implementations must never leave a partially written file at `path`.
    fn encode(&self, image: &DynamicImage, path: &Path, quality: Quality)
    -> Result<(), BackendError>;
}
