//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format guessed from content |
//! | Orientation | `ImageDecoder::orientation` applied with `DynamicImage::apply_orientation` |
//! | EXIF | `kamadak-exif` via [`read_exif`](super::exif_reader::read_exif) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG/TIFF/WebP | `DynamicImage::write_to` (lossless) |
//! | Atomic replace | `tempfile::NamedTempFile` in the target directory, then `persist` |

use super::backend::{BackendError, ImageBackend};
use super::exif_reader::{ExifData, MetadataError, read_exif};
use super::params::Quality;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
///
/// AVIF is encode-only: the `image` crate's `"avif"` feature pulls in rav1e
/// but no decoder, so `.avif` inputs are not listed.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, upright per its EXIF orientation.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_err = |e: image::ImageError| BackendError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut decoder = ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .into_decoder()
        .map_err(decode_err)?;
    // An unreadable orientation tag decodes as upright
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Map an output path's extension to an encodable format.
fn output_format(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        "webp" => Ok(ImageFormat::WebP),
        "avif" => Ok(ImageFormat::Avif),
        other => Err(BackendError::UnsupportedFormat(other.to_string())),
    }
}

/// Encode into a temp file next to `path`, then atomically rename over it.
///
/// An existing file at `path` is untouched unless encoding succeeds.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = output_format(path)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let tmp = tempfile::Builder::new()
        .prefix(".exifmark-")
        .tempfile_in(dir)?;
    let encode_err = |e: image::ImageError| BackendError::Encode {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    {
        let mut writer = BufWriter::new(tmp.as_file());
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality as u8);
                rgb.write_with_encoder(encoder).map_err(encode_err)?;
            }
            ImageFormat::Avif => {
                let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                    &mut writer,
                    6,
                    quality as u8,
                );
                img.write_with_encoder(encoder).map_err(encode_err)?;
            }
            ImageFormat::WebP => {
                // The pure-Rust WebP encoder is lossless RGB(A)8 only
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut writer);
                rgba.write_with_encoder(encoder).map_err(encode_err)?;
            }
            ImageFormat::Png => {
                let encoder = image::codecs::png::PngEncoder::new(&mut writer);
                img.write_with_encoder(encoder).map_err(encode_err)?;
            }
            _ => {
                let encoder = image::codecs::tiff::TiffEncoder::new(&mut writer);
                img.write_with_encoder(encoder).map_err(encode_err)?;
            }
        }
        writer.flush()?;
    }

    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        load_image(path)
    }

    fn read_exif(&self, path: &Path) -> Result<ExifData, MetadataError> {
        read_exif(path)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        quality: Quality,
    ) -> Result<(), BackendError> {
        save_image(image, path, quality.value())
    }
}
