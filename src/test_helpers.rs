//! Shared test utilities: synthetic EXIF blocks and camera JPEGs.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fields = camera_fields();
//! let tmp = TempDir::new().unwrap();
//! let path = tmp.path().join("DSC_0001.jpg");
//! write_jpeg_with_exif(&path, 60, 40, &fields);
//! ```

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{ImageEncoder, RgbImage};
use std::io::Cursor;
use std::path::Path;

// =========================================================================
// Fields
// =========================================================================

pub fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

pub fn rational_field(tag: Tag, values: &[(u32, u32)]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            values
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

pub fn short_field(tag: Tag, value: u16) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![value]),
    }
}

/// A full set of camera tags, shot in Buenos Aires (south, west).
pub fn camera_fields() -> Vec<Field> {
    vec![
        ascii_field(Tag::Make, "SONY"),
        ascii_field(Tag::Model, "ILCE-7M4"),
        ascii_field(Tag::LensMake, "Sony"),
        ascii_field(Tag::LensModel, "FE 35mm F1.8"),
        rational_field(Tag::FocalLength, &[(35, 1)]),
        short_field(Tag::FocalLengthIn35mmFilm, 35),
        rational_field(Tag::FNumber, &[(18, 10)]),
        rational_field(Tag::ExposureTime, &[(1, 250)]),
        short_field(Tag::PhotographicSensitivity, 400),
        ascii_field(Tag::DateTimeOriginal, "2024:03:15 10:22:31"),
        ascii_field(Tag::DateTime, "2024:03:16 08:00:00"),
        ascii_field(Tag::GPSLatitudeRef, "S"),
        rational_field(Tag::GPSLatitude, &[(34, 1), (36, 1), (0, 1)]),
        ascii_field(Tag::GPSLongitudeRef, "W"),
        rational_field(Tag::GPSLongitude, &[(58, 1), (22, 1), (48, 1)]),
    ]
}

// =========================================================================
// Encoding
// =========================================================================

/// Serialize fields into a bare TIFF/EXIF block.
pub fn exif_block(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    buf.into_inner()
}

/// Write a gradient JPEG with `fields` in an APP1 segment.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, fields: &[Field]) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend(exif_block(fields));
    let len = u16::try_from(payload.len() + 2).unwrap();

    // SOI, then APP1 ahead of the encoder's own segments
    let mut out = jpeg[..2].to_vec();
    out.extend([0xFF, 0xE1]);
    out.extend(len.to_be_bytes());
    out.extend(payload);
    out.extend(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}
