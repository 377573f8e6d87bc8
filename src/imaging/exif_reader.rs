//! EXIF extraction via `kamadak-exif`.
//!
//! Only the handful of tags the text fields need are read. Every field is
//! optional: a photo straight out of a screenshot tool has none of them,
//! and the container renders placeholders instead of failing.
//!
//! | Field | Tag |
//! |---|---|
//! | make / model | `Make`, `Model` |
//! | lens | `LensMake`, `LensModel` |
//! | focal length | `FocalLength`, `FocalLengthIn35mmFilm` |
//! | exposure | `FNumber`, `ExposureTime`, `PhotographicSensitivity` |
//! | capture time | `DateTimeOriginal`, falling back to `DateTime` |
//! | location | `GPSLatitude(Ref)`, `GPSLongitude(Ref)` |

use exif::{Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
}

/// Parsed EXIF values used for display text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    /// Focal length in millimeters as recorded by the camera.
    pub focal_length: Option<f64>,
    /// 35mm-equivalent focal length, when the camera records it.
    pub focal_length_35mm: Option<u32>,
    pub aperture: Option<f64>,
    /// Exposure time in seconds as `(numerator, denominator)`.
    pub exposure_time: Option<(u32, u32)>,
    pub iso: Option<u32>,
    /// Raw EXIF timestamp, `YYYY:MM:DD HH:MM:SS`.
    pub datetime: Option<String>,
    /// Signed decimal degrees `(latitude, longitude)`.
    pub gps: Option<(f64, f64)>,
}

/// Read EXIF from an image file.
pub fn read_exif(path: &Path) -> Result<ExifData, MetadataError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader)?;
    Ok(extract(&exif))
}

fn extract(exif: &Exif) -> ExifData {
    let field = |tag| exif.get_field(tag, In::PRIMARY);

    ExifData {
        make: field(Tag::Make).and_then(ascii),
        model: field(Tag::Model).and_then(ascii),
        lens_make: field(Tag::LensMake).and_then(ascii),
        lens_model: field(Tag::LensModel).and_then(ascii),
        focal_length: field(Tag::FocalLength).and_then(|f| rational(f, 0)),
        focal_length_35mm: field(Tag::FocalLengthIn35mmFilm)
            .and_then(|f| f.value.get_uint(0))
            .filter(|&v| v > 0),
        aperture: field(Tag::FNumber).and_then(|f| rational(f, 0)),
        exposure_time: field(Tag::ExposureTime).and_then(|f| match f.value {
            Value::Rational(ref v) => v.first().filter(|r| r.denom != 0).map(|r| (r.num, r.denom)),
            _ => None,
        }),
        iso: field(Tag::PhotographicSensitivity).and_then(|f| f.value.get_uint(0)),
        datetime: field(Tag::DateTimeOriginal)
            .or_else(|| field(Tag::DateTime))
            .and_then(ascii),
        gps: gps(exif),
    }
}

fn ascii(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref parts) => parts
            .first()
            .map(|raw| {
                String::from_utf8_lossy(raw)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational(field: &Field, index: usize) -> Option<f64> {
    match field.value {
        Value::Rational(ref v) => v
            .get(index)
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64()),
        _ => None,
    }
}

fn gps(exif: &Exif) -> Option<(f64, f64)> {
    let coord = |value_tag, ref_tag, negative: &str| {
        let value = exif.get_field(value_tag, In::PRIMARY)?;
        let degrees = dms_to_degrees(
            rational(value, 0)?,
            rational(value, 1).unwrap_or(0.0),
            rational(value, 2).unwrap_or(0.0),
        );
        let sign = exif
            .get_field(ref_tag, In::PRIMARY)
            .and_then(ascii)
            .filter(|r| r.eq_ignore_ascii_case(negative))
            .map_or(1.0, |_| -1.0);
        Some(degrees * sign)
    };

    let lat = coord(Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")?;
    let lon = coord(Tag::GPSLongitude, Tag::GPSLongitudeRef, "W")?;
    Some((lat, lon))
}

/// Degrees/minutes/seconds to unsigned decimal degrees.
pub fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// `1/125` for sub-second exposures, `2` or `0.5`-style seconds otherwise.
pub fn format_exposure(num: u32, denom: u32) -> String {
    if denom == 0 {
        return String::new();
    }
    if num == 0 {
        return "0".to_string();
    }
    if num < denom {
        // Reduce 10/1250 to 1/125
        let reduced = (denom as f64 / num as f64).round() as u32;
        return format!("1/{}", reduced);
    }
    let seconds = num as f64 / denom as f64;
    trim_decimal(seconds)
}

/// Format a number with at most one decimal, dropping a trailing `.0`.
pub fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn parse(fields: &[Field]) -> ExifData {
        let exif = Reader::new().read_raw(exif_block(fields)).unwrap();
        extract(&exif)
    }

    // =========================================================================
    // Tag mapping
    // =========================================================================

    #[test]
    fn maps_every_camera_tag() {
        let data = parse(&camera_fields());
        assert_eq!(data.make.as_deref(), Some("SONY"));
        assert_eq!(data.model.as_deref(), Some("ILCE-7M4"));
        assert_eq!(data.lens_make.as_deref(), Some("Sony"));
        assert_eq!(data.lens_model.as_deref(), Some("FE 35mm F1.8"));
        assert_eq!(data.focal_length, Some(35.0));
        assert_eq!(data.focal_length_35mm, Some(35));
        assert_eq!(data.aperture, Some(1.8));
        assert_eq!(data.exposure_time, Some((1, 250)));
        assert_eq!(data.iso, Some(400));
        assert_eq!(data.datetime.as_deref(), Some("2024:03:15 10:22:31"));
    }

    #[test]
    fn southern_western_fix_is_negative() {
        let (lat, lon) = parse(&camera_fields()).gps.unwrap();
        assert!((lat + 34.6).abs() < 1e-9, "lat {lat}");
        assert!((lon + 58.38).abs() < 1e-9, "lon {lon}");
    }

    #[test]
    fn northern_eastern_fix_is_positive() {
        let data = parse(&[
            ascii_field(Tag::GPSLatitudeRef, "N"),
            rational_field(Tag::GPSLatitude, &[(35, 1), (30, 1), (36, 1)]),
            ascii_field(Tag::GPSLongitudeRef, "E"),
            rational_field(Tag::GPSLongitude, &[(139, 1), (0, 1), (0, 1)]),
        ]);
        let (lat, lon) = data.gps.unwrap();
        assert!((lat - 35.51).abs() < 1e-9);
        assert!((lon - 139.0).abs() < 1e-9);
    }

    #[test]
    fn latitude_without_longitude_is_no_fix() {
        let data = parse(&[
            ascii_field(Tag::GPSLatitudeRef, "N"),
            rational_field(Tag::GPSLatitude, &[(35, 1), (0, 1), (0, 1)]),
        ]);
        assert_eq!(data.gps, None);
    }

    #[test]
    fn datetime_falls_back_to_modification_time() {
        let data = parse(&[ascii_field(Tag::DateTime, "2023:12:31 23:59:00")]);
        assert_eq!(data.datetime.as_deref(), Some("2023:12:31 23:59:00"));
    }

    #[test]
    fn ascii_is_trimmed_and_blank_is_missing() {
        let data = parse(&[
            ascii_field(Tag::Make, "  Canon   "),
            ascii_field(Tag::Model, "   "),
        ]);
        assert_eq!(data.make.as_deref(), Some("Canon"));
        assert_eq!(data.model, None);
    }

    #[test]
    fn zero_denominators_are_missing() {
        let data = parse(&[
            rational_field(Tag::FNumber, &[(4, 0)]),
            rational_field(Tag::ExposureTime, &[(1, 0)]),
            rational_field(Tag::FocalLength, &[(50, 0)]),
        ]);
        assert_eq!(data.aperture, None);
        assert_eq!(data.exposure_time, None);
        assert_eq!(data.focal_length, None);
    }

    #[test]
    fn zero_equivalent_focal_length_is_missing() {
        let data = parse(&[
            rational_field(Tag::FocalLength, &[(23, 1)]),
            short_field(Tag::FocalLengthIn35mmFilm, 0),
        ]);
        assert_eq!(data.focal_length, Some(23.0));
        assert_eq!(data.focal_length_35mm, None);
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn read_exif_from_camera_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("DSC_0001.jpg");
        write_jpeg_with_exif(&path, 32, 24, &camera_fields());

        let data = read_exif(&path).unwrap();
        assert_eq!(data, parse(&camera_fields()));
    }

    #[test]
    fn read_exif_missing_file_is_io_error() {
        let result = read_exif(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(MetadataError::Io(_))));
    }

    #[test]
    fn read_exif_without_metadata_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        assert!(read_exif(&path).is_err());
    }

    #[test]
    fn exposure_sub_second() {
        assert_eq!(format_exposure(1, 125), "1/125");
        assert_eq!(format_exposure(10, 1250), "1/125");
        assert_eq!(format_exposure(1, 3), "1/3");
    }

    #[test]
    fn exposure_long() {
        assert_eq!(format_exposure(2, 1), "2");
        assert_eq!(format_exposure(25, 10), "2.5");
        assert_eq!(format_exposure(30, 1), "30");
    }

    #[test]
    fn exposure_degenerate() {
        assert_eq!(format_exposure(1, 0), "");
        assert_eq!(format_exposure(0, 1), "0");
    }

    #[test]
    fn trim_decimal_drops_zero_fraction() {
        assert_eq!(trim_decimal(1.8), "1.8");
        assert_eq!(trim_decimal(8.0), "8");
        assert_eq!(trim_decimal(2.8000001), "2.8");
    }

    #[test]
    fn dms_conversion() {
        let deg = dms_to_degrees(35.0, 30.0, 36.0);
        assert!((deg - 35.51).abs() < 1e-9);
    }
}
