//! One photo in flight: pixels, EXIF, and the text derived from them.
//!
//! An [`ImageContainer`] is created by decoding a source file, mutated in
//! place by each component of a [`ProcessorChain`](crate::pipeline::ProcessorChain),
//! saved, and closed. Closing drops the pixel buffer; any later access,
//! including a second close, is a [`ContainerError::State`] error.
//!
//! Missing or unreadable EXIF never fails an open. The container falls back
//! to empty metadata and every text field renders a placeholder instead.

use crate::config::ElementConfig;
use crate::imaging::calculations::megapixels;
use crate::imaging::exif_reader::{format_exposure, trim_decimal};
use crate::imaging::{BackendError, Dimensions, ExifData, ImageBackend, Quality, RustBackend};
use crate::types::{Corner, TextField};
use chrono::NaiveDateTime;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Rendered for any EXIF value the file does not carry.
pub const MISSING: &str = "--";

/// Rendered by `geo_info` when the file has no GPS position.
pub const NO_GPS: &str = "no GPS";

const EXIF_DATETIME: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: BackendError,
    },
    #[error("cannot save {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: BackendError,
    },
    #[error("{0}")]
    State(String),
}

#[derive(Debug)]
pub struct ImageContainer {
    path: PathBuf,
    image: Option<DynamicImage>,
    exif: ExifData,
    original: Dimensions,
    equivalent_focal_length: bool,
    corner_text: [Option<String>; 4],
}

impl ImageContainer {
    /// Open a source file with the default codec backend.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        Self::open_with(&RustBackend::new(), path)
    }

    /// Open a source file using a specific backend (allows testing with mock).
    pub fn open_with(backend: &impl ImageBackend, path: &Path) -> Result<Self, ContainerError> {
        let image = backend
            .decode(path)
            .map_err(|source| ContainerError::Decode {
                path: path.display().to_string(),
                source,
            })?;
        let exif = backend.read_exif(path).unwrap_or_else(|e| {
            debug!(file = %path.display(), error = %e, "no usable EXIF, using placeholders");
            ExifData::default()
        });
        Ok(Self::from_parts(path, image, exif))
    }

    /// Build a container from an already decoded image.
    pub fn from_parts(path: impl Into<PathBuf>, image: DynamicImage, exif: ExifData) -> Self {
        Self {
            path: path.into(),
            original: Dimensions::from((image.width(), image.height())),
            image: Some(image),
            exif,
            equivalent_focal_length: false,
            corner_text: Default::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source file name, used for the output path and in error events.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exif(&self) -> &ExifData {
        &self.exif
    }

    /// Size of the decoded source, before any component ran.
    pub fn original_dimensions(&self) -> Dimensions {
        self.original
    }

    pub fn is_closed(&self) -> bool {
        self.image.is_none()
    }

    /// Prefer the 35mm-equivalent focal length in derived text.
    pub fn set_equivalent_focal_length(&mut self, enabled: bool) {
        if self.equivalent_focal_length != enabled {
            self.equivalent_focal_length = enabled;
            self.corner_text = Default::default();
        }
    }

    fn closed_error(&self) -> ContainerError {
        ContainerError::State(format!("{} is already closed", self.file_name()))
    }

    pub fn image(&self) -> Result<&DynamicImage, ContainerError> {
        self.image.as_ref().ok_or_else(|| self.closed_error())
    }

    /// Current pixel size.
    pub fn dimensions(&self) -> Result<Dimensions, ContainerError> {
        self.image()
            .map(|img| Dimensions::from((img.width(), img.height())))
    }

    /// Swap in the output of a transformation.
    pub fn replace_image(&mut self, image: DynamicImage) -> Result<(), ContainerError> {
        match self.image.as_mut() {
            Some(slot) => {
                *slot = image;
                Ok(())
            }
            None => Err(self.closed_error()),
        }
    }

    /// Display text for one field kind.
    ///
    /// `custom` is only used by [`TextField::Custom`].
    pub fn text(&self, field: TextField, custom: &str) -> Result<String, ContainerError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let exif = &self.exif;
        let text = match field {
            TextField::Model => or_missing(exif.model.as_deref()),
            TextField::Make => or_missing(exif.make.as_deref()),
            TextField::LensModel => or_missing(exif.lens_model.as_deref()),
            TextField::Param => self.param_text(),
            TextField::Datetime => self.datetime_text("%Y-%m-%d %H:%M"),
            TextField::Date => self.datetime_text("%Y-%m-%d"),
            TextField::Custom => custom.to_string(),
            TextField::None => String::new(),
            TextField::LensMakeLensModel => {
                join_present(&[exif.lens_make.as_deref(), exif.lens_model.as_deref()])
            }
            TextField::CameraModelLensModel => {
                join_present(&[exif.model.as_deref(), exif.lens_model.as_deref()])
            }
            TextField::CameraMakeCameraModel => {
                join_present(&[exif.make.as_deref(), exif.model.as_deref()])
            }
            TextField::TotalPixel => format!(
                "{}MP",
                megapixels((self.original.width, self.original.height))
            ),
            TextField::Filename => self.file_name(),
            TextField::DateFilename => {
                format!("{} {}", self.datetime_text("%Y-%m-%d"), self.file_name())
            }
            TextField::DatetimeFilename => format!(
                "{} {}",
                self.datetime_text("%Y-%m-%d %H:%M"),
                self.file_name()
            ),
            TextField::GeoInfo => match exif.gps {
                Some((lat, lon)) => format!("{:.4}, {:.4}", lat, lon),
                None => NO_GPS.to_string(),
            },
        };
        Ok(text)
    }

    /// Text for a corner slot, cached for the life of the container.
    pub fn corner_text(
        &mut self,
        corner: Corner,
        element: &ElementConfig,
    ) -> Result<&str, ContainerError> {
        let idx = corner.index();
        if self.corner_text[idx].is_none() {
            let text = self.text(element.name, &element.value)?;
            self.corner_text[idx] = Some(text);
        }
        Ok(self.corner_text[idx].as_deref().unwrap_or_default())
    }

    fn focal_text(&self) -> Option<String> {
        let equivalent = self
            .exif
            .focal_length_35mm
            .filter(|_| self.equivalent_focal_length)
            .map(|mm| mm.to_string());
        equivalent.or_else(|| self.exif.focal_length.map(trim_decimal))
    }

    fn param_text(&self) -> String {
        let aperture = self
            .exif
            .aperture
            .map(trim_decimal)
            .unwrap_or_else(|| MISSING.to_string());
        let shutter = self
            .exif
            .exposure_time
            .map(|(num, denom)| format_exposure(num, denom))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| MISSING.to_string());
        let iso = self
            .exif
            .iso
            .map(|v| v.to_string())
            .unwrap_or_else(|| MISSING.to_string());

        let exposure = format!("f/{} {}s ISO{}", aperture, shutter, iso);
        match self.focal_text() {
            Some(focal) => format!("{}mm {}", focal, exposure),
            None => exposure,
        }
    }

    fn datetime_text(&self, format: &str) -> String {
        self.exif
            .datetime
            .as_deref()
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, EXIF_DATETIME).ok())
            .map(|dt| dt.format(format).to_string())
            .unwrap_or_else(|| MISSING.to_string())
    }

    /// Encode the current pixels with the default codec backend.
    pub fn save(&self, path: &Path, quality: Quality) -> Result<(), ContainerError> {
        self.save_with(&RustBackend::new(), path, quality)
    }

    /// Encode the current pixels using a specific backend.
    ///
    /// The backend writes atomically, so a failed save never leaves a
    /// truncated file at `path`.
    pub fn save_with(
        &self,
        backend: &impl ImageBackend,
        path: &Path,
        quality: Quality,
    ) -> Result<(), ContainerError> {
        let image = self.image()?;
        backend
            .encode(image, path, quality)
            .map_err(|source| ContainerError::Encode {
                path: path.display().to_string(),
                source,
            })
    }

    /// Release the pixel buffer. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), ContainerError> {
        match self.image.take() {
            Some(_) => {
                self.corner_text = Default::default();
                Ok(())
            }
            None => Err(self.closed_error()),
        }
    }
}

fn or_missing(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

fn join_present(parts: &[Option<&str>]) -> String {
    let present: Vec<&str> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        MISSING.to_string()
    } else {
        present.join(" ")
    }
}
