//! Shared types used by configuration, the container, and the pipeline.
//!
//! These are the vocabulary of the config file: corner names and text field
//! kinds are deserialized from snake_case strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four text slots of a watermark strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    LeftTop,
    RightTop,
    LeftBottom,
    RightBottom,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::LeftTop,
        Corner::RightTop,
        Corner::LeftBottom,
        Corner::RightBottom,
    ];

    pub fn is_top(self) -> bool {
        matches!(self, Corner::LeftTop | Corner::RightTop)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Corner::LeftTop | Corner::LeftBottom)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Corner::LeftTop => "left_top",
            Corner::RightTop => "right_top",
            Corner::LeftBottom => "left_bottom",
            Corner::RightBottom => "right_bottom",
        };
        f.write_str(name)
    }
}

/// What a text slot displays.
///
/// Each kind has one fixed rendering rule, implemented by
/// [`ImageContainer::text`](crate::container::ImageContainer::text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Model,
    Make,
    LensModel,
    Param,
    Datetime,
    Date,
    Custom,
    None,
    LensMakeLensModel,
    CameraModelLensModel,
    CameraMakeCameraModel,
    TotalPixel,
    Filename,
    DateFilename,
    DatetimeFilename,
    GeoInfo,
}

impl TextField {
    pub const ALL: [TextField; 16] = [
        TextField::Model,
        TextField::Make,
        TextField::LensModel,
        TextField::Param,
        TextField::Datetime,
        TextField::Date,
        TextField::Custom,
        TextField::None,
        TextField::LensMakeLensModel,
        TextField::CameraModelLensModel,
        TextField::CameraMakeCameraModel,
        TextField::TotalPixel,
        TextField::Filename,
        TextField::DateFilename,
        TextField::DatetimeFilename,
        TextField::GeoInfo,
    ];
}
