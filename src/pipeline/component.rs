//! The closed set of chain components.
//!
//! Components hold configuration and shared assets only. All per-image
//! state lives in the [`ImageContainer`], which is what lets one chain be
//! shared by every worker.

use super::ProcessingError;
use super::assets::Assets;
use super::compose::{self, LogoPosition, Strip};
use crate::config::ElementsConfig;
use crate::container::ImageContainer;
use crate::imaging::Color;
use crate::types::Corner;
use image::{DynamicImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// Settings for the watermark strip layouts.
#[derive(Debug, Clone)]
pub struct Watermark {
    pub logo: Option<LogoPosition>,
    pub elements: ElementsConfig,
    pub background: Color,
    pub assets: Arc<Assets>,
}

#[derive(Debug, Clone)]
pub enum ProcessorComponent {
    /// Bottom strip with corner text; optional logo left or right.
    Watermark(Watermark),
    /// Uniform border, a percent of the short edge.
    Margin { percent: u32, background: Color },
    /// Drop shadow around the photo.
    Shadow { background: Color },
    /// Pad to 1:1.
    Square { background: Color },
    /// Normalize, optionally bounding the long edge.
    Simple { max_long_edge: Option<u32> },
    /// Pad back to the source aspect ratio.
    PaddingToOriginalRatio { background: Color },
}

impl ProcessorComponent {
    /// Stable name, matching the layout registry key where there is one.
    pub fn name(&self) -> &'static str {
        match self {
            ProcessorComponent::Watermark(w) => match w.logo {
                None => "watermark",
                Some(LogoPosition::Left) => "watermark_left_logo",
                Some(LogoPosition::Right) => "watermark_right_logo",
            },
            ProcessorComponent::Margin { .. } => "margin",
            ProcessorComponent::Shadow { .. } => "shadow",
            ProcessorComponent::Square { .. } => "square",
            ProcessorComponent::Simple { .. } => "simple",
            ProcessorComponent::PaddingToOriginalRatio { .. } => "padding_to_original_ratio",
        }
    }

    /// Transform the container's image in place.
    pub fn process(&self, container: &mut ImageContainer) -> Result<(), ProcessingError> {
        let output = match self {
            ProcessorComponent::Watermark(w) => {
                let mut texts: [String; 4] = Default::default();
                for corner in Corner::ALL {
                    texts[corner.index()] = container
                        .corner_text(corner, w.elements.get(corner))?
                        .to_string();
                }
                let photo = self.frame(container)?;
                let logo = w.logo.and_then(|position| {
                    let make = container.exif().make.as_deref()?;
                    w.assets.logo_for(make).map(|logo| (logo, position))
                });
                let strip = Strip {
                    texts: Corner::ALL.map(|c| texts[c.index()].as_str()),
                    colors: Corner::ALL.map(|c| w.elements.get(c).text_color()),
                    bold: Corner::ALL.map(|c| w.elements.get(c).bold),
                    logo,
                    background: w.background,
                };
                compose::watermark(&photo, &strip, &w.assets)
            }
            ProcessorComponent::Margin {
                percent,
                background,
            } => compose::margin(&self.frame(container)?, *percent, *background),
            ProcessorComponent::Shadow { background } => {
                compose::shadow(&self.frame(container)?, *background)
            }
            ProcessorComponent::Square { background } => {
                compose::square(&self.frame(container)?, *background)
            }
            ProcessorComponent::Simple { max_long_edge } => {
                compose::normalize(&self.frame(container)?, *max_long_edge)
            }
            ProcessorComponent::PaddingToOriginalRatio { background } => compose::pad_to_ratio(
                &self.frame(container)?,
                container.original_dimensions(),
                *background,
            ),
        };
        container.replace_image(DynamicImage::ImageRgba8(output))?;
        Ok(())
    }

    /// The current image as RGBA. Empty images cannot be composed.
    fn frame(&self, container: &ImageContainer) -> Result<RgbaImage, ProcessingError> {
        let image = container.image()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ProcessingError::Render {
                component: self.name(),
                reason: format!("{} has no pixels", container.file_name()),
            });
        }
        Ok(image.to_rgba8())
    }
}

impl fmt::Display for ProcessorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
