//! Processor chain: the ordered list of transformations applied to every photo.
//!
//! A chain is built once per run from the [`Config`] snapshot and then
//! shared read-only by every worker. Order is part of the output:
//!
//! ```text
//! [shadow] -> layout -> [margin] -> [padding_to_original_ratio]
//! ```
//!
//! 1. **Shadow** when `global.shadow` is on and the layout is not `square`.
//! 2. **Layout** looked up by `layout.type` in [`LAYOUTS`]; unknown keys fall
//!    back to `simple`.
//! 3. **Margin** when `global.white_margin` is on and the layout key contains
//!    `watermark`, so the border wraps the composed strip.
//! 4. **PaddingToOriginalRatio** when enabled and the layout is not `square`.
//!
//! A failing component aborts the chain for that one photo; nothing is saved
//! for it and the caller decides what to do with the error.

mod assets;
mod component;
mod compose;

pub use assets::Assets;
pub use component::{ProcessorComponent, Watermark};
pub use compose::LogoPosition;

use crate::config::Config;
use crate::container::{ContainerError, ImageContainer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("{component} failed: {reason}")]
    Render {
        component: &'static str,
        reason: String,
    },
}

/// Registry of layout keys accepted by `layout.type`.
pub const LAYOUTS: &[&str] = &[
    "watermark",
    "watermark_left_logo",
    "watermark_right_logo",
    "square",
    "simple",
];

const SQUARE: &str = "square";

#[derive(Debug, Clone, Default)]
pub struct ProcessorChain {
    components: Vec<ProcessorComponent>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component. Insertion order is execution order.
    pub fn add(&mut self, component: ProcessorComponent) {
        self.components.push(component);
    }

    pub fn components(&self) -> &[ProcessorComponent] {
        &self.components
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Run every component in order, stopping at the first failure.
    pub fn process(&self, container: &mut ImageContainer) -> Result<(), ProcessingError> {
        for component in &self.components {
            component.process(container)?;
        }
        Ok(())
    }
}

impl fmt::Display for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("(empty)");
        }
        f.write_str(&self.names().join(" -> "))
    }
}

/// Build the chain for a run, loading fonts and logos from the config.
pub fn build_chain(config: &Config) -> ProcessorChain {
    let layout = config.layout.layout_type.as_str();
    let uses_logo = config.layout.logo_enable && layout_logo(layout).is_some();
    let assets = Assets::load(&config.base, uses_logo);

    if layout.contains("watermark") && !assets.fonts.can_draw() {
        warn!("no usable font configured; watermark text will not be drawn");
    }

    let chain = build_chain_with_assets(config, Arc::new(assets));
    info!(layout, chain = %chain, "built processor chain");
    chain
}

/// Build the chain with already loaded assets.
pub fn build_chain_with_assets(config: &Config, assets: Arc<Assets>) -> ProcessorChain {
    let layout = config.layout.layout_type.as_str();
    let global = &config.global;
    let background = config.background();
    let mut chain = ProcessorChain::new();

    if global.shadow && layout != SQUARE {
        chain.add(ProcessorComponent::Shadow { background });
    }

    match layout_component(config, assets) {
        Some(component) => chain.add(component),
        None => {
            warn!(layout, "unknown layout type, falling back to simple");
            chain.add(simple(config));
        }
    }

    if global.white_margin && layout.contains("watermark") {
        chain.add(ProcessorComponent::Margin {
            percent: global.white_margin_width,
            background,
        });
    }

    if global.padding_with_original_ratio && layout != SQUARE {
        chain.add(ProcessorComponent::PaddingToOriginalRatio { background });
    }

    chain
}

fn layout_logo(layout: &str) -> Option<LogoPosition> {
    match layout {
        "watermark_left_logo" => Some(LogoPosition::Left),
        "watermark_right_logo" => Some(LogoPosition::Right),
        _ => None,
    }
}

/// Look up the layout registry.
fn layout_component(config: &Config, assets: Arc<Assets>) -> Option<ProcessorComponent> {
    let background = config.background();
    let watermark = |logo: Option<LogoPosition>| {
        ProcessorComponent::Watermark(Watermark {
            logo: logo.filter(|_| config.layout.logo_enable),
            elements: config.layout.elements.clone(),
            background,
            assets,
        })
    };
    match config.layout.layout_type.as_str() {
        "watermark" => Some(watermark(None)),
        key @ ("watermark_left_logo" | "watermark_right_logo") => Some(watermark(layout_logo(key))),
        "square" => Some(ProcessorComponent::Square { background }),
        "simple" => Some(simple(config)),
        _ => None,
    }
}

fn simple(config: &Config) -> ProcessorComponent {
    ProcessorComponent::Simple {
        max_long_edge: config.base.max_long_edge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ExifData;
    use image::DynamicImage;

    fn config(layout: &str, shadow: bool, margin: bool, padding: bool) -> Config {
        let mut config = Config::default();
        config.layout.layout_type = layout.to_string();
        config.global.shadow = shadow;
        config.global.white_margin = margin;
        config.global.padding_with_original_ratio = padding;
        config
    }

    fn names(config: &Config) -> Vec<&'static str> {
        build_chain_with_assets(config, Arc::new(Assets::default())).names()
    }

    // =========================================================================
    // Chain construction order
    // =========================================================================

    /// Independent statement of the four construction rules.
    fn expected(layout: &str, shadow: bool, margin: bool, padding: bool) -> Vec<&'static str> {
        let mut out = Vec::new();
        if shadow && layout != "square" {
            out.push("shadow");
        }
        out.push(match layout {
            "watermark" => "watermark",
            "watermark_left_logo" => "watermark",
            "watermark_right_logo" => "watermark",
            "square" => "square",
            _ => "simple",
        });
        if margin && layout.contains("watermark") {
            out.push("margin");
        }
        if padding && layout != "square" {
            out.push("padding_to_original_ratio");
        }
        out
    }

    #[test]
    fn order_for_every_layout_and_flag_combination() {
        let layouts = ["watermark", "watermark_left_logo", "watermark_right_logo", "square", "simple", "polaroid"];
        for layout in layouts {
            for bits in 0..8u8 {
                let (shadow, margin, padding) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
                let cfg = config(layout, shadow, margin, padding);
                assert_eq!(
                    names(&cfg),
                    expected(layout, shadow, margin, padding),
                    "layout={layout} shadow={shadow} margin={margin} padding={padding}"
                );
            }
        }
    }

    #[test]
    fn scenario_shadow_watermark_margin() {
        let cfg = config("watermark", true, true, false);
        assert_eq!(names(&cfg), vec!["shadow", "watermark", "margin"]);
    }

    #[test]
    fn square_excludes_shadow_and_padding() {
        let cfg = config("square", true, true, true);
        assert_eq!(names(&cfg), vec!["square"]);
    }

    #[test]
    fn unknown_layout_falls_back_to_simple() {
        let cfg = config("polaroid", false, true, false);
        assert_eq!(names(&cfg), vec!["simple"]);
    }

    #[test]
    fn logo_layouts_respect_logo_enable() {
        let mut cfg = config("watermark_left_logo", false, false, false);
        assert_eq!(names(&cfg), vec!["watermark"]);
        cfg.layout.logo_enable = true;
        assert_eq!(names(&cfg), vec!["watermark_left_logo"]);
        cfg.layout.layout_type = "watermark_right_logo".to_string();
        assert_eq!(names(&cfg), vec!["watermark_right_logo"]);
    }

    #[test]
    fn every_registry_key_resolves() {
        for key in LAYOUTS {
            let cfg = config(key, false, false, false);
            assert!(layout_component(&cfg, Arc::new(Assets::default())).is_some(), "{key}");
        }
    }

    #[test]
    fn chain_display() {
        let cfg = config("watermark", true, true, true);
        let chain = build_chain_with_assets(&cfg, Arc::new(Assets::default()));
        assert_eq!(
            chain.to_string(),
            "shadow -> watermark -> margin -> padding_to_original_ratio"
        );
        assert_eq!(ProcessorChain::new().to_string(), "(empty)");
    }

    // =========================================================================
    // Chain execution
    // =========================================================================

    fn container() -> ImageContainer {
        ImageContainer::from_parts("/in/a.jpg", DynamicImage::new_rgb8(300, 200), ExifData::default())
    }

    #[test]
    fn empty_chain_is_passthrough() {
        let mut c = container();
        ProcessorChain::new().process(&mut c).unwrap();
        let dims = c.dimensions().unwrap();
        assert_eq!((dims.width, dims.height), (300, 200));
    }

    #[test]
    fn full_chain_applies_every_step() {
        let cfg = config("watermark", true, true, true);
        let chain = build_chain_with_assets(&cfg, Arc::new(Assets::default()));
        let mut c = container();
        chain.process(&mut c).unwrap();

        let dims = c.dimensions().unwrap();
        // Padding restores the 3:2 source ratio
        let ratio = dims.width as f64 / dims.height as f64;
        assert!((ratio - 1.5).abs() < 0.01, "ratio {ratio}");
        assert!(dims.width > 300);
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let cfg = config("watermark", false, true, false);
        let chain = build_chain_with_assets(&cfg, Arc::new(Assets::default()));
        let mut c = ImageContainer::from_parts("/in/a.jpg", DynamicImage::new_rgb8(0, 0), ExifData::default());
        let err = chain.process(&mut c).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Render {
                component: "watermark",
                ..
            }
        ));
    }

    #[test]
    fn shared_chain_across_threads() {
        let cfg = config("watermark", true, true, false);
        let chain = build_chain_with_assets(&cfg, Arc::new(Assets::default()));
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut c = container();
                    chain.process(&mut c).unwrap();
                });
            }
        });
    }

    #[test]
    fn default_assets_draw_exif_text_in_strip() {
        let cfg = config("watermark", false, false, false);
        let chain = build_chain(&cfg);
        let exif = ExifData {
            make: Some("FUJIFILM".to_string()),
            model: Some("X-T5".to_string()),
            aperture: Some(4.0),
            exposure_time: Some((1, 250)),
            iso: Some(400),
            datetime: Some("2024:03:15 10:22:31".to_string()),
            ..ExifData::default()
        };
        let mut c = ImageContainer::from_parts("/in/a.jpg", DynamicImage::new_rgb8(600, 400), exif);
        chain.process(&mut c).unwrap();

        let out = c.image().unwrap().to_rgba8();
        assert!(out.height() > 400);
        let background = cfg.background().rgba();
        let ink = (400..out.height())
            .flat_map(|y| (0..out.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| *out.get_pixel(x, y) != background)
            .count();
        assert!(ink > 100, "only {ink} text pixels in the strip");
    }
}
