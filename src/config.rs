//! Run configuration.
//!
//! Handles loading, validating, and merging the `exifmark.toml` file. Stock
//! defaults are overridden by whatever keys the user file sets; everything
//! else keeps its default. The resulting [`Config`] is an immutable snapshot:
//! it is captured once when a run starts and passed by reference to the
//! chain builder and the scheduler.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [layout]
//! type = "watermark_right_logo"  # watermark | watermark_left_logo | watermark_right_logo | square | simple
//! logo_enable = false
//!
//! [layout.elements.left_top]
//! name = "model"                 # text field kind, see below
//! value = ""                     # literal text for name = "custom"
//! color = "#212121"
//! bold = true
//!
//! [global]
//! shadow = false
//! white_margin = true
//! white_margin_width = 3         # percent of the short edge
//! padding_with_original_ratio = false
//! use_equivalent_focal_length = false
//!
//! [base]
//! quality = 90
//! background = "#ffffff"
//! # font = "/path/to/Regular.ttf"
//! # bold_font = "/path/to/Bold.ttf"
//! # logo_dir = "logos"
//! # max_long_edge = 4000
//!
//! [processing]
//! max_workers = 5
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Color;
use crate::types::{Corner, TextField};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Largest accepted white margin, in percent of the short edge.
pub const MAX_MARGIN_PERCENT: u32 = 30;

/// Full configuration loaded from `exifmark.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Layout choice and per-corner text elements.
    pub layout: LayoutConfig,
    /// Effect toggles.
    pub global: GlobalConfig,
    /// Output quality, fonts, logos, colors.
    pub base: BaseConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.base.quality) {
            return Err(ConfigError::Validation(
                "base.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_workers == 0 {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        if self.global.white_margin_width > MAX_MARGIN_PERCENT {
            return Err(ConfigError::Validation(format!(
                "global.white_margin_width must be 0-{}",
                MAX_MARGIN_PERCENT
            )));
        }
        if self.base.max_long_edge == Some(0) {
            return Err(ConfigError::Validation(
                "base.max_long_edge must be positive".into(),
            ));
        }
        Color::parse(&self.base.background)
            .map_err(|e| ConfigError::Validation(format!("base.background: {e}")))?;
        for corner in Corner::ALL {
            Color::parse(&self.layout.elements.get(corner).color).map_err(|e| {
                ConfigError::Validation(format!("layout.elements.{corner}.color: {e}"))
            })?;
        }
        Ok(())
    }

    /// Strip and border color. Falls back to white if unparsable.
    pub fn background(&self) -> Color {
        Color::parse(&self.base.background).unwrap_or(Color::WHITE)
    }
}

/// Layout selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Registry key of the layout processor.
    #[serde(rename = "type")]
    pub layout_type: String,
    /// Draw the manufacturer logo in logo layouts.
    pub logo_enable: bool,
    /// Text shown in each corner slot.
    pub elements: ElementsConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layout_type: "watermark_right_logo".to_string(),
            logo_enable: false,
            elements: ElementsConfig::default(),
        }
    }
}

/// The four corner slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementsConfig {
    pub left_top: ElementConfig,
    pub right_top: ElementConfig,
    pub left_bottom: ElementConfig,
    pub right_bottom: ElementConfig,
}

impl ElementsConfig {
    pub fn get(&self, corner: Corner) -> &ElementConfig {
        match corner {
            Corner::LeftTop => &self.left_top,
            Corner::RightTop => &self.right_top,
            Corner::LeftBottom => &self.left_bottom,
            Corner::RightBottom => &self.right_bottom,
        }
    }
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            left_top: ElementConfig::new(TextField::Model, true),
            right_top: ElementConfig::new(TextField::Param, true),
            left_bottom: ElementConfig::new(TextField::LensModel, false),
            right_bottom: ElementConfig::new(TextField::Datetime, false),
        }
    }
}

/// A single corner slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementConfig {
    /// Which field to render.
    pub name: TextField,
    /// Literal text, used when `name = "custom"`.
    pub value: String,
    /// Text color as `#RRGGBB`.
    pub color: String,
    /// Use the bold face.
    pub bold: bool,
}

impl ElementConfig {
    pub fn new(name: TextField, bold: bool) -> Self {
        Self {
            name,
            bold,
            ..Self::default()
        }
    }

    /// Text color. Falls back to near-black if unparsable.
    pub fn text_color(&self) -> Color {
        Color::parse(&self.color).unwrap_or(Color::new(0x21, 0x21, 0x21))
    }
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            name: TextField::None,
            value: String::new(),
            color: "#212121".to_string(),
            bold: false,
        }
    }
}

/// Effect toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Drop shadow around the photo (not applied to `square`).
    pub shadow: bool,
    /// Uniform border around watermark layouts.
    pub white_margin: bool,
    /// Margin width in percent of the short edge.
    pub white_margin_width: u32,
    /// Pad the result back to the source aspect ratio (not applied to `square`).
    pub padding_with_original_ratio: bool,
    /// Prefer the 35mm-equivalent focal length in text.
    pub use_equivalent_focal_length: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            shadow: false,
            white_margin: true,
            white_margin_width: 3,
            padding_with_original_ratio: false,
            use_equivalent_focal_length: false,
        }
    }
}

/// Output and asset settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseConfig {
    /// Lossy encoding quality (1-100).
    pub quality: u32,
    /// Strip, margin and padding color.
    pub background: String,
    /// Regular font file. Without it, text slots are laid out but not drawn.
    pub font: Option<PathBuf>,
    /// Bold font file. Falls back to `font`.
    pub bold_font: Option<PathBuf>,
    /// Directory of `<make>.png` logos.
    pub logo_dir: Option<PathBuf>,
    /// Downscale bound applied by the `simple` layout.
    pub max_long_edge: Option<u32>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            background: "#ffffff".to_string(),
            font: None,
            bold_font: None,
            logo_dir: None,
            max_long_edge: None,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of files processed concurrently.
    pub max_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_WORKERS,
        }
    }
}

/// Resolve the worker count: a CLI override wins over the config value.
/// Never less than one.
pub fn effective_workers(config: &ProcessingConfig, cli_override: Option<usize>) -> usize {
    cli_override.unwrap_or(config.max_workers).max(1)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, merging user values on top of stock defaults.
///
/// `None` yields the stock defaults. An explicit path that does not exist
/// is an error: the user asked for that file.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = match path {
        Some(p) => Some(load_raw_config(p)?.ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", p.display()),
            ))
        })?),
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `exifmark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# exifmark configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# One of: watermark, watermark_left_logo, watermark_right_logo, square, simple.
# Unknown values fall back to simple.
type = "watermark_right_logo"

# Draw the camera manufacturer's logo (needs base.logo_dir).
logo_enable = false

# Text slots. `name` is one of:
#   model, make, lens_model, param, datetime, date, custom, none,
#   lens_make_lens_model, camera_model_lens_model, camera_make_camera_model,
#   total_pixel, filename, date_filename, datetime_filename, geo_info
# `value` is only used by `custom`.
[layout.elements.left_top]
name = "model"
value = ""
color = "#212121"
bold = true

[layout.elements.right_top]
name = "param"
value = ""
color = "#212121"
bold = true

[layout.elements.left_bottom]
name = "lens_model"
value = ""
color = "#212121"
bold = false

[layout.elements.right_bottom]
name = "datetime"
value = ""
color = "#212121"
bold = false

# ---------------------------------------------------------------------------
# Effects
# ---------------------------------------------------------------------------
[global]
# Drop shadow around the photo. Ignored for the square layout.
shadow = false

# White border around watermark layouts.
white_margin = true

# Border width in percent of the photo's short edge (0-30).
white_margin_width = 3

# Pad the result back to the source aspect ratio. Ignored for square.
padding_with_original_ratio = false

# Show the 35mm-equivalent focal length when the camera records it.
use_equivalent_focal_length = false

# ---------------------------------------------------------------------------
# Output and assets
# ---------------------------------------------------------------------------
[base]
# Encoding quality for JPEG/AVIF output (1 = worst, 100 = best).
quality = 90

# Strip, margin and padding color.
background = "#ffffff"

# Font files for the text slots. Without a font, text is not drawn.
# font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
# bold_font = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"

# Directory of logos named after the manufacturer, e.g. logos/nikon.png.
# logo_dir = "logos"

# Downscale bound for the simple layout (longer edge, pixels).
# max_long_edge = 4000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Files processed concurrently.
max_workers = 5
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.layout.layout_type, "watermark_right_logo");
        assert!(!config.layout.logo_enable);
        assert_eq!(config.base.quality, 90);
        assert!(config.global.white_margin);
        assert!(!config.global.shadow);
        assert_eq!(config.processing.max_workers, 5);
    }

    #[test]
    fn default_elements_per_corner() {
        let e = ElementsConfig::default();
        assert_eq!(e.get(Corner::LeftTop).name, TextField::Model);
        assert!(e.get(Corner::LeftTop).bold);
        assert_eq!(e.get(Corner::RightTop).name, TextField::Param);
        assert_eq!(e.get(Corner::LeftBottom).name, TextField::LensModel);
        assert_eq!(e.get(Corner::RightBottom).name, TextField::Datetime);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[layout]
type = "square"

[global]
shadow = true
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.layout.layout_type, "square");
        assert!(config.global.shadow);
        // Defaults preserved
        assert!(config.global.white_margin);
        assert_eq!(config.base.quality, 90);
    }

    #[test]
    fn parse_custom_element() {
        let toml = r##"
[layout.elements.left_top]
name = "custom"
value = "Shot on film"
color = "#ff0000"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        let e = config.layout.elements.get(Corner::LeftTop);
        assert_eq!(e.name, TextField::Custom);
        assert_eq!(e.value, "Shot on film");
        assert_eq!(e.text_color(), Color::new(255, 0, 0));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_none_returns_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("exifmark.toml");
        fs::write(
            &path,
            r##"
[base]
quality = 75

[processing]
max_workers = 2
"##,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.base.quality, 75);
        assert_eq!(config.processing.max_workers, 2);
        assert_eq!(config.layout.layout_type, "watermark_right_logo");
    }

    #[test]
    fn load_config_partial_element_keeps_corner_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("exifmark.toml");
        fs::write(
            &path,
            r#"
[layout.elements.left_top]
name = "make"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        let e = config.layout.elements.get(Corner::LeftTop);
        assert_eq!(e.name, TextField::Make);
        // Merged over the stock left_top, which is bold
        assert!(e.bold);
    }

    #[test]
    fn load_config_missing_explicit_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/exifmark.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("exifmark.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[global]
shaddow = true
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_text_field_rejected() {
        let toml_str = r#"
[layout.elements.right_top]
name = "shutter"
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = Config::default();
        config.base.quality = 100;
        assert!(config.validate().is_ok());
        config.base.quality = 1;
        assert!(config.validate().is_ok());
        config.base.quality = 0;
        assert!(config.validate().unwrap_err().to_string().contains("quality"));
        config.base.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_workers() {
        let mut config = Config::default();
        config.processing.max_workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_margin_width() {
        let mut config = Config::default();
        config.global.white_margin_width = MAX_MARGIN_PERCENT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_colors() {
        let mut config = Config::default();
        config.base.background = "white".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.elements.right_bottom.color = "#12".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("right_bottom"));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("exifmark.toml");
        fs::write(&path, "[base]\nquality = 200\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn effective_workers_prefers_override() {
        let processing = ProcessingConfig { max_workers: 4 };
        assert_eq!(effective_workers(&processing, None), 4);
        assert_eq!(effective_workers(&processing, Some(2)), 2);
        assert_eq!(effective_workers(&processing, Some(0)), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(1));
        assert_eq!(merged.get("b").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value =
            toml::from_str("[layout.elements.left_top]\nname = \"model\"\nbold = true").unwrap();
        let overlay: toml::Value =
            toml::from_str("[layout.elements.left_top]\nname = \"make\"").unwrap();
        let merged = merge_toml(base, overlay);
        let slot = &merged["layout"]["elements"]["left_top"];
        assert_eq!(slot["name"].as_str(), Some("make"));
        assert_eq!(slot["bold"].as_bool(), Some(true));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for section in ["layout", "global", "base", "processing"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
