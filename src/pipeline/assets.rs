//! Fonts and manufacturer logos, loaded once when the chain is built.
//!
//! Components share one [`Assets`] behind an `Arc`; nothing in it changes
//! after loading.

use crate::config::BaseConfig;
use crate::imaging::FontSet;
use crate::imaging::text::load_font;
use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The `Default` value has no fonts and no logos.
#[derive(Debug, Default)]
pub struct Assets {
    pub fonts: FontSet,
    /// Logos keyed by lowercase file stem.
    logos: BTreeMap<String, RgbaImage>,
}

impl Assets {
    pub fn new(fonts: FontSet, logos: BTreeMap<String, RgbaImage>) -> Self {
        Self { fonts, logos }
    }

    /// Load fonts and, when `with_logos` is set, the logo directory.
    ///
    /// Configured fonts replace the embedded DejaVu faces. Missing or broken
    /// files are logged and skipped; a run never fails because of an asset.
    pub fn load(base: &BaseConfig, with_logos: bool) -> Self {
        let load = |path: Option<&Path>| {
            let path = path?;
            load_font(path)
                .inspect_err(|e| warn!(error = %e, "font unavailable"))
                .ok()
        };
        let regular = load(base.font.as_deref());
        let bold = load(base.bold_font.as_deref());
        let fonts = FontSet::embedded().with_overrides(regular, bold);

        let logos = match (&base.logo_dir, with_logos) {
            (Some(dir), true) => load_logos(dir),
            (None, true) => {
                warn!("logos enabled but base.logo_dir is not set");
                BTreeMap::new()
            }
            _ => BTreeMap::new(),
        };

        Self { fonts, logos }
    }

    pub fn logo_count(&self) -> usize {
        self.logos.len()
    }

    /// Logo for a camera make, matched case-insensitively.
    ///
    /// `"NIKON CORPORATION"` finds `nikon.png`. When several stems match,
    /// the longest wins so `leica` beats `lei`.
    pub fn logo_for(&self, make: &str) -> Option<&RgbaImage> {
        let make = make.to_lowercase();
        self.logos
            .iter()
            .filter(|(stem, _)| make.contains(stem.as_str()))
            .max_by_key(|(stem, _)| stem.len())
            .map(|(_, logo)| logo)
    }
}

fn load_logos(dir: &Path) -> BTreeMap<String, RgbaImage> {
    let mut logos = BTreeMap::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        let stem = path.file_stem().and_then(|s| s.to_str());
        let (true, Some(stem)) = (is_png && entry.file_type().is_file(), stem) else {
            continue;
        };
        match image::open(path) {
            Ok(img) => {
                debug!(logo = stem, "loaded logo");
                logos.insert(stem.to_lowercase(), img.to_rgba8());
            }
            Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable logo"),
        }
    }
    if logos.is_empty() {
        warn!(dir = %dir.display(), "no logos found");
    }
    logos
}
