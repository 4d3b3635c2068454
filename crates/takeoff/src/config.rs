use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, TakeoffError};
use crate::render::palette::ClassStyle;

/// What to do with segmentation output that only carries a raw mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaskPolicy {
    /// Report the mask as unsupported and produce no polygon
    #[default]
    Unsupported,
    /// Decode the mask and trace its outline
    TraceContours,
}

/// Which contour to keep when a segmentation yields several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContourSelection {
    /// Positionally first contour
    #[default]
    First,
    /// Contour enclosing the largest area
    LargestArea,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NormalizerConfig {
    pub mask_policy: MaskPolicy,
    pub contour_selection: ContourSelection,
    /// Douglas-Peucker tolerance applied to traced mask contours
    pub simplify_tolerance: Option<f64>,
    /// Binarization threshold for decoded bitmap masks
    pub mask_threshold: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            mask_policy: MaskPolicy::Unsupported,
            contour_selection: ContourSelection::First,
            simplify_tolerance: Some(1.0),
            mask_threshold: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RegionConfig {
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_width: 50.0,
            min_height: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RendererConfig {
    /// Outline width in pixels at native resolution
    pub stroke_width: f32,
    /// Opacity of the header banner background
    pub banner_alpha: u8,
    /// Pixel multiplier for the built-in bitmap font
    pub text_scale: u32,
    /// TrueType font to use instead of the built-in bitmap font
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    /// Per-class overrides merged over the built-in palette
    pub palette: BTreeMap<String, ClassStyle>,
    pub default_style: Option<ClassStyle>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            stroke_width: 3.0,
            banner_alpha: 180,
            text_scale: 2,
            font_path: None,
            font_size: 20.0,
            palette: BTreeMap::new(),
            default_style: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TakeoffConfig {
    pub normalizer: NormalizerConfig,
    pub region: RegionConfig,
    pub renderer: RendererConfig,
}

impl TakeoffConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| TakeoffError::Config(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(TakeoffError::UnsupportedFileFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = TakeoffConfig::from_toml_str("").unwrap();
        assert_eq!(config, TakeoffConfig::default());
        assert_eq!(config.region.min_width, 50.0);
        assert_eq!(config.renderer.stroke_width, 3.0);
        assert_eq!(config.normalizer.mask_policy, MaskPolicy::Unsupported);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = TakeoffConfig::from_toml_str(
            r#"
            [normalizer]
            mask_policy = "trace_contours"
            contour_selection = "largest_area"

            [renderer.palette.vinyl_siding]
            fill = [10, 20, 30, 60]
            stroke = [10, 20, 30, 255]
            "#,
        )
        .unwrap();

        assert_eq!(config.normalizer.mask_policy, MaskPolicy::TraceContours);
        assert_eq!(config.normalizer.contour_selection, ContourSelection::LargestArea);
        assert_eq!(config.normalizer.mask_threshold, 128);
        assert_eq!(config.renderer.palette["vinyl_siding"].fill, [10, 20, 30, 60]);
        assert_eq!(config.region, RegionConfig::default());
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = TakeoffConfig::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs")).unwrap_err();
        assert!(matches!(err, TakeoffError::UnsupportedFileFormat));
    }
}
