use std::collections::BTreeMap;

use image::Rgba;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{algorithms::normalize_class_label, config::RendererConfig};

/// Fill and outline colors for one detection class, as RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassStyle {
    pub fill: [u8; 4],
    pub stroke: [u8; 4],
}

impl ClassStyle {
    pub const fn new(fill: [u8; 4], stroke: [u8; 4]) -> Self {
        Self { fill, stroke }
    }

    /// Translucent fill over an opaque outline of the same hue
    const fn tinted(r: u8, g: u8, b: u8) -> Self {
        Self::new([r, g, b, 77], [r, g, b, 255])
    }

    pub fn fill_color(&self) -> Rgba<u8> {
        Rgba(self.fill)
    }

    pub fn stroke_color(&self) -> Rgba<u8> {
        Rgba(self.stroke)
    }
}

/// Magenta stands out from every built-in class.
pub const DEFAULT_STYLE: ClassStyle = ClassStyle::tinted(236, 72, 153);

const BUILTIN_STYLES: &[(&str, ClassStyle)] = &[
    ("siding", ClassStyle::tinted(59, 130, 246)),
    ("exterior_wall", ClassStyle::tinted(59, 130, 246)),
    ("building", ClassStyle::tinted(14, 165, 233)),
    ("window", ClassStyle::tinted(34, 197, 94)),
    ("door", ClassStyle::tinted(249, 115, 22)),
    ("garage_door", ClassStyle::tinted(234, 88, 12)),
    ("roof", ClassStyle::tinted(239, 68, 68)),
    ("gable", ClassStyle::tinted(220, 38, 38)),
    ("trim", ClassStyle::tinted(168, 85, 247)),
    ("corner", ClassStyle::tinted(147, 51, 234)),
    ("corner_trim", ClassStyle::tinted(147, 51, 234)),
    ("fascia", ClassStyle::tinted(234, 179, 8)),
    ("soffit", ClassStyle::tinted(202, 138, 4)),
    ("gutter", ClassStyle::tinted(20, 184, 166)),
    ("downspout", ClassStyle::tinted(13, 148, 136)),
    ("vent", ClassStyle::tinted(100, 116, 139)),
];

/// Class-to-color lookup keyed by normalized class label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPalette {
    styles: BTreeMap<String, ClassStyle>,
    default_style: ClassStyle,
}

impl ClassPalette {
    pub fn builtin() -> Self {
        Self {
            styles: BUILTIN_STYLES
                .iter()
                .map(|(class, style)| (class.to_string(), *style))
                .collect(),
            default_style: DEFAULT_STYLE,
        }
    }

    /// Built-in table with the configured overrides merged on top
    pub fn from_config(config: &RendererConfig) -> Self {
        let mut palette = Self::builtin();
        for (class, style) in &config.palette {
            palette.insert(class, *style);
        }
        if let Some(style) = config.default_style {
            palette.default_style = style;
        }
        palette
    }

    pub fn insert(&mut self, class: &str, style: ClassStyle) {
        self.styles.insert(normalize_class_label(class), style);
    }

    pub fn default_style(&self) -> ClassStyle {
        self.default_style
    }

    pub fn style_for(&self, class: &str) -> ClassStyle {
        self.styles
            .get(&normalize_class_label(class))
            .copied()
            .unwrap_or(self.default_style)
    }
}

impl Default for ClassPalette {
    fn default() -> Self {
        Self::builtin()
    }
}
