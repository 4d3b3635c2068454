pub mod builder;

use image::GrayImage;
use crate::{
    algorithms::polygon_area,
    config::ContourSelection,
    error::Result,
    traits::{ContourExtractor, ContourSimplifier, ImagePreprocessor},
    types::Point,
};

/// Turns a decoded segmentation mask into polygon outlines
pub struct MaskTracer {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    contour_extractor: Box<dyn ContourExtractor>,
    simplifier: Option<(Box<dyn ContourSimplifier>, f64)>,
    selection: ContourSelection,
}

impl MaskTracer {
    /// Create a new tracer builder
    pub fn builder() -> builder::MaskTracerBuilder {
        builder::MaskTracerBuilder::new()
    }

    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        contour_extractor: Box<dyn ContourExtractor>,
        simplifier: Option<(Box<dyn ContourSimplifier>, f64)>,
        selection: ContourSelection,
    ) -> Self {
        Self {
            preprocessors,
            contour_extractor,
            simplifier,
            selection,
        }
    }

    /// Every outer contour of the mask with at least three points
    pub fn trace(&self, mask: &GrayImage) -> Result<Vec<Vec<Point>>> {
        let mut processed = mask.clone();
        for preprocessor in &self.preprocessors {
            processed = preprocessor.preprocess(&processed)?;
        }

        let contours = self.contour_extractor.extract_contours(&processed)?;

        let mut contours: Vec<Vec<Point>> = match &self.simplifier {
            Some((simplifier, tolerance)) => contours
                .into_iter()
                .map(|contour| simplifier.simplify(contour, *tolerance))
                .collect(),
            None => contours,
        };

        contours.retain(|contour| contour.len() >= 3);

        tracing::debug!(contours = contours.len(), "traced mask");
        Ok(contours)
    }

    /// The contour picked by the configured selection rule
    pub fn trace_primary(&self, mask: &GrayImage) -> Result<Option<Vec<Point>>> {
        Ok(select_contour(self.trace(mask)?, self.selection))
    }

    pub fn selection(&self) -> ContourSelection {
        self.selection
    }

    /// Get information about the tracer configuration
    pub fn info(&self) -> String {
        format!(
            "MaskTracer: {} preprocessors, simplification {}, selection {}",
            self.preprocessors.len(),
            if self.simplifier.is_some() { "on" } else { "off" },
            self.selection,
        )
    }
}

/// Pick one contour out of several.
pub fn select_contour(contours: Vec<Vec<Point>>, selection: ContourSelection) -> Option<Vec<Point>> {
    match selection {
        ContourSelection::First => contours.into_iter().next(),
        ContourSelection::LargestArea => contours.into_iter().max_by(|a, b| {
            polygon_area(a)
                .partial_cmp(&polygon_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}
