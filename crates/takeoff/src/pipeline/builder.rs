use crate::{
    pipeline::MaskTracer,
    config::{ContourSelection, NormalizerConfig},
    traits::{ImagePreprocessor, ContourExtractor, ContourSimplifier},
    algorithms::{
        ImageprocContourExtractor,
        ThresholdPreprocessor,
        DouglasPeuckerSimplifier,
        VisvalingamWhyattSimplifier,
    },
};

/// Builder for mask tracers with a fluent API
pub struct MaskTracerBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    simplifier: Option<(Box<dyn ContourSimplifier>, f64)>,
    selection: ContourSelection,
}

impl MaskTracerBuilder {
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            contour_extractor: None,
            simplifier: None,
            selection: ContourSelection::First,
        }
    }

    /// Add a preprocessor to the tracer
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the simplifier and its tolerance (replaces any existing one)
    pub fn set_simplifier<S>(mut self, simplifier: S, tolerance: f64) -> Self
    where
        S: ContourSimplifier + 'static,
    {
        self.simplifier = Some((Box::new(simplifier), tolerance));
        self
    }

    /// Douglas-Peucker simplification of traced contours
    pub fn with_simplification(self, tolerance: f64) -> Self {
        self.set_simplifier(DouglasPeuckerSimplifier, tolerance)
    }

    /// Visvalingam-Whyatt simplification of traced contours
    pub fn with_vw_simplification(self, tolerance: f64) -> Self {
        self.set_simplifier(VisvalingamWhyattSimplifier, tolerance)
    }

    pub fn with_selection(mut self, selection: ContourSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Build the tracer, thresholding at 128 unless preprocessors were given
    pub fn build(self) -> MaskTracer {
        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(ImageprocContourExtractor));

        let preprocessors = if self.preprocessors.is_empty() {
            vec![Box::new(ThresholdPreprocessor::default()) as Box<dyn ImagePreprocessor>]
        } else {
            self.preprocessors
        };

        MaskTracer::new(preprocessors, contour_extractor, self.simplifier, self.selection)
    }

    /// Tracer matching a normalizer configuration
    pub fn from_config(config: &NormalizerConfig) -> MaskTracer {
        let builder = Self::new()
            .add_preprocessor(ThresholdPreprocessor { threshold: config.mask_threshold })
            .with_selection(config.contour_selection);

        match config.simplify_tolerance {
            Some(tolerance) if tolerance > 0.0 => builder.with_simplification(tolerance).build(),
            _ => builder.build(),
        }
    }
}

impl Default for MaskTracerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
