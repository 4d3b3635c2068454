use serde_json::Value;
use uuid::Uuid;

use crate::{
    algorithms::{bounding_box_from_polygon, decoding::decode_mask},
    config::{MaskPolicy, NormalizerConfig},
    detector::{DetectorOutput, MaskData, RawPrediction, RoboflowResponse, SegmentationOutput},
    pipeline::{MaskTracer, builder::MaskTracerBuilder, select_contour},
    types::{Detection, DetectionSource, Point},
};

/// Canonical class key: lowercase, whitespace runs collapsed to `_`.
///
/// `"Hardie  Plank "` becomes `"hardie_plank"`.
pub fn normalize_class_label(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Fresh provenance-prefixed identifier, e.g. `region-6f1c...`
pub fn detection_id(source: DetectionSource) -> String {
    format!("{}-{}", source, Uuid::new_v4())
}

/// Round to the nearest whole pixel, halves toward positive infinity.
///
/// `-2.5` becomes `-2`, matching the rounding detector front ends apply.
pub fn round_pixel(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Normalize one center-box prediction.
///
/// Coordinates are rounded with [`round_pixel`]; `points` are kept as the
/// polygon when present and non-empty.
pub fn normalize_prediction(prediction: &RawPrediction, source: DetectionSource) -> Detection {
    let polygon_points = prediction
        .points
        .as_ref()
        .filter(|points| !points.is_empty())
        .cloned();

    Detection {
        id: detection_id(source),
        class: normalize_class_label(&prediction.class),
        confidence: prediction.confidence,
        pixel_x: round_pixel(prediction.x),
        pixel_y: round_pixel(prediction.y),
        pixel_width: round_pixel(prediction.width),
        pixel_height: round_pixel(prediction.height),
        polygon_points,
        source,
    }
}

/// Result of pulling a polygon out of segmentation output.
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonExtraction {
    Points(Vec<Point>),
    /// The shape was understood but held no points
    Empty,
    /// Only a raw mask was supplied and tracing is disabled
    MaskNotSupported,
    Unrecognized,
}

/// Converts detector payloads into canonical detections
pub struct Normalizer {
    config: NormalizerConfig,
    tracer: MaskTracer,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let tracer = MaskTracerBuilder::from_config(&config);
        Self { config, tracer }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize_predictions(&self, predictions: &[RawPrediction]) -> Vec<Detection> {
        predictions
            .iter()
            .map(|prediction| normalize_prediction(prediction, DetectionSource::Roboflow))
            .collect()
    }

    pub fn normalize_response(&self, response: &RoboflowResponse) -> Vec<Detection> {
        self.normalize_predictions(&response.predictions)
    }

    /// Resolve the polygon carried by a segmentation payload
    pub fn extract_polygon(&self, output: &SegmentationOutput) -> PolygonExtraction {
        let points = match output {
            SegmentationOutput::Points(points) => points.clone(),
            SegmentationOutput::Pairs(pairs) => pairs.iter().copied().map(Point::from).collect(),
            SegmentationOutput::Contours(contours) => {
                match select_contour(contours.clone(), self.config.contour_selection) {
                    Some(contour) => contour,
                    None => return PolygonExtraction::Empty,
                }
            }
            SegmentationOutput::Polygon(points) => points.clone(),
            SegmentationOutput::Mask(mask) => return self.extract_from_mask(mask),
            SegmentationOutput::Unrecognized => return PolygonExtraction::Unrecognized,
        };

        if points.is_empty() {
            PolygonExtraction::Empty
        } else if points.iter().any(|p| !p.is_finite()) {
            PolygonExtraction::Unrecognized
        } else {
            PolygonExtraction::Points(points)
        }
    }

    fn extract_from_mask(&self, mask: &MaskData) -> PolygonExtraction {
        if self.config.mask_policy == MaskPolicy::Unsupported {
            return PolygonExtraction::MaskNotSupported;
        }

        let traced = decode_mask(mask).and_then(|image| self.tracer.trace_primary(&image));
        match traced {
            Ok(Some(points)) => PolygonExtraction::Points(points),
            Ok(None) => PolygonExtraction::Empty,
            Err(err) => {
                tracing::warn!(%err, "could not trace segmentation mask");
                PolygonExtraction::Unrecognized
            }
        }
    }

    /// Normalize a click-to-segment result into zero or one detection.
    ///
    /// Segmentation shapes are user-confirmed, so confidence is always 1.0.
    /// Shapes that cannot be resolved are logged and yield an empty list.
    pub fn normalize_segmentation(&self, output: &SegmentationOutput, class: &str) -> Vec<Detection> {
        let points = match self.extract_polygon(output) {
            PolygonExtraction::Points(points) => points,
            PolygonExtraction::Empty => {
                tracing::warn!("segmentation output contained no points");
                return Vec::new();
            }
            PolygonExtraction::MaskNotSupported => {
                tracing::warn!("segmentation output only carries a mask; contour tracing is disabled");
                return Vec::new();
            }
            PolygonExtraction::Unrecognized => {
                tracing::warn!("unrecognized segmentation output shape");
                return Vec::new();
            }
        };

        let Some(bbox) = bounding_box_from_polygon(&points) else {
            return Vec::new();
        };
        let center = bbox.center();

        vec![Detection {
            id: detection_id(DetectionSource::Sam),
            class: normalize_class_label(class),
            confidence: 1.0,
            pixel_x: center.x,
            pixel_y: center.y,
            pixel_width: bbox.width,
            pixel_height: bbox.height,
            polygon_points: Some(points),
            source: DetectionSource::Sam,
        }]
    }

    /// Normalize any detector JSON; `class` labels segmentation output.
    pub fn normalize_json(&self, value: &Value, class: &str) -> Vec<Detection> {
        let detections = match DetectorOutput::from_json(value) {
            DetectorOutput::CenterBox(response) => self.normalize_response(&response),
            DetectorOutput::Segmentation(output) => self.normalize_segmentation(&output, class),
        };
        tracing::debug!(count = detections.len(), "normalized detector output");
        detections
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}
