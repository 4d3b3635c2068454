//! Raw detector output as it arrives at the ingestion boundary.
//!
//! Each provider shape is a variant here; the format sniffing happens once,
//! in [`SegmentationOutput::from_json`] and [`DetectorOutput::from_json`], so
//! nothing downstream has to probe JSON fields.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::types::Point;

/// One Roboflow-style prediction. `(x, y)` is already the box center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawPrediction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub class: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

/// Inference response envelope wrapping the prediction list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RoboflowResponse {
    #[serde(default)]
    pub predictions: Vec<RawPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSize>,
}

/// Points arrive either as `{x, y}` objects or as `[x, y]` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPoint {
    Object { x: f64, y: f64 },
    Pair([f64; 2]),
}

impl From<RawPoint> for Point {
    fn from(raw: RawPoint) -> Self {
        match raw {
            RawPoint::Object { x, y } => Point::new(x, y),
            RawPoint::Pair([x, y]) => Point::new(x, y),
        }
    }
}

/// COCO run-length counts, either as plain integers or LEB128-style string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    Uncompressed(Vec<u32>),
    Compressed(String),
}

/// Column-major run-length mask; `size` is `[height, width]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RleMask {
    pub size: [u32; 2],
    pub counts: RleCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaskData {
    Rle(RleMask),
    /// Base64 image bytes, optionally as a `data:` URL
    Bitmap(String),
}

/// Segmentation output after format resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationOutput {
    Points(Vec<Point>),
    Pairs(Vec<[f64; 2]>),
    Contours(Vec<Vec<Point>>),
    Polygon(Vec<Point>),
    Mask(MaskData),
    Unrecognized,
}

impl SegmentationOutput {
    /// Resolve a SAM-style payload.
    ///
    /// Order: `{x, y}` array, `[x, y]` array, `contours`, `polygon`, `mask`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Self::Points(Vec::new());
                }
                if items.iter().all(Value::is_object) {
                    if let Ok(points) = serde_json::from_value::<Vec<Point>>(value.clone()) {
                        return Self::Points(points);
                    }
                }
                if items.iter().all(Value::is_array) {
                    if let Ok(pairs) = serde_json::from_value::<Vec<[f64; 2]>>(value.clone()) {
                        return Self::Pairs(pairs);
                    }
                }
                Self::Unrecognized
            }
            Value::Object(map) => {
                if let Some(Value::Array(contours)) = map.get("contours") {
                    let parsed: Option<Vec<Vec<Point>>> = contours.iter().map(parse_points).collect();
                    return parsed.map(Self::Contours).unwrap_or(Self::Unrecognized);
                }
                if let Some(polygon) = map.get("polygon") {
                    return parse_points(polygon)
                        .map(Self::Polygon)
                        .unwrap_or(Self::Unrecognized);
                }
                if let Some(mask) = map.get("mask") {
                    return parse_mask(mask)
                        .map(Self::Mask)
                        .unwrap_or(Self::Unrecognized);
                }
                Self::Unrecognized
            }
            _ => Self::Unrecognized,
        }
    }
}

fn parse_points(value: &Value) -> Option<Vec<Point>> {
    serde_json::from_value::<Vec<RawPoint>>(value.clone())
        .ok()
        .map(|raw| raw.into_iter().map(Point::from).collect())
}

fn parse_mask(value: &Value) -> Option<MaskData> {
    match value {
        Value::String(encoded) => Some(MaskData::Bitmap(encoded.clone())),
        Value::Object(_) => serde_json::from_value::<RleMask>(value.clone())
            .ok()
            .map(MaskData::Rle),
        _ => None,
    }
}

/// Any payload a detector can hand us.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutput {
    CenterBox(RoboflowResponse),
    Segmentation(SegmentationOutput),
}

impl DetectorOutput {
    /// Tell center-box responses from segmentation payloads.
    ///
    /// A `predictions` envelope, or an array whose elements carry `class` and
    /// `confidence`, is treated as center-box output.
    pub fn from_json(value: &Value) -> Self {
        if let Some(predictions) = value.get("predictions") {
            return match serde_json::from_value::<RoboflowResponse>(value.clone()) {
                Ok(response) => Self::CenterBox(response),
                Err(err) => {
                    tracing::warn!(%err, entries = ?predictions.as_array().map(Vec::len), "unreadable prediction envelope");
                    Self::Segmentation(SegmentationOutput::Unrecognized)
                }
            };
        }

        let looks_like_predictions = value
            .as_array()
            .and_then(|items| items.first())
            .is_some_and(|first| first.get("class").is_some() && first.get("confidence").is_some());

        if looks_like_predictions {
            return match serde_json::from_value::<Vec<RawPrediction>>(value.clone()) {
                Ok(predictions) => Self::CenterBox(RoboflowResponse { predictions, image: None }),
                Err(err) => {
                    tracing::warn!(%err, "unreadable prediction list");
                    Self::Segmentation(SegmentationOutput::Unrecognized)
                }
            };
        }

        Self::Segmentation(SegmentationOutput::from_json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_point_objects_before_pairs() {
        let output = SegmentationOutput::from_json(&json!([{"x": 1, "y": 2}, {"x": 3, "y": 4}]));
        assert_eq!(output, SegmentationOutput::Points(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]));
    }

    #[test]
    fn resolves_numeric_pairs() {
        let output = SegmentationOutput::from_json(&json!([[1.5, 2.0], [3.0, 4.0], [0.0, 9.0]]));
        assert_eq!(output, SegmentationOutput::Pairs(vec![[1.5, 2.0], [3.0, 4.0], [0.0, 9.0]]));
    }

    #[test]
    fn resolves_contours_in_either_point_form() {
        let output = SegmentationOutput::from_json(&json!({
            "contours": [[[0, 0], [10, 0], [10, 10]], [{"x": 1, "y": 1}, {"x": 2, "y": 2}, {"x": 1, "y": 3}]]
        }));
        match output {
            SegmentationOutput::Contours(contours) => {
                assert_eq!(contours.len(), 2);
                assert_eq!(contours[0][1], Point::new(10.0, 0.0));
                assert_eq!(contours[1][2], Point::new(1.0, 3.0));
            }
            other => panic!("expected contours, got {other:?}"),
        }
    }

    #[test]
    fn contours_take_precedence_over_polygon_and_mask() {
        let output = SegmentationOutput::from_json(&json!({
            "contours": [[[0, 0], [4, 0], [4, 4]]],
            "polygon": [[9, 9], [8, 8], [7, 9]],
            "mask": "aGVsbG8="
        }));
        assert!(matches!(output, SegmentationOutput::Contours(_)));
    }

    #[test]
    fn resolves_polygon_field() {
        let output = SegmentationOutput::from_json(&json!({"polygon": [[0, 0], [5, 0], [5, 5]]}));
        assert!(matches!(output, SegmentationOutput::Polygon(ref p) if p.len() == 3));
    }

    #[test]
    fn resolves_rle_and_bitmap_masks() {
        let rle = SegmentationOutput::from_json(&json!({"mask": {"size": [2, 2], "counts": [1, 2, 1]}}));
        assert!(matches!(rle, SegmentationOutput::Mask(MaskData::Rle(_))));

        let bitmap = SegmentationOutput::from_json(&json!({"mask": "data:image/png;base64,AAAA"}));
        assert!(matches!(bitmap, SegmentationOutput::Mask(MaskData::Bitmap(_))));
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        assert_eq!(SegmentationOutput::from_json(&json!(42)), SegmentationOutput::Unrecognized);
        assert_eq!(SegmentationOutput::from_json(&json!({"foo": 1})), SegmentationOutput::Unrecognized);
        assert_eq!(SegmentationOutput::from_json(&json!(["a", "b"])), SegmentationOutput::Unrecognized);
    }

    #[test]
    fn sniffs_center_box_payloads() {
        let wrapped = DetectorOutput::from_json(&json!({
            "predictions": [{"x": 10, "y": 10, "width": 4, "height": 4, "class": "window", "confidence": 0.8}],
            "image": {"width": 640, "height": 480}
        }));
        assert!(matches!(wrapped, DetectorOutput::CenterBox(ref r) if r.predictions.len() == 1));

        let bare = DetectorOutput::from_json(&json!([
            {"x": 10, "y": 10, "width": 4, "height": 4, "class": "door", "confidence": 0.8}
        ]));
        assert!(matches!(bare, DetectorOutput::CenterBox(_)));

        let pairs = DetectorOutput::from_json(&json!([[0, 0], [1, 1], [2, 0]]));
        assert!(matches!(pairs, DetectorOutput::Segmentation(SegmentationOutput::Pairs(_))));
    }
}
