//! # Takeoff Geometry
//!
//! Turns AI detector output on building elevation photos into measurable,
//! renderable shapes: canonical detections, region selections, net siding
//! areas and annotated markup images.
//!
//! ## Core Features
//!
//! - **Detection Normalizer**: Roboflow center boxes, SAM point lists, contours
//!   and masks all become one [`Detection`] type
//! - **Region Filter**: Confidence and center-point selection inside a user-drawn rectangle
//! - **Net-Area Calculator**: Gross facade, opening and net siding area per building and per page
//! - **Markup Renderer**: Class-styled overlays, header banner and legend exported as PNG
//! - **GeoJSON Support**: Export detections and facades, read detections back
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use takeoff::Normalizer;
//! use serde_json::json;
//!
//! let normalizer = Normalizer::default();
//! let detections = normalizer.normalize_json(
//!     &json!({"predictions": [
//!         {"x": 120, "y": 80, "width": 40, "height": 60, "class": "Window", "confidence": 0.92}
//!     ]}),
//!     "window",
//! );
//! assert_eq!(detections[0].class, "window");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Markup Export
//!
//! ```rust,no_run
//! use takeoff::{MarkupRenderer, ImageSource, RenderableDetection};
//!
//! # async fn run(detections: Vec<RenderableDetection>) -> takeoff::Result<()> {
//! let renderer = MarkupRenderer::new();
//! let export = renderer
//!     .export(&ImageSource::Path("elevation.jpg".into()), &detections, Some("North Elevation"))
//!     .await?;
//! export.save(std::path::Path::new(".")).await?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod detector;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod render;
pub mod io;
pub mod typed_geojson;
pub mod command;

// Re-exports for convenience
pub use error::{Result, TakeoffError};
pub use types::*;
pub use detector::{DetectorOutput, RawPrediction, RoboflowResponse, SegmentationOutput};
pub use config::TakeoffConfig;
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{MaskTracer, builder::MaskTracerBuilder};
pub use render::{ImageSource, MarkupExport, MarkupRenderer, encode_png, load_base_image};
pub use io::{detections_from_geojson_str, detections_to_geojson, siding_to_geojson};
pub use command::{CommandOutput, TakeoffCommand, TakeoffManager};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use serde_json::json;

    fn detector_response() -> serde_json::Value {
        json!({
            "predictions": [
                {"x": 150, "y": 150, "width": 300, "height": 200, "class": "Siding", "confidence": 0.95},
                {"x": 60, "y": 100, "width": 20, "height": 30, "class": "Window", "confidence": 0.88},
                {"x": 120, "y": 100, "width": 20, "height": 30, "class": "Window", "confidence": 0.25},
                {"x": 200, "y": 180, "width": 30, "height": 60, "class": "Door", "confidence": 0.91}
            ],
            "image": {"width": 320, "height": 240}
        })
    }

    #[test]
    fn detector_json_to_siding_summary() {
        let detections = Normalizer::default().normalize_json(&detector_response(), "unused");
        assert_eq!(detections.len(), 4);
        assert!(detections.iter().all(|d| d.source == DetectionSource::Roboflow));

        let siding = detections.iter().find(|d| d.class == "siding").unwrap();
        let exterior = siding.bounding_box().to_polygon();
        let confident: Vec<Detection> = detections.iter().filter(|d| d.confidence >= 0.3).cloned().collect();

        let openings = openings_from_detections(&confident, &["window", "door"]);
        let assignment = assign_openings(std::slice::from_ref(&exterior), openings);
        assert!(assignment.unassigned.is_empty());

        let building = SidingPolygon::build(
            exterior,
            assignment.per_building.into_iter().next().unwrap(),
            AreaScale::default(),
        )
        .unwrap();
        // 300x200 facade minus a 20x30 window and a 30x60 door
        assert_eq!(building.summary.gross_facade_sf, 60000.0);
        assert_eq!(building.summary.openings_sf, 2400.0);
        assert_eq!(building.summary.net_siding_sf, 57600.0);
        assert_eq!(building.summary.opening_count, 2);
    }

    #[test]
    fn undersized_region_returns_no_detections() {
        let response: RoboflowResponse = serde_json::from_value(detector_response()).unwrap();
        let result = filter_by_region(&response.predictions, &Region::new(0.0, 0.0, 40.0, 40.0), 0.3);
        assert!(matches!(result, Err(TakeoffError::RegionTooSmall { .. })));
    }

    #[test]
    fn region_selection_renders_to_png() {
        let response: RoboflowResponse = serde_json::from_value(detector_response()).unwrap();
        let selected = filter_by_region(&response.predictions, &Region::new(0.0, 50.0, 160.0, 120.0), 0.3).unwrap();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|d| d.source == DetectionSource::Region));

        let renderable: Vec<RenderableDetection> = selected.iter().map(RenderableDetection::from).collect();
        let base = RgbaImage::from_pixel(320, 240, Rgba([200, 200, 200, 255]));
        let canvas = MarkupRenderer::new().render(&base, &renderable, Some("Selection")).unwrap();
        assert_eq!(canvas.dimensions(), base.dimensions());
        assert_ne!(canvas, base);

        let png = encode_png(&canvas).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, canvas);
    }

    #[test]
    fn detections_survive_geojson_export() {
        let detections = Normalizer::default().normalize_json(&detector_response(), "unused");
        let text = serde_json::to_string(&detections_to_geojson(&detections)).unwrap();
        assert_eq!(detections_from_geojson_str(&text).unwrap(), detections);
    }
}
