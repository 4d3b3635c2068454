use image::GrayImage;
use imageproc::contours::BorderType;
use crate::{error::Result, traits::ContourExtractor, types::Point};

/// Imageproc-based contour extractor returning only outer borders
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_contours(&self, binary_image: &GrayImage) -> Result<Vec<Vec<Point>>> {
        let contours = imageproc::contours::find_contours::<i32>(binary_image);

        let result = contours
            .into_iter()
            .filter(|contour| matches!(contour.border_type, BorderType::Outer))
            .map(|contour| {
                contour.points
                    .iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect()
            })
            .collect();

        Ok(result)
    }
}
