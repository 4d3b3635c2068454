use image::{GrayImage, Rgba, RgbaImage};
use crate::{error::Result, types::Point};

/// Trait for mask preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Preprocess the decoded mask (e.g., blur, threshold)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract outer contours from a binary mask
    fn extract_contours(&self, image: &GrayImage) -> Result<Vec<Vec<Point>>>;
}

/// Trait for contour simplification algorithms
pub trait ContourSimplifier: Send + Sync {
    /// Reduce the point count of a traced contour
    fn simplify(&self, contour: Vec<Point>, tolerance: f64) -> Vec<Point>;
}

/// Text rasterizer used for markup headers and legends
pub trait LabelFont: Send + Sync {
    /// Width and height in pixels of `text` as it would be drawn
    fn measure(&self, text: &str) -> (u32, u32);

    /// Draw `text` with its top-left corner at `(x, y)`
    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str);

    /// Size of `text` when drawn with [`LabelFont::draw_bold`]
    fn measure_bold(&self, text: &str) -> (u32, u32) {
        let (width, height) = self.measure(text);
        (width + 1, height)
    }

    /// Faux bold: the text is drawn twice, one pixel apart
    fn draw_bold(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        self.draw(canvas, x, y, color, text);
        self.draw(canvas, x + 1, y, color, text);
    }
}
