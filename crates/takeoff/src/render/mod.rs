//! Markup export: detection overlays, header banner and class legend drawn
//! over the source photo, encoded as PNG.

pub mod draw;
pub mod font;
pub mod palette;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};

use crate::{
    algorithms::normalize_class_label,
    config::RendererConfig,
    error::{Result, TakeoffError},
    traits::LabelFont,
    types::{BoundingBox, Point, RenderableDetection},
};

pub use draw::Stencil;
pub use font::{BitmapFont, TrueTypeFont};
pub use palette::{ClassPalette, ClassStyle, DEFAULT_STYLE};

pub const PNG_MIME: &str = "image/png";

const PADDING: u32 = 6;
const MARGIN: u32 = 10;
const HEADER_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LEGEND_TEXT: Rgba<u8> = Rgba([17, 24, 39, 255]);
const LEGEND_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 230]);
const LEGEND_BORDER: Rgba<u8> = Rgba([55, 65, 81, 255]);

/// Where the base photo comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Load and decode the base photo. Any failure here is fatal to the render.
pub async fn load_base_image(source: &ImageSource) -> Result<RgbaImage> {
    let decoded = match source {
        ImageSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(image::ImageError::IoError)?;
            image::load_from_memory(&bytes)?
        }
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes)?,
    };
    Ok(decoded.to_rgba8())
}

/// Lossless PNG encoding of a rendered canvas.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Download name for a markup, derived from the header label when present.
pub fn export_filename(header: Option<&str>) -> String {
    let slug = header
        .unwrap_or_default()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "markup.png".to_string()
    } else {
        format!("markup-{slug}.png")
    }
}

/// An encoded markup ready to hand to a download mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupExport {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

impl MarkupExport {
    /// Write the PNG into `dir` under its generated filename
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// How a detection is drawn.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OverlayShape {
    Polygon(Vec<Point>),
    /// Center box converted to top-left form
    Rect(BoundingBox),
}

impl OverlayShape {
    fn outline(&self) -> Vec<Point> {
        match self {
            Self::Polygon(points) => points.clone(),
            Self::Rect(bbox) => bbox.to_polygon().points,
        }
    }
}

pub(crate) fn overlay_shape(detection: &RenderableDetection) -> OverlayShape {
    match detection.polygon_points.as_deref() {
        Some(points) if points.len() >= 3 => OverlayShape::Polygon(points.to_vec()),
        _ => OverlayShape::Rect(BoundingBox::from_center(
            detection.pixel_x,
            detection.pixel_y,
            detection.pixel_width,
            detection.pixel_height,
        )),
    }
}

/// Distinct normalized classes in first-seen order.
pub(crate) fn legend_classes(detections: &[RenderableDetection]) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    for detection in detections {
        let class = normalize_class_label(&detection.class);
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes
}

pub struct MarkupRenderer {
    config: RendererConfig,
    palette: ClassPalette,
    font: Box<dyn LabelFont>,
}

impl MarkupRenderer {
    pub fn new() -> Self {
        let config = RendererConfig::default();
        Self {
            palette: ClassPalette::from_config(&config),
            font: Box::new(BitmapFont::new(config.text_scale)),
            config,
        }
    }

    /// Build from configuration, loading the TrueType font when one is set
    pub fn from_config(config: &RendererConfig) -> Result<Self> {
        let font: Box<dyn LabelFont> = match &config.font_path {
            Some(path) => Box::new(TrueTypeFont::from_path(path, config.font_size)?),
            None => Box::new(BitmapFont::new(config.text_scale)),
        };
        Ok(Self {
            config: config.clone(),
            palette: ClassPalette::from_config(config),
            font,
        })
    }

    pub fn with_font(mut self, font: Box<dyn LabelFont>) -> Self {
        self.font = font;
        self
    }

    pub fn with_palette(mut self, palette: ClassPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn palette(&self) -> &ClassPalette {
        &self.palette
    }

    /// Draw detections, header and legend over a copy of `base`.
    ///
    /// The canvas keeps the base image's exact size. Detections are drawn in
    /// input order, so later ones paint over earlier ones where they overlap.
    pub fn render(
        &self,
        base: &RgbaImage,
        detections: &[RenderableDetection],
        header: Option<&str>,
    ) -> Result<RgbaImage> {
        if base.width() == 0 || base.height() == 0 {
            return Err(TakeoffError::ImageProcessing("base image has no pixels".to_string()));
        }

        let mut canvas = base.clone();
        for detection in detections {
            self.draw_detection(&mut canvas, detection);
        }

        if let Some(label) = header.map(str::trim).filter(|label| !label.is_empty()) {
            self.draw_header(&mut canvas, label);
        }
        self.draw_legend(&mut canvas, &legend_classes(detections));

        tracing::debug!(
            width = canvas.width(),
            height = canvas.height(),
            detections = detections.len(),
            "rendered markup"
        );
        Ok(canvas)
    }

    /// Load the base image, render and encode as PNG
    pub async fn export(
        &self,
        source: &ImageSource,
        detections: &[RenderableDetection],
        header: Option<&str>,
    ) -> Result<MarkupExport> {
        let base = load_base_image(source).await?;
        let canvas = self.render(&base, detections, header)?;
        Ok(MarkupExport {
            bytes: encode_png(&canvas)?,
            filename: export_filename(header),
            mime_type: PNG_MIME,
        })
    }

    fn draw_detection(&self, canvas: &mut RgbaImage, detection: &RenderableDetection) {
        let style = self.palette.style_for(&detection.class);
        let outline = overlay_shape(detection).outline();
        let (width, height) = canvas.dimensions();

        let Some(mut fill) = Stencil::around(&outline, 0.0, width, height) else {
            tracing::debug!(class = %detection.class, "detection lies outside the canvas");
            return;
        };
        fill.fill_ring(&outline);
        fill.paint(canvas, style.fill_color());

        if let Some(mut stroke) = Stencil::around(&outline, self.config.stroke_width, width, height) {
            stroke.stroke_ring(&outline, self.config.stroke_width);
            stroke.paint(canvas, style.stroke_color());
        }
    }

    fn draw_header(&self, canvas: &mut RgbaImage, label: &str) {
        let (text_width, text_height) = self.font.measure_bold(label);
        let background = Rgba([0, 0, 0, self.config.banner_alpha]);

        draw::fill_rect(
            canvas,
            0,
            0,
            text_width + 2 * PADDING,
            text_height + 2 * PADDING,
            background,
        );
        self.font.draw_bold(canvas, PADDING as i32, PADDING as i32, HEADER_TEXT, label);
    }

    fn draw_legend(&self, canvas: &mut RgbaImage, classes: &[String]) {
        if classes.is_empty() {
            return;
        }

        let labels: Vec<String> = classes.iter().map(|class| class.to_uppercase()).collect();
        let row_height = labels
            .iter()
            .map(|label| self.font.measure(label).1)
            .max()
            .unwrap_or(0)
            .max(1);
        let label_width = labels
            .iter()
            .map(|label| self.font.measure(label).0)
            .max()
            .unwrap_or(0);

        let swatch = row_height;
        let rows = labels.len() as u32;
        let box_width = PADDING + swatch + PADDING + label_width + PADDING;
        let box_height = PADDING + rows * row_height + (rows - 1) * PADDING + PADDING;
        let x = (canvas.width() as i32 - (box_width + MARGIN) as i32).max(0);
        let y = MARGIN as i32;

        draw::fill_rect(canvas, x, y, box_width, box_height, LEGEND_BACKGROUND);
        draw::outline_rect(canvas, x, y, box_width, box_height, LEGEND_BORDER);

        for (index, (class, label)) in classes.iter().zip(&labels).enumerate() {
            let style = self.palette.style_for(class);
            let row_y = y + (PADDING + index as u32 * (row_height + PADDING)) as i32;
            let swatch_x = x + PADDING as i32;

            draw::fill_rect(canvas, swatch_x, row_y, swatch, swatch, style.stroke_color());
            draw::fill_rect(canvas, swatch_x, row_y, swatch, swatch, style.fill_color());
            self.font.draw(
                canvas,
                swatch_x + (swatch + PADDING) as i32,
                row_y,
                LEGEND_TEXT,
                label,
            );
        }
    }
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Detection, DetectionSource};
    use draw::blend_pixel;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn base() -> RgbaImage {
        RgbaImage::from_pixel(200, 200, WHITE)
    }

    fn detection(class: &str, x: f64, y: f64, w: f64, h: f64, polygon: Option<Vec<Point>>) -> RenderableDetection {
        RenderableDetection {
            class: class.to_string(),
            pixel_x: x,
            pixel_y: y,
            pixel_width: w,
            pixel_height: h,
            polygon_points: polygon,
        }
    }

    fn triangle() -> Vec<Point> {
        vec![Point::new(10.0, 100.0), Point::new(90.0, 100.0), Point::new(10.0, 180.0)]
    }

    #[test]
    fn canvas_matches_base_dimensions() {
        let renderer = MarkupRenderer::new();
        let base = RgbaImage::from_pixel(317, 123, WHITE);
        let detections = [detection("window", 50.0, 50.0, 20.0, 20.0, None)];

        let canvas = renderer.render(&base, &detections, Some("Front Elevation")).unwrap();
        assert_eq!(canvas.dimensions(), (317, 123));
    }

    #[test]
    fn polygon_takes_precedence_over_the_box() {
        // Box would span 10..90 x 100..180, the triangle only its lower-left half
        let with_polygon = detection("window", 50.0, 140.0, 80.0, 80.0, Some(triangle()));
        assert_eq!(overlay_shape(&with_polygon), OverlayShape::Polygon(triangle()));

        let canvas = MarkupRenderer::new().render(&base(), &[with_polygon], None).unwrap();
        assert_ne!(canvas.get_pixel(25, 115), &WHITE);
        assert_eq!(canvas.get_pixel(80, 170), &WHITE);
    }

    #[test]
    fn four_point_polygon_is_drawn_as_a_polygon() {
        // Trapezoid narrowing toward the bottom inside a 20..120 x 100..170 box
        let trapezoid = vec![
            Point::new(20.0, 100.0),
            Point::new(120.0, 100.0),
            Point::new(90.0, 170.0),
            Point::new(50.0, 170.0),
        ];
        let quad = detection("door", 70.0, 135.0, 100.0, 70.0, Some(trapezoid.clone()));
        assert_eq!(overlay_shape(&quad), OverlayShape::Polygon(trapezoid));

        let canvas = MarkupRenderer::new().render(&base(), &[quad], None).unwrap();
        assert_ne!(canvas.get_pixel(70, 140), &WHITE);
        assert_eq!(canvas.get_pixel(25, 165), &WHITE);
        assert_eq!(canvas.get_pixel(115, 165), &WHITE);
    }

    #[test]
    fn huge_polygons_render_without_overflow() {
        let huge = vec![Point::new(-3e9, -3e9), Point::new(3e9, -3e9), Point::new(10.0, 3e9)];
        let small = RgbaImage::from_pixel(50, 50, WHITE);
        let canvas = MarkupRenderer::new()
            .render(&small, &[detection("window", 0.0, 0.0, 1.0, 1.0, Some(huge))], None)
            .unwrap();
        assert_ne!(canvas.get_pixel(5, 45), &WHITE);
    }

    #[test]
    fn box_fallback_converts_center_to_top_left() {
        let two_points = Some(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
        for polygon in [None, two_points] {
            let fallback = detection("window", 50.0, 140.0, 80.0, 80.0, polygon);
            assert_eq!(
                overlay_shape(&fallback),
                OverlayShape::Rect(BoundingBox { x: 10.0, y: 100.0, width: 80.0, height: 80.0 })
            );

            let canvas = MarkupRenderer::new().render(&base(), &[fallback], None).unwrap();
            assert_ne!(canvas.get_pixel(80, 170), &WHITE);
            assert_eq!(canvas.get_pixel(95, 185), &WHITE);
        }
    }

    #[test]
    fn unknown_class_uses_default_fill() {
        let detections = [detection("chimney", 100.0, 140.0, 60.0, 60.0, None)];
        let canvas = MarkupRenderer::new().render(&base(), &detections, None).unwrap();
        assert_eq!(canvas.get_pixel(100, 140), &blend_pixel(WHITE, DEFAULT_STYLE.fill_color()));
    }

    #[test]
    fn later_detections_paint_over_earlier_ones() {
        let mut palette = ClassPalette::builtin();
        palette.insert("red", ClassStyle::new([255, 0, 0, 255], [255, 0, 0, 255]));
        palette.insert("blue", ClassStyle::new([0, 0, 255, 255], [0, 0, 255, 255]));
        let renderer = MarkupRenderer::new().with_palette(palette);

        let detections = [
            detection("red", 100.0, 140.0, 60.0, 60.0, None),
            detection("blue", 110.0, 150.0, 60.0, 60.0, None),
        ];
        let canvas = renderer.render(&base(), &detections, None).unwrap();
        assert_eq!(canvas.get_pixel(105, 145), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(75, 115), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn header_banner_is_drawn_only_when_given() {
        let renderer = MarkupRenderer::new();
        let without = renderer.render(&base(), &[], None).unwrap();
        assert_eq!(without, base());

        let with = renderer.render(&base(), &[], Some("Page 3")).unwrap();
        let corner = with.get_pixel(1, 1);
        assert!(corner[0] < 128, "banner should darken the corner, got {corner:?}");

        let blank = renderer.render(&base(), &[], Some("   ")).unwrap();
        assert_eq!(blank, base());
    }

    #[test]
    fn legend_lists_each_class_once_in_first_seen_order() {
        let detections = [
            detection("window", 0.0, 0.0, 1.0, 1.0, None),
            detection("Garage Door", 0.0, 0.0, 1.0, 1.0, None),
            detection("Window", 0.0, 0.0, 1.0, 1.0, None),
            detection("garage_door", 0.0, 0.0, 1.0, 1.0, None),
            detection("trim", 0.0, 0.0, 1.0, 1.0, None),
        ];
        assert_eq!(legend_classes(&detections), vec!["window", "garage_door", "trim"]);
    }

    #[test]
    fn legend_sits_in_the_top_right() {
        let detections = [detection("window", 100.0, 150.0, 10.0, 10.0, None)];
        let canvas = MarkupRenderer::new().render(&base(), &detections, None).unwrap();

        let border_x = 200 - MARGIN - 1;
        assert_eq!(canvas.get_pixel(border_x, MARGIN + 2), &LEGEND_BORDER);
        assert_eq!(canvas.get_pixel(2, MARGIN + 2), &WHITE);
    }

    #[test]
    fn empty_base_is_rejected() {
        let result = MarkupRenderer::new().render(&RgbaImage::new(0, 0), &[], None);
        assert!(matches!(result, Err(TakeoffError::ImageProcessing(_))));
    }

    #[test]
    fn png_encoding_and_filenames() {
        let bytes = encode_png(&base()).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

        assert_eq!(export_filename(None), "markup.png");
        assert_eq!(export_filename(Some("  ")), "markup.png");
        assert_eq!(export_filename(Some("Front Elevation / Page 2")), "markup-front-elevation-page-2.png");
    }

    #[test]
    fn renderable_projection_drops_provenance() {
        let full = Detection {
            id: "roboflow-1".to_string(),
            class: "door".to_string(),
            confidence: 0.8,
            pixel_x: 10.0,
            pixel_y: 20.0,
            pixel_width: 30.0,
            pixel_height: 40.0,
            polygon_points: None,
            source: DetectionSource::Roboflow,
        };
        let renderable = RenderableDetection::from(&full);
        assert_eq!(renderable, detection("door", 10.0, 20.0, 30.0, 40.0, None));
    }

    #[tokio::test]
    async fn missing_base_image_fails_the_export() {
        let source = ImageSource::Path(PathBuf::from("/nonexistent/elevation.png"));
        let result = MarkupRenderer::new().export(&source, &[], None).await;
        assert!(matches!(result, Err(TakeoffError::ImageLoad(_))));

        let garbage = ImageSource::Bytes(b"not an image".to_vec());
        assert!(matches!(load_base_image(&garbage).await, Err(TakeoffError::ImageLoad(_))));
    }

    #[tokio::test]
    async fn export_round_trips_through_png() {
        let source = ImageSource::Bytes(encode_png(&base()).unwrap());
        let detections = [detection("window", 50.0, 140.0, 80.0, 80.0, Some(triangle()))];

        let export = MarkupRenderer::new()
            .export(&source, &detections, Some("North"))
            .await
            .unwrap();
        assert_eq!(export.mime_type, "image/png");
        assert_eq!(export.filename, "markup-north.png");

        let decoded = image::load_from_memory(&export.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (200, 200));
    }
}
