use geo_types::{Coord, LineString};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// A position in image pixel space, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Coord { x: point.x, y: point.y }
    }
}

impl From<Coord<f64>> for Point {
    fn from(coord: Coord<f64>) -> Self {
        Self { x: coord.x, y: coord.y }
    }
}

/// Ordered ring of points. The ring is implicitly closed: the last point
/// connects back to the first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// A polygon needs at least three vertices to be drawn or measured.
    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn area(&self) -> f64 {
        crate::algorithms::polygon_area(&self.points)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        crate::algorithms::bounding_box_from_polygon(&self.points)
    }

    /// Convert to a geo-types polygon for containment and area predicates
    pub fn to_geo_polygon(&self) -> geo_types::Polygon<f64> {
        let coords: Vec<Coord<f64>> = self.points.iter().copied().map(Coord::from).collect();
        geo_types::Polygon::new(LineString::new(coords), vec![])
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

/// Axis-aligned box with `(x, y)` at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Convert a center-based box into its top-left form
    pub fn from_center(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            x: center_x - width / 2.0,
            y: center_y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Corners in clockwise order starting at the top-left
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.x, self.y),
            Point::new(self.max_x(), self.y),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.x, self.max_y()),
        ])
    }
}

/// User-drawn rectangular selection, in the same pixel space as detections.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Which detector or workflow produced a detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionSource {
    /// Full-page Roboflow inference
    Roboflow,
    /// Click-to-segment SAM output
    Sam,
    /// Detections surfaced through a user-drawn region
    Region,
    /// Vision-assistant suggestions
    Assistant,
    /// Shapes drawn by hand in the editor
    Manual,
}

/// Canonical detection record shared by every downstream stage.
///
/// The box is always center-based (`pixel_x`, `pixel_y` is the center),
/// whatever the detector reported. When `polygon_points` holds three or more
/// points it takes precedence over the box for rendering and area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    pub id: String,
    pub class: String,
    pub confidence: f64,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon_points: Option<Vec<Point>>,
    pub source: DetectionSource,
}

impl Detection {
    pub fn center(&self) -> Point {
        Point::new(self.pixel_x, self.pixel_y)
    }

    /// Polygon outline when one is present and renderable
    pub fn polygon(&self) -> Option<&[Point]> {
        self.polygon_points
            .as_deref()
            .filter(|points| points.len() >= 3)
    }

    /// Polygon when present, otherwise the corners of the center box
    pub fn outline(&self) -> Polygon {
        match self.polygon() {
            Some(points) => Polygon::new(points.to_vec()),
            None => BoundingBox::from_center(self.pixel_x, self.pixel_y, self.pixel_width, self.pixel_height)
                .to_polygon(),
        }
    }

    /// Extent of the polygon when present, otherwise of the center box
    pub fn bounding_box(&self) -> BoundingBox {
        self.polygon()
            .and_then(crate::algorithms::bounding_box_from_polygon)
            .unwrap_or_else(|| {
                BoundingBox::from_center(self.pixel_x, self.pixel_y, self.pixel_width, self.pixel_height)
            })
    }
}

/// The part of a detection the markup renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderableDetection {
    pub class: String,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon_points: Option<Vec<Point>>,
}

impl From<&Detection> for RenderableDetection {
    fn from(detection: &Detection) -> Self {
        Self {
            class: detection.class.clone(),
            pixel_x: detection.pixel_x,
            pixel_y: detection.pixel_y,
            pixel_width: detection.pixel_width,
            pixel_height: detection.pixel_height,
            polygon_points: detection.polygon_points.clone(),
        }
    }
}

impl From<Detection> for RenderableDetection {
    fn from(detection: Detection) -> Self {
        Self {
            class: detection.class,
            pixel_x: detection.pixel_x,
            pixel_y: detection.pixel_y,
            pixel_width: detection.pixel_width,
            pixel_height: detection.pixel_height,
            polygon_points: detection.polygon_points,
        }
    }
}

/// Conversion from pixel measurements to real-world square feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AreaScale {
    pub pixels_per_foot: f64,
}

impl AreaScale {
    pub fn new(pixels_per_foot: f64) -> crate::error::Result<Self> {
        let scale = Self { pixels_per_foot };
        scale.validate()?;
        Ok(scale)
    }

    /// Zero, negative and non-finite scales make every area meaningless
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pixels_per_foot.is_finite() && self.pixels_per_foot > 0.0 {
            Ok(())
        } else {
            Err(crate::error::TakeoffError::InvalidScale(self.pixels_per_foot))
        }
    }

    pub fn to_square_feet(&self, pixel_area: f64) -> f64 {
        pixel_area / (self.pixels_per_foot * self.pixels_per_foot)
    }
}

impl Default for AreaScale {
    fn default() -> Self {
        Self { pixels_per_foot: 1.0 }
    }
}

/// A window, door or other opening before it is measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Opening {
    pub class: String,
    pub polygon: Polygon,
}

/// A measured opening cut out of a facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SidingHole {
    pub class: String,
    pub points: Vec<Point>,
    pub area_sf: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SidingSummary {
    /// Building footprint, measured outside this crate
    pub building_sf: Option<f64>,
    /// Roof area, measured outside this crate
    pub roof_sf: Option<f64>,
    pub gross_facade_sf: f64,
    pub openings_sf: f64,
    pub net_siding_sf: f64,
    pub opening_count: usize,
}

impl SidingSummary {
    pub fn with_footprint(mut self, building_sf: Option<f64>, roof_sf: Option<f64>) -> Self {
        self.building_sf = building_sf;
        self.roof_sf = roof_sf;
        self
    }
}

/// One building facade with its openings and the derived area summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SidingPolygon {
    pub exterior: Polygon,
    pub holes: Vec<SidingHole>,
    pub summary: SidingSummary,
}

/// Per-page roll-up of independently computed building summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PageSidingSummary {
    pub buildings: Vec<SidingSummary>,
    pub total_buildings: usize,
    pub total_gross_facade_sf: f64,
    pub total_openings_sf: f64,
    pub total_net_siding_sf: f64,
}
