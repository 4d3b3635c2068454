use geo::{Area, Centroid};
use crate::types::{BoundingBox, Point, Polygon, Region};

/// Axis-aligned extent of a point set.
///
/// An empty slice has no extent and yields `None` rather than a zero box.
pub fn bounding_box_from_polygon(points: &[Point]) -> Option<BoundingBox> {
    let first = points.first()?;

    let mut min_x = first.x;
    let mut min_y = first.y;
    let mut max_x = first.x;
    let mut max_y = first.y;

    for point in &points[1..] {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// Inclusive containment: points on any edge of `rect` count as inside.
pub fn point_in_rect(point: Point, rect: &Region) -> bool {
    point.x >= rect.x
        && point.x <= rect.x + rect.width
        && point.y >= rect.y
        && point.y <= rect.y + rect.height
}

/// Unsigned shoelace area of the implicitly closed ring, 0.0 below three points.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    Polygon::new(points.to_vec()).to_geo_polygon().unsigned_area()
}

/// Area centroid, falling back to the bounding box center for degenerate rings
pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    if points.len() >= 3 {
        if let Some(centroid) = Polygon::new(points.to_vec()).to_geo_polygon().centroid() {
            return Some(Point::new(centroid.x(), centroid.y()));
        }
    }
    bounding_box_from_polygon(points).map(|bbox| bbox.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[[f64; 2]]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn bounding_box_spans_point_extents() {
        let points = pts(&[[10.0, 40.0], [55.0, 12.0], [30.0, 90.0], [-5.0, 20.0]]);
        let bbox = bounding_box_from_polygon(&points).expect("non-empty input has a box");

        assert_eq!(bbox.x, -5.0);
        assert_eq!(bbox.y, 12.0);
        assert_eq!(bbox.max_x(), 55.0);
        assert_eq!(bbox.max_y(), 90.0);
    }

    #[test]
    fn empty_polygon_has_no_bounding_box() {
        assert!(bounding_box_from_polygon(&[]).is_none());
    }

    #[test]
    fn single_point_has_zero_sized_box() {
        let bbox = bounding_box_from_polygon(&pts(&[[3.0, 4.0]])).unwrap();
        assert_eq!(bbox, BoundingBox { x: 3.0, y: 4.0, width: 0.0, height: 0.0 });
    }

    #[test]
    fn point_in_rect_is_inclusive_on_every_edge() {
        let rect = Region::new(10.0, 20.0, 100.0, 50.0);

        assert!(point_in_rect(Point::new(10.0, 40.0), &rect));
        assert!(point_in_rect(Point::new(110.0, 40.0), &rect));
        assert!(point_in_rect(Point::new(50.0, 20.0), &rect));
        assert!(point_in_rect(Point::new(50.0, 70.0), &rect));
        assert!(point_in_rect(Point::new(110.0, 70.0), &rect));

        assert!(!point_in_rect(Point::new(9.999, 40.0), &rect));
        assert!(!point_in_rect(Point::new(50.0, 70.001), &rect));
    }

    #[test]
    fn shoelace_area_ignores_winding() {
        let clockwise = pts(&[[0.0, 0.0], [0.0, 10.0], [20.0, 10.0], [20.0, 0.0]]);
        let counter: Vec<Point> = clockwise.iter().rev().copied().collect();

        assert!((polygon_area(&clockwise) - 200.0).abs() < 1e-9);
        assert!((polygon_area(&counter) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polygons_have_zero_area() {
        assert_eq!(polygon_area(&[]), 0.0);
        assert_eq!(polygon_area(&pts(&[[0.0, 0.0], [5.0, 5.0]])), 0.0);
    }

    #[test]
    fn centroid_of_square() {
        let square = pts(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        let centroid = polygon_centroid(&square).unwrap();
        assert!((centroid.x - 5.0).abs() < 1e-9);
        assert!((centroid.y - 5.0).abs() < 1e-9);
    }
}
