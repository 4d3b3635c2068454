use geo_types::{Coord, LineString};
use crate::{traits::ContourSimplifier, types::Point};

fn to_linestring(contour: &[Point]) -> LineString<f64> {
    LineString::new(contour.iter().copied().map(Coord::from).collect())
}

/// Douglas-Peucker simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier;

impl ContourSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, contour: Vec<Point>, tolerance: f64) -> Vec<Point> {
        use geo::Simplify;

        if contour.len() < 3 {
            return contour;
        }
        let simplified: Vec<Point> = to_linestring(&contour)
            .simplify(&tolerance)
            .coords()
            .map(|coord| Point::from(*coord))
            .collect();

        // Keep the original ring when simplification collapses it
        if simplified.len() < 3 { contour } else { simplified }
    }
}

/// Visvalingam-Whyatt simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct VisvalingamWhyattSimplifier;

impl ContourSimplifier for VisvalingamWhyattSimplifier {
    fn simplify(&self, contour: Vec<Point>, tolerance: f64) -> Vec<Point> {
        use geo::SimplifyVw;

        if contour.len() < 3 {
            return contour;
        }
        let simplified: Vec<Point> = to_linestring(&contour)
            .simplify_vw(&tolerance)
            .coords()
            .map(|coord| Point::from(*coord))
            .collect();

        if simplified.len() < 3 { contour } else { simplified }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_square() -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(Point::new(i as f64, 0.0));
        }
        for i in 0..10 {
            points.push(Point::new(10.0, i as f64));
        }
        for i in 0..10 {
            points.push(Point::new(10.0 - i as f64, 10.0));
        }
        for i in 0..10 {
            points.push(Point::new(0.0, 10.0 - i as f64));
        }
        points
    }

    #[test]
    fn douglas_peucker_drops_collinear_points() {
        let simplified = DouglasPeuckerSimplifier.simplify(dense_square(), 0.5);
        assert!(simplified.len() < 10, "got {} points", simplified.len());
        assert!(simplified.len() >= 3);
    }

    #[test]
    fn short_contours_pass_through() {
        let line = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(DouglasPeuckerSimplifier.simplify(line.clone(), 5.0), line);
        assert_eq!(VisvalingamWhyattSimplifier.simplify(line.clone(), 5.0), line);
    }
}
