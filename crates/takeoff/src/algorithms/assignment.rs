use geo::Contains;
use crate::{
    algorithms::{normalize_class_label, polygon_centroid},
    types::{Detection, Opening, Polygon},
};

/// Openings grouped by the building exterior that contains them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpeningAssignment {
    /// One list per exterior, in the same order as the exteriors
    pub per_building: Vec<Vec<Opening>>,
    /// Openings no exterior contains
    pub unassigned: Vec<Opening>,
}

/// Assign each opening to exactly one building.
///
/// An opening goes to the first exterior that fully contains it, or failing
/// that, the first exterior containing its centroid.
pub fn assign_openings(exteriors: &[Polygon], openings: Vec<Opening>) -> OpeningAssignment {
    let shapes: Vec<geo_types::Polygon<f64>> = exteriors
        .iter()
        .map(|exterior| exterior.to_geo_polygon())
        .collect();

    let mut assignment = OpeningAssignment {
        per_building: vec![Vec::new(); exteriors.len()],
        unassigned: Vec::new(),
    };

    for opening in openings {
        if !opening.polygon.is_renderable() {
            assignment.unassigned.push(opening);
            continue;
        }

        let inner = opening.polygon.to_geo_polygon();
        let owner = shapes
            .iter()
            .position(|outer| outer.contains(&inner))
            .or_else(|| {
                let centroid = polygon_centroid(&opening.polygon.points)?;
                let point = geo_types::Point::new(centroid.x, centroid.y);
                shapes.iter().position(|outer| outer.contains(&point))
            });

        match owner {
            Some(index) => assignment.per_building[index].push(opening),
            None => assignment.unassigned.push(opening),
        }
    }

    tracing::debug!(
        buildings = exteriors.len(),
        unassigned = assignment.unassigned.len(),
        "assigned openings to buildings"
    );
    assignment
}

/// Openings from detections of the given classes; box outline when no polygon.
pub fn openings_from_detections(detections: &[Detection], classes: &[&str]) -> Vec<Opening> {
    let wanted: Vec<String> = classes.iter().map(|c| normalize_class_label(c)).collect();

    detections
        .iter()
        .filter(|detection| wanted.iter().any(|class| *class == detection.class))
        .map(|detection| Opening {
            class: detection.class.clone(),
            polygon: detection.outline(),
        })
        .collect()
}
