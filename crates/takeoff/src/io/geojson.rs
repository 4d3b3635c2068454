use geojson::{feature::Id, FeatureCollection, Geometry, Value};
use crate::{
    algorithms::summarize_page,
    error::{Result, TakeoffError},
    types::{Detection, Point, SidingPolygon},
    typed_geojson::{foreign_members, DetectionFeature, DetectionProperties, SidingFeature, SidingProperties},
};

/// GeoJSON rings repeat the first position at the end.
fn closed_ring(points: &[Point]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = points.iter().map(|p| vec![p.x, p.y]).collect();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first != last {
            ring.push(vec![first.x, first.y]);
        }
    }
    ring
}

fn open_ring(positions: &[Vec<f64>]) -> Result<Vec<Point>> {
    let mut points = positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Point::new(*x, *y)),
            _ => Err(TakeoffError::InvalidGeometry(format!(
                "position needs two coordinates, got {}",
                position.len()
            ))),
        })
        .collect::<Result<Vec<Point>>>()?;

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Ok(points)
}

/// One polygon feature per detection: its polygon when present, its box otherwise.
pub fn detections_to_geojson(detections: &[Detection]) -> FeatureCollection {
    let features = detections
        .iter()
        .map(|detection| {
            let outline = detection.outline();
            let properties = DetectionProperties {
                id: detection.id.clone(),
                class: detection.class.clone(),
                confidence: detection.confidence,
                pixel_x: detection.pixel_x,
                pixel_y: detection.pixel_y,
                pixel_width: detection.pixel_width,
                pixel_height: detection.pixel_height,
                source: detection.source,
                has_polygon: detection.polygon().is_some(),
                partial_points: match detection.polygon() {
                    Some(_) => None,
                    None => detection.polygon_points.clone(),
                },
            };

            DetectionFeature::new(Some(Geometry::new(Value::Polygon(vec![closed_ring(&outline.points)]))), properties)
                .with_id(Id::String(detection.id.clone()))
                .into_feature()
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// One polygon-with-holes feature per building, page totals in the foreign members.
pub fn siding_to_geojson(buildings: &[SidingPolygon]) -> FeatureCollection {
    let features = buildings
        .iter()
        .enumerate()
        .map(|(index, building)| {
            let mut rings = vec![closed_ring(&building.exterior.points)];
            rings.extend(building.holes.iter().map(|hole| closed_ring(&hole.points)));

            let summary = building.summary;
            let properties = SidingProperties {
                building_index: index,
                building_sf: summary.building_sf,
                roof_sf: summary.roof_sf,
                gross_facade_sf: summary.gross_facade_sf,
                openings_sf: summary.openings_sf,
                net_siding_sf: summary.net_siding_sf,
                opening_count: summary.opening_count,
                hole_classes: building.holes.iter().map(|hole| hole.class.clone()).collect(),
            };

            SidingFeature::new(Some(Geometry::new(Value::Polygon(rings))), properties)
                .with_id(Id::Number(index.into()))
                .into_feature()
        })
        .collect();

    let page = summarize_page(buildings);
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: foreign_members(&serde_json::json!({
            "total_buildings": page.total_buildings,
            "total_gross_facade_sf": page.total_gross_facade_sf,
            "total_openings_sf": page.total_openings_sf,
            "total_net_siding_sf": page.total_net_siding_sf,
        })),
    }
}

/// Read detections back from a collection written by [`detections_to_geojson`].
pub fn detections_from_geojson_str(geojson_str: &str) -> Result<Vec<Detection>> {
    let collection: FeatureCollection = geojson_str.parse()?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let typed = DetectionFeature::from_feature(feature);
            let properties = typed.properties().ok_or_else(|| {
                TakeoffError::InvalidGeometry(format!("feature {index} has no detection properties"))
            })?;

            let polygon_points = if properties.has_polygon {
                let Some(Value::Polygon(rings)) = typed.feature.geometry.as_ref().map(|g| &g.value) else {
                    return Err(TakeoffError::InvalidGeometry(format!(
                        "feature {index} is marked as a polygon but has no polygon geometry"
                    )));
                };
                let exterior = rings.first().map(|ring| open_ring(ring)).transpose()?;
                exterior.filter(|points| points.len() >= 3)
            } else {
                properties.partial_points
            };

            Ok(Detection {
                id: properties.id,
                class: properties.class,
                confidence: properties.confidence,
                pixel_x: properties.pixel_x,
                pixel_y: properties.pixel_y,
                pixel_width: properties.pixel_width,
                pixel_height: properties.pixel_height,
                polygon_points,
                source: properties.source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AreaScale, DetectionSource, Opening, Polygon};

    fn detection(id: &str, polygon: Option<Vec<Point>>) -> Detection {
        Detection {
            id: id.to_string(),
            class: "window".to_string(),
            confidence: 0.87,
            pixel_x: 20.0,
            pixel_y: 30.0,
            pixel_width: 10.0,
            pixel_height: 20.0,
            polygon_points: polygon,
            source: DetectionSource::Sam,
        }
    }

    fn exterior_ring(collection: &FeatureCollection, index: usize) -> &Vec<Vec<f64>> {
        match &collection.features[index].geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => &rings[0],
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn rings_are_closed() {
        let triangle = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 3.0)];
        let collection = detections_to_geojson(&[detection("sam-1", Some(triangle)), detection("sam-2", None)]);

        let ring = exterior_ring(&collection, 0);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());

        // Box fallback: 15..25 x 20..40
        let ring = exterior_ring(&collection, 1);
        assert_eq!(ring[0], vec![15.0, 20.0]);
        assert_eq!(ring[2], vec![25.0, 40.0]);
        assert_eq!(collection.features[1].id, Some(Id::String("sam-2".to_string())));
    }

    #[test]
    fn detections_read_back_from_geojson() {
        let triangle = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 3.0)];
        let detections = vec![detection("sam-1", Some(triangle)), detection("sam-2", None)];

        let text = serde_json::to_string(&detections_to_geojson(&detections)).unwrap();
        assert_eq!(detections_from_geojson_str(&text).unwrap(), detections);
    }

    #[test]
    fn short_point_lists_survive_the_round_trip() {
        let two_points = vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)];
        let detections = vec![detection("roboflow-1", Some(two_points.clone()))];

        let collection = detections_to_geojson(&detections);
        // Drawn as its box, points kept alongside
        assert_eq!(exterior_ring(&collection, 0)[0], vec![15.0, 20.0]);

        let text = serde_json::to_string(&collection).unwrap();
        let read_back = detections_from_geojson_str(&text).unwrap();
        assert_eq!(read_back[0].polygon_points, Some(two_points));
        assert_eq!(read_back, detections);
    }

    #[test]
    fn features_without_properties_are_rejected() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":null,"properties":{"name":"x"}}
        ]}"#;
        assert!(matches!(
            detections_from_geojson_str(text),
            Err(TakeoffError::InvalidGeometry(_))
        ));
        assert!(matches!(detections_from_geojson_str("{"), Err(TakeoffError::GeoJson(_))));
    }

    #[test]
    fn siding_features_carry_holes_and_page_totals() {
        let rect = |x: f64, y: f64, w: f64, h: f64| {
            Polygon::new(vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ])
        };
        let building = SidingPolygon::build(
            rect(0.0, 0.0, 50.0, 40.0),
            vec![
                Opening { class: "window".to_string(), polygon: rect(5.0, 5.0, 3.0, 5.0) },
                Opening { class: "door".to_string(), polygon: rect(20.0, 10.0, 5.0, 5.0) },
            ],
            AreaScale::default(),
        )
        .unwrap();

        let collection = siding_to_geojson(&[building]);
        let feature = SidingFeature::from_feature(collection.features[0].clone());
        let properties = feature.properties().unwrap();
        assert_eq!(properties.hole_classes, vec!["window", "door"]);
        assert_eq!(properties.net_siding_sf, 1960.0);

        match &feature.feature.geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => assert_eq!(rings.len(), 3),
            other => panic!("expected polygon, got {other:?}"),
        }

        let totals = collection.foreign_members.unwrap();
        assert_eq!(totals["total_buildings"], 1);
        assert_eq!(totals["total_net_siding_sf"], 1960.0);
    }
}
