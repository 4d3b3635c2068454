use std::marker::PhantomData;
use serde::{Deserialize, Serialize};
use geojson::{Feature, Geometry, JsonObject};
use schemars::JsonSchema;

use crate::types::{DetectionSource, Point};

/// Properties for detection features
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties for detection features")]
pub struct DetectionProperties {
    #[schemars(description = "Generator-prefixed unique id")]
    pub id: String,
    #[schemars(description = "Normalized class label")]
    pub class: String,
    pub confidence: f64,
    #[schemars(description = "Center x in pixels")]
    pub pixel_x: f64,
    #[schemars(description = "Center y in pixels")]
    pub pixel_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub source: DetectionSource,
    #[schemars(description = "Whether the geometry is the detection polygon rather than its box")]
    pub has_polygon: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Detector points too few to outline a polygon, kept verbatim")]
    pub partial_points: Option<Vec<Point>>,
}

/// Properties for building facade features
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties for building facade features")]
pub struct SidingProperties {
    #[schemars(description = "Position of the building on the page")]
    pub building_index: usize,
    pub building_sf: Option<f64>,
    pub roof_sf: Option<f64>,
    pub gross_facade_sf: f64,
    pub openings_sf: f64,
    pub net_siding_sf: f64,
    pub opening_count: usize,
    #[schemars(description = "Class of each hole ring, in ring order")]
    pub hole_classes: Vec<String>,
}

pub type DetectionFeature = TypedFeature<DetectionProperties>;
pub type SidingFeature = TypedFeature<SidingProperties>;

/// A typed GeoJSON Feature that is generic over its properties.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    /// Creates a new TypedFeature.
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self::from_feature(feature)
    }

    /// Wrap an untyped feature; properties are checked on access.
    pub fn from_feature(feature: Feature) -> Self {
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    pub fn with_id(mut self, id: geojson::feature::Id) -> Self {
        self.feature.id = Some(id);
        self
    }

    /// Tries to access the typed properties of the feature.
    pub fn properties(&self) -> Option<P> {
        self.feature.properties.as_ref().and_then(|p| {
            serde_json::from_value(serde_json::Value::Object(p.clone())).ok()
        })
    }

    pub fn into_feature(self) -> Feature {
        self.feature
    }
}

/// Page-level metadata stored in a collection's foreign members.
pub fn foreign_members<T: Serialize>(metadata: &T) -> Option<JsonObject> {
    serde_json::to_value(metadata).ok().and_then(|v| v.as_object().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_properties_survive_the_feature() {
        let properties = SidingProperties {
            building_index: 2,
            building_sf: None,
            roof_sf: Some(900.0),
            gross_facade_sf: 100.0,
            openings_sf: 10.0,
            net_siding_sf: 90.0,
            opening_count: 1,
            hole_classes: vec!["window".to_string()],
        };
        let feature = SidingFeature::new(None, properties.clone());
        assert_eq!(feature.properties(), Some(properties));
    }

    #[test]
    fn mismatched_properties_read_as_none() {
        let feature = DetectionFeature::from_feature(Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(JsonObject::new()),
            foreign_members: None,
        });
        assert!(feature.properties().is_none());
    }
}
