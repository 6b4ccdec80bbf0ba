//! GeoJSON reading - just what the collaborators feed us.
//!
//! Documents are decoded with the `geojson` crate one feature at a time, so a
//! single broken feature is skipped instead of sinking the whole layer.
//! Polygonal geometry is found anywhere, including inside geometry
//! collections.

use geojson::{Feature, GeoJson, Geometry, Value};
use log::debug;

use crate::geometry::{LatLng, Ring};
use crate::shelter::Shelter;

/// Property holding a shelter's name in the shelter layer.
pub const SHELTER_NAME_PROPERTY: &str = "fac_nam";

/// Name used when a shelter feature has none.
pub const DEFAULT_SHELTER_NAME: &str = "Shelter";

/// Parse a GeoJSON document into its features.
///
/// Only malformed JSON is an error. Unknown document types yield no features,
/// a bare geometry becomes one property-less feature.
pub fn parse_features(text: &str) -> Result<Vec<Feature>, serde_json::Error> {
    let doc: serde_json::Value = serde_json::from_str(text)?;
    Ok(features_from_value(doc))
}

pub fn features_from_value(doc: serde_json::Value) -> Vec<Feature> {
    let doc = match doc {
        serde_json::Value::Object(mut obj) => match obj.remove("features") {
            Some(serde_json::Value::Array(items)) => return decode_each(items),
            _ => serde_json::Value::Object(obj),
        },
        other => other,
    };

    match serde_json::from_value::<GeoJson>(doc) {
        Ok(GeoJson::Feature(feature)) => vec![feature],
        Ok(GeoJson::Geometry(geometry)) => vec![bare_feature(geometry)],
        Ok(GeoJson::FeatureCollection(collection)) => collection.features,
        Err(e) => {
            debug!("not a GeoJSON document: {}", e);
            Vec::new()
        }
    }
}

fn decode_each(items: Vec<serde_json::Value>) -> Vec<Feature> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value::<Feature>(item)
                .map_err(|e| debug!("skipping feature {}: {}", index, e))
                .ok()
        })
        .collect()
}

fn bare_feature(geometry: Geometry) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

/// `[lng, lat]` to a position. Short arrays become NaN so the geometry
/// adapter rejects the ring instead of silently shifting vertices.
fn position(coords: &[f64]) -> LatLng {
    let lng = coords.first().copied().unwrap_or(f64::NAN);
    let lat = coords.get(1).copied().unwrap_or(f64::NAN);
    LatLng::new(lat, lng)
}

fn ring(coords: &[Vec<f64>]) -> Ring {
    coords.iter().map(|c| position(c)).collect()
}

/// Exterior rings of a geometry (holes are ignored). Geometry collections
/// are searched member by member.
pub fn exterior_rings(geometry: &Geometry) -> Vec<Ring> {
    match &geometry.value {
        Value::Polygon(rings) => rings.first().map(|r| ring(r)).into_iter().collect(),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .filter_map(|poly| poly.first())
            .map(|r| ring(r))
            .collect(),
        Value::GeometryCollection(members) => members.iter().flat_map(exterior_rings).collect(),
        _ => Vec::new(),
    }
}

/// All exterior rings in a feature list.
pub fn feature_rings(features: &[Feature]) -> Vec<Ring> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .flat_map(exterior_rings)
        .collect()
}

/// A shelter from a `Point` feature.
///
/// Missing geometry, non-points, and zero or missing coordinates give `None`.
pub fn shelter_from_feature(feature: &Feature) -> Option<Shelter> {
    let Value::Point(coordinates) = &feature.geometry.as_ref()?.value else {
        return None;
    };
    let lng = coordinates.first().copied().filter(|v| *v != 0.0 && v.is_finite())?;
    let lat = coordinates.get(1).copied().filter(|v| *v != 0.0 && v.is_finite())?;

    let name = feature
        .property(SHELTER_NAME_PROPERTY)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SHELTER_NAME);

    Some(Shelter::new(name, lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"fac_nam": "Riverside School"},
             "geometry": {"type": "Point", "coordinates": [126.7755, 37.7555]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [126.8, 37.79]}},
            {"type": "Feature", "properties": null,
             "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": {"id": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[126.77, 37.75], [126.78, 37.75], [126.78, 37.76], [126.77, 37.75]]]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[1, 2], [3, 4], [5, 6], [1, 2]]],
                [[[7, 8], [9, 10], [11, 12], [7, 8]], [[0, 0], [0, 1], [1, 1], [0, 0]]]
            ]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}},
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": "broken"}}
        ]
    }"#;

    #[test]
    fn collection_features_parse_and_bad_ones_are_skipped() {
        let features = parse_features(DOC).unwrap();
        // the "broken" point is dropped, everything else decodes
        assert_eq!(features.len(), 7);
        assert!(matches!(
            features[5].geometry.as_ref().map(|g| &g.value),
            Some(Value::LineString(_))
        ));
        assert!(features[6].geometry.is_none());
    }

    #[test]
    fn single_feature_document() {
        let doc = r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}"#;
        let features = parse_features(doc).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(feature_rings(&features).len(), 1);
    }

    #[test]
    fn bare_geometry_document() {
        let doc = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let features = parse_features(doc).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(feature_rings(&features).len(), 1);
    }

    #[test]
    fn unknown_document_is_empty() {
        assert!(parse_features(r#"{"type": "Topology"}"#).unwrap().is_empty());
        assert!(parse_features("[]").unwrap().is_empty());
        assert!(parse_features("not json").is_err());
    }

    #[test]
    fn rings_swap_to_lat_lng() {
        let features = parse_features(DOC).unwrap();
        let rings = feature_rings(&features);
        // one polygon + two multipolygon parts (hole ignored)
        assert_eq!(rings.len(), 3);
        assert_eq!(rings[0][0], LatLng::new(37.75, 126.77));
        assert_eq!(rings[2][0], LatLng::new(8.0, 7.0));
    }

    #[test]
    fn polygons_inside_geometry_collections_are_found() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Point", "coordinates": [126.0, 37.0]},
                        {"type": "Polygon", "coordinates": [[[126.77, 37.75], [126.78, 37.75], [126.78, 37.76], [126.77, 37.75]]]},
                        {"type": "GeometryCollection", "geometries": [
                            {"type": "MultiPolygon", "coordinates": [[[[1, 2], [3, 4], [5, 6], [1, 2]]]]}
                        ]}
                    ]
                }}
            ]
        }"#;
        let features = parse_features(doc).unwrap();
        assert_eq!(features.len(), 1);

        let rings = feature_rings(&features);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0][1], LatLng::new(37.75, 126.78));
        assert_eq!(rings[1][0], LatLng::new(2.0, 1.0));
    }

    #[test]
    fn short_position_becomes_nan() {
        let p = position(&[126.0]);
        assert!(p.lat.is_nan());
        assert_eq!(p.lng, 126.0);
    }

    #[test]
    fn shelters_from_points() {
        let features = parse_features(DOC).unwrap();
        let shelters: Vec<Shelter> = features.iter().filter_map(shelter_from_feature).collect();
        assert_eq!(
            shelters,
            vec![
                Shelter::new("Riverside School", 37.7555, 126.7755),
                Shelter::new(DEFAULT_SHELTER_NAME, 37.79, 126.8),
            ]
        );
    }
}
