//! GeoJSON output for whoever draws the map.
//!
//! Coordinates are `[lng, lat]`. Styling hints ride along in feature
//! properties so the renderer needs no knowledge of tiers.

use geo::{LineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::context::{RouteRecord, Snapshot};
use crate::shelter::ShelterClassification;

fn feature<const N: usize>(geometry: Geometry, properties: [(&str, JsonValue); N]) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(
            properties
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<JsonObject>(),
        ),
        foreign_members: None,
    }
}

/// A `MultiPolygon` geometry object.
pub fn multipolygon_geometry(area: &MultiPolygon<f64>) -> Geometry {
    Geometry::new(Value::from(area))
}

/// The snapshot's danger region, one feature per region member.
pub fn region_features(snapshot: &Snapshot) -> Vec<Feature> {
    let style = snapshot.severity.style();
    snapshot
        .region
        .features()
        .iter()
        .enumerate()
        .map(|(index, area)| {
            feature(
                multipolygon_geometry(area),
                [
                    ("layer", "danger".into()),
                    ("member", index.into()),
                    ("region_kind", snapshot.region.kind().into()),
                    ("severity", snapshot.severity.name().into()),
                    ("rainfall_mm", snapshot.reading.millimetres().into()),
                    ("generation", snapshot.generation.into()),
                    ("stroke", style.stroke.into()),
                    ("fill", style.fill.into()),
                    ("weight", style.weight.into()),
                    ("fill_opacity", style.fill_opacity.into()),
                    ("animated", style.animated.into()),
                ],
            )
        })
        .collect()
}

/// Shelter points, flagged flooded or reachable.
pub fn shelter_features(split: &ShelterClassification) -> Vec<Feature> {
    let tagged = split
        .reachable
        .iter()
        .map(|s| (s, false))
        .chain(split.flooded.iter().map(|s| (s, true)));

    tagged
        .map(|(shelter, flooded)| {
            feature(
                Geometry::new(Value::Point(vec![shelter.lng, shelter.lat])),
                [
                    ("layer", "shelter".into()),
                    ("name", shelter.name.as_str().into()),
                    ("flooded", flooded.into()),
                    ("fill", if flooded { "#999999" } else { "#2b7cff" }.into()),
                ],
            )
        })
        .collect()
}

/// The selected route as a `LineString` feature.
pub fn route_feature(record: &RouteRecord) -> Feature {
    let route = &record.route;
    let line: LineString<f64> = route.path.iter().map(|p| (p.lng, p.lat)).collect();
    feature(
        Geometry::new(Value::from(&line)),
        [
            ("layer", "route".into()),
            ("target", route.target_name.as_str().into()),
            ("mode", route.mode.name().into()),
            ("distance_m", route.distance_m.into()),
            ("generation", record.generation.into()),
            ("stroke", route.mode.color().into()),
            ("summary", route.summary().into()),
        ],
    )
}

/// Region, shelters and optional route in a single `FeatureCollection`.
pub fn scene(snapshot: &Snapshot, route: Option<&RouteRecord>) -> FeatureCollection {
    let mut features = region_features(snapshot);
    features.extend(shelter_features(&snapshot.shelters));
    features.extend(route.map(route_feature));
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
