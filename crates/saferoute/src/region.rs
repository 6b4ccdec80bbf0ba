//! Danger region construction from historical flood traces.
//!
//! ```text
//!   rings ──build_polygon──▶ polygons ──buffer(d)──▶ features ──fold union──▶ region
//!            (bad rings dropped)       (d from rainfall)        (fallback: collection)
//! ```
//!
//! The region is a pure function of `(traces, rainfall)`; nothing is cached
//! between builds.

use geo::{ChamberlainDuquetteArea, MultiPolygon};
use log::{debug, warn};

use crate::buffer::{UnionError, buffer_polygon, try_union};
use crate::geometry::{Ring, build_polygon};

/// Rainfall below this (mm) is non-hazardous regardless of trace data.
pub const RAINFALL_FLOOR_MM: f64 = 30.0;

/// Buffer growth per millimetre of rain above the floor.
pub const BUFFER_METRES_PER_MM: f64 = 5.0;

/// Buffer distance in metres for a rainfall amount.
///
/// `(rainfall - 30) * 5.0`, so zero at exactly 30 mm. Amounts under the floor
/// clamp to zero (they never reach the buffer step anyway).
#[inline]
pub fn buffer_distance(rainfall_mm: f64) -> f64 {
    ((rainfall_mm - RAINFALL_FLOOR_MM) * BUFFER_METRES_PER_MM).max(0.0)
}

/// The current spatial risk area.
///
/// ## Rust Lesson #14: Exhaustive Matching
///
/// Instead of "null, a feature, or a feature collection" checked at runtime,
/// the three shapes are variants. Every `match` on this type must handle all
/// of them, so a predicate can't forget the fallback case.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DangerRegion {
    /// No danger: rainfall under the floor or no usable trace data.
    #[default]
    None,
    /// All buffered traces merged into one (multi-)polygon.
    Single(MultiPolygon<f64>),
    /// Union failed; the individually buffered traces, unmerged.
    Collection(Vec<MultiPolygon<f64>>),
}

impl DangerRegion {
    pub fn is_none(&self) -> bool {
        matches!(self, DangerRegion::None)
    }

    /// Short tag used in reports: `none`, `single` or `collection`.
    pub fn kind(&self) -> &'static str {
        match self {
            DangerRegion::None => "none",
            DangerRegion::Single(_) => "single",
            DangerRegion::Collection(_) => "collection",
        }
    }

    /// Member features as a slice (empty for `None`).
    pub fn features(&self) -> &[MultiPolygon<f64>] {
        match self {
            DangerRegion::None => &[],
            DangerRegion::Single(area) => std::slice::from_ref(area),
            DangerRegion::Collection(members) => members,
        }
    }

    /// Number of polygons across all features.
    pub fn polygon_count(&self) -> usize {
        self.features().iter().map(|f| f.0.len()).sum()
    }

    /// Approximate area in square metres.
    ///
    /// Collections may overlap, so their area is an upper bound.
    pub fn area_m2(&self) -> f64 {
        self.features()
            .iter()
            .map(|f| f.chamberlain_duquette_unsigned_area())
            .sum()
    }
}

/// Historical inundation traces, fixed once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodTraceSet {
    rings: Vec<Ring>,
}

impl FloodTraceSet {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// Owns the trace set and produces a fresh region per rainfall value.
#[derive(Debug, Clone, Default)]
pub struct DangerRegionBuilder {
    traces: FloodTraceSet,
}

impl DangerRegionBuilder {
    pub fn new(traces: FloodTraceSet) -> Self {
        Self { traces }
    }

    pub fn traces(&self) -> &FloodTraceSet {
        &self.traces
    }

    pub fn build(&self, rainfall_mm: f64) -> DangerRegion {
        build_region(rainfall_mm, self.traces.rings())
    }
}

/// Build the danger region for `rainfall_mm` using the geometry library's union.
pub fn build_region(rainfall_mm: f64, traces: &[Ring]) -> DangerRegion {
    build_region_with(rainfall_mm, traces, try_union)
}

/// Same as [`build_region`] with a caller-supplied union step.
pub fn build_region_with<F>(rainfall_mm: f64, traces: &[Ring], union: F) -> DangerRegion
where
    F: FnMut(&MultiPolygon<f64>, &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, UnionError>,
{
    // written as a negation so NaN also lands here
    if !(rainfall_mm >= RAINFALL_FLOOR_MM) || traces.is_empty() {
        return DangerRegion::None;
    }

    let distance = buffer_distance(rainfall_mm);

    let features: Vec<MultiPolygon<f64>> = traces
        .iter()
        .enumerate()
        .filter_map(|(index, ring)| {
            let polygon = build_polygon(ring)
                .map_err(|e| debug!("dropping flood trace {}: {}", index, e))
                .ok()?;
            buffer_polygon(&polygon, distance)
                .map_err(|e| debug!("dropping flood trace {} (buffer {:.0} m): {}", index, distance, e))
                .ok()
        })
        .collect();

    merge_features(features, union)
}

/// Left fold of `union` over the features, in order.
///
/// The first failing union abandons the merge and returns every feature
/// unmerged, so one bad pair never costs the whole region.
pub fn merge_features<F>(features: Vec<MultiPolygon<f64>>, mut union: F) -> DangerRegion
where
    F: FnMut(&MultiPolygon<f64>, &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, UnionError>,
{
    let Some((first, rest)) = features.split_first() else {
        return DangerRegion::None;
    };

    let mut merged = first.clone();
    for (offset, next) in rest.iter().enumerate() {
        match union(&merged, next) {
            Ok(result) => merged = result,
            Err(e) => {
                warn!(
                    "polygon merge failed at feature {}, keeping {} features unmerged: {}",
                    offset + 1,
                    features.len(),
                    e
                );
                return DangerRegion::Collection(features);
            }
        }
    }

    DangerRegion::Single(merged)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLng;
    use geo::{Area, Intersects, Point};

    fn square(lat: f64, lng: f64, size: f64) -> Ring {
        vec![
            LatLng::new(lat, lng),
            LatLng::new(lat, lng + size),
            LatLng::new(lat + size, lng + size),
            LatLng::new(lat + size, lng),
        ]
    }

    #[test]
    fn buffer_distance_law() {
        assert_eq!(buffer_distance(30.0), 0.0);
        assert_eq!(buffer_distance(31.0), 5.0);
        assert_eq!(buffer_distance(80.0), 250.0);
        assert_eq!(buffer_distance(130.0), 500.0);
        assert_eq!(buffer_distance(10.0), 0.0);
    }

    #[test]
    fn below_floor_is_none() {
        let traces = vec![square(37.75, 126.77, 0.01)];
        assert_eq!(build_region(29.9, &traces), DangerRegion::None);
        assert_eq!(build_region(0.0, &traces), DangerRegion::None);
        assert_eq!(build_region(f64::NAN, &traces), DangerRegion::None);
    }

    #[test]
    fn no_traces_is_none() {
        assert_eq!(build_region(100.0, &[]), DangerRegion::None);
    }

    #[test]
    fn only_bad_rings_is_none() {
        let bad = vec![vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]];
        assert_eq!(build_region(50.0, &bad), DangerRegion::None);
    }

    #[test]
    fn bad_ring_does_not_abort_build() {
        let traces = vec![
            vec![LatLng::new(37.0, 126.0)],
            square(37.75, 126.77, 0.01),
            vec![LatLng::new(f64::NAN, 126.0); 5],
        ];
        let region = build_region(30.0, &traces);
        let expected = build_polygon(&traces[1]).unwrap();
        assert_eq!(region, DangerRegion::Single(MultiPolygon::new(vec![expected])));
    }

    #[test]
    fn disjoint_traces_merge_into_one_multipolygon() {
        let traces = vec![square(37.75, 126.77, 0.01), square(37.80, 126.85, 0.01)];
        let region = build_region(40.0, &traces);
        match &region {
            DangerRegion::Single(area) => assert_eq!(area.0.len(), 2),
            other => panic!("expected single region, got {}", other.kind()),
        }
        assert_eq!(region.polygon_count(), 2);
    }

    #[test]
    fn failing_union_falls_back_to_collection() {
        let traces = vec![
            square(37.75, 126.77, 0.01),
            square(37.755, 126.775, 0.01),
            square(37.80, 126.85, 0.01),
        ];
        let region = build_region_with(50.0, &traces, |_, _| Err(UnionError::NonFinite));
        let DangerRegion::Collection(members) = &region else {
            panic!("expected collection, got {}", region.kind());
        };
        assert_eq!(members.len(), 3);

        // fallback members are the individually buffered traces
        let centre = Point::new(126.775, 37.755);
        assert!(members[0].intersects(&centre));
        assert!(members[0].unsigned_area() > 0.0);
    }

    #[test]
    fn late_union_failure_still_returns_every_feature() {
        let traces = vec![
            square(37.75, 126.77, 0.01),
            square(37.755, 126.775, 0.01),
            square(37.80, 126.85, 0.01),
        ];
        let mut calls = 0;
        let region = build_region_with(30.0, &traces, |a, b| {
            calls += 1;
            if calls == 2 { Err(UnionError::Panicked("boom".into())) } else { try_union(a, b) }
        });
        assert_eq!(region.features().len(), 3);
        assert_eq!(region.kind(), "collection");
    }

    #[test]
    fn area_grows_with_rainfall() {
        let traces = vec![square(37.75, 126.77, 0.01)];
        let a30 = build_region(30.0, &traces).area_m2();
        let a60 = build_region(60.0, &traces).area_m2();
        let a90 = build_region(90.0, &traces).area_m2();
        assert!(a30 > 0.0);
        assert!(a60 > a30);
        assert!(a90 > a60);
    }

    #[test]
    fn builder_owns_traces() {
        let builder = DangerRegionBuilder::new(FloodTraceSet::new(vec![square(37.75, 126.77, 0.01)]));
        assert_eq!(builder.traces().len(), 1);
        assert!(builder.build(20.0).is_none());
        assert_eq!(builder.build(45.0).kind(), "single");
    }
}
