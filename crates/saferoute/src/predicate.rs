//! Spatial predicates used by every stage of a cycle.
//!
//! This is the HOT PATH: shelters, route samples and map clicks all come
//! through here, so everything stays allocation-free.

use geo::{Intersects, Point};

use crate::geometry::{LatLng, Ring};
use crate::region::DangerRegion;

/// Stand-in denominator for horizontal edges in the ray cast.
pub const EDGE_EPSILON: f64 = 0.000001;

// ============================================================================
// POINT IN RING (Ray Casting Algorithm)
// ============================================================================
//
// ## Rust Lesson #8: References & Slices
//
// `&[LatLng]` is a borrowed window over any contiguous run of positions:
// a `Vec`, an array, or part of either. We only look, never own.

/// Test if a position is inside a ring using ray casting.
///
/// Casts a ray along increasing longitude and counts edge crossings.
/// Odd crossings = inside, even = outside. Works on open or closed rings.
#[inline]
pub fn point_in_ring(lat: f64, lng: f64, ring: &[LatLng]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let (x, y) = (lng, lat);
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (ring[i].lng, ring[i].lat);
        let (xj, yj) = (ring[j].lng, ring[j].lat);

        let dy = yj - yi;
        let dy = if dy == 0.0 { EDGE_EPSILON } else { dy };
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / dy + xi) {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Is the position inside the zone of interest?
///
/// An empty boundary means "no boundary data", which must never block
/// anything, so it answers `true`.
pub fn point_in_boundary(lat: f64, lng: f64, boundary: &[Ring]) -> bool {
    boundary.is_empty() || boundary.iter().any(|ring| point_in_ring(lat, lng, ring))
}

// ============================================================================
// POINT IN DANGER REGION
// ============================================================================

/// Is the position inside the danger region?
///
/// Boundary-inclusive: a point exactly on the region outline counts as in
/// danger. Collections answer `true` on the first member that matches.
pub fn point_in_region(lat: f64, lng: f64, region: &DangerRegion) -> bool {
    let point = Point::new(lng, lat);

    // ## Rust Lesson #13: Match Expressions
    //
    // Exhaustive: adding a fourth region shape won't compile until it's
    // handled here.
    match region {
        DangerRegion::None => false,
        DangerRegion::Single(area) => area.intersects(&point),
        DangerRegion::Collection(members) => members.iter().any(|m| m.intersects(&point)),
    }
}

/// [`point_in_region`] for a [`LatLng`].
#[inline]
pub fn position_in_region(position: LatLng, region: &DangerRegion) -> bool {
    point_in_region(position.lat, position.lng, region)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::try_union;
    use crate::region::{build_region, build_region_with};

    fn square(lat: f64, lng: f64, size: f64) -> Ring {
        vec![
            LatLng::new(lat, lng),
            LatLng::new(lat, lng + size),
            LatLng::new(lat + size, lng + size),
            LatLng::new(lat + size, lng),
        ]
    }

    #[test]
    fn point_inside_ring() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(point_in_ring(5.0, 5.0, &sq));
        assert!(!point_in_ring(5.0, 15.0, &sq));
        assert!(!point_in_ring(-1.0, 5.0, &sq));
    }

    #[test]
    fn closed_and_open_rings_agree() {
        let open = square(0.0, 0.0, 10.0);
        let mut closed = open.clone();
        closed.push(open[0]);
        for (lat, lng) in [(5.0, 5.0), (0.5, 9.5), (11.0, 3.0), (-2.0, -2.0)] {
            assert_eq!(point_in_ring(lat, lng, &open), point_in_ring(lat, lng, &closed));
        }
    }

    #[test]
    fn concave_ring() {
        // U shape opening north
        let u = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 3.0),
            LatLng::new(3.0, 3.0),
            LatLng::new(3.0, 2.0),
            LatLng::new(1.0, 2.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(3.0, 1.0),
            LatLng::new(3.0, 0.0),
        ];
        assert!(point_in_ring(2.0, 0.5, &u));
        assert!(!point_in_ring(2.0, 1.5, &u));
        assert!(point_in_ring(0.5, 1.5, &u));
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        let line = vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)];
        assert!(!point_in_ring(0.5, 0.5, &line));
    }

    #[test]
    fn empty_boundary_fails_open() {
        assert!(point_in_boundary(89.0, 179.0, &[]));
    }

    #[test]
    fn boundary_any_ring() {
        let rings = vec![square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0)];
        assert!(point_in_boundary(0.5, 0.5, &rings));
        assert!(point_in_boundary(10.5, 10.5, &rings));
        assert!(!point_in_boundary(5.0, 5.0, &rings));
    }

    #[test]
    fn none_region_never_contains() {
        assert!(!point_in_region(37.755, 126.775, &DangerRegion::None));
    }

    #[test]
    fn single_region_containment() {
        let region = build_region(30.0, &[square(37.75, 126.77, 0.01)]);
        assert!(point_in_region(37.755, 126.775, &region));
        assert!(!point_in_region(37.70, 126.775, &region));
    }

    #[test]
    fn collection_region_matches_any_member() {
        let traces = vec![square(37.75, 126.77, 0.01), square(37.80, 126.85, 0.01)];
        let region = build_region_with(30.0, &traces, |_, _| {
            Err(crate::buffer::UnionError::NonFinite)
        });
        assert_eq!(region.kind(), "collection");
        assert!(point_in_region(37.755, 126.775, &region));
        assert!(point_in_region(37.805, 126.855, &region));
        assert!(!point_in_region(37.78, 126.80, &region));

        // same answers as the merged version
        let merged = build_region_with(30.0, &traces, try_union);
        for (lat, lng) in [(37.755, 126.775), (37.805, 126.855), (37.78, 126.80)] {
            assert_eq!(point_in_region(lat, lng, &region), point_in_region(lat, lng, &merged));
        }
    }
}
