//! Core geometry types for saferoute.
//!
//! Every collaborator hands us WGS84 `(latitude, longitude)` pairs. Once a
//! ring becomes a polygon it follows GeoJSON axis order instead:
//! `x` = longitude, `y` = latitude. That way `geo` predicates and any
//! GeoJSON renderer can consume it without another swap.
//!
//! ## Rust Lesson #3: Structs & Derives
//!
//! The `#[derive(...)]` macro auto-generates common functionality:
//! - `Debug` = printable with `{:?}`
//! - `Clone` / `Copy` = duplicate the value (Copy only for small stack values)
//! - `PartialEq` = comparable with `==`
//! - `Serialize` / `Deserialize` = serde can turn it into JSON and back

use std::fmt;

use geo::{BoundingRect, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Mean earth radius in metres (same constant Leaflet uses for `map.distance`).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A closed ring needs at least this many positions (triangle + closing point).
pub const MIN_RING_POINTS: usize = 4;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// An ordered sequence of positions describing one polygon outline.
///
/// Rings from collaborators may or may not repeat their first point at the
/// end; [`build_polygon`] takes care of closing them.
pub type Ring = Vec<LatLng>;

impl LatLng {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are real numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Great-circle distance to another position in metres (haversine).
    pub fn distance(&self, other: LatLng) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Linear interpolation in degree space; `t = 0` is `self`, `t = 1` is `other`.
    #[inline]
    pub fn lerp(&self, other: LatLng, t: f64) -> LatLng {
        LatLng::new(
            self.lat + (other.lat - self.lat) * t,
            self.lng + (other.lng - self.lng) * t,
        )
    }

    /// Convert to a `geo` coordinate in GeoJSON axis order.
    #[inline]
    pub fn to_coord(self) -> Coord<f64> {
        Coord { x: self.lng, y: self.lat }
    }

    #[inline]
    pub fn from_coord(coord: Coord<f64>) -> Self {
        LatLng::new(coord.y, coord.x)
    }
}

// ============================================================================
// GEOMETRY ADAPTER
// ============================================================================

/// Why a ring could not become a polygon.
///
/// ## Rust Lesson #10: Enums (Sum Types)
///
/// Each variant carries exactly the data needed to explain the failure.
/// Callers drop the ring and move on, so nothing here is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RingError {
    /// Fewer than [`MIN_RING_POINTS`] positions after closing.
    TooFewPoints(usize),
    /// A position with a NaN or infinite component.
    Malformed { index: usize },
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::TooFewPoints(n) => {
                write!(f, "ring has {} points after closing, need at least {}", n, MIN_RING_POINTS)
            }
            RingError::Malformed { index } => write!(f, "ring position {} is not a finite coordinate", index),
        }
    }
}

impl std::error::Error for RingError {}

/// Return a copy of `ring` whose last position equals its first.
pub fn close_ring(ring: &[LatLng]) -> Ring {
    let mut closed = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            closed.push(*first);
        }
    }
    closed
}

/// Turn a raw ring into a polygon (exterior only).
///
/// Open rings are closed automatically. Rings that are still shorter than
/// [`MIN_RING_POINTS`] or contain non-finite coordinates are rejected.
pub fn build_polygon(ring: &[LatLng]) -> Result<Polygon<f64>, RingError> {
    if let Some(index) = ring.iter().position(|p| !p.is_finite()) {
        return Err(RingError::Malformed { index });
    }

    let closed = close_ring(ring);
    if closed.len() < MIN_RING_POINTS {
        return Err(RingError::TooFewPoints(closed.len()));
    }

    let exterior: LineString<f64> = closed.into_iter().map(LatLng::to_coord).collect();
    Ok(Polygon::new(exterior, Vec::new()))
}

// ============================================================================
// LOCAL METRIC FRAME
// ============================================================================

/// Equirectangular projection around a reference position.
///
/// Maps degrees to metres east/north of `origin`. Over the few kilometres a
/// flood trace spans the distortion is far below the buffer resolution, and
/// since the mapping is affine it preserves containment and union topology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: LatLng,
    metres_per_deg_lat: f64,
    metres_per_deg_lng: f64,
}

impl LocalFrame {
    pub fn new(origin: LatLng) -> Self {
        let metres_per_deg_lat = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        Self {
            origin,
            metres_per_deg_lat,
            metres_per_deg_lng: metres_per_deg_lat * origin.lat.to_radians().cos(),
        }
    }

    /// Frame centred on a polygon's bounding box.
    pub fn centred_on(polygon: &Polygon<f64>) -> Option<Self> {
        polygon
            .bounding_rect()
            .map(|rect| LocalFrame::new(LatLng::from_coord(rect.center())))
    }

    pub fn origin(&self) -> LatLng {
        self.origin
    }

    /// Degrees (x = lng, y = lat) to metres (x = east, y = north).
    #[inline]
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.origin.lng) * self.metres_per_deg_lng,
            y: (coord.y - self.origin.lat) * self.metres_per_deg_lat,
        }
    }

    /// Metres back to degrees.
    #[inline]
    pub fn unproject(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: coord.x / self.metres_per_deg_lng + self.origin.lng,
            y: coord.y / self.metres_per_deg_lat + self.origin.lat,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
