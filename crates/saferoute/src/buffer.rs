//! Positive polygon buffering and fault-tolerant union.
//!
//! A positive buffer of distance `d` is the Minkowski sum of the polygon with
//! a disc of radius `d`. We build it explicitly:
//!
//! ```text
//!   polygon  ∪  one rectangle per edge (width 2d)  ∪  one arc sector per convex corner
//! ```
//!
//! A point outside the polygon within `d` of it is nearest either to the
//! inside of an edge (its rectangle) or to a convex corner, inside the wedge
//! between that corner's two outward normals (its sector). Reflex corners
//! never need anything, and a corner's arc only spans its turning angle, so a
//! simple ring gets one full circle of arc in total however many vertices
//! it has.
//!
//! Everything happens in a [`LocalFrame`] so `d` is in metres, then the
//! result is mapped back to WGS84. The unions go through `geo`'s boolean ops.

use std::any::Any;
use std::f64::consts::TAU;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use geo::{BooleanOps, Coord, CoordsIter, LineString, MapCoords, MultiPolygon, Polygon};

use crate::geometry::LocalFrame;

/// Segments per quarter circle of corner arc.
///
/// 64 keeps a 500 m buffer visually round at street zoom.
pub const QUADRANT_SEGMENTS: usize = 64;

/// The geometry library could not union two shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum UnionError {
    /// The boolean-op backend panicked; carries the panic message.
    Panicked(String),
    /// The backend returned NaN or infinite coordinates.
    NonFinite,
}

impl fmt::Display for UnionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnionError::Panicked(msg) => write!(f, "polygon union panicked: {}", msg),
            UnionError::NonFinite => write!(f, "polygon union produced non-finite coordinates"),
        }
    }
}

impl std::error::Error for UnionError {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Union two shapes, turning backend panics and garbage output into errors.
pub fn try_union(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, UnionError> {
    let merged = panic::catch_unwind(AssertUnwindSafe(|| a.union(b)))
        .map_err(|payload| UnionError::Panicked(panic_message(payload.as_ref())))?;

    if merged.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        Ok(merged)
    } else {
        Err(UnionError::NonFinite)
    }
}

/// Union any number of shapes by pairing neighbours until one is left.
///
/// Pairwise halving keeps every intermediate shape small, which matters when
/// a trace with hundreds of edges goes in.
pub fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> Result<MultiPolygon<f64>, UnionError> {
    while parts.len() > 1 {
        let mut next = Vec::with_capacity(parts.len() / 2 + 1);
        let mut iter = parts.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(try_union(&a, &b)?),
                None => next.push(a),
            }
        }
        parts = next;
    }

    Ok(parts.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new())))
}

/// Regular polygon approximating a circle, counter-clockwise.
pub fn disc(centre: Coord<f64>, radius: f64, quadrant_segments: usize) -> Polygon<f64> {
    let n = quadrant_segments.max(1) * 4;
    let ring: LineString<f64> = (0..=n)
        .map(|i| {
            // i == n lands back on angle 0, closing the ring exactly
            let theta = TAU * (i % n) as f64 / n as f64;
            Coord {
                x: centre.x + radius * theta.cos(),
                y: centre.y + radius * theta.sin(),
            }
        })
        .collect();
    Polygon::new(ring, Vec::new())
}

fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Rotate counter-clockwise by `angle` radians.
fn rotate(v: Coord<f64>, angle: f64) -> Coord<f64> {
    let (sin, cos) = angle.sin_cos();
    Coord {
        x: v.x * cos - v.y * sin,
        y: v.x * sin + v.y * cos,
    }
}

/// Ring vertices without the closing repeat or consecutive duplicates.
fn distinct_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        if vertices.last() != Some(&c) {
            vertices.push(c);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Which way round the polygon's interior lies: `1.0` when it is on the left
/// of the ring's direction of travel, `-1.0` when on the right.
fn interior_side(ring: &[Coord<f64>], is_hole: bool) -> f64 {
    let twice_area: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(&a, &b)| cross(a, b))
        .sum();
    let ccw = twice_area >= 0.0;
    // a hole's own inside is the polygon's outside
    if ccw != is_hole { 1.0 } else { -1.0 }
}

/// One ring's edge rectangles and convex-corner sectors, in local metres.
fn ring_pieces(
    ring: &[Coord<f64>],
    is_hole: bool,
    distance: f64,
    quadrant_segments: usize,
) -> Vec<Polygon<f64>> {
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }
    let side = interior_side(ring, is_hole);
    let step = std::f64::consts::FRAC_PI_2 / quadrant_segments.max(1) as f64;

    // unit direction and outward offset of every edge i -> i+1
    let edges: Vec<(Coord<f64>, Coord<f64>)> = (0..n)
        .map(|i| {
            let d = ring[(i + 1) % n] - ring[i];
            let len = d.x.hypot(d.y);
            let dir = Coord { x: d.x / len, y: d.y / len };
            // right-hand normal when the interior is on the left
            let normal = Coord { x: side * dir.y, y: -side * dir.x };
            (dir, normal * distance)
        })
        .collect();

    let mut pieces = Vec::with_capacity(n * 2);
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        let (_, offset) = edges[i];
        pieces.push(Polygon::new(
            LineString::from(vec![a - offset, b - offset, b + offset, a + offset, a - offset]),
            Vec::new(),
        ));
    }

    for i in 0..n {
        let (dir_in, offset_in) = edges[(i + n - 1) % n];
        let (dir_out, offset_out) = edges[i];
        let turn = side * cross(dir_in, dir_out);
        let spike = turn.abs() <= 1e-12 && dot(dir_in, dir_out) < 0.0;
        if turn <= 1e-12 && !spike {
            continue; // reflex or straight: the rectangles cover it
        }

        let sweep = if spike {
            std::f64::consts::PI
        } else {
            (side * cross(offset_in, offset_out)).atan2(dot(offset_in, offset_out))
        };
        let segments = (sweep / step).ceil().max(1.0) as usize;

        let corner = ring[i];
        let mut outline = Vec::with_capacity(segments + 3);
        outline.push(corner);
        outline.push(corner + offset_in);
        outline.extend(
            (1..segments).map(|k| corner + rotate(offset_in, side * sweep * k as f64 / segments as f64)),
        );
        outline.push(corner + offset_out);
        outline.push(corner);
        pieces.push(Polygon::new(LineString::from(outline), Vec::new()));
    }

    pieces
}

/// Grow a WGS84 polygon outward by `distance_m` metres.
///
/// A distance of zero (or less) returns the polygon untouched.
pub fn buffer_polygon(
    polygon: &Polygon<f64>,
    distance_m: f64,
) -> Result<MultiPolygon<f64>, UnionError> {
    buffer_polygon_with_segments(polygon, distance_m, QUADRANT_SEGMENTS)
}

pub fn buffer_polygon_with_segments(
    polygon: &Polygon<f64>,
    distance_m: f64,
    quadrant_segments: usize,
) -> Result<MultiPolygon<f64>, UnionError> {
    let unchanged = || MultiPolygon::new(vec![polygon.clone()]);
    if !(distance_m > 0.0) {
        return Ok(unchanged());
    }
    let Some(frame) = LocalFrame::centred_on(polygon) else {
        return Ok(unchanged());
    };

    let local = polygon.map_coords(|c| frame.project(c));

    let mut parts = vec![MultiPolygon::new(vec![local.clone()])];
    let rings = std::iter::once((local.exterior(), false)).chain(local.interiors().iter().map(|r| (r, true)));
    for (ring, is_hole) in rings {
        let vertices = distinct_vertices(ring);
        if vertices.len() == 1 {
            parts.push(MultiPolygon::new(vec![disc(vertices[0], distance_m, quadrant_segments)]));
            continue;
        }
        parts.extend(
            ring_pieces(&vertices, is_hole, distance_m, quadrant_segments)
                .into_iter()
                .map(|piece| MultiPolygon::new(vec![piece])),
        );
    }

    let grown = union_all(parts)?;
    Ok(grown.map_coords(|c| frame.unproject(c)))
}

// ============================================================================
// TESTS
// ============================================================================
