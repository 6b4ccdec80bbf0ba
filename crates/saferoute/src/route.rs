//! Evacuation route selection.
//!
//! For an origin we take the few nearest reachable shelters (straight-line),
//! ask the oracle for a road route to each, check each route against the
//! danger region and keep the shortest valid one.
//!
//! ## Selection policy
//!
//! - **Escape**: origin is inside the danger region. Any routed candidate is
//!   valid; getting out matters more than crossing residual danger.
//! - **Safe**: origin is outside. A candidate is valid only if none of its
//!   sampled points is in danger.
//!
//! Only the [`MAX_CANDIDATES`] nearest shelters are ever asked about. A
//! farther shelter with the only clean route is not found; that caps oracle
//! calls per search.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::geometry::LatLng;
use crate::oracle::{OracleError, RoutingOracle};
use crate::predicate::position_in_region;
use crate::region::DangerRegion;
use crate::shelter::Shelter;

/// Shelters routed per search.
pub const MAX_CANDIDATES: usize = 3;

/// Roughly how many path points are checked against the region.
pub const PATH_SAMPLE_TARGET: usize = 40;

/// Which policy produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    Escape,
    Safe,
}

impl RouteMode {
    pub fn for_origin(origin_in_danger: bool) -> Self {
        if origin_in_danger { RouteMode::Escape } else { RouteMode::Safe }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RouteMode::Escape => "escape",
            RouteMode::Safe => "safe",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RouteMode::Escape => "Emergency escape",
            RouteMode::Safe => "Safe route",
        }
    }

    /// Line colour for the route overlay.
    pub fn color(&self) -> &'static str {
        match self {
            RouteMode::Escape => "#d32f2f",
            RouteMode::Safe => "#0066ff",
        }
    }
}

/// One shelter's routed result, before the validity rule is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub target: Shelter,
    pub path: Vec<LatLng>,
    pub distance_m: f64,
    pub touches_danger: bool,
}

/// The route to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedRoute {
    pub path: Vec<LatLng>,
    pub target_name: String,
    pub mode: RouteMode,
    pub distance_m: f64,
}

impl SelectedRoute {
    /// Distance in kilometres with one decimal, e.g. `"2.4"`.
    pub fn km(&self) -> String {
        format!("{:.1}", self.distance_m / 1000.0)
    }

    /// Popup-style one-liner.
    pub fn summary(&self) -> String {
        format!("{} ({}km) - target: {}", self.mode.title(), self.km(), self.target_name)
    }
}

/// Why no route was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// No reachable shelters at all; the oracle was never called.
    Unavailable,
    /// None of the nearest candidates produced a valid route.
    SearchFailed,
    /// Origin lies outside the zone of interest.
    OutsideBoundary,
}

impl RouteError {
    pub fn name(&self) -> &'static str {
        match self {
            RouteError::Unavailable => "unavailable",
            RouteError::SearchFailed => "search failed",
            RouteError::OutsideBoundary => "outside boundary",
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Unavailable => write!(f, "no shelters available"),
            RouteError::SearchFailed => {
                write!(f, "search failed: roads may be blocked or no shelter is reachable")
            }
            RouteError::OutsideBoundary => write!(f, "location is outside the service boundary"),
        }
    }
}

impl std::error::Error for RouteError {}

// ============================================================================
// RANKING & SAMPLING
// ============================================================================

/// Nearest `limit` shelters by great-circle distance, closest first.
///
/// The sort is stable, so equal distances keep directory order.
pub fn rank_shelters(origin: LatLng, shelters: &[Shelter], limit: usize) -> Vec<(&Shelter, f64)> {
    let mut ranked: Vec<(&Shelter, f64)> = shelters
        .iter()
        .map(|s| (s, origin.distance(s.location())))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(limit);
    ranked
}

/// Stride that visits about [`PATH_SAMPLE_TARGET`] points of a path.
#[inline]
pub fn sample_stride(point_count: usize) -> usize {
    (point_count / PATH_SAMPLE_TARGET).max(1)
}

/// Does any sampled point of `path` fall in the region? Stops at the first hit.
pub fn path_touches_region(path: &[LatLng], region: &DangerRegion) -> bool {
    if region.is_none() {
        return false;
    }
    path.iter()
        .step_by(sample_stride(path.len()))
        .any(|p| position_in_region(*p, region))
}

/// Route one shelter and tag it with danger contact.
pub fn evaluate_candidate<O: RoutingOracle + ?Sized>(
    oracle: &O,
    origin: LatLng,
    shelter: &Shelter,
    region: &DangerRegion,
) -> Result<RouteCandidate, OracleError> {
    let routed = oracle.route(origin, shelter.location())?;
    if routed.path.is_empty() || !(routed.distance_m >= 0.0) {
        return Err(OracleError::NoRoute);
    }

    let touches_danger = path_touches_region(&routed.path, region);
    Ok(RouteCandidate {
        target: shelter.clone(),
        path: routed.path,
        distance_m: routed.distance_m,
        touches_danger,
    })
}

// ============================================================================
// SEARCH
// ============================================================================

/// Pick the best evacuation route from `origin`.
///
/// Candidates are routed one after another, nearest first, and all of them
/// are always tried. The shortest valid oracle distance wins; on a tie the
/// earlier (nearer) candidate stays.
pub fn find_route<O: RoutingOracle + ?Sized>(
    origin: LatLng,
    reachable: &[Shelter],
    region: &DangerRegion,
    oracle: &O,
) -> Result<SelectedRoute, RouteError> {
    if reachable.is_empty() {
        return Err(RouteError::Unavailable);
    }

    let origin_in_danger = position_in_region(origin, region);
    let mode = RouteMode::for_origin(origin_in_danger);
    debug!(
        "route search from ({:.5}, {:.5}), {} mode, {} reachable shelters",
        origin.lat,
        origin.lng,
        mode.name(),
        reachable.len()
    );

    let best = rank_shelters(origin, reachable, MAX_CANDIDATES)
        .into_iter()
        .fold(None::<RouteCandidate>, |best, (shelter, straight_m)| {
            let candidate = match evaluate_candidate(oracle, origin, shelter, region) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!("skipping shelter '{}': {}", shelter.name, e);
                    return best;
                }
            };

            let valid = origin_in_danger || !candidate.touches_danger;
            debug!(
                "candidate '{}': straight {:.0} m, routed {:.0} m, touches danger: {}, valid: {}",
                shelter.name, straight_m, candidate.distance_m, candidate.touches_danger, valid
            );
            if !valid {
                return best;
            }

            match best {
                Some(kept) if kept.distance_m <= candidate.distance_m => Some(kept),
                _ => Some(candidate),
            }
        });

    best.map(|c| SelectedRoute {
        path: c.path,
        target_name: c.target.name,
        mode,
        distance_m: c.distance_m,
    })
    .ok_or(RouteError::SearchFailed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleRoute;
    use geo::{LineString, MultiPolygon, Polygon};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Oracle answering from a table keyed by destination name.
    struct Scripted {
        shelters: Vec<Shelter>,
        answers: HashMap<String, Result<OracleRoute, OracleError>>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(shelters: &[Shelter]) -> Self {
            Self { shelters: shelters.to_vec(), answers: HashMap::new(), calls: RefCell::new(Vec::new()) }
        }

        fn answer(mut self, name: &str, result: Result<OracleRoute, OracleError>) -> Self {
            self.answers.insert(name.to_string(), result);
            self
        }
    }

    impl RoutingOracle for Scripted {
        fn route(&self, _origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError> {
            let shelter = self
                .shelters
                .iter()
                .find(|s| s.location() == destination)
                .expect("destination is a known shelter");
            self.calls.borrow_mut().push(shelter.name.clone());
            self.answers.get(&shelter.name).cloned().unwrap_or(Err(OracleError::NoRoute))
        }
    }

    fn clean_route(distance_m: f64) -> Result<OracleRoute, OracleError> {
        Ok(OracleRoute {
            path: vec![LatLng::new(10.0, 10.0), LatLng::new(10.1, 10.1)],
            distance_m,
        })
    }

    fn origin() -> LatLng {
        LatLng::new(0.0, 0.0)
    }

    /// Axis-aligned danger box, `[lng, lat]` corners.
    fn danger_box(lat: (f64, f64), lng: (f64, f64)) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (lng.0, lat.0),
            (lng.1, lat.0),
            (lng.1, lat.1),
            (lng.0, lat.1),
            (lng.0, lat.0),
        ]);
        MultiPolygon::new(vec![Polygon::new(ring, Vec::new())])
    }

    fn region() -> DangerRegion {
        DangerRegion::Single(danger_box((0.50, 0.60), (0.50, 0.60)))
    }

    /// Straight path that passes through `(0.55, 0.55)` on the way.
    fn dirty_route(distance_m: f64) -> Result<OracleRoute, OracleError> {
        Ok(OracleRoute {
            path: vec![LatLng::new(0.40, 0.40), LatLng::new(0.55, 0.55), LatLng::new(0.70, 0.70)],
            distance_m,
        })
    }

    /// Shelters at increasing straight-line distance from the origin.
    fn ladder() -> Vec<Shelter> {
        vec![
            Shelter::new("d4", 0.04, 0.0),
            Shelter::new("d1", 0.01, 0.0),
            Shelter::new("d3", 0.03, 0.0),
            Shelter::new("d2", 0.02, 0.0),
        ]
    }

    #[test]
    fn stride_caps_samples() {
        assert_eq!(sample_stride(0), 1);
        assert_eq!(sample_stride(39), 1);
        assert_eq!(sample_stride(40), 1);
        assert_eq!(sample_stride(80), 2);
        assert_eq!(sample_stride(1000), 25);
    }

    #[test]
    fn ranking_is_nearest_first_and_capped() {
        let shelters = ladder();
        let ranked = rank_shelters(origin(), &shelters, 3);
        let names: Vec<&str> = ranked.iter().map(|(s, _)| s.name.as_str()).collect();
        assert_eq!(names, vec!["d1", "d2", "d3"]);
        assert!(ranked[0].1 < ranked[1].1);
    }

    #[test]
    fn ranking_ties_keep_directory_order() {
        let shelters = vec![
            Shelter::new("east", 0.0, 0.01),
            Shelter::new("west", 0.0, -0.01),
        ];
        let ranked = rank_shelters(origin(), &shelters, 3);
        assert_eq!(ranked[0].0.name, "east");
        assert_eq!(ranked[1].0.name, "west");
    }

    #[test]
    fn empty_directory_is_unavailable_without_calls() {
        let oracle = Scripted::new(&[]);
        let result = find_route(origin(), &[], &DangerRegion::None, &oracle);
        assert_eq!(result, Err(RouteError::Unavailable));
        assert!(oracle.calls.borrow().is_empty());
    }

    #[test]
    fn only_three_nearest_are_routed_in_order() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters).answer("d4", clean_route(10.0));
        let result = find_route(origin(), &shelters, &DangerRegion::None, &oracle);
        assert_eq!(result, Err(RouteError::SearchFailed));
        assert_eq!(*oracle.calls.borrow(), vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn shortest_road_distance_wins_not_nearest_shelter() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", clean_route(5_000.0))
            .answer("d2", clean_route(1_200.0))
            .answer("d3", clean_route(3_000.0));
        let route = find_route(origin(), &shelters, &DangerRegion::None, &oracle).unwrap();
        assert_eq!(route.target_name, "d2");
        assert_eq!(route.distance_m, 1_200.0);
        assert_eq!(route.mode, RouteMode::Safe);
        // success doesn't stop the search
        assert_eq!(oracle.calls.borrow().len(), 3);
    }

    #[test]
    fn failed_candidates_are_skipped() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", Err(OracleError::Transport("timeout".into())))
            .answer("d2", Err(OracleError::Status(502)))
            .answer("d3", clean_route(7_000.0));
        let route = find_route(origin(), &shelters, &DangerRegion::None, &oracle).unwrap();
        assert_eq!(route.target_name, "d3");
    }

    #[test]
    fn empty_path_is_unusable() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", Ok(OracleRoute { path: Vec::new(), distance_m: 10.0 }))
            .answer("d2", clean_route(900.0));
        let route = find_route(origin(), &shelters, &DangerRegion::None, &oracle).unwrap();
        assert_eq!(route.target_name, "d2");
    }

    #[test]
    fn equal_distances_keep_the_nearer_shelter() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", clean_route(2_000.0))
            .answer("d2", clean_route(2_000.0))
            .answer("d3", clean_route(2_000.0));
        let route = find_route(origin(), &shelters, &DangerRegion::None, &oracle).unwrap();
        assert_eq!(route.target_name, "d1");
    }

    #[test]
    fn safe_mode_passes_over_shorter_dirty_route() {
        let shelters = ladder();
        let region = region();
        let oracle = Scripted::new(&shelters)
            .answer("d1", dirty_route(600.0))
            .answer("d2", clean_route(900.0));

        let route = find_route(origin(), &shelters, &region, &oracle).unwrap();
        assert_eq!(route.mode, RouteMode::Safe);
        assert_eq!(route.target_name, "d2");
        assert_eq!(route.distance_m, 900.0);
        assert!(!path_touches_region(&route.path, &region));
    }

    #[test]
    fn safe_mode_with_only_dirty_routes_fails() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", dirty_route(600.0))
            .answer("d2", dirty_route(700.0))
            .answer("d3", dirty_route(800.0));
        let result = find_route(origin(), &shelters, &region(), &oracle);
        assert_eq!(result, Err(RouteError::SearchFailed));
        assert_eq!(oracle.calls.borrow().len(), 3);
    }

    #[test]
    fn escape_mode_takes_shorter_dirty_route() {
        let shelters = ladder();
        let oracle = Scripted::new(&shelters)
            .answer("d1", dirty_route(600.0))
            .answer("d2", clean_route(900.0));
        // origin sits in a second danger patch
        let region = DangerRegion::Collection(vec![
            danger_box((-0.01, 0.01), (-0.01, 0.01)),
            danger_box((0.50, 0.60), (0.50, 0.60)),
        ]);

        let route = find_route(origin(), &shelters, &region, &oracle).unwrap();
        assert_eq!(route.mode, RouteMode::Escape);
        assert_eq!(route.target_name, "d1");
    }

    #[test]
    fn sampling_skips_points_between_strides() {
        let region = region();
        // 80 points: stride 2, so only even indices are checked
        let mut path: Vec<LatLng> = (0..80).map(|i| LatLng::new(10.0 + i as f64 * 0.001, 10.0)).collect();
        path[1] = LatLng::new(0.55, 0.55);
        assert_eq!(sample_stride(path.len()), 2);
        assert!(!path_touches_region(&path, &region));

        path[2] = LatLng::new(0.55, 0.55);
        assert!(path_touches_region(&path, &region));
    }

    #[test]
    fn short_paths_check_every_point() {
        let region = region();
        let mut path: Vec<LatLng> = (0..40).map(|i| LatLng::new(10.0 + i as f64 * 0.001, 10.0)).collect();
        assert!(!path_touches_region(&path, &region));
        path[39] = LatLng::new(0.55, 0.55);
        assert!(path_touches_region(&path, &region));
    }

    #[test]
    fn collection_region_is_checked_member_by_member() {
        let region = DangerRegion::Collection(vec![
            danger_box((5.0, 6.0), (5.0, 6.0)),
            danger_box((0.50, 0.60), (0.50, 0.60)),
        ]);
        let dirty = dirty_route(1.0).unwrap();
        assert!(path_touches_region(&dirty.path, &region));
        assert!(!path_touches_region(&dirty.path, &DangerRegion::None));
    }

    #[test]
    fn summary_formats_kilometres() {
        let route = SelectedRoute {
            path: Vec::new(),
            target_name: "Hill Community Center".into(),
            mode: RouteMode::Escape,
            distance_m: 2_449.0,
        };
        assert_eq!(route.km(), "2.4");
        assert_eq!(route.summary(), "Emergency escape (2.4km) - target: Hill Community Center");
    }

    #[test]
    fn errors_are_distinct() {
        assert_ne!(RouteError::Unavailable.to_string(), RouteError::SearchFailed.to_string());
        assert_eq!(RouteError::SearchFailed.name(), "search failed");
    }
}
