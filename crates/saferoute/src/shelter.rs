//! Shelter directory entries and their flooded/reachable split.

use serde::{Deserialize, Serialize};

use crate::geometry::LatLng;
use crate::predicate::point_in_region;
use crate::region::DangerRegion;

/// An evacuation shelter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Shelter {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self { name: name.into(), lat, lng }
    }

    #[inline]
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Every shelter lands in exactly one of the two lists.
///
/// Floodedness is never stored on a shelter; rebuild this whenever the
/// region changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShelterClassification {
    pub reachable: Vec<Shelter>,
    pub flooded: Vec<Shelter>,
}

impl ShelterClassification {
    /// Partition `shelters` against `region`, keeping directory order.
    pub fn classify(shelters: &[Shelter], region: &DangerRegion) -> Self {
        let (flooded, reachable) = shelters
            .iter()
            .cloned()
            .partition(|s| point_in_region(s.lat, s.lng, region));
        Self { reachable, flooded }
    }

    pub fn total(&self) -> usize {
        self.reachable.len() + self.flooded.len()
    }

    pub fn is_flooded(&self, shelter: &Shelter) -> bool {
        self.flooded.contains(shelter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::build_region;

    fn directory() -> Vec<Shelter> {
        vec![
            Shelter::new("Riverside School", 37.7555, 126.7755),
            Shelter::new("Hill Community Center", 37.7900, 126.8000),
            Shelter::new("Market Hall", 37.7520, 126.7720),
            Shelter::new("North Gym", 37.8000, 126.7600),
        ]
    }

    fn trace() -> Vec<LatLng> {
        vec![
            LatLng::new(37.750, 126.770),
            LatLng::new(37.750, 126.780),
            LatLng::new(37.760, 126.780),
            LatLng::new(37.760, 126.770),
        ]
    }

    #[test]
    fn no_region_everything_reachable() {
        let split = ShelterClassification::classify(&directory(), &DangerRegion::None);
        assert_eq!(split.reachable, directory());
        assert!(split.flooded.is_empty());
    }

    #[test]
    fn flooded_shelters_are_excluded() {
        let region = build_region(30.0, &[trace()]);
        let split = ShelterClassification::classify(&directory(), &region);
        let flooded: Vec<&str> = split.flooded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(flooded, vec!["Riverside School", "Market Hall"]);
        assert_eq!(split.reachable.len(), 2);
        assert_eq!(split.total(), 4);
        assert!(split.is_flooded(&directory()[0]));
        assert!(!split.is_flooded(&directory()[1]));
    }

    #[test]
    fn reclassify_from_scratch() {
        let shelters = directory();
        let heavy = build_region(30.0, &[trace()]);
        let before = ShelterClassification::classify(&shelters, &heavy);
        let after = ShelterClassification::classify(&shelters, &DangerRegion::None);
        assert_eq!(before.flooded.len(), 2);
        assert!(after.flooded.is_empty());
    }
}
