//! Static registry of region centroids with directional queries

use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, BTreeSet};

use super::compass::{bearing_degrees, compass_sector, CompassSector};
use crate::core::types::{MapPoint, RegionId};

/// A region found by a sector query
#[derive(Debug, Clone, PartialEq)]
pub struct SectorHit {
    pub region: RegionId,
    pub distance: f64,
}

/// Region centroids keyed by id, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    centroids: BTreeMap<RegionId, MapPoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (RegionId, MapPoint)>) -> Self {
        Self {
            centroids: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn contains(&self, region: &RegionId) -> bool {
        self.centroids.contains_key(region)
    }

    pub fn centroid_of(&self, region: &RegionId) -> Option<MapPoint> {
        self.centroids.get(region).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &MapPoint)> {
        self.centroids.iter()
    }

    /// Regions in `sector` as seen from `from`, nearest first
    pub fn regions_in_sector(
        &self,
        from: &RegionId,
        sector: CompassSector,
        exclude: &BTreeSet<RegionId>,
    ) -> Vec<SectorHit> {
        self.regions_within(from, sector, f64::INFINITY, exclude)
    }

    /// Like [`regions_in_sector`](Self::regions_in_sector), limited to
    /// regions no farther than `max_distance`. Unknown origins yield nothing.
    pub fn regions_within(
        &self,
        from: &RegionId,
        sector: CompassSector,
        max_distance: f64,
        exclude: &BTreeSet<RegionId>,
    ) -> Vec<SectorHit> {
        let Some(origin) = self.centroid_of(from) else {
            return Vec::new();
        };

        let mut hits: Vec<SectorHit> = self
            .centroids
            .iter()
            .filter(|(id, _)| *id != from && !exclude.contains(*id))
            .filter_map(|(id, point)| {
                let distance = origin.distance(point);
                if distance > max_distance {
                    return None;
                }
                (compass_sector(bearing_degrees(origin, *point)) == sector).then(|| SectorHit {
                    region: id.clone(),
                    distance,
                })
            })
            .collect();

        // Stable: equal distances keep id order
        hits.sort_by_key(|hit| OrderedFloat(hit.distance));
        hits
    }

    /// Replace a split parent by its children
    pub(crate) fn replace(&mut self, parent: &RegionId, children: &[(RegionId, MapPoint)]) {
        self.centroids.remove(parent);
        for (id, point) in children {
            self.centroids.insert(id.clone(), *point);
        }
    }

    pub(crate) fn insert(&mut self, region: RegionId, centroid: MapPoint) {
        self.centroids.insert(region, centroid);
    }
}
