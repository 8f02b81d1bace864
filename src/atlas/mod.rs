//! Region registry: which regions exist, where they are, and their outlines
//!
//! Built once from an SVG catalog and a coordinate table. The only later
//! mutation is a split, which retires one region and registers its two halves.

pub mod catalog;
pub mod coordinates;

pub use catalog::{extract_region_paths, normalize_region_name, GeometryCatalog};
pub use coordinates::{CoordinateEntry, CoordinateTable};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{ConquestError, PreconditionViolation};
use crate::core::types::{MapPoint, RegionId};
use crate::geometry::path_center;
use crate::spatial::SpatialIndex;

/// A region known to the map
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub centroid: MapPoint,
    /// Outline path data; regions without one cannot be split
    pub path: Option<String>,
}

/// One half of a split region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPiece {
    pub region: RegionId,
    pub path: String,
}

/// A completed split, kept so it can be replayed onto a fresh map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub parent: RegionId,
    pub children: [RegionPiece; 2],
}

#[derive(Debug, Clone, Default)]
pub struct Atlas {
    regions: BTreeMap<RegionId, Region>,
    index: SpatialIndex,
    splits: Vec<SplitRecord>,
    curve_segments: usize,
}

impl Atlas {
    /// Merge outlines and precomputed centers into one region set.
    ///
    /// A region's centroid comes from the table when present, otherwise from
    /// the bounding-box center of its outline. Regions with neither a table
    /// entry nor a parsable outline are left out.
    pub fn new(catalog: &GeometryCatalog, table: &CoordinateTable, curve_segments: usize) -> Self {
        let mut atlas = Self::empty(curve_segments);

        for (id, path) in catalog.iter() {
            let centroid = match table.center_of(id) {
                Some(center) => center,
                None => match path_center(path, curve_segments) {
                    Ok(center) => center,
                    Err(e) => {
                        tracing::warn!(region = %id, error = %e, "skipping region without usable geometry");
                        continue;
                    }
                },
            };
            atlas.insert_region(Region {
                id: id.clone(),
                centroid,
                path: Some(path.to_string()),
            });
        }

        for (id, entry) in table.iter() {
            if !atlas.contains(id) {
                atlas.insert_region(Region {
                    id: id.clone(),
                    centroid: entry.center(),
                    path: None,
                });
            }
        }

        tracing::info!(regions = atlas.len(), "atlas built");
        atlas
    }

    /// Build from an SVG map file and an optional coordinate table file
    pub fn load(map: &Path, coordinates: Option<&Path>, curve_segments: usize) -> crate::core::Result<Self> {
        let catalog = GeometryCatalog::load(map)?;
        let table = match coordinates {
            Some(path) => CoordinateTable::load(path)?,
            None => CoordinateTable::new(),
        };
        Ok(Self::new(&catalog, &table, curve_segments))
    }

    pub fn empty(curve_segments: usize) -> Self {
        Self {
            curve_segments: curve_segments.max(1),
            ..Self::default()
        }
    }

    /// Regions known only by position
    pub fn from_centroids(entries: impl IntoIterator<Item = (RegionId, MapPoint)>) -> Self {
        let mut atlas = Self::empty(16);
        for (id, centroid) in entries {
            atlas.insert_region(Region { id, centroid, path: None });
        }
        atlas
    }

    pub fn insert_region(&mut self, region: Region) {
        self.index.insert(region.id.clone(), region.centroid);
        self.regions.insert(region.id.clone(), region);
    }

    pub fn contains(&self, region: &RegionId) -> bool {
        self.regions.contains_key(region)
    }

    pub fn region(&self, region: &RegionId) -> Option<&Region> {
        self.regions.get(region)
    }

    pub fn path_of(&self, region: &RegionId) -> Option<&str> {
        self.regions.get(region).and_then(|r| r.path.as_deref())
    }

    pub fn region_ids(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.keys()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn splits(&self) -> &[SplitRecord] {
        &self.splits
    }

    pub fn curve_segments(&self) -> usize {
        self.curve_segments
    }

    /// Retire `record.parent` and register its two halves.
    ///
    /// Nothing changes unless the parent exists, the child names are free
    /// and both child outlines have a center.
    pub fn apply_split(&mut self, record: SplitRecord) -> Result<(), ConquestError> {
        if !self.contains(&record.parent) {
            return Err(PreconditionViolation::UnknownRegion(record.parent).into());
        }

        let mut children = Vec::with_capacity(2);
        for piece in &record.children {
            if self.contains(&piece.region) || piece.region == record.parent {
                return Err(PreconditionViolation::RegionExists(piece.region.clone()).into());
            }
            let centroid = path_center(&piece.path, self.curve_segments)?;
            children.push((piece.region.clone(), centroid));
        }

        self.regions.remove(&record.parent);
        self.index.replace(&record.parent, &children);
        for (piece, (_, centroid)) in record.children.iter().zip(&children) {
            self.regions.insert(
                piece.region.clone(),
                Region {
                    id: piece.region.clone(),
                    centroid: *centroid,
                    path: Some(piece.path.clone()),
                },
            );
        }

        tracing::debug!(parent = %record.parent, "split applied to atlas");
        self.splits.push(record);
        Ok(())
    }

    /// Re-apply previously recorded splits; records that no longer fit are
    /// skipped. Returns how many were applied.
    pub fn replay(&mut self, records: &[SplitRecord]) -> usize {
        let mut applied = 0;
        for record in records {
            match self.apply_split(record.clone()) {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!(parent = %record.parent, error = %e, "skipping recorded split");
                }
            }
        }
        applied
    }
}
