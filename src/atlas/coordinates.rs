//! Precomputed region centers
//!
//! A JSON object keyed by region identifier:
//! `{ "United_Kingdom": { "centerX": 443.2, "centerY": 122.5, "width": 20.1, "height": 35.0 } }`.
//! Keys are normalized the same way catalog names are.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::catalog::normalize_region_name;
use crate::core::types::{MapPoint, RegionId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateEntry {
    pub center_x: f64,
    pub center_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl CoordinateEntry {
    pub fn center(&self) -> MapPoint {
        MapPoint::new(self.center_x, self.center_y)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateTable {
    entries: BTreeMap<RegionId, CoordinateEntry>,
}

impl CoordinateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, CoordinateEntry> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (key, entry) in raw {
            if !entry.center_x.is_finite() || !entry.center_y.is_finite() {
                tracing::warn!(region = %key, "ignoring non-finite coordinate entry");
                continue;
            }
            table.insert(RegionId::new(normalize_region_name(&key)), entry);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> crate::core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn insert(&mut self, region: RegionId, entry: CoordinateEntry) {
        self.entries.insert(region, entry);
    }

    pub fn get(&self, region: &RegionId) -> Option<&CoordinateEntry> {
        self.entries.get(region)
    }

    pub fn center_of(&self, region: &RegionId) -> Option<MapPoint> {
        self.entries.get(region).map(CoordinateEntry::center)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &CoordinateEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_normalized() {
        let table = CoordinateTable::from_json(
            r#"{
                "United_Kingdom": { "centerX": 443.2, "centerY": 122.5, "width": 20.1, "height": 35.0 },
                "France": { "centerX": 455.0, "centerY": 150.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.center_of(&RegionId::new("United Kingdom")),
            Some(MapPoint::new(443.2, 122.5))
        );
        assert_eq!(table.get(&RegionId::new("France")).unwrap().width, None);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(CoordinateTable::from_json(r#"{ "France": { "centerX": 1.0 } }"#).is_err());
        assert!(CoordinateTable::from_json("not json").is_err());
    }
}
