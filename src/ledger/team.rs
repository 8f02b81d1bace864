//! Team - a competitor and the territory it holds

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::types::{RegionId, TeamId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub home_region: RegionId,
    /// Rounds won; never decreases
    pub score: u32,
    pub color: String,
    pub owned_regions: BTreeSet<RegionId>,
    /// Set exactly when `owned_regions` is empty
    pub eliminated: bool,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>, home_region: RegionId, color: impl Into<String>) -> Self {
        let mut owned_regions = BTreeSet::new();
        owned_regions.insert(home_region.clone());
        Self {
            id,
            name: name.into(),
            home_region,
            score: 0,
            color: color.into(),
            owned_regions,
            eliminated: false,
        }
    }

    pub fn region_count(&self) -> usize {
        self.owned_regions.len()
    }

    pub fn owns(&self, region: &RegionId) -> bool {
        self.owned_regions.contains(region)
    }

    pub fn is_active(&self) -> bool {
        !self.eliminated
    }

    /// Point-in-time copy for the match history
    pub fn snapshot(&self) -> TeamSnapshot {
        TeamSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            score: self.score,
            region_count: self.region_count(),
        }
    }

    pub(crate) fn refresh_elimination(&mut self) -> bool {
        let was_eliminated = self.eliminated;
        self.eliminated = self.owned_regions.is_empty();
        self.eliminated && !was_eliminated
    }
}

/// A team as it was when a round was decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    pub id: TeamId,
    pub name: String,
    pub color: String,
    pub score: u32,
    pub region_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_team_owns_home() {
        let team = Team::new(TeamId(1), "Rovers", RegionId::new("France"), "#e6194b");
        assert!(team.owns(&RegionId::new("France")));
        assert_eq!(team.region_count(), 1);
        assert!(team.is_active());
        assert_eq!(team.score, 0);
    }

    #[test]
    fn test_refresh_elimination_reports_transition_once() {
        let mut team = Team::new(TeamId(1), "Rovers", RegionId::new("France"), "#e6194b");
        team.owned_regions.clear();
        assert!(team.refresh_elimination());
        assert!(team.eliminated);
        assert!(!team.refresh_elimination());
    }
}
