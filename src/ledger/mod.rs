//! Ownership ledger: the authoritative record of who holds which region
//!
//! Teams are never removed. A team that loses its last region is flagged
//! eliminated and stays in the ledger for display.

pub mod roster;
pub mod team;

pub use roster::{Roster, RosterEntry};
pub use team::{Team, TeamSnapshot};

use ahash::AHashMap;
use rand::Rng;

use crate::atlas::{Atlas, RegionPiece, SplitRecord};
use crate::core::config::{GameConfig, SplitConfig};
use crate::core::error::{ConquestError, GeometryError, PreconditionViolation};
use crate::core::types::{RegionId, TeamId};
use crate::geometry::{split_polygon, SplitAxis};

const FALLBACK_COLOR: &str = "#808080";

/// Result of one territory transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    /// The region that changed hands, if the loser had any
    pub region: Option<RegionId>,
    /// Whether this transfer eliminated the loser
    pub loser_eliminated: bool,
}

/// A region replaced by its two halves
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub parent: RegionId,
    pub children: [RegionId; 2],
    pub axis: SplitAxis,
}

#[derive(Debug, Clone)]
pub struct OwnershipLedger {
    teams: Vec<Team>,
    owners: AHashMap<RegionId, TeamId>,
    next_team_id: u32,
    palette: Vec<String>,
}

impl Default for OwnershipLedger {
    fn default() -> Self {
        Self::new(GameConfig::default().palette)
    }
}

impl OwnershipLedger {
    pub fn new(palette: Vec<String>) -> Self {
        Self {
            teams: Vec::new(),
            owners: AHashMap::new(),
            next_team_id: 1,
            palette,
        }
    }

    /// Rebuild a ledger from persisted teams, repairing anything that breaks
    /// the ownership rules: regions missing from the atlas are dropped, a
    /// region claimed twice stays with the first claimant, duplicate team ids
    /// are discarded and elimination flags are recomputed.
    pub fn restore(teams: Vec<Team>, atlas: &Atlas, palette: Vec<String>) -> Self {
        let mut ledger = Self::new(palette);

        for mut team in teams {
            if ledger.team(team.id).is_some() {
                tracing::warn!(team = %team.id, "dropping duplicate team from snapshot");
                continue;
            }

            let claimed = std::mem::take(&mut team.owned_regions);
            for region in claimed {
                if !atlas.contains(&region) {
                    tracing::warn!(team = %team.id, region = %region, "dropping unknown region from snapshot");
                } else if let Some(owner) = ledger.owners.get(&region) {
                    tracing::warn!(team = %team.id, region = %region, owner = %owner, "region claimed twice in snapshot");
                } else {
                    ledger.owners.insert(region.clone(), team.id);
                    team.owned_regions.insert(region);
                }
            }
            team.eliminated = team.owned_regions.is_empty();

            ledger.next_team_id = ledger.next_team_id.max(team.id.0.saturating_add(1));
            ledger.teams.push(team);
        }

        ledger
    }

    /// Drop every team; the palette is kept
    pub fn clear(&mut self) {
        self.teams.clear();
        self.owners.clear();
        self.next_team_id = 1;
    }

    /// Create a team owning `home_region`
    pub fn add_team(
        &mut self,
        name: &str,
        home_region: &RegionId,
        atlas: &Atlas,
    ) -> Result<TeamId, PreconditionViolation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PreconditionViolation::EmptyTeamName);
        }
        if !atlas.contains(home_region) {
            return Err(PreconditionViolation::UnknownRegion(home_region.clone()));
        }
        if let Some(owner) = self.owner_of(home_region) {
            return Err(PreconditionViolation::RegionTaken {
                region: home_region.clone(),
                owner,
            });
        }

        let id = TeamId(self.next_team_id);
        self.next_team_id += 1;
        let color = self
            .palette
            .get(self.teams.len() % self.palette.len().max(1))
            .map(String::as_str)
            .unwrap_or(FALLBACK_COLOR);

        self.owners.insert(home_region.clone(), id);
        self.teams.push(Team::new(id, name, home_region.clone(), color));

        tracing::info!(team = %id, name, region = %home_region, "team added");
        Ok(id)
    }

    pub fn rename_team(&mut self, id: TeamId, name: &str) -> Result<(), PreconditionViolation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PreconditionViolation::EmptyTeamName);
        }
        let team = self.team_mut(id).ok_or(PreconditionViolation::UnknownTeam(id))?;
        tracing::debug!(team = %id, from = %team.name, to = name, "team renamed");
        team.name = name.to_string();
        Ok(())
    }

    /// Add every roster entry whose home region is free.
    ///
    /// Entries that cannot be placed are logged and skipped.
    pub fn seed_from_roster(&mut self, roster: &Roster, atlas: &Atlas, config: &GameConfig) -> Vec<TeamId> {
        let mut created = Vec::new();
        for entry in &roster.teams {
            let region = RegionId::new(config.resolve_alias(&entry.home_region));
            match self.add_team(&entry.name, &region, atlas) {
                Ok(id) => created.push(id),
                Err(e) => {
                    tracing::warn!(name = %entry.name, region = %region, error = %e, "roster entry skipped");
                }
            }
        }
        created
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    /// All teams in creation order
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn active_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter().filter(|t| t.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_teams().count()
    }

    pub fn owner_of(&self, region: &RegionId) -> Option<TeamId> {
        self.owners.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Move one of the loser's regions, chosen uniformly at random, to the
    /// winner and award the winner a point.
    ///
    /// A loser with no regions left is a no-op: nothing moves and the score
    /// is unchanged.
    pub fn transfer_random_region<R: Rng + ?Sized>(
        &mut self,
        winner: TeamId,
        loser: TeamId,
        rng: &mut R,
    ) -> Result<TransferOutcome, PreconditionViolation> {
        if winner == loser {
            return Err(PreconditionViolation::NotAParticipant(loser));
        }
        if self.team(winner).is_none() {
            return Err(PreconditionViolation::UnknownTeam(winner));
        }
        let loser_team = self.team(loser).ok_or(PreconditionViolation::UnknownTeam(loser))?;

        let count = loser_team.region_count();
        if count == 0 {
            tracing::warn!(winner = %winner, loser = %loser, "loser holds no regions, nothing to transfer");
            return Ok(TransferOutcome { region: None, loser_eliminated: false });
        }
        let Some(region) = loser_team.owned_regions.iter().nth(rng.gen_range(0..count)).cloned() else {
            return Ok(TransferOutcome { region: None, loser_eliminated: false });
        };

        let loser_eliminated = match self.team_mut(loser) {
            Some(team) => {
                team.owned_regions.remove(&region);
                team.refresh_elimination()
            }
            None => false,
        };
        if let Some(team) = self.team_mut(winner) {
            team.owned_regions.insert(region.clone());
            team.score += 1;
        }
        self.owners.insert(region.clone(), winner);

        tracing::info!(winner = %winner, loser = %loser, region = %region, "region transferred");
        if loser_eliminated {
            tracing::info!(team = %loser, "team eliminated");
        }

        Ok(TransferOutcome {
            region: Some(region),
            loser_eliminated,
        })
    }

    /// Split a neutral region into two new regions named `"<parent> 1"` and
    /// `"<parent> 2"` (numbers bumped past names already in use).
    ///
    /// Nothing changes on failure.
    pub fn split_region(
        &self,
        region: &RegionId,
        atlas: &mut Atlas,
        config: &SplitConfig,
    ) -> Result<SplitOutcome, ConquestError> {
        if !atlas.contains(region) {
            return Err(PreconditionViolation::UnknownRegion(region.clone()).into());
        }
        if let Some(owner) = self.owner_of(region) {
            return Err(PreconditionViolation::RegionOwned {
                region: region.clone(),
                owner,
            }
            .into());
        }
        let path = atlas.path_of(region).ok_or(GeometryError::EmptyShape)?;

        let result = split_polygon(path, config)?;
        let [first, second] = child_names(region, atlas);
        atlas.apply_split(SplitRecord {
            parent: region.clone(),
            children: [
                RegionPiece { region: first.clone(), path: result.part_a },
                RegionPiece { region: second.clone(), path: result.part_b },
            ],
        })?;

        tracing::info!(region = %region, axis = ?result.axis, a = %first, b = %second, "region split");
        Ok(SplitOutcome {
            parent: region.clone(),
            children: [first, second],
            axis: result.axis,
        })
    }

    /// Check the ownership rules against `atlas`
    pub fn check_invariants(&self, atlas: &Atlas) -> Result<(), String> {
        let mut seen: AHashMap<&RegionId, TeamId> = AHashMap::new();

        for team in &self.teams {
            if team.eliminated != team.owned_regions.is_empty() {
                return Err(format!(
                    "team {} has {} regions but eliminated = {}",
                    team.id,
                    team.region_count(),
                    team.eliminated
                ));
            }
            for region in &team.owned_regions {
                if !atlas.contains(region) {
                    return Err(format!("team {} owns unknown region {}", team.id, region));
                }
                if let Some(other) = seen.insert(region, team.id) {
                    return Err(format!("region {} owned by both {} and {}", region, other, team.id));
                }
                if self.owner_of(region) != Some(team.id) {
                    return Err(format!("owner index disagrees for region {}", region));
                }
            }
        }

        if seen.len() != self.owners.len() {
            return Err(format!(
                "owner index has {} entries, teams own {}",
                self.owners.len(),
                seen.len()
            ));
        }

        Ok(())
    }
}

/// The first two free names of the form `"<parent> n"`
fn child_names(parent: &RegionId, atlas: &Atlas) -> [RegionId; 2] {
    let mut free = (1u32..)
        .map(|n| RegionId::new(format!("{} {}", parent, n)))
        .filter(|id| !atlas.contains(id));
    let first = free.next().unwrap_or_else(|| RegionId::new(format!("{} a", parent)));
    let second = free.next().unwrap_or_else(|| RegionId::new(format!("{} b", parent)));
    [first, second]
}
