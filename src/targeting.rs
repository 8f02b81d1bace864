//! Opponent selection by compass direction
//!
//! A random compass sector is drawn, and the closest region in that sector
//! (seen from any of the attacker's regions) that belongs to a candidate team
//! decides the opponent. With nothing in that direction, any candidate is
//! picked at random.

use ahash::AHashMap;
use rand::Rng;

use crate::core::types::{RegionId, TeamId};
use crate::ledger::Team;
use crate::spatial::{CompassSector, SpatialIndex};

#[derive(Debug, Clone, PartialEq)]
pub enum TargetingMethod {
    /// Found by direction: the region that was hit and how far away it was
    Directional { region: RegionId, distance: f64 },
    /// Nothing owned by a candidate lay in the sector
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetingDecision {
    pub opponent: TeamId,
    pub sector: CompassSector,
    pub method: TargetingMethod,
}

pub struct TargetingEngine<'a> {
    index: &'a SpatialIndex,
}

impl<'a> TargetingEngine<'a> {
    pub fn new(index: &'a SpatialIndex) -> Self {
        Self { index }
    }

    /// Pick an opponent for `attacker` from `pool`.
    ///
    /// Never returns the attacker or a team outside the pool; `None` only
    /// when the pool holds no other active team.
    pub fn select_opponent<R: Rng + ?Sized>(&self, attacker: &Team, pool: &[&Team], rng: &mut R) -> Option<TeamId> {
        self.decide(attacker, pool, rng).map(|decision| decision.opponent)
    }

    /// Like [`select_opponent`](Self::select_opponent), reporting how the
    /// choice was made
    pub fn decide<R: Rng + ?Sized>(
        &self,
        attacker: &Team,
        pool: &[&Team],
        rng: &mut R,
    ) -> Option<TargetingDecision> {
        let sector = CompassSector::random(rng);
        self.select_opponent_in(sector, attacker, pool, rng)
    }

    /// Opponent selection for a fixed sector
    pub fn select_opponent_in<R: Rng + ?Sized>(
        &self,
        sector: CompassSector,
        attacker: &Team,
        pool: &[&Team],
        rng: &mut R,
    ) -> Option<TargetingDecision> {
        let candidates: Vec<&Team> = pool
            .iter()
            .copied()
            .filter(|team| team.id != attacker.id && team.is_active())
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let owners: AHashMap<&RegionId, TeamId> = candidates
            .iter()
            .flat_map(|team| team.owned_regions.iter().map(move |region| (region, team.id)))
            .collect();

        let mut best: Option<(TeamId, RegionId, f64)> = None;
        for origin in &attacker.owned_regions {
            let hits = self.index.regions_in_sector(origin, sector, &attacker.owned_regions);
            // Hits are nearest first, so the first owned one is this origin's best
            let Some((hit, owner)) = hits
                .iter()
                .find_map(|hit| owners.get(&hit.region).map(|owner| (hit, *owner)))
            else {
                continue;
            };

            // Strict: on a tie the earlier origin keeps the win
            if best.as_ref().map_or(true, |(_, _, distance)| hit.distance < *distance) {
                best = Some((owner, hit.region.clone(), hit.distance));
            }
        }

        let decision = match best {
            Some((opponent, region, distance)) => TargetingDecision {
                opponent,
                sector,
                method: TargetingMethod::Directional { region, distance },
            },
            None => TargetingDecision {
                opponent: candidates[rng.gen_range(0..candidates.len())].id,
                sector,
                method: TargetingMethod::Fallback,
            },
        };

        tracing::debug!(
            attacker = %attacker.id,
            opponent = %decision.opponent,
            sector = %sector,
            method = ?decision.method,
            "opponent selected"
        );
        Some(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MapPoint;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn team(id: u32, regions: &[&str]) -> Team {
        let mut team = Team::new(TeamId(id), format!("T{}", id), RegionId::new(regions[0]), "#808080");
        team.owned_regions = regions.iter().map(|r| RegionId::new(*r)).collect();
        team
    }

    /// Attacker at the origin, rivals spread around it
    fn index() -> SpatialIndex {
        SpatialIndex::from_entries([
            (RegionId::new("Home"), MapPoint::new(0.0, 0.0)),
            (RegionId::new("Outpost"), MapPoint::new(100.0, 100.0)),
            (RegionId::new("East Near"), MapPoint::new(10.0, 0.0)),
            (RegionId::new("East Far"), MapPoint::new(50.0, 0.0)),
            (RegionId::new("North"), MapPoint::new(0.0, -40.0)),
            (RegionId::new("Neutral West"), MapPoint::new(-5.0, 0.0)),
        ])
    }

    #[test]
    fn test_closest_in_sector_wins() {
        let index = index();
        let engine = TargetingEngine::new(&index);
        let attacker = team(1, &["Home"]);
        let near = team(2, &["East Near"]);
        let far = team(3, &["East Far", "North"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let decision = engine
            .select_opponent_in(CompassSector::E, &attacker, &[&far, &near], &mut rng)
            .unwrap();
        assert_eq!(decision.opponent, TeamId(2));
        assert!(matches!(decision.method, TargetingMethod::Directional { ref region, .. } if region.as_str() == "East Near"));

        let decision = engine
            .select_opponent_in(CompassSector::N, &attacker, &[&far, &near], &mut rng)
            .unwrap();
        assert_eq!(decision.opponent, TeamId(3));
    }

    #[test]
    fn test_teams_outside_pool_are_ignored() {
        let index = index();
        let engine = TargetingEngine::new(&index);
        let attacker = team(1, &["Home"]);
        let far = team(3, &["East Far"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        // East Near belongs to nobody in the pool, so the ray continues to East Far
        let decision = engine
            .select_opponent_in(CompassSector::E, &attacker, &[&far], &mut rng)
            .unwrap();
        assert_eq!(decision.opponent, TeamId(3));
    }

    #[test]
    fn test_empty_sector_falls_back_to_pool() {
        let index = index();
        let engine = TargetingEngine::new(&index);
        let attacker = team(1, &["Home"]);
        let near = team(2, &["East Near"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let decision = engine
            .select_opponent_in(CompassSector::SW, &attacker, &[&near], &mut rng)
            .unwrap();
        assert_eq!(decision.opponent, TeamId(2));
        assert_eq!(decision.method, TargetingMethod::Fallback);
    }

    #[test]
    fn test_attacker_filtered_from_pool() {
        let index = index();
        let engine = TargetingEngine::new(&index);
        let attacker = team(1, &["Home"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(engine.select_opponent(&attacker, &[&attacker], &mut rng), None);
        assert_eq!(engine.select_opponent(&attacker, &[], &mut rng), None);
    }

    #[test]
    fn test_all_attacker_regions_are_origins() {
        let index = index();
        let engine = TargetingEngine::new(&index);
        // From Outpost (100,100), North at (0,-40) is NW-ish, far away; from Home it is due N
        let attacker = team(1, &["Outpost", "Home"]);
        let north = team(2, &["North"]);
        let near = team(3, &["East Near"]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let decision = engine
            .select_opponent_in(CompassSector::N, &attacker, &[&near, &north], &mut rng)
            .unwrap();
        assert_eq!(decision.opponent, TeamId(2));
    }

    proptest! {
        #[test]
        fn prop_never_selects_attacker_or_outsider(seed in any::<u64>(), pool_mask in 1u8..16) {
            let index = index();
            let engine = TargetingEngine::new(&index);
            let teams = [
                team(1, &["Home"]),
                team(2, &["East Near"]),
                team(3, &["East Far"]),
                team(4, &["North"]),
                team(5, &["Neutral West", "Outpost"]),
            ];
            let attacker = &teams[0];
            let mut pool: Vec<&Team> = teams[1..]
                .iter()
                .enumerate()
                .filter(|(i, _)| pool_mask & (1 << i) != 0)
                .map(|(_, t)| t)
                .collect();
            pool.push(attacker);

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let chosen = engine.select_opponent(attacker, &pool, &mut rng).unwrap();
            prop_assert_ne!(chosen, attacker.id);
            prop_assert!(pool.iter().any(|t| t.id == chosen));
        }
    }
}
