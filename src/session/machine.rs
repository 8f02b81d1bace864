//! Round lifecycle: pick an acting team, draw its opponent, wait for a
//! winner, transfer territory, repeat until one team is left.
//!
//! The two timed pauses ("drawing an opponent" and the gap between rounds)
//! are not slept here. Each one is handed back to the caller as a
//! [`ScheduledTransition`], and the caller passes its token to
//! [`MatchStateMachine::fire`] once the delay is up. Only the most recently
//! issued token is honored.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::history::{MatchHistory, MatchRound};
use crate::atlas::Atlas;
use crate::core::config::{GameConfig, SplitConfig, TimingConfig};
use crate::core::error::{ConquestError, PreconditionViolation};
use crate::core::types::{RegionId, TeamId};
use crate::ledger::{OwnershipLedger, Roster, SplitOutcome, Team, TeamSnapshot, TransferOutcome};
use crate::targeting::TargetingEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchStage {
    #[default]
    Idle,
    SelectingOpponent,
    AwaitingWinner,
    ResolvingRound,
    GameOver,
}

/// The teams playing the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    pub acting: TeamId,
    pub opponent: Option<TeamId>,
}

impl MatchPair {
    pub fn involves(&self, team: TeamId) -> bool {
        self.acting == team || self.opponent == Some(team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    DrawOpponent,
    AdvanceRound,
}

/// A transition the caller must fire after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub token: u64,
    pub kind: TransitionKind,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PendingTransition {
    pub(super) token: u64,
    pub(super) kind: TransitionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    /// The token was cancelled or superseded; nothing happened
    Stale,
    OpponentDrawn { acting: TeamId, opponent: TeamId },
    NextRound(ScheduledTransition),
    GameOver { champion: Option<TeamId> },
}

/// What a winner declaration did
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResolution {
    pub winner: TeamId,
    pub loser: TeamId,
    pub transfer: TransferOutcome,
    pub next: ScheduledTransition,
}

/// Everything that makes up a game in progress
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(super) ledger: OwnershipLedger,
    pub(super) round: u32,
    pub(super) active: bool,
    pub(super) stage: MatchStage,
    pub(super) pair: Option<MatchPair>,
    /// Acting team and opponent as they stood when the opponent was drawn
    pub(super) participants: Option<[TeamSnapshot; 2]>,
    pub(super) pending: Option<PendingTransition>,
    pub(super) history: MatchHistory,
    pub(super) next_token: u64,
}

impl GameSession {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            ledger: OwnershipLedger::new(config.palette.clone()),
            round: 1,
            active: false,
            stage: MatchStage::Idle,
            pair: None,
            participants: None,
            pending: None,
            history: MatchHistory::new(config.history_limit),
            next_token: 1,
        }
    }

    pub fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stage(&self) -> MatchStage {
        self.stage
    }

    pub fn pair(&self) -> Option<MatchPair> {
        self.pair
    }

    pub fn participants(&self) -> Option<&[TeamSnapshot; 2]> {
        self.participants.as_ref()
    }

    pub fn history(&self) -> &MatchHistory {
        &self.history
    }

    /// A timed transition is outstanding
    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<u64> {
        self.pending.map(|p| p.token)
    }

    fn schedule(&mut self, kind: TransitionKind, delay: Duration) -> ScheduledTransition {
        let token = self.next_token;
        self.next_token += 1;
        self.pending = Some(PendingTransition { token, kind });
        ScheduledTransition { token, kind, delay }
    }

    fn ensure_idle_timer(&self) -> Result<(), PreconditionViolation> {
        if self.pending.is_some() {
            Err(PreconditionViolation::TransitionPending)
        } else {
            Ok(())
        }
    }

    fn random_active_team<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TeamId> {
        let ids: Vec<TeamId> = self.ledger.active_teams().map(|t| t.id).collect();
        if ids.is_empty() {
            None
        } else {
            Some(ids[rng.gen_range(0..ids.len())])
        }
    }

    fn finish(&mut self) -> FireOutcome {
        self.stage = MatchStage::GameOver;
        self.active = false;
        self.pair = None;
        self.participants = None;
        let mut survivors = self.ledger.active_teams().map(|t| t.id);
        let champion = match (survivors.next(), survivors.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        };
        tracing::info!(round = self.round, champion = ?champion, "game over");
        FireOutcome::GameOver { champion }
    }
}

/// Drives a [`GameSession`] through its stages
#[derive(Debug, Clone, Copy)]
pub struct MatchStateMachine {
    timing: TimingConfig,
    split: SplitConfig,
}

impl MatchStateMachine {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            timing: config.timing,
            split: config.split,
        }
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Begin a game: pick the first acting team and schedule the draw
    pub fn start<R: Rng + ?Sized>(
        &self,
        session: &mut GameSession,
        rng: &mut R,
    ) -> Result<ScheduledTransition, PreconditionViolation> {
        session.ensure_idle_timer()?;
        if !matches!(session.stage, MatchStage::Idle | MatchStage::GameOver) {
            return Err(PreconditionViolation::InvalidStage { actual: session.stage });
        }
        let available = session.ledger.active_count();
        if available < 2 {
            return Err(PreconditionViolation::NotEnoughTeams { available });
        }
        let acting = session
            .random_active_team(rng)
            .ok_or(PreconditionViolation::NotEnoughTeams { available })?;

        session.pair = Some(MatchPair { acting, opponent: None });
        session.participants = None;
        session.active = true;
        session.stage = MatchStage::SelectingOpponent;
        tracing::info!(round = session.round, acting = %acting, "game started");
        Ok(session.schedule(TransitionKind::DrawOpponent, self.timing.select_delay()))
    }

    /// Complete a timed transition
    pub fn fire<R: Rng + ?Sized>(
        &self,
        session: &mut GameSession,
        token: u64,
        atlas: &Atlas,
        rng: &mut R,
    ) -> FireOutcome {
        let pending = match session.pending {
            Some(pending) if pending.token == token => pending,
            _ => {
                tracing::debug!(token, "ignoring stale transition");
                return FireOutcome::Stale;
            }
        };
        session.pending = None;

        match pending.kind {
            TransitionKind::DrawOpponent => self.draw_opponent(session, atlas, rng),
            TransitionKind::AdvanceRound => self.advance_round(session, rng),
        }
    }

    fn draw_opponent<R: Rng + ?Sized>(&self, session: &mut GameSession, atlas: &Atlas, rng: &mut R) -> FireOutcome {
        // Resolve by id: the team may have changed since the draw was scheduled
        let drawn = session
            .pair
            .and_then(|pair| session.ledger.team(pair.acting))
            .filter(|team| team.is_active())
            .and_then(|acting| {
                let pool: Vec<&Team> = session
                    .ledger
                    .active_teams()
                    .filter(|team| team.id != acting.id)
                    .collect();
                let opponent = TargetingEngine::new(atlas.index()).select_opponent(acting, &pool, rng)?;
                let drawn = session.ledger.team(opponent)?;
                Some((acting.id, opponent, [acting.snapshot(), drawn.snapshot()]))
            });
        let Some((acting_id, opponent, participants)) = drawn else {
            return session.finish();
        };

        session.pair = Some(MatchPair {
            acting: acting_id,
            opponent: Some(opponent),
        });
        session.participants = Some(participants);
        session.stage = MatchStage::AwaitingWinner;
        tracing::info!(round = session.round, acting = %acting_id, opponent = %opponent, "opponent drawn");
        FireOutcome::OpponentDrawn {
            acting: acting_id,
            opponent,
        }
    }

    fn advance_round<R: Rng + ?Sized>(&self, session: &mut GameSession, rng: &mut R) -> FireOutcome {
        session.pair = None;
        session.participants = None;
        if session.ledger.active_count() < 2 {
            return session.finish();
        }
        let Some(acting) = session.random_active_team(rng) else {
            return session.finish();
        };

        session.pair = Some(MatchPair { acting, opponent: None });
        session.stage = MatchStage::SelectingOpponent;
        tracing::debug!(round = session.round, acting = %acting, "next round");
        FireOutcome::NextRound(session.schedule(TransitionKind::DrawOpponent, self.timing.select_delay()))
    }

    /// Throw away the drawn opponent and draw again for the same acting team
    pub fn reselect_opponent(&self, session: &mut GameSession) -> Result<ScheduledTransition, PreconditionViolation> {
        session.ensure_idle_timer()?;
        if session.stage != MatchStage::AwaitingWinner {
            return Err(PreconditionViolation::InvalidStage { actual: session.stage });
        }
        let Some(pair) = session.pair.as_mut() else {
            return Err(PreconditionViolation::InvalidStage { actual: session.stage });
        };

        pair.opponent = None;
        session.participants = None;
        session.stage = MatchStage::SelectingOpponent;
        tracing::debug!(round = session.round, "reselecting opponent");
        Ok(session.schedule(TransitionKind::DrawOpponent, self.timing.select_delay()))
    }

    /// Settle the current round in favor of `winner`
    pub fn declare_winner<R: Rng + ?Sized>(
        &self,
        session: &mut GameSession,
        winner: TeamId,
        rng: &mut R,
    ) -> Result<RoundResolution, PreconditionViolation> {
        session.ensure_idle_timer()?;
        if session.stage != MatchStage::AwaitingWinner {
            return Err(PreconditionViolation::InvalidStage { actual: session.stage });
        }
        let (acting, opponent) = match session.pair {
            Some(MatchPair {
                acting,
                opponent: Some(opponent),
            }) => (acting, opponent),
            _ => return Err(PreconditionViolation::InvalidStage { actual: session.stage }),
        };
        if !session.pair.is_some_and(|pair| pair.involves(winner)) {
            return Err(PreconditionViolation::NotAParticipant(winner));
        }
        let loser = if winner == acting { opponent } else { acting };

        // Snapshots from the draw; a restored match without them is captured now
        let participants = match session.participants.clone() {
            Some(saved) if saved[0].id == acting && saved[1].id == opponent => saved,
            _ => {
                let snapshot = |id| {
                    session
                        .ledger
                        .team(id)
                        .map(Team::snapshot)
                        .ok_or(PreconditionViolation::UnknownTeam(id))
                };
                [snapshot(acting)?, snapshot(opponent)?]
            }
        };

        let transfer = session.ledger.transfer_random_region(winner, loser, rng)?;
        session.participants = None;
        session.stage = MatchStage::ResolvingRound;
        session.history.record(MatchRound {
            round: session.round,
            participants,
            winner,
            transferred: transfer.region.clone(),
        });
        tracing::info!(round = session.round, winner = %winner, loser = %loser, "round resolved");
        session.round += 1;

        let next = session.schedule(TransitionKind::AdvanceRound, self.timing.transition_delay());
        Ok(RoundResolution {
            winner,
            loser,
            transfer,
            next,
        })
    }

    /// Wipe the session and cancel any outstanding transition
    pub fn clear(&self, session: &mut GameSession) {
        if let Some(pending) = session.pending.take() {
            tracing::debug!(token = pending.token, "cancelled pending transition");
        }
        session.ledger.clear();
        session.round = 1;
        session.active = false;
        session.stage = MatchStage::Idle;
        session.pair = None;
        session.participants = None;
        session.history.clear();
        tracing::info!("session cleared");
    }

    /// Re-arm the opponent draw of a restored session that was waiting on
    /// it, drawing a fresh acting team if none was saved
    pub fn resume<R: Rng + ?Sized>(&self, session: &mut GameSession, rng: &mut R) -> Option<ScheduledTransition> {
        if !session.active || session.stage != MatchStage::SelectingOpponent || session.pending.is_some() {
            return None;
        }
        if session.pair.is_none() {
            let acting = session.random_active_team(rng)?;
            session.pair = Some(MatchPair { acting, opponent: None });
        }
        tracing::info!(round = session.round, "resuming opponent draw");
        Some(session.schedule(TransitionKind::DrawOpponent, self.timing.select_delay()))
    }

    pub fn add_team(
        &self,
        session: &mut GameSession,
        name: &str,
        home_region: &RegionId,
        atlas: &Atlas,
    ) -> Result<TeamId, PreconditionViolation> {
        session.ensure_idle_timer()?;
        session.ledger.add_team(name, home_region, atlas)
    }

    pub fn seed_from_roster(
        &self,
        session: &mut GameSession,
        roster: &Roster,
        atlas: &Atlas,
        config: &GameConfig,
    ) -> Result<Vec<TeamId>, PreconditionViolation> {
        session.ensure_idle_timer()?;
        Ok(session.ledger.seed_from_roster(roster, atlas, config))
    }

    pub fn rename_team(&self, session: &mut GameSession, team: TeamId, name: &str) -> Result<(), PreconditionViolation> {
        session.ensure_idle_timer()?;
        session.ledger.rename_team(team, name)
    }

    pub fn split_region(
        &self,
        session: &mut GameSession,
        region: &RegionId,
        atlas: &mut Atlas,
    ) -> Result<SplitOutcome, ConquestError> {
        session.ensure_idle_timer()?;
        session.ledger.split_region(region, atlas, &self.split)
    }
}
