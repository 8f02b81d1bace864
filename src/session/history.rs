//! Bounded record of finished rounds, most recent first

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::types::{RegionId, TeamId};
use crate::ledger::TeamSnapshot;

/// One decided round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRound {
    pub round: u32,
    /// Acting team first, then its opponent, as they stood when the winner
    /// was declared
    pub participants: [TeamSnapshot; 2],
    pub winner: TeamId,
    #[serde(default)]
    pub transferred: Option<RegionId>,
}

impl MatchRound {
    pub fn loser(&self) -> Option<&TeamSnapshot> {
        self.participants.iter().find(|p| p.id != self.winner)
    }
}

#[derive(Debug, Clone)]
pub struct MatchHistory {
    rounds: VecDeque<MatchRound>,
    limit: usize,
}

impl MatchHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            rounds: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Rebuild from persisted rounds (most recent first), dropping any over
    /// the limit
    pub fn from_rounds(rounds: Vec<MatchRound>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        history.rounds.extend(rounds.into_iter().take(history.limit));
        history
    }

    pub fn record(&mut self, round: MatchRound) {
        self.rounds.push_front(round);
        self.rounds.truncate(self.limit);
    }

    pub fn latest(&self) -> Option<&MatchRound> {
        self.rounds.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRound> {
        self.rounds.iter()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }

    pub fn to_vec(&self) -> Vec<MatchRound> {
        self.rounds.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(n: u32) -> MatchRound {
        let snapshot = |id: u32| TeamSnapshot {
            id: TeamId(id),
            name: format!("T{}", id),
            color: "#808080".into(),
            score: 0,
            region_count: 1,
        };
        MatchRound {
            round: n,
            participants: [snapshot(1), snapshot(2)],
            winner: TeamId(1),
            transferred: None,
        }
    }

    #[test]
    fn test_most_recent_first_and_capped() {
        let mut history = MatchHistory::new(3);
        for n in 1..=5 {
            history.record(round(n));
        }
        let rounds: Vec<u32> = history.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![5, 4, 3]);
        assert_eq!(history.latest().unwrap().loser().unwrap().id, TeamId(2));
    }

    #[test]
    fn test_from_rounds_respects_limit() {
        let history = MatchHistory::from_rounds((1..=4).rev().map(round).collect(), 2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().round, 4);
    }
}
