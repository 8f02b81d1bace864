//! Session persistence in a string key-value store
//!
//! Every part of the session lives under its own key as a JSON value, so a
//! damaged entry only costs that part: loading falls back to the default for
//! it and carries on.

use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::history::{MatchHistory, MatchRound};
use super::machine::{GameSession, MatchPair, MatchStage};
use crate::atlas::{Atlas, SplitRecord};
use crate::core::config::GameConfig;
use crate::core::error::PersistenceError;
use crate::ledger::{OwnershipLedger, Team, TeamSnapshot};

pub const KEY_ROUND: &str = "currentRound";
pub const KEY_ACTIVE: &str = "gameActive";
pub const KEY_MATCH: &str = "currentMatch";
pub const KEY_HISTORY: &str = "matchHistory";
pub const KEY_TEAMS: &str = "teams";
pub const KEY_SPLITS: &str = "splitRegions";

pub const ALL_KEYS: [&str; 6] = [KEY_ROUND, KEY_ACTIVE, KEY_MATCH, KEY_HISTORY, KEY_TEAMS, KEY_SPLITS];

/// The `currentMatch` entry: the pair plus both teams as they were drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedMatch {
    #[serde(flatten)]
    pair: MatchPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    participants: Option<[TeamSnapshot; 2]>,
}

/// String key-value storage for snapshots
pub trait SnapshotStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: AHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Open a [`FileStore`] at `root`, or keep the session in memory when the
/// directory cannot be used
pub fn open_store(root: &Path) -> Box<dyn SnapshotStore> {
    match FileStore::new(root) {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(dir = %root.display(), error = %e, "save directory unusable, session will not be saved to disk");
            Box::new(MemoryStore::new())
        }
    }
}

fn write_key<S, T>(store: &mut S, key: &str, value: &T) -> Result<(), PersistenceError>
where
    S: SnapshotStore + ?Sized,
    T: Serialize,
{
    let json = serde_json::to_string(value)?;
    store.write(key, &json)
}

fn read_key<S, T>(store: &S, key: &str) -> Option<T>
where
    S: SnapshotStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "snapshot entry unreadable, using default");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "snapshot entry corrupt, using default");
            None
        }
    }
}

/// Write every part of the session
pub fn try_save_session<S>(store: &mut S, session: &GameSession, atlas: &Atlas) -> Result<(), PersistenceError>
where
    S: SnapshotStore + ?Sized,
{
    // A resolving round has already been recorded; its pair is not resumable
    let current = match session.stage {
        MatchStage::ResolvingRound => None,
        _ => session.pair.map(|pair| SavedMatch {
            pair,
            participants: session.participants.clone(),
        }),
    };

    write_key(store, KEY_ROUND, &session.round)?;
    write_key(store, KEY_ACTIVE, &session.active)?;
    write_key(store, KEY_MATCH, &current)?;
    write_key(store, KEY_HISTORY, &session.history.to_vec())?;
    write_key(store, KEY_TEAMS, &session.ledger.teams())?;
    write_key(store, KEY_SPLITS, &atlas.splits())?;
    Ok(())
}

/// Like [`try_save_session`], logging instead of failing
pub fn save_session<S>(store: &mut S, session: &GameSession, atlas: &Atlas)
where
    S: SnapshotStore + ?Sized,
{
    if let Err(e) = try_save_session(store, session, atlas) {
        tracing::warn!(error = %e, "failed to save session snapshot");
    }
}

/// Rebuild a session from whatever the store holds.
///
/// Recorded splits are replayed onto `atlas` first. Never fails: missing or
/// corrupt entries take their defaults, and the restored ledger is repaired
/// to satisfy the ownership rules.
pub fn load_session<S>(store: &S, atlas: &mut Atlas, config: &GameConfig) -> GameSession
where
    S: SnapshotStore + ?Sized,
{
    let splits: Vec<SplitRecord> = read_key(store, KEY_SPLITS).unwrap_or_default();
    let fresh: Vec<SplitRecord> = splits
        .into_iter()
        .filter(|record| !atlas.splits().contains(record))
        .collect();
    atlas.replay(&fresh);

    let teams: Vec<Team> = read_key(store, KEY_TEAMS).unwrap_or_default();
    let ledger = OwnershipLedger::restore(teams, atlas, config.palette.clone());

    let round = read_key::<_, u32>(store, KEY_ROUND).unwrap_or(1).max(1);
    let mut active = read_key(store, KEY_ACTIVE).unwrap_or(false);
    let history = MatchHistory::from_rounds(
        read_key::<_, Vec<MatchRound>>(store, KEY_HISTORY).unwrap_or_default(),
        config.history_limit,
    );

    let is_playing = |id| ledger.team(id).is_some_and(Team::is_active);
    let saved_match = read_key::<_, Option<SavedMatch>>(store, KEY_MATCH).flatten();
    let mut pair = saved_match.as_ref().map(|m| m.pair);
    if let Some(saved) = pair {
        if !is_playing(saved.acting) || saved.opponent.is_some_and(|o| !is_playing(o) || o == saved.acting) {
            tracing::warn!(?saved, "dropping saved match with teams no longer in play");
            pair = None;
        }
    }

    if active && ledger.active_count() < 2 {
        tracing::warn!("saved game has fewer than two teams in play, marking it inactive");
        active = false;
    }

    let stage = match (active, pair) {
        (false, _) => MatchStage::Idle,
        (true, Some(MatchPair { opponent: Some(_), .. })) => MatchStage::AwaitingWinner,
        (true, _) => MatchStage::SelectingOpponent,
    };
    if !active {
        pair = None;
    }
    let participants = match (pair, saved_match.and_then(|m| m.participants)) {
        (Some(MatchPair { acting, opponent: Some(opponent) }), Some(teams))
            if teams[0].id == acting && teams[1].id == opponent =>
        {
            Some(teams)
        }
        _ => None,
    };

    tracing::info!(round, active, ?stage, teams = ledger.len(), "session restored");
    let mut session = GameSession::new(config);
    session.ledger = ledger;
    session.round = round;
    session.active = active;
    session.stage = stage;
    session.pair = pair;
    session.participants = participants;
    session.history = history;
    session
}

/// Remove every snapshot key
pub fn clear_snapshot<S>(store: &mut S) -> Result<(), PersistenceError>
where
    S: SnapshotStore + ?Sized,
{
    for key in ALL_KEYS {
        store.remove(key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TimingConfig;
    use crate::core::types::{MapPoint, RegionId, TeamId};
    use crate::session::machine::{FireOutcome, MatchStateMachine};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn atlas() -> Atlas {
        Atlas::from_centroids([
            (RegionId::new("Alpha"), MapPoint::new(0.0, 0.0)),
            (RegionId::new("Beta"), MapPoint::new(10.0, 0.0)),
            (RegionId::new("Delta"), MapPoint::new(0.0, 10.0)),
        ])
    }

    fn awaiting_winner(atlas: &Atlas) -> (GameSession, MatchStateMachine, ChaCha8Rng) {
        let config = GameConfig::default();
        let machine = MatchStateMachine::new(&config).with_timing(TimingConfig::immediate());
        let mut session = GameSession::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for (name, region) in [("A", "Alpha"), ("B", "Beta"), ("D", "Delta")] {
            machine.add_team(&mut session, name, &RegionId::new(region), atlas).unwrap();
        }
        let draw = machine.start(&mut session, &mut rng).unwrap();
        let outcome = machine.fire(&mut session, draw.token, atlas, &mut rng);
        assert!(matches!(outcome, FireOutcome::OpponentDrawn { .. }));
        (session, machine, rng)
    }

    #[test]
    fn test_round_trip_in_progress_session() {
        let atlas_before = atlas();
        let (session, _, _) = awaiting_winner(&atlas_before);
        let mut store = MemoryStore::new();
        try_save_session(&mut store, &session, &atlas_before).unwrap();
        assert_eq!(store.len(), ALL_KEYS.len());

        let mut atlas_after = atlas();
        let restored = load_session(&store, &mut atlas_after, &GameConfig::default());
        assert_eq!(restored.stage(), MatchStage::AwaitingWinner);
        assert_eq!(restored.pair(), session.pair());
        assert_eq!(restored.participants(), session.participants());
        assert!(restored.participants().is_some());
        assert_eq!(restored.round(), 1);
        assert!(restored.is_active());
        assert_eq!(restored.ledger().teams(), session.ledger().teams());
        assert!(!restored.is_transitioning());
    }

    #[test]
    fn test_restored_match_records_teams_as_drawn() {
        let atlas_before = atlas();
        let (session, machine, mut rng) = awaiting_winner(&atlas_before);
        let MatchPair { acting, opponent: Some(opponent) } = session.pair().unwrap() else {
            panic!("opponent should be drawn");
        };
        let drawn_name = session.ledger().team(acting).unwrap().name.clone();
        let mut store = MemoryStore::new();
        try_save_session(&mut store, &session, &atlas_before).unwrap();

        let mut atlas_after = atlas();
        let mut restored = load_session(&store, &mut atlas_after, &GameConfig::default());
        machine.rename_team(&mut restored, acting, "Renamed").unwrap();
        machine.declare_winner(&mut restored, opponent, &mut rng).unwrap();

        let round = restored.history().latest().unwrap();
        assert_eq!(round.participants[0].name, drawn_name);
        assert_eq!(round.participants[1].id, opponent);
    }

    #[test]
    fn test_pair_without_team_snapshots_still_loads() {
        let atlas_before = atlas();
        let (session, _, _) = awaiting_winner(&atlas_before);
        let mut store = MemoryStore::new();
        try_save_session(&mut store, &session, &atlas_before).unwrap();
        write_key(&mut store, KEY_MATCH, &session.pair()).unwrap();

        let mut atlas_after = atlas();
        let restored = load_session(&store, &mut atlas_after, &GameConfig::default());
        assert_eq!(restored.pair(), session.pair());
        assert_eq!(restored.stage(), MatchStage::AwaitingWinner);
        assert!(restored.participants().is_none());
    }

    #[test]
    fn test_resolving_round_saves_no_pair() {
        let atlas = atlas();
        let (mut session, machine, mut rng) = awaiting_winner(&atlas);
        let acting = session.pair().unwrap().acting;
        machine.declare_winner(&mut session, acting, &mut rng).unwrap();

        let mut store = MemoryStore::new();
        try_save_session(&mut store, &session, &atlas).unwrap();
        assert_eq!(store.read(KEY_MATCH).unwrap().as_deref(), Some("null"));

        let mut fresh = atlas.clone();
        let mut restored = load_session(&store, &mut fresh, &GameConfig::default());
        assert_eq!(restored.stage(), MatchStage::SelectingOpponent);
        assert_eq!(restored.round(), 2);
        assert_eq!(restored.history().len(), 1);
        assert!(machine.resume(&mut restored, &mut rng).is_some());
        assert!(restored.pair().is_some());
    }

    #[test]
    fn test_corrupt_entries_fall_back() {
        let atlas_before = atlas();
        let (session, _, _) = awaiting_winner(&atlas_before);
        let mut store = MemoryStore::new();
        try_save_session(&mut store, &session, &atlas_before).unwrap();
        store.write(KEY_ROUND, "\"seven\"").unwrap();
        store.write(KEY_MATCH, "{ broken").unwrap();

        let mut atlas_after = atlas();
        let restored = load_session(&store, &mut atlas_after, &GameConfig::default());
        assert_eq!(restored.round(), 1);
        assert_eq!(restored.ledger().len(), 3);
        assert_eq!(restored.pair(), None);
        assert_eq!(restored.stage(), MatchStage::SelectingOpponent);
    }

    #[test]
    fn test_empty_store_gives_fresh_session() {
        let mut atlas = atlas();
        let restored = load_session(&MemoryStore::new(), &mut atlas, &GameConfig::default());
        assert_eq!(restored.stage(), MatchStage::Idle);
        assert_eq!(restored.round(), 1);
        assert!(restored.ledger().is_empty());
    }

    #[test]
    fn test_pair_with_eliminated_team_is_dropped() {
        let mut store = MemoryStore::new();
        let mut a = Team::new(TeamId(1), "A", RegionId::new("Alpha"), "#111111");
        a.owned_regions.insert(RegionId::new("Beta"));
        let mut b = Team::new(TeamId(2), "B", RegionId::new("Beta"), "#222222");
        b.owned_regions.clear();
        b.eliminated = true;
        let d = Team::new(TeamId(3), "D", RegionId::new("Delta"), "#333333");
        write_key(&mut store, KEY_TEAMS, &vec![a, b, d]).unwrap();
        write_key(&mut store, KEY_ACTIVE, &true).unwrap();
        write_key(
            &mut store,
            KEY_MATCH,
            &Some(MatchPair { acting: TeamId(1), opponent: Some(TeamId(2)) }),
        )
        .unwrap();

        let mut atlas = atlas();
        let restored = load_session(&store, &mut atlas, &GameConfig::default());
        assert_eq!(restored.pair(), None);
        assert_eq!(restored.stage(), MatchStage::SelectingOpponent);
        assert!(restored.ledger().check_invariants(&atlas).is_ok());
    }

    #[test]
    fn test_unusable_save_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "plain file").unwrap();

        let atlas = atlas();
        let (session, _, _) = awaiting_winner(&atlas);
        let mut store = open_store(&blocker.join("save"));
        try_save_session(store.as_mut(), &session, &atlas).unwrap();

        let mut atlas_after = atlas.clone();
        let restored = load_session(store.as_ref(), &mut atlas_after, &GameConfig::default());
        assert_eq!(restored.ledger().len(), 3);
        assert!(!blocker.join("save").exists());
    }

    #[test]
    fn test_file_store_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = atlas();
        let (session, _, _) = awaiting_winner(&atlas);

        let mut store = FileStore::new(dir.path().join("snapshots")).unwrap();
        save_session(&mut store, &session, &atlas);
        assert!(store.root().join("teams.json").exists());
        assert!(store.read("missing").unwrap().is_none());

        clear_snapshot(&mut store).unwrap();
        for key in ALL_KEYS {
            assert!(store.read(key).unwrap().is_none());
        }
    }
}
