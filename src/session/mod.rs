//! Match flow and session persistence

pub mod history;
pub mod machine;
pub mod snapshot;

pub use history::{MatchHistory, MatchRound};
pub use machine::{
    FireOutcome, GameSession, MatchPair, MatchStage, MatchStateMachine, RoundResolution, ScheduledTransition,
    TransitionKind,
};
pub use snapshot::{
    clear_snapshot, load_session, open_store, save_session, try_save_session, FileStore, MemoryStore, SnapshotStore,
};
