use thiserror::Error;

use crate::core::types::{RegionId, TeamId};
use crate::session::MatchStage;

/// Failures of the geometry kernel. The target region is left unsplit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Malformed path data at offset {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("Path contains no closed shape")]
    EmptyShape,

    #[error("Shape has zero area")]
    ZeroArea,

    #[error("Shape outline crosses itself")]
    SelfIntersecting,

    #[error("Split failed or produced degenerate parts")]
    SplitFailed,
}

/// A transition or mutation that is not allowed in the current state.
/// Always raised before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionViolation {
    #[error("At least two teams still in play are needed to start (found {available})")]
    NotEnoughTeams { available: usize },

    #[error("Team {0} is not playing in the current match")]
    NotAParticipant(TeamId),

    #[error("A transition is already in progress")]
    TransitionPending,

    #[error("Not allowed while the match is {actual:?}")]
    InvalidStage { actual: MatchStage },

    #[error("Region {region} is owned by team {owner} and cannot be split")]
    RegionOwned { region: RegionId, owner: TeamId },

    #[error("Region {region} already belongs to team {owner}")]
    RegionTaken { region: RegionId, owner: TeamId },

    #[error("Region {0} already exists")]
    RegionExists(RegionId),

    #[error("Unknown region: {0}")]
    UnknownRegion(RegionId),

    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("Team name must not be empty")]
    EmptyTeamName,
}

/// Snapshot store failures. Never fatal: callers fall back to defaults.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ConquestError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConquestError>;
