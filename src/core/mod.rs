pub mod config;
pub mod error;
pub mod types;

pub use config::{GameConfig, SplitConfig, TimingConfig};
pub use error::{ConquestError, GeometryError, PersistenceError, PreconditionViolation, Result};
pub use types::{MapPoint, RegionId, TeamId};
