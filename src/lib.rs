//! Map Conquest - turn-based territorial conquest on a world map
//!
//! Teams start with one home region each. Every round an acting team is
//! drawn, its opponent is chosen by compass direction, and the declared winner
//! annexes one of the loser's regions until a single team is left. Neutral
//! regions can be split in two along their bounding box.

pub mod atlas;
pub mod core;
pub mod geometry;
pub mod ledger;
pub mod session;
pub mod spatial;
pub mod targeting;
