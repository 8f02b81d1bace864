//! Spatial lookups for directional targeting
//!
//! Centroids only: this module never looks at ownership.

pub mod compass;
pub mod index;

pub use compass::{bearing_degrees, compass_sector, distance, CompassSector};
pub use index::{SectorHit, SpatialIndex};
