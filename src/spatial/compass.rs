//! Bearings and eight-way compass sectors
//!
//! Bearings use screen axes (y grows downward): 0° is East and angles grow
//! clockwise, so 90° is South and 270° is North.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::types::MapPoint;

/// One of eight 45°-wide sectors, each centered on its direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassSector {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassSector {
    pub const ALL: [CompassSector; 8] = [
        CompassSector::N,
        CompassSector::NE,
        CompassSector::E,
        CompassSector::SE,
        CompassSector::S,
        CompassSector::SW,
        CompassSector::W,
        CompassSector::NW,
    ];

    /// Bearing of the sector's center line
    pub fn center_degrees(self) -> f64 {
        match self {
            CompassSector::E => 0.0,
            CompassSector::SE => 45.0,
            CompassSector::S => 90.0,
            CompassSector::SW => 135.0,
            CompassSector::W => 180.0,
            CompassSector::NW => 225.0,
            CompassSector::N => 270.0,
            CompassSector::NE => 315.0,
        }
    }

    /// Uniformly random sector
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn label(self) -> &'static str {
        match self {
            CompassSector::N => "N",
            CompassSector::NE => "NE",
            CompassSector::E => "E",
            CompassSector::SE => "SE",
            CompassSector::S => "S",
            CompassSector::SW => "SW",
            CompassSector::W => "W",
            CompassSector::NW => "NW",
        }
    }
}

impl fmt::Display for CompassSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompassSector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|sector| sector.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown compass sector '{}'", s))
    }
}

/// Euclidean distance between two map points
pub fn distance(p1: MapPoint, p2: MapPoint) -> f64 {
    p1.distance(&p2)
}

/// Bearing from `from` to `to` in degrees, in (-180, 180]
pub fn bearing_degrees(from: MapPoint, to: MapPoint) -> f64 {
    let delta = to - from;
    delta.y.atan2(delta.x).to_degrees()
}

/// Sector containing a bearing.
///
/// Each sector spans [center - 22.5°, center + 22.5°) after normalizing to
/// [0°, 360°), so a bearing of exactly 22.5° is SE and -22.5° is E.
/// Non-finite bearings fall back to E.
pub fn compass_sector(bearing: f64) -> CompassSector {
    let normalized = bearing.rem_euclid(360.0);
    if !normalized.is_finite() {
        return CompassSector::E;
    }

    if !(22.5..337.5).contains(&normalized) {
        CompassSector::E
    } else if normalized < 67.5 {
        CompassSector::SE
    } else if normalized < 112.5 {
        CompassSector::S
    } else if normalized < 157.5 {
        CompassSector::SW
    } else if normalized < 202.5 {
        CompassSector::W
    } else if normalized < 247.5 {
        CompassSector::NW
    } else if normalized < 292.5 {
        CompassSector::N
    } else {
        CompassSector::NE
    }
}
