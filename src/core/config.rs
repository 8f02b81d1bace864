//! Game configuration with documented constants
//!
//! Every tunable number lives here. Values load from a TOML file where every
//! key is optional; missing keys keep the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::core::error::ConfigError;

/// Top-level configuration for a conquest session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub timing: TimingConfig,

    /// Number of finished rounds kept in the match history
    ///
    /// History is purely for display, so this only bounds memory and the
    /// size of the persisted snapshot.
    pub history_limit: usize,

    pub split: SplitConfig,

    /// Team colors, assigned by creation index (wrapping)
    pub palette: Vec<String>,

    /// Roster name -> map region name, for home regions whose roster name
    /// differs from the name on the map (e.g. "England" -> "United Kingdom")
    pub aliases: BTreeMap<String, String>,
}

/// Delays of the two timed suspensions in the match flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long "drawing an opponent" takes before the pair is revealed
    pub select_delay_ms: u64,

    /// Pause after a round resolves before the next acting team is drawn
    pub transition_delay_ms: u64,
}

/// Region splitting parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Minimum area (square map units) each half must have
    ///
    /// Anything at or below this is treated as a sliver and the split
    /// attempt counts as degenerate.
    pub min_piece_area: f64,

    /// Decimal digits kept when writing split paths
    pub precision: usize,

    /// Line segments used to flatten each curve command
    ///
    /// Arcs use this many segments per quarter turn.
    pub curve_segments: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            history_limit: 10,
            split: SplitConfig::default(),
            palette: default_palette(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            select_delay_ms: 1500,
            transition_delay_ms: 2000,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_piece_area: 1.0,
            precision: 3,
            curve_segments: 16,
        }
    }
}

impl TimingConfig {
    pub fn select_delay(&self) -> Duration {
        Duration::from_millis(self.select_delay_ms)
    }

    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    /// Zero delays, for headless runs and tests
    pub fn immediate() -> Self {
        Self {
            select_delay_ms: 0,
            transition_delay_ms: 0,
        }
    }
}

fn default_palette() -> Vec<String> {
    [
        "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4",
        "#46f0f0", "#f032e6", "#bcf60c", "#fabebe", "#008080", "#e6beff",
        "#9a6324", "#800000", "#aaffc3", "#808000", "#000075", "#808080",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Map a roster region name through the alias table
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.history_limit == 0 {
            return Err("history_limit must be at least 1".into());
        }

        if self.palette.is_empty() {
            return Err("palette must contain at least one color".into());
        }
        if let Some(bad) = self.palette.iter().find(|c| !is_hex_color(c)) {
            return Err(format!("palette color '{}' is not #rrggbb", bad));
        }

        if !self.split.min_piece_area.is_finite() || self.split.min_piece_area <= 0.0 {
            return Err(format!(
                "split.min_piece_area ({}) must be a positive number",
                self.split.min_piece_area
            ));
        }

        if self.split.precision > 9 {
            return Err(format!(
                "split.precision ({}) should be <= 9",
                self.split.precision
            ));
        }

        if self.split.curve_segments == 0 {
            return Err("split.curve_segments must be at least 1".into());
        }

        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
